use chrono::DateTime;
use chrono::Utc;
use qz_content::Question;
use qz_core::ID;
use qz_core::Millis;
use qz_core::Mode;
use qz_core::Score;
use qz_core::Tier;
use qz_store::Participant;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;

/// What a participant did with one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerAction {
    Answered,
    Skipped,
    Timeout,
}

/// Per-answer audit record, appended in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: ID<Question>,
    pub time_taken: Millis,
    pub action: AnswerAction,
    pub correct: bool,
}

/// One arrival in the current FFF question window.
/// The timestamp is recorded for audit; scoring order is the append order
/// decided by the session's writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub participant_id: ID<Participant>,
    pub option_id: ID<qz_content::Choice>,
    pub timestamp: DateTime<Utc>,
    pub correct: bool,
}

/// Shared-clock state carried only by FASTEST_FINGER_FIRST sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FffState {
    pub time_per_question: Millis,
    pub current_question_index: usize,
    pub question_start_time: DateTime<Utc>,
    pub question_answers: Vec<QuestionAnswer>,
    /// False until the opening grace elapses and question zero goes out.
    #[serde(default)]
    pub started: bool,
}

/// Authoritative mutable state of one ACTIVE session.
/// Owned by the session's actor; everything else reads it as an opaque
/// checkpoint. Serialized as a single blob per write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveState {
    pub mode: Mode,
    pub tier: Tier,
    pub questions: Vec<Question>,
    pub end_time: DateTime<Utc>,
    pub scores: HashMap<ID<Participant>, Score>,
    pub user_progress: HashMap<ID<Participant>, usize>,
    pub question_sent_at: HashMap<ID<Participant>, DateTime<Utc>>,
    pub results: HashMap<ID<Participant>, Vec<AnswerRecord>>,
    pub fff: Option<FffState>,
}

impl LiveState {
    /// Fresh state at session start: zero scores and zero progress for
    /// every participant, empty result logs.
    pub fn new(
        mode: Mode,
        tier: Tier,
        questions: Vec<Question>,
        end_time: DateTime<Utc>,
        participants: &[ID<Participant>],
    ) -> Self {
        Self {
            mode,
            tier,
            questions,
            end_time,
            scores: participants.iter().map(|p| (*p, 0)).collect(),
            user_progress: participants.iter().map(|p| (*p, 0)).collect(),
            question_sent_at: HashMap::new(),
            results: participants.iter().map(|p| (*p, Vec::new())).collect(),
            fff: None,
        }
    }
    pub fn with_fff(mut self, time_per_question: Millis, now: DateTime<Utc>) -> Self {
        self.fff = Some(FffState {
            time_per_question,
            current_question_index: 0,
            question_start_time: now,
            question_answers: Vec::new(),
            started: false,
        });
        self
    }

    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
    /// Zero-based index of the next question for a participant.
    pub fn progress(&self, participant: ID<Participant>) -> usize {
        self.user_progress.get(&participant).copied().unwrap_or(0)
    }
    /// The question a participant is currently on, if any remain.
    pub fn current_question(&self, participant: ID<Participant>) -> Option<&Question> {
        self.question_at(self.progress(participant))
    }
    pub fn advance(&mut self, participant: ID<Participant>) {
        *self.user_progress.entry(participant).or_insert(0) += 1;
    }
    pub fn award(&mut self, participant: ID<Participant>, points: Score) {
        *self.scores.entry(participant).or_insert(0) += points;
    }
    pub fn record(&mut self, participant: ID<Participant>, record: AnswerRecord) {
        self.results.entry(participant).or_default().push(record);
    }
    pub fn past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    /// The current FFF question, None past the end of the batch.
    pub fn fff_question(&self) -> Option<&Question> {
        let fff = self.fff.as_ref()?;
        self.question_at(fff.current_question_index)
    }
    pub fn fff_answered(&self, participant: ID<Participant>) -> bool {
        self.fff
            .as_ref()
            .map(|f| f.question_answers.iter().any(|a| a.participant_id == participant))
            .unwrap_or(false)
    }
    /// True when some earlier arrival in this question window was correct.
    pub fn fff_point_taken(&self) -> bool {
        self.fff
            .as_ref()
            .map(|f| f.question_answers.iter().any(|a| a.correct))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qz_content::Choice;
    fn question() -> Question {
        let a = Choice {
            id: ID::default(),
            text: "a".into(),
        };
        let correct = a.id;
        Question::new(ID::default(), "q".into(), vec![a], correct, None, None)
    }
    fn participants(n: usize) -> Vec<ID<Participant>> {
        (0..n).map(|_| ID::default()).collect()
    }
    #[test]
    fn fresh_state_zeroes_everyone() {
        let pids = participants(3);
        let state = LiveState::new(
            Mode::QuickDuel,
            Tier::Easy,
            vec![question()],
            Utc::now(),
            &pids,
        );
        assert_eq!(state.scores.len(), 3);
        assert!(state.scores.values().all(|s| *s == 0));
        assert!(state.results.values().all(|r| r.is_empty()));
    }
    #[test]
    fn advance_and_award() {
        let pids = participants(1);
        let mut state = LiveState::new(
            Mode::QuickDuel,
            Tier::Easy,
            vec![question(), question()],
            Utc::now(),
            &pids,
        );
        assert_eq!(state.progress(pids[0]), 0);
        state.advance(pids[0]);
        state.award(pids[0], 10);
        assert_eq!(state.progress(pids[0]), 1);
        assert_eq!(state.scores[&pids[0]], 10);
    }
    #[test]
    fn fff_first_correct_bookkeeping() {
        let pids = participants(2);
        let mut state = LiveState::new(
            Mode::FastestFingerFirst,
            Tier::Easy,
            vec![question()],
            Utc::now(),
            &pids,
        )
        .with_fff(30_000, Utc::now());
        assert!(!state.fff_point_taken());
        let q = state.fff_question().unwrap();
        let option = q.correct();
        state.fff.as_mut().unwrap().question_answers.push(QuestionAnswer {
            participant_id: pids[0],
            option_id: option,
            timestamp: Utc::now(),
            correct: true,
        });
        assert!(state.fff_point_taken());
        assert!(state.fff_answered(pids[0]));
        assert!(!state.fff_answered(pids[1]));
    }
    #[test]
    fn blob_round_trips() {
        let pids = participants(2);
        let state = LiveState::new(
            Mode::TimeAttack,
            Tier::Hard,
            vec![question()],
            Utc::now(),
            &pids,
        );
        let blob = serde_json::to_string(&state).unwrap();
        let back: LiveState = serde_json::from_str(&blob).unwrap();
        assert_eq!(back.scores.len(), 2);
        assert_eq!(back.mode, Mode::TimeAttack);
    }
}
