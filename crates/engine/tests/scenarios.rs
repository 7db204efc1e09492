//! End-to-end scenarios driven through the per-mode rules with a fake
//! clock, checking the observable contract: emitted events, score maps,
//! and per-answer records.
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use qz_content::Choice;
use qz_content::Question;
use qz_core::Config;
use qz_core::ID;
use qz_core::Mode;
use qz_core::Tier;
use qz_core::Unique;
use qz_engine::Ctx;
use qz_engine::Effect;
use qz_engine::QuickDuel;
use qz_engine::Rules;
use qz_engine::protocol;
use qz_engine::rules_for;
use qz_live::AnswerAction;
use qz_live::LiveState;
use qz_store::Enrolled;
use qz_store::Participant;
use qz_store::UserProfile;

fn question(n_options: usize) -> Question {
    let choices = (0..n_options)
        .map(|i| Choice {
            id: ID::default(),
            text: format!("option {}", i),
        })
        .collect::<Vec<_>>();
    let correct = choices[0].id;
    Question::new(
        ID::default(),
        "prompt".into(),
        choices,
        correct,
        Some("because".into()),
        Some("remember this".into()),
    )
}

fn enrolled(is_bot: bool) -> Enrolled {
    Enrolled {
        participant: ID::<Participant>::default(),
        user: ID::<UserProfile>::default(),
        username: if is_bot { "QuizBot-abc123" } else { "alice" }.to_string(),
        is_bot,
        rating: 1200,
    }
}

fn ctx(roster: Vec<Enrolled>, now: DateTime<Utc>) -> Ctx {
    Ctx {
        session: ID::default(),
        roster,
        cfg: Config::default(),
        now,
    }
}

fn state(mode: Mode, questions: Vec<Question>, roster: &[Enrolled], now: DateTime<Utc>) -> LiveState {
    let ids = roster.iter().map(|e| e.participant).collect::<Vec<_>>();
    let state = LiveState::new(mode, Tier::Medium, questions, now + Duration::minutes(1), &ids);
    match mode {
        Mode::FastestFingerFirst => state.with_fff(30_000, now),
        _ => state,
    }
}

fn emitted<'a>(effects: &'a [Effect], event: &str) -> Vec<&'a serde_json::Value> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Emit {
                event: name,
                payload,
                ..
            } if *name == event => Some(payload),
            _ => None,
        })
        .collect()
}

fn wrong_option(q: &Question) -> ID<Choice> {
    q.wrong_choices()[0]
}

#[test]
fn quick_duel_bot_match_plays_out() {
    let now = Utc::now();
    let user = enrolled(false);
    let bot = enrolled(true);
    let u = user.participant;
    let ctx = ctx(vec![user, bot.clone()], now);
    let questions = vec![question(4), question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::QuickDuel, questions, &ctx.roster, now);
    let rules = QuickDuel;

    let started = rules.on_start(&ctx, &mut state);
    assert_eq!(emitted(&started, protocol::MATCH_FOUND).len(), 1);
    // the human gets a question, the bot gets a scheduled answer
    assert_eq!(emitted(&started, protocol::QUESTION_NEW).len(), 1);
    assert!(started.iter().any(|e| matches!(
        e,
        Effect::ScheduleBot { participant, .. } if *participant == bot.participant
    )));

    // Q1 answered correctly
    let effects = rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    assert_eq!(state.scores[&u], 10);
    assert_eq!(emitted(&effects, protocol::SCORE_UPDATE).len(), 1);
    // Q2 skipped
    rules.on_skip(&ctx, &mut state, u);
    // Q3 answered incorrectly
    let effects = rules.on_answer(&ctx, &mut state, u, q[2].id(), wrong_option(&q[2]));
    assert!(emitted(&effects, protocol::SCORE_UPDATE).is_empty());
    assert_eq!(state.scores[&u], 10);

    let log = &state.results[&u];
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].action, AnswerAction::Answered);
    assert!(log[0].correct);
    assert_eq!(log[1].action, AnswerAction::Skipped);
    assert_eq!(log[2].action, AnswerAction::Answered);
    assert!(!log[2].correct);

    // batch exhausted, so the participant is told they are done
    let effects = rules.on_answer(&ctx, &mut state, u, q[2].id(), q[2].correct());
    assert!(effects.is_empty(), "answers past the batch do nothing");
    let ended = rules.on_game_end(&ctx, &state);
    assert_eq!(emitted(&ended, protocol::GAME_END).len(), 1);
}

#[test]
fn quick_duel_duplicate_answer_is_idempotent() {
    let now = Utc::now();
    let user = enrolled(false);
    let u = user.participant;
    let ctx = ctx(vec![user], now);
    let questions = vec![question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::QuickDuel, questions, &ctx.roster, now);
    let rules = QuickDuel;
    rules.on_start(&ctx, &mut state);

    rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    let scores = state.scores.clone();
    let progress = state.progress(u);
    // the retry names a question that is no longer current
    let retry = rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    assert!(retry.is_empty());
    assert_eq!(state.scores, scores);
    assert_eq!(state.progress(u), progress);
    assert_eq!(state.results[&u].len(), 1);
}

#[test]
fn quick_duel_scores_conserve_award_sum() {
    let now = Utc::now();
    let user = enrolled(false);
    let u = user.participant;
    let ctx = ctx(vec![user], now);
    let questions = (0..5).map(|_| question(4)).collect::<Vec<_>>();
    let q = questions.clone();
    let mut state = state(Mode::QuickDuel, questions, &ctx.roster, now);
    let rules = QuickDuel;
    rules.on_start(&ctx, &mut state);

    // correct, wrong, correct, skip, correct
    rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    rules.on_answer(&ctx, &mut state, u, q[1].id(), wrong_option(&q[1]));
    rules.on_answer(&ctx, &mut state, u, q[2].id(), q[2].correct());
    rules.on_skip(&ctx, &mut state, u);
    rules.on_answer(&ctx, &mut state, u, q[4].id(), q[4].correct());

    let correct_answers = state.results[&u].iter().filter(|r| r.correct).count();
    let total: i32 = state.scores.values().sum();
    assert_eq!(total, 10 * correct_answers as i32);
}

#[test]
fn fastest_finger_first_correct_takes_the_point() {
    let now = Utc::now();
    let a = enrolled(false);
    let b = enrolled(false);
    let ctx0 = ctx(vec![a.clone(), b.clone()], now);
    let questions = vec![question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::FastestFingerFirst, questions, &ctx0.roster, now);
    let rules = rules_for(Mode::FastestFingerFirst);

    let started = rules.on_start(&ctx0, &mut state);
    assert!(started.iter().any(|e| matches!(
        e,
        Effect::ScheduleAdvance { index: 0, .. }
    )));
    let opened = rules.on_advance(&ctx0, &mut state, 0);
    assert_eq!(emitted(&opened, protocol::FF_MATCH_FOUND).len(), 1);
    assert_eq!(emitted(&opened, protocol::FF_NEW_QUESTION).len(), 1);
    assert!(opened.iter().any(|e| matches!(
        e,
        Effect::ScheduleQuestionTimeout { .. }
    )));

    // A first at +200ms, B at +210ms, both correct
    let at = |ms: i64| Ctx {
        now: now + Duration::milliseconds(ms),
        ..ctx(vec![a.clone(), b.clone()], now)
    };
    let first = rules.on_answer(&at(200), &mut state, a.participant, q[0].id(), q[0].correct());
    assert_eq!(emitted(&first, protocol::FF_PLAYER_ANSWERED).len(), 1);
    let awarded = emitted(&first, protocol::FF_POINT_AWARDED);
    assert_eq!(awarded.len(), 1);
    assert_eq!(
        awarded[0]["participantId"],
        serde_json::json!(a.participant)
    );
    assert!(first.iter().any(|e| matches!(e, Effect::CancelQuestionTimeout)));

    let second = rules.on_answer(&at(210), &mut state, b.participant, q[0].id(), q[0].correct());
    let announced = emitted(&second, protocol::FF_PLAYER_ANSWERED);
    assert_eq!(announced.len(), 1);
    assert_eq!(announced[0]["correct"], serde_json::json!(true));
    assert!(emitted(&second, protocol::FF_POINT_AWARDED).is_empty());

    assert_eq!(state.scores[&a.participant], 1);
    assert_eq!(state.scores[&b.participant], 0);
}

#[test]
fn fastest_finger_timeout_records_everyone_silent() {
    let now = Utc::now();
    let a = enrolled(false);
    let b = enrolled(false);
    let ctx0 = ctx(vec![a.clone(), b.clone()], now);
    let questions = vec![question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::FastestFingerFirst, questions, &ctx0.roster, now);
    let rules = rules_for(Mode::FastestFingerFirst);
    rules.on_start(&ctx0, &mut state);
    rules.on_advance(&ctx0, &mut state, 0);

    // A answers wrong, B stays silent, then the window closes
    rules.on_answer(&ctx0, &mut state, a.participant, q[0].id(), wrong_option(&q[0]));
    let fired = rules.on_question_timeout(&ctx0, &mut state, q[0].id());
    let timeout = emitted(&fired, protocol::FF_QUESTION_TIMEOUT);
    assert_eq!(timeout.len(), 1);
    assert_eq!(
        timeout[0]["correctOptionId"],
        serde_json::json!(q[0].correct())
    );
    assert!(fired.iter().any(|e| matches!(
        e,
        Effect::ScheduleAdvance { index: 1, delay } if *delay == std::time::Duration::from_secs(1)
    )));
    assert!(state.scores.values().all(|s| *s == 0));
    let b_log = &state.results[&b.participant];
    assert_eq!(b_log.len(), 1);
    assert_eq!(b_log[0].action, AnswerAction::Timeout);
    // A answered, so no timeout record on top
    assert_eq!(state.results[&a.participant].len(), 1);
    assert_eq!(state.results[&a.participant][0].action, AnswerAction::Answered);

    // a redelivered job for the settled question must do nothing
    let stale = rules.on_question_timeout(&ctx0, &mut state, q[0].id());
    assert!(stale.is_empty());
    let again = rules.on_advance(&ctx0, &mut state, 1);
    assert_eq!(emitted(&again, protocol::FF_NEW_QUESTION).len(), 1);
    let very_stale = rules.on_question_timeout(&ctx0, &mut state, q[0].id());
    assert!(very_stale.is_empty());
}

#[test]
fn fastest_finger_drops_late_and_duplicate_answers() {
    let now = Utc::now();
    let a = enrolled(false);
    let ctx0 = ctx(vec![a.clone()], now);
    let questions = vec![question(4)];
    let q = questions.clone();
    let mut state = state(Mode::FastestFingerFirst, questions, &ctx0.roster, now);
    let rules = rules_for(Mode::FastestFingerFirst);
    rules.on_start(&ctx0, &mut state);
    rules.on_advance(&ctx0, &mut state, 0);

    let late = Ctx {
        now: now + Duration::milliseconds(31_000),
        ..ctx(vec![a.clone()], now)
    };
    assert!(rules
        .on_answer(&late, &mut state, a.participant, q[0].id(), q[0].correct())
        .is_empty());

    rules.on_answer(&ctx0, &mut state, a.participant, q[0].id(), wrong_option(&q[0]));
    let duplicate =
        rules.on_answer(&ctx0, &mut state, a.participant, q[0].id(), q[0].correct());
    assert!(duplicate.is_empty());
    assert_eq!(state.scores[&a.participant], 0);
}

#[test]
fn practice_next_question_is_idempotent() {
    let now = Utc::now();
    let user = enrolled(false);
    let u = user.participant;
    let ctx = ctx(vec![user], now);
    let questions = vec![question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::Practice, questions, &ctx.roster, now);
    let rules = rules_for(Mode::Practice);

    let started = rules.on_start(&ctx, &mut state);
    let opened = emitted(&started, protocol::PRACTICE_STARTED);
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0]["totalQuestions"], serde_json::json!(2));

    let first = rules.on_request_next(&ctx, &mut state, u);
    assert_eq!(emitted(&first, protocol::QUESTION_NEW).len(), 1);
    let resend = rules.on_request_next(&ctx, &mut state, u);
    assert!(resend.is_empty(), "resend must not re-emit or advance");
    assert_eq!(state.progress(u), 0);

    // answering unlocks the next request
    let feedback = rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    let fb = emitted(&feedback, protocol::ANSWER_FEEDBACK);
    assert_eq!(fb.len(), 1);
    assert_eq!(fb[0]["correct"], serde_json::json!(true));
    assert_eq!(fb[0]["explanation"], serde_json::json!("because"));
    assert_eq!(fb[0]["learningTip"], serde_json::json!("remember this"));
    let second = rules.on_request_next(&ctx, &mut state, u);
    assert_eq!(emitted(&second, protocol::QUESTION_NEW).len(), 1);
}

#[test]
fn practice_finishes_itself_after_the_last_answer() {
    let now = Utc::now();
    let user = enrolled(false);
    let u = user.participant;
    let ctx = ctx(vec![user], now);
    let questions = vec![question(4)];
    let q = questions.clone();
    let mut state = state(Mode::Practice, questions, &ctx.roster, now);
    let rules = rules_for(Mode::Practice);
    rules.on_start(&ctx, &mut state);
    rules.on_request_next(&ctx, &mut state, u);

    let last = rules.on_answer(&ctx, &mut state, u, q[0].id(), q[0].correct());
    assert!(last.iter().any(|e| matches!(e, Effect::Finish)));
    let ended = rules.on_game_end(&ctx, &state);
    let done = emitted(&ended, protocol::PRACTICE_FINISHED);
    assert_eq!(done.len(), 1);
    assert!(done[0]["results"].is_array(), "practice carries the array");
    assert_eq!(done[0]["score"], serde_json::json!(10));
}

#[test]
fn time_attack_serves_continuously_and_finishes_on_deadline() {
    let now = Utc::now();
    let user = enrolled(false);
    let u = user.participant;
    let ctx0 = ctx(vec![user.clone()], now);
    let questions = vec![question(4), question(4), question(4)];
    let q = questions.clone();
    let mut state = state(Mode::TimeAttack, questions, &ctx0.roster, now);
    let rules = rules_for(Mode::TimeAttack);
    rules.on_start(&ctx0, &mut state);

    rules.on_request_next(&ctx0, &mut state, u);
    let effects = rules.on_answer(&ctx0, &mut state, u, q[0].id(), q[0].correct());
    let scored = emitted(&effects, protocol::TIME_ATTACK_SCORE_UPDATE);
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0]["score"], serde_json::json!(10));
    // the next question is auto-served without a request
    assert_eq!(emitted(&effects, protocol::QUESTION_NEW).len(), 1);

    // past the deadline, a request ends the game instead
    let late = Ctx {
        now: now + Duration::minutes(2),
        ..ctx(vec![user], now)
    };
    let finished = rules.on_request_next(&late, &mut state, u);
    assert!(finished.iter().any(|e| matches!(e, Effect::Finish)));
}

#[test]
fn group_play_broadcasts_room_wide() {
    let now = Utc::now();
    let a = enrolled(false);
    let b = enrolled(false);
    let ctx = ctx(vec![a.clone(), b], now);
    let questions = vec![question(4)];
    let q = questions.clone();
    let mut state = state(Mode::GroupPlay, questions, &ctx.roster, now);
    let rules = rules_for(Mode::GroupPlay);

    let started = rules.on_start(&ctx, &mut state);
    assert_eq!(emitted(&started, protocol::GROUP_STARTED).len(), 1);
    let effects = rules.on_answer(&ctx, &mut state, a.participant, q[0].id(), q[0].correct());
    let update = effects.iter().find_map(|e| match e {
        Effect::Emit { target, event, .. } if *event == protocol::GROUP_SCORE_UPDATE => {
            Some(target)
        }
        _ => None,
    });
    assert!(
        matches!(update, Some(qz_engine::EmitTarget::Room)),
        "group scores go to the whole room"
    );
    let ended = rules.on_game_end(&ctx, &state);
    assert_eq!(emitted(&ended, protocol::GROUP_FINISHED).len(), 1);
}
