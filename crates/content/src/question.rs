use qz_core::ID;
use qz_core::Unique;
use qz_store::CATEGORIES;
use qz_store::CHOICES;
use qz_store::QUESTIONS;
use qz_store::QUESTION_CATEGORIES;
use qz_store::Schema;
use serde::Deserialize;
use serde::Serialize;

/// A quiz question with its ordered answer options.
/// `correct`, `explanation`, and `learning_tip` are authoritative fields
/// that never leave the server; clients receive a [`QuestionView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    id: ID<Self>,
    prompt: String,
    choices: Vec<Choice>,
    correct: ID<Choice>,
    explanation: Option<String>,
    learning_tip: Option<String>,
}

/// One answer option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub id: ID<Self>,
    pub text: String,
}

/// A question category tag.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: ID<Self>,
    pub name: String,
}

/// Marker for the question ↔ category join table.
pub struct Tagging;

/// Client-facing projection of a question: prompt and options only.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: ID<Question>,
    pub prompt: String,
    pub choices: Vec<Choice>,
}

impl Unique for Question {
    fn id(&self) -> ID<Self> {
        self.id
    }
}

impl Question {
    pub fn new(
        id: ID<Self>,
        prompt: String,
        choices: Vec<Choice>,
        correct: ID<Choice>,
        explanation: Option<String>,
        learning_tip: Option<String>,
    ) -> Self {
        Self {
            id,
            prompt,
            choices,
            correct,
            explanation,
            learning_tip,
        }
    }
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }
    pub fn correct(&self) -> ID<Choice> {
        self.correct
    }
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
    pub fn learning_tip(&self) -> Option<&str> {
        self.learning_tip.as_deref()
    }
    pub fn is_correct(&self, choice: ID<Choice>) -> bool {
        self.correct == choice
    }
    /// Options other than the correct one, for simulated wrong answers.
    pub fn wrong_choices(&self) -> Vec<ID<Choice>> {
        self.choices
            .iter()
            .map(|c| c.id)
            .filter(|id| *id != self.correct)
            .collect()
    }
    /// Strips correctness metadata for delivery to clients.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            prompt: self.prompt.clone(),
            choices: self.choices.clone(),
        }
    }
}

impl Schema for Question {
    fn name() -> &'static str {
        QUESTIONS
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            QUESTIONS,
            " (
                id                 UUID PRIMARY KEY,
                prompt             TEXT NOT NULL,
                tier               TEXT NOT NULL,
                correct_choice_id  UUID NOT NULL,
                explanation        TEXT,
                learning_tip       TEXT,
                created_at         TIMESTAMPTZ NOT NULL DEFAULT now()
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_questions_tier ON ",
            QUESTIONS,
            " (tier, created_at, id);"
        )
    }
}

impl Schema for Choice {
    fn name() -> &'static str {
        CHOICES
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            CHOICES,
            " (
                id           UUID PRIMARY KEY,
                question_id  UUID NOT NULL REFERENCES ",
            QUESTIONS,
            "(id) ON DELETE CASCADE,
                text         TEXT NOT NULL,
                position     SMALLINT NOT NULL
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_choices_question ON ",
            CHOICES,
            " (question_id, position);"
        )
    }
}

impl Schema for Category {
    fn name() -> &'static str {
        CATEGORIES
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            CATEGORIES,
            " (
                id    UUID PRIMARY KEY,
                name  TEXT NOT NULL UNIQUE
            );"
        )
    }
    fn indices() -> &'static str {
        ""
    }
}

impl Schema for Tagging {
    fn name() -> &'static str {
        QUESTION_CATEGORIES
    }
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            QUESTION_CATEGORIES,
            " (
                question_id  UUID NOT NULL REFERENCES ",
            QUESTIONS,
            "(id) ON DELETE CASCADE,
                category_id  UUID NOT NULL REFERENCES ",
            CATEGORIES,
            "(id) ON DELETE CASCADE,
                PRIMARY KEY (question_id, category_id)
            );"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS idx_taggings_category ON ",
            QUESTION_CATEGORIES,
            " (category_id);"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn question() -> Question {
        let a = Choice {
            id: ID::default(),
            text: "red".into(),
        };
        let b = Choice {
            id: ID::default(),
            text: "blue".into(),
        };
        let correct = a.id;
        Question::new(
            ID::default(),
            "sky color at noon?".into(),
            vec![a, b],
            correct,
            Some("rayleigh scattering".into()),
            None,
        )
    }
    #[test]
    fn view_strips_correctness_metadata() {
        let q = question();
        let json = serde_json::to_string(&q.view()).unwrap();
        assert!(!json.contains("correct"));
        assert!(!json.contains("explanation"));
        assert!(!json.contains("rayleigh"));
    }
    #[test]
    fn wrong_choices_excludes_correct() {
        let q = question();
        let wrong = q.wrong_choices();
        assert_eq!(wrong.len(), 1);
        assert!(!wrong.contains(&q.correct()));
    }
}
