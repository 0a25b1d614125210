use serde_json::Value;

use crate::db::models::SubmissionAnswerRow;

/// One answered question inside an attempt, with the question's difficulty,
/// weight and tags as they were when the answer was recorded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnsweredQuestion {
    pub(crate) question_id: String,
    pub(crate) difficulty: i32,
    pub(crate) correct: bool,
    pub(crate) answer: Value,
    pub(crate) time_spent_seconds: i32,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) tags: Vec<String>,
}

impl AnsweredQuestion {
    #[cfg(test)]
    pub(crate) fn new(
        question_id: &str,
        difficulty: i32,
        correct: bool,
        adaptive_weight: Option<f64>,
    ) -> Self {
        Self {
            question_id: question_id.to_string(),
            difficulty,
            correct,
            answer: Value::Null,
            time_spent_seconds: 0,
            adaptive_weight,
            tags: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }
}

impl From<SubmissionAnswerRow> for AnsweredQuestion {
    fn from(row: SubmissionAnswerRow) -> Self {
        Self {
            question_id: row.question_id,
            difficulty: row.difficulty,
            correct: row.is_correct,
            answer: row.answer.0,
            time_spent_seconds: row.time_spent_seconds,
            adaptive_weight: row.adaptive_weight,
            tags: row.tags.0,
        }
    }
}

/// Rows come back ordered by position; this keeps the administration order.
pub(crate) fn from_rows(rows: Vec<SubmissionAnswerRow>) -> Vec<AnsweredQuestion> {
    rows.into_iter().map(AnsweredQuestion::from).collect()
}
