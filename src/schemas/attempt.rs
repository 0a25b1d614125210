use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{CompletionReason, SubmissionStatus};
use crate::schemas::assessment::PublicQuestion;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    pub(crate) answer: serde_json::Value,
    #[serde(default)]
    #[serde(alias = "timeSpent", alias = "timeSpentSeconds")]
    #[validate(range(min = 0, max = 86400, message = "time_spent_seconds is out of range"))]
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MyAttemptsQuery {
    #[serde(default)]
    pub(crate) assessment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionsQuery {
    /// Omitted means every status.
    #[serde(default)]
    pub(crate) status: Option<SubmissionStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) completion_reason: Option<CompletionReason>,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: f64,
    pub(crate) passed: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) deadline: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) answers: serde_json::Value,
    pub(crate) feedback: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdaptiveInfo {
    pub(crate) target_difficulty: f64,
    pub(crate) reason: String,
    pub(crate) recent_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum NextQuestionResponse {
    Question {
        question: PublicQuestion,
        question_number: usize,
        answered_count: usize,
        remaining_seconds: Option<i64>,
        adaptive: Option<AdaptiveInfo>,
    },
    Completed {
        result: AttemptResultResponse,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) question_id: String,
    pub(crate) correct: bool,
    pub(crate) auto_graded: bool,
    pub(crate) difficulty: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) answered_count: usize,
}

/// Answer endpoint outcome: either the answer was recorded, or the deadline
/// had already passed and the attempt was closed instead.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum AnswerOutcome {
    Recorded(AnswerResponse),
    Completed { result: AttemptResultResponse },
}
