use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssessmentType, CompletionReason, QuestionType, SubmissionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assessment {
    pub(crate) id: String,
    pub(crate) lesson_id: String,
    pub(crate) title: String,
    pub(crate) assessment_type: AssessmentType,
    pub(crate) passing_score: f64,
    pub(crate) max_attempts: i32,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) is_adaptive: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Option<Json<Vec<String>>>,
    pub(crate) correct_answer: Json<serde_json::Value>,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: Option<i32>,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) assessment_id: String,
    pub(crate) answers: Json<serde_json::Map<String, serde_json::Value>>,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) passed: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) completion_reason: Option<CompletionReason>,
    pub(crate) current_question_id: Option<String>,
    pub(crate) feedback: Option<Json<serde_json::Value>>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One recorded answer joined with the question fields the engine needs.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubmissionAnswerRow {
    pub(crate) question_id: String,
    pub(crate) position: i32,
    pub(crate) answer: Json<serde_json::Value>,
    pub(crate) is_correct: bool,
    pub(crate) difficulty: i32,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// In-progress attempt joined with its assessment's time limit, for the sweeper.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TimedAttempt {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) time_limit_minutes: i32,
}

#[derive(Debug, Clone, Copy, Default, FromRow)]
pub(crate) struct AttemptStatusCounts {
    pub(crate) total: i64,
    pub(crate) completed: i64,
    pub(crate) in_progress: i64,
    pub(crate) abandoned: i64,
}

/// Score columns of a completed attempt, for instructor analytics.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct CompletedAttempt {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) passed: Option<bool>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

/// Per-question answer counts over completed attempts.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionOutcome {
    pub(crate) question_id: String,
    pub(crate) prompt: String,
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: Option<i32>,
    pub(crate) attempts: i64,
    pub(crate) correct: i64,
}
