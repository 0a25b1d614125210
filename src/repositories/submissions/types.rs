use time::PrimitiveDateTime;

use crate::db::types::{CompletionReason, SubmissionStatus};

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) struct FinalizeUpdate {
    pub(crate) status: SubmissionStatus,
    pub(crate) completion_reason: CompletionReason,
    pub(crate) answers: serde_json::Map<String, serde_json::Value>,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) passed: bool,
    pub(crate) time_spent_seconds: i32,
    pub(crate) feedback: serde_json::Value,
    pub(crate) completed_at: PrimitiveDateTime,
}
