use sqlx::PgConnection;

use crate::api::errors::ApiError;
use crate::api::guards::AuthUser;
use crate::core::time::format_primitive;
use crate::db::models::{Assessment, Question, Submission};
use crate::repositories;
use crate::schemas::assessment::PublicQuestion;
use crate::schemas::attempt::{AttemptResponse, AttemptResultResponse};
use crate::services::attempt_history::{self, AnsweredQuestion};
use crate::services::attempt_timing::compute_deadline;

pub(crate) fn attempt_to_response(
    submission: &Submission,
    time_limit_minutes: Option<i32>,
) -> AttemptResponse {
    let percentage = if submission.max_score > 0.0 {
        submission.score / submission.max_score * 100.0
    } else {
        0.0
    };

    AttemptResponse {
        id: submission.id.clone(),
        assessment_id: submission.assessment_id.clone(),
        user_id: submission.user_id.clone(),
        attempt_number: submission.attempt_number,
        status: submission.status,
        completion_reason: submission.completion_reason,
        score: submission.score,
        max_score: submission.max_score,
        percentage,
        passed: submission.passed,
        time_spent_seconds: submission.time_spent_seconds,
        started_at: format_primitive(submission.started_at),
        completed_at: submission.completed_at.map(format_primitive),
        deadline: compute_deadline(submission.started_at, time_limit_minutes).map(format_primitive),
    }
}

pub(crate) fn result_response(
    submission: &Submission,
    time_limit_minutes: Option<i32>,
) -> AttemptResultResponse {
    AttemptResultResponse {
        attempt: attempt_to_response(submission, time_limit_minutes),
        answers: serde_json::Value::Object(submission.answers.0.clone()),
        feedback: submission.feedback.as_ref().map(|feedback| feedback.0.clone()),
    }
}

pub(crate) fn public_question(question: &Question) -> PublicQuestion {
    PublicQuestion {
        id: question.id.clone(),
        question_type: question.question_type,
        prompt: question.prompt.clone(),
        options: question.options.as_ref().map(|options| options.0.clone()),
        difficulty: question.difficulty,
        tags: question.tags.0.clone(),
    }
}

/// Locks the attempt row for the rest of the transaction and checks ownership.
pub(crate) async fn lock_owned_attempt(
    conn: &mut PgConnection,
    attempt_id: &str,
    user: &AuthUser,
) -> Result<Submission, ApiError> {
    let submission = repositories::submissions::find_by_id_for_update(&mut *conn, attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    if submission.user_id != user.id {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(submission)
}

pub(crate) async fn fetch_assessment(
    conn: &mut PgConnection,
    assessment_id: &str,
) -> Result<Assessment, ApiError> {
    repositories::assessments::find_by_id(&mut *conn, assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))
}

pub(crate) async fn load_history(
    conn: &mut PgConnection,
    submission_id: &str,
) -> Result<Vec<AnsweredQuestion>, ApiError> {
    let rows = repositories::submission_answers::list_by_submission(&mut *conn, submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;
    Ok(attempt_history::from_rows(rows))
}
