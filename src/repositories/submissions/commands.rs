use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::types::SubmissionStatus;

use super::types::{CreateSubmission, FinalizeUpdate};

/// Serialises attempt starts for one user on one assessment.
pub(crate) async fn acquire_user_assessment_lock(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    assessment_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("attempt:{assessment_id}:{user_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn acquire_global_lock(
    executor: impl sqlx::PgExecutor<'_>,
    key: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))").bind(key).execute(executor).await?;
    Ok(())
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSubmission<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO submissions (
            id, user_id, assessment_id, attempt_number, status,
            started_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT DO NOTHING",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.assessment_id)
    .bind(params.attempt_number)
    .bind(SubmissionStatus::InProgress)
    .bind(params.started_at)
    .bind(params.created_at)
    .bind(params.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn set_current_question(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_id: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET current_question_id = $1, updated_at = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(question_id)
    .bind(now)
    .bind(id)
    .bind(SubmissionStatus::InProgress)
    .execute(executor)
    .await?;
    Ok(())
}

/// Moves an in-progress submission to its terminal state. Returns false if
/// another request finished it first.
pub(crate) async fn finish(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: FinalizeUpdate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE submissions
         SET status = $1,
             completion_reason = $2,
             answers = $3,
             score = $4,
             max_score = $5,
             passed = $6,
             time_spent_seconds = $7,
             feedback = $8,
             current_question_id = NULL,
             completed_at = $9,
             updated_at = $9
         WHERE id = $10 AND status = $11",
    )
    .bind(params.status)
    .bind(params.completion_reason)
    .bind(Json(params.answers))
    .bind(params.score)
    .bind(params.max_score)
    .bind(params.passed)
    .bind(params.time_spent_seconds)
    .bind(Json(params.feedback))
    .bind(params.completed_at)
    .bind(id)
    .bind(SubmissionStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
