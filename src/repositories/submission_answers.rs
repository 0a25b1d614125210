use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::models::SubmissionAnswerRow;

pub(crate) const COLUMNS: &str = "\
    question_id, position, answer, is_correct, difficulty, adaptive_weight, \
    time_spent_seconds, tags, answered_at";

pub(crate) struct InsertAnswer<'a> {
    pub(crate) submission_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) position: i32,
    pub(crate) answer: serde_json::Value,
    pub(crate) is_correct: bool,
    pub(crate) difficulty: i32,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) time_spent_seconds: i32,
    pub(crate) tags: Vec<String>,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// Returns false when the question was already answered in this submission.
pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: InsertAnswer<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO submission_answers (
            submission_id, question_id, position, answer, is_correct, difficulty,
            adaptive_weight, time_spent_seconds, tags, answered_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        ON CONFLICT DO NOTHING",
    )
    .bind(params.submission_id)
    .bind(params.question_id)
    .bind(params.position)
    .bind(Json(params.answer))
    .bind(params.is_correct)
    .bind(params.difficulty)
    .bind(params.adaptive_weight)
    .bind(params.time_spent_seconds)
    .bind(Json(params.tags))
    .bind(params.answered_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_submission(
    executor: impl sqlx::PgExecutor<'_>,
    submission_id: &str,
) -> Result<Vec<SubmissionAnswerRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionAnswerRow>(&format!(
        "SELECT {COLUMNS} FROM submission_answers WHERE submission_id = $1 ORDER BY position"
    ))
    .bind(submission_id)
    .fetch_all(executor)
    .await
}
