use sqlx::PgPool;

use crate::db::models::{AttemptStatusCounts, CompletedAttempt, QuestionOutcome};
use crate::db::types::SubmissionStatus;

pub(crate) async fn status_counts(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<AttemptStatusCounts, sqlx::Error> {
    sqlx::query_as::<_, AttemptStatusCounts>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = $2) AS completed,
            COUNT(*) FILTER (WHERE status = $3) AS in_progress,
            COUNT(*) FILTER (WHERE status = $4) AS abandoned
         FROM submissions
         WHERE assessment_id = $1",
    )
    .bind(assessment_id)
    .bind(SubmissionStatus::Completed)
    .bind(SubmissionStatus::InProgress)
    .bind(SubmissionStatus::Abandoned)
    .fetch_one(pool)
    .await
}

/// Completed attempts, most recently finished first.
pub(crate) async fn list_completed(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<CompletedAttempt>, sqlx::Error> {
    sqlx::query_as::<_, CompletedAttempt>(
        "SELECT id, user_id, attempt_number, score, max_score, passed, time_spent_seconds,
                completed_at
         FROM submissions
         WHERE assessment_id = $1 AND status = $2
         ORDER BY completed_at DESC NULLS LAST, id",
    )
    .bind(assessment_id)
    .bind(SubmissionStatus::Completed)
    .fetch_all(pool)
    .await
}

/// Every question of the assessment in order, with how often it was answered
/// and answered correctly inside completed attempts.
pub(crate) async fn question_outcomes(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<QuestionOutcome>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOutcome>(
        "SELECT q.id AS question_id, q.prompt, q.question_type, q.difficulty,
                COUNT(sa.question_id) AS attempts,
                COUNT(sa.question_id) FILTER (WHERE sa.is_correct) AS correct
         FROM questions q
         LEFT JOIN submission_answers sa
           ON sa.question_id = q.id
          AND EXISTS (
              SELECT 1 FROM submissions s
              WHERE s.id = sa.submission_id AND s.status = $2
          )
         WHERE q.assessment_id = $1
         GROUP BY q.id, q.prompt, q.question_type, q.difficulty, q.order_index
         ORDER BY q.order_index, q.id",
    )
    .bind(assessment_id)
    .bind(SubmissionStatus::Completed)
    .fetch_all(pool)
    .await
}
