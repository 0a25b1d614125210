use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{Submission, TimedAttempt};
use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "\
    id, user_id, assessment_id, answers, score, max_score, passed, time_spent_seconds, \
    attempt_number, status, completion_reason, current_question_id, feedback, \
    started_at, completed_at, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the submission until the surrounding transaction ends.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    assessment_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions \
         WHERE user_id = $1 AND assessment_id = $2 AND status = $3"
    ))
    .bind(user_id)
    .bind(assessment_id)
    .bind(SubmissionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_by_user_and_assessment(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    assessment_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE user_id = $1 AND assessment_id = $2")
        .bind(user_id)
        .bind(assessment_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count_in_progress(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE status = $1")
        .bind(SubmissionStatus::InProgress)
        .fetch_one(executor)
        .await
}

pub(crate) async fn list_by_user(
    pool: &PgPool,
    user_id: &str,
    assessment_id: Option<&str>,
) -> Result<Vec<Submission>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM submissions WHERE user_id = "));
    builder.push_bind(user_id);

    if let Some(assessment_id) = assessment_id {
        builder.push(" AND assessment_id = ");
        builder.push_bind(assessment_id);
    }

    builder.push(" ORDER BY started_at DESC, attempt_number DESC");

    builder.build_query_as::<Submission>().fetch_all(pool).await
}

pub(crate) async fn list_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
    status: Option<SubmissionStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM submissions WHERE assessment_id = "
    ));
    builder.push_bind(assessment_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY started_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Submission>().fetch_all(pool).await
}

pub(crate) async fn count_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
    status: Option<SubmissionStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM submissions WHERE assessment_id = ");
    builder.push_bind(assessment_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// In-progress attempts on timed assessments whose deadline plus grace has passed.
pub(crate) async fn list_overdue(
    pool: &PgPool,
    now: time::PrimitiveDateTime,
    grace_seconds: i64,
    limit: i64,
) -> Result<Vec<TimedAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TimedAttempt>(
        "SELECT s.id, s.assessment_id, s.started_at, a.time_limit_minutes
         FROM submissions s
         JOIN assessments a ON a.id = s.assessment_id
         WHERE s.status = $1
           AND a.time_limit_minutes IS NOT NULL
           AND s.started_at
               + make_interval(mins => a.time_limit_minutes)
               + make_interval(secs => $2::double precision) < $3
         ORDER BY s.started_at
         LIMIT $4",
    )
    .bind(SubmissionStatus::InProgress)
    .bind(grace_seconds)
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}
