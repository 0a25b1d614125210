use sqlx::types::Json;
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, assessment_id, question_type, prompt, options, correct_answer, explanation, \
    difficulty, tags, adaptive_weight, order_index, created_at";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: &'a str,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answer: serde_json::Value,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) difficulty: i32,
    pub(crate) tags: Vec<String>,
    pub(crate) adaptive_weight: Option<f64>,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, assessment_id, question_type, prompt, options, correct_answer, explanation,
            difficulty, tags, adaptive_weight, order_index, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
    )
    .bind(params.id)
    .bind(params.assessment_id)
    .bind(params.question_type)
    .bind(params.prompt)
    .bind(params.options.map(Json))
    .bind(Json(params.correct_answer))
    .bind(params.explanation)
    .bind(params.difficulty)
    .bind(Json(params.tags))
    .bind(params.adaptive_weight)
    .bind(params.order_index)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_assessment(
    executor: impl sqlx::PgExecutor<'_>,
    assessment_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE assessment_id = $1 ORDER BY order_index, id"
    ))
    .bind(assessment_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    assessment_id: &str,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE assessment_id = $1 AND id = $2"
    ))
    .bind(assessment_id)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_by_assessment(
    executor: impl sqlx::PgExecutor<'_>,
    assessment_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE assessment_id = $1")
        .bind(assessment_id)
        .fetch_one(executor)
        .await
}
