use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::api::attempts::helpers::attempt_to_response;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInstructor, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Assessment, CompletedAttempt, Question};
use crate::db::types::{QuestionType, UserRole};
use crate::repositories;
use crate::schemas::assessment::{
    AssessmentAnalytics, AssessmentCreate, AssessmentListQuery, AssessmentResponse, AttemptSummary,
    QuestionAnalytics, QuestionCreate, QuestionResponse, ScoreBandCount,
};
use crate::schemas::attempt::{AttemptResponse, SubmissionsQuery};
use crate::services::assessment_analytics as analytics;
use crate::services::attempt_timing::normalize_time_limit;

const LEADERBOARD_SIZE: usize = 5;
const RECENT_SIZE: usize = 10;

pub(in crate::api::assessments) async fn create_assessment(
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<AssessmentCreate>,
) -> Result<(StatusCode, Json<AssessmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if payload.questions.is_empty() {
        return Err(ApiError::BadRequest("At least one question is required".to_string()));
    }
    let time_limit_minutes = normalize_time_limit(payload.time_limit_minutes)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for (index, question) in payload.questions.iter().enumerate() {
        validate_answer_key(question)
            .map_err(|detail| ApiError::BadRequest(format!("questions[{index}]: {detail}")))?;
    }

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let assessment_id = Uuid::new_v4().to_string();
    let assessment = repositories::assessments::create(
        &mut *tx,
        repositories::assessments::CreateAssessment {
            id: &assessment_id,
            lesson_id: &payload.lesson_id,
            title: payload.title.trim(),
            assessment_type: payload.assessment_type,
            passing_score: payload.passing_score,
            max_attempts: payload.max_attempts,
            time_limit_minutes,
            is_adaptive: payload.is_adaptive,
            created_by: &user.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assessment"))?;

    for (index, question) in payload.questions.into_iter().enumerate() {
        let order_index = question.order_index.unwrap_or(index as i32);
        repositories::questions::create(
            &mut *tx,
            repositories::questions::CreateQuestion {
                id: &Uuid::new_v4().to_string(),
                assessment_id: &assessment.id,
                question_type: question.question_type,
                prompt: &question.prompt,
                options: question.options,
                correct_answer: question.correct_answer,
                explanation: question.explanation.as_deref(),
                difficulty: question.difficulty,
                tags: question.tags,
                adaptive_weight: question.adaptive_weight,
                order_index,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create question"))?;
    }

    let questions = repositories::questions::list_by_assessment(&mut *tx, &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        assessment_id = %assessment.id,
        lesson_id = %assessment.lesson_id,
        questions = questions.len(),
        adaptive = assessment.is_adaptive,
        "Assessment created"
    );

    Ok((StatusCode::CREATED, Json(assessment_to_response(assessment, &questions, true))))
}

pub(in crate::api::assessments) async fn list_assessments(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<AssessmentListQuery>,
) -> Result<Json<Vec<AssessmentResponse>>, ApiError> {
    let assessments = repositories::assessments::list(
        state.db(),
        params.lesson_id.as_deref(),
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list assessments"))?;

    let mut response = Vec::with_capacity(assessments.len());
    for assessment in assessments {
        let count = repositories::questions::count_by_assessment(state.db(), &assessment.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
        let mut item = assessment_to_response(assessment, &[], false);
        item.question_count = usize::try_from(count).unwrap_or_default();
        response.push(item);
    }

    Ok(Json(response))
}

pub(in crate::api::assessments) async fn get_assessment(
    Path(assessment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let assessment = fetch_assessment(&state, &assessment_id).await?;
    let questions = repositories::questions::list_by_assessment(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    let include_answers = user.role == UserRole::Instructor;
    Ok(Json(assessment_to_response(assessment, &questions, include_answers)))
}

pub(in crate::api::assessments) async fn delete_assessment(
    Path(assessment_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let assessment = fetch_assessment(&state, &assessment_id).await?;
    if assessment.created_by != user.id {
        return Err(ApiError::Forbidden("Only the author can delete this assessment"));
    }

    repositories::assessments::delete_by_id(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assessment"))?;

    tracing::info!(assessment_id = %assessment.id, "Assessment deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::assessments) async fn list_submissions(
    Path(assessment_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
    Query(params): Query<SubmissionsQuery>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let assessment = fetch_assessment(&state, &assessment_id).await?;
    if assessment.created_by != user.id {
        return Err(ApiError::Forbidden("Only the author can view these submissions"));
    }

    let submissions = repositories::submissions::list_by_assessment(
        state.db(),
        &assessment.id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let total =
        repositories::submissions::count_by_assessment(state.db(), &assessment.id, params.status)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    let items = submissions
        .into_iter()
        .map(|submission| attempt_to_response(&submission, assessment.time_limit_minutes))
        .collect();

    Ok(Json(PaginatedResponse::new(items, total, params.skip, params.limit)))
}

pub(in crate::api::assessments) async fn get_analytics(
    Path(assessment_id): Path<String>,
    CurrentInstructor(user): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<AssessmentAnalytics>, ApiError> {
    let assessment = fetch_assessment(&state, &assessment_id).await?;
    if assessment.created_by != user.id {
        return Err(ApiError::Forbidden("Only the author can view these analytics"));
    }

    let counts = repositories::analytics::status_counts(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
    let completed = repositories::analytics::list_completed(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch completed submissions"))?;
    let outcomes = repositories::analytics::question_outcomes(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question statistics"))?;

    let stats = analytics::score_stats(&completed);
    let score_distribution = analytics::score_distribution(&completed)
        .into_iter()
        .map(|(range, count)| ScoreBandCount { range, count })
        .collect();
    let question_analysis = outcomes
        .into_iter()
        .map(|outcome| QuestionAnalytics {
            success_rate: analytics::success_rate(outcome.attempts, outcome.correct),
            question_id: outcome.question_id,
            prompt: outcome.prompt,
            question_type: outcome.question_type,
            difficulty: outcome.difficulty,
            total_attempts: outcome.attempts,
            correct_answers: outcome.correct,
        })
        .collect();

    Ok(Json(AssessmentAnalytics {
        total_submissions: counts.total,
        completed_submissions: counts.completed,
        in_progress_submissions: counts.in_progress,
        abandoned_submissions: counts.abandoned,
        passed_submissions: stats.passed,
        pass_rate: stats.pass_rate,
        average_score: stats.average_score,
        min_score: stats.min_score,
        max_score: stats.max_score,
        average_time_spent_seconds: stats.average_time_seconds,
        score_distribution,
        recent_submissions: completed.iter().take(RECENT_SIZE).map(attempt_summary).collect(),
        top_performers: analytics::top_performers(&completed, LEADERBOARD_SIZE)
            .into_iter()
            .map(attempt_summary)
            .collect(),
        struggling_students: analytics::struggling(&completed, LEADERBOARD_SIZE)
            .into_iter()
            .map(attempt_summary)
            .collect(),
        question_analysis,
        assessment_id: assessment.id,
        title: assessment.title,
        passing_score: assessment.passing_score,
    }))
}

fn attempt_summary(attempt: &CompletedAttempt) -> AttemptSummary {
    AttemptSummary {
        attempt_id: attempt.id.clone(),
        user_id: attempt.user_id.clone(),
        attempt_number: attempt.attempt_number,
        percentage: analytics::round_one(analytics::attempt_percentage(attempt)),
        passed: attempt.passed == Some(true),
        time_spent_seconds: attempt.time_spent_seconds,
        completed_at: attempt.completed_at.map(format_primitive),
    }
}

async fn fetch_assessment(state: &AppState, assessment_id: &str) -> Result<Assessment, ApiError> {
    repositories::assessments::find_by_id(state.db(), assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))
}

fn assessment_to_response(
    assessment: Assessment,
    questions: &[Question],
    include_answers: bool,
) -> AssessmentResponse {
    let question_views = (!questions.is_empty()).then(|| {
        questions.iter().map(|question| question_to_response(question, include_answers)).collect()
    });

    AssessmentResponse {
        id: assessment.id,
        lesson_id: assessment.lesson_id,
        title: assessment.title,
        assessment_type: assessment.assessment_type,
        passing_score: assessment.passing_score,
        max_attempts: assessment.max_attempts,
        time_limit_minutes: assessment.time_limit_minutes,
        is_adaptive: assessment.is_adaptive,
        created_by: assessment.created_by,
        created_at: format_primitive(assessment.created_at),
        updated_at: format_primitive(assessment.updated_at),
        question_count: questions.len(),
        questions: question_views,
    }
}

fn question_to_response(question: &Question, include_answers: bool) -> QuestionResponse {
    QuestionResponse {
        id: question.id.clone(),
        question_type: question.question_type,
        prompt: question.prompt.clone(),
        options: question.options.as_ref().map(|options| options.0.clone()),
        correct_answer: include_answers.then(|| question.correct_answer.0.clone()),
        explanation: if include_answers { question.explanation.clone() } else { None },
        difficulty: question.difficulty,
        tags: question.tags.0.clone(),
        adaptive_weight: question.adaptive_weight,
        order_index: question.order_index,
    }
}

/// Checks that the answer key has a shape the grader can compare against.
pub(in crate::api::assessments) fn validate_answer_key(question: &QuestionCreate) -> Result<(), String> {
    let key = &question.correct_answer;
    match question.question_type {
        QuestionType::MultipleChoice => {
            let options = question.options.as_deref().unwrap_or_default();
            if options.len() < 2 {
                return Err("multiple_choice needs at least two options".to_string());
            }
            match key {
                Value::String(answer) if options.iter().any(|option| option == answer) => Ok(()),
                Value::Number(index)
                    if index.as_u64().is_some_and(|index| (index as usize) < options.len()) =>
                {
                    Ok(())
                }
                _ => Err("correct_answer must be one of the options".to_string()),
            }
        }
        QuestionType::TrueFalse => match key {
            Value::Bool(_) => Ok(()),
            Value::String(text) if matches!(text.to_ascii_lowercase().as_str(), "true" | "false") => {
                Ok(())
            }
            _ => Err("correct_answer must be true or false".to_string()),
        },
        QuestionType::ShortAnswer => match key {
            Value::String(text) if !text.trim().is_empty() => Ok(()),
            _ => Err("correct_answer must be a non-empty string".to_string()),
        },
        QuestionType::FillBlank => match key {
            Value::String(text) if !text.trim().is_empty() => Ok(()),
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => Ok(()),
            _ => Err("correct_answer must be a string or a list of strings".to_string()),
        },
        QuestionType::DragDrop => match key {
            Value::Array(items) if !items.is_empty() => Ok(()),
            _ => Err("correct_answer must be a non-empty ordered list".to_string()),
        },
        QuestionType::Essay | QuestionType::Code => Ok(()),
    }
}
