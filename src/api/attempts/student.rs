use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{AuthUser, CurrentStudent, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Assessment, Question, Submission};
use crate::db::types::{CompletionReason, SubmissionStatus};
use crate::repositories;
use crate::schemas::attempt::{
    AdaptiveInfo, AnswerOutcome, AnswerRequest, AnswerResponse, AttemptResponse,
    AttemptResultResponse, MyAttemptsQuery, NextQuestionResponse,
};
use crate::services::answer_grading;
use crate::services::attempt_finalize::{finalize_attempt, FinalizeMode};
use crate::services::attempt_history::AnsweredQuestion;
use crate::services::attempt_state::{AttemptEvent, AttemptState};
use crate::services::attempt_timing::{is_expired, remaining_seconds};
use crate::services::question_selector::{
    select_next, select_sequential, target_for_history, RecentPerformance, Selection,
    SelectorConfig,
};

use super::helpers::{
    attempt_to_response, fetch_assessment, load_history, lock_owned_attempt, public_question,
    result_response,
};

const CAPACITY_LOCK_KEY: &str = "attempts_active_capacity";

pub(in crate::api) async fn start_attempt(
    Path(assessment_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let assessment = fetch_assessment(&mut tx, &assessment_id).await?;
    let question_count = repositories::questions::count_by_assessment(&mut *tx, &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
    if question_count == 0 {
        return Err(ApiError::BadRequest("Assessment has no questions".to_string()));
    }

    repositories::submissions::acquire_user_assessment_lock(&mut *tx, &user.id, &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire attempt lock"))?;

    let now = primitive_now_utc();
    let grace = state.settings().attempts().submit_grace_seconds;

    let existing = repositories::submissions::find_in_progress(&mut *tx, &user.id, &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    if let Some(existing) = existing {
        if !is_expired(existing.started_at, assessment.time_limit_minutes, now, grace) {
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
            return Ok((
                StatusCode::OK,
                Json(attempt_to_response(&existing, assessment.time_limit_minutes)),
            ));
        }

        // The stale attempt still counts towards the quota once closed.
        let locked = repositories::submissions::find_by_id_for_update(&mut *tx, &existing.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to lock attempt"))?
            .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;
        finalize_attempt(&mut tx, &assessment, &locked, FinalizeMode::AutoDeadline, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to close expired attempt"))?;
    }

    repositories::submissions::acquire_global_lock(&mut *tx, CAPACITY_LOCK_KEY)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire capacity lock"))?;

    let active = repositories::submissions::count_in_progress(&mut *tx)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count active attempts"))?;
    let max_concurrent =
        i64::try_from(state.settings().attempts().max_concurrent_attempts).unwrap_or(i64::MAX);
    if active >= max_concurrent {
        return Err(ApiError::ServiceUnavailable(
            "Assessment service is temporarily at capacity. Try again in a few minutes."
                .to_string(),
        ));
    }

    let attempts =
        repositories::submissions::count_by_user_and_assessment(&mut *tx, &user.id, &assessment.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
    if attempts >= i64::from(assessment.max_attempts) {
        return Err(ApiError::BadRequest("Maximum attempts reached".to_string()));
    }

    let attempt_id = Uuid::new_v4().to_string();
    let inserted = repositories::submissions::create(
        &mut *tx,
        repositories::submissions::CreateSubmission {
            id: &attempt_id,
            user_id: &user.id,
            assessment_id: &assessment.id,
            attempt_number: (attempts + 1) as i32,
            started_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

    if !inserted {
        return Err(ApiError::Conflict("An attempt is already in progress".to_string()));
    }

    let submission = repositories::submissions::find_by_id(&mut *tx, &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::internal("missing row", "Attempt missing after insert"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("attempts_started_total").increment(1);
    tracing::info!(
        attempt_id = %submission.id,
        assessment_id = %assessment.id,
        user_id = %user.id,
        attempt_number = submission.attempt_number,
        "Attempt started"
    );

    Ok((StatusCode::CREATED, Json(attempt_to_response(&submission, assessment.time_limit_minutes))))
}

pub(in crate::api::attempts) async fn next_question(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<NextQuestionResponse>, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let submission = lock_owned_attempt(&mut tx, &attempt_id, &user).await?;
    let assessment = fetch_assessment(&mut tx, &submission.assessment_id).await?;

    if submission.status != SubmissionStatus::InProgress {
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        return Ok(Json(completed(&submission, &assessment)));
    }

    let now = primitive_now_utc();
    let grace = state.settings().attempts().submit_grace_seconds;
    if is_expired(submission.started_at, assessment.time_limit_minutes, now, grace) {
        let finished =
            close(&mut tx, &assessment, &submission, FinalizeMode::AutoDeadline).await?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        return Ok(Json(completed(&finished, &assessment)));
    }

    let history = load_history(&mut tx, &submission.id).await?;
    let config = state.selector();
    let recent = RecentPerformance::from_history(&history, config.recent_window);

    if let Some(outstanding) = outstanding_question(&mut tx, &submission, &history).await? {
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        let adaptive = adaptive_info(&assessment, &history, &recent, config);
        return Ok(Json(question_payload(
            &outstanding,
            &history,
            &submission,
            &assessment,
            adaptive,
        )));
    }

    let pool = repositories::questions::list_by_assessment(&mut *tx, &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;

    let selection = if assessment.is_adaptive {
        select_next(&pool, &history, config)
    } else {
        select_sequential(&pool, &history, config)
    };

    match selection {
        Selection::Completed => {
            let finished =
                close(&mut tx, &assessment, &submission, FinalizeMode::SelectorExhausted).await?;
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
            Ok(Json(completed(&finished, &assessment)))
        }
        Selection::Next { question, target } => {
            repositories::submissions::set_current_question(
                &mut *tx,
                &submission.id,
                Some(question.id.as_str()),
                now,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to record issued question"))?;
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

            tracing::debug!(
                attempt_id = %submission.id,
                question_id = %question.id,
                target_difficulty = target.difficulty,
                reason = target.reason.describe(),
                "Question issued"
            );

            let adaptive = assessment.is_adaptive.then(|| AdaptiveInfo {
                target_difficulty: target.difficulty,
                reason: target.reason.describe().to_string(),
                recent_accuracy: recent.accuracy(),
            });
            Ok(Json(question_payload(question, &history, &submission, &assessment, adaptive)))
        }
    }
}

pub(in crate::api::attempts) async fn submit_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerOutcome>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let submission = lock_owned_attempt(&mut tx, &attempt_id, &user).await?;
    AttemptState::from_status(submission.status, submission.completion_reason)
        .apply(AttemptEvent::AnswerAccepted)?;
    let assessment = fetch_assessment(&mut tx, &submission.assessment_id).await?;

    let now = primitive_now_utc();
    let grace = state.settings().attempts().submit_grace_seconds;
    if is_expired(submission.started_at, assessment.time_limit_minutes, now, grace) {
        let finished =
            close(&mut tx, &assessment, &submission, FinalizeMode::AutoDeadline).await?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        return Ok(Json(AnswerOutcome::Completed {
            result: result_response(&finished, assessment.time_limit_minutes),
        }));
    }

    let Some(outstanding_id) = submission.current_question_id.as_deref() else {
        return Err(ApiError::Conflict(
            "No question is outstanding; request the next question first".to_string(),
        ));
    };
    if outstanding_id != payload.question_id {
        return Err(ApiError::Conflict(
            "Answer does not match the outstanding question".to_string(),
        ));
    }

    let question =
        repositories::questions::find_by_id(&mut *tx, &assessment.id, &payload.question_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
            .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let difficulty = question
        .difficulty
        .ok_or_else(|| ApiError::internal(&question.id, "Issued question has no difficulty"))?;

    let history = load_history(&mut tx, &submission.id).await?;
    let options = question.options.as_ref().map(|options| options.0.as_slice()).unwrap_or_default();
    let correct = answer_grading::is_correct(
        question.question_type,
        options,
        &question.correct_answer.0,
        &payload.answer,
    );

    let inserted = repositories::submission_answers::insert(
        &mut *tx,
        repositories::submission_answers::InsertAnswer {
            submission_id: &submission.id,
            question_id: &question.id,
            position: history.len() as i32,
            answer: payload.answer,
            is_correct: correct,
            difficulty,
            adaptive_weight: question.adaptive_weight,
            time_spent_seconds: payload.time_spent_seconds,
            tags: question.tags.0.clone(),
            answered_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record answer"))?;
    if !inserted {
        return Err(ApiError::Conflict("Question was already answered".to_string()));
    }

    repositories::submissions::set_current_question(&mut *tx, &submission.id, None, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to clear outstanding question"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("answers_recorded_total", "correct" => correct.to_string()).increment(1);

    Ok(Json(AnswerOutcome::Recorded(AnswerResponse {
        question_id: question.id,
        correct,
        auto_graded: answer_grading::is_auto_gradable(question.question_type),
        difficulty,
        explanation: question.explanation,
        answered_count: history.len() + 1,
    })))
}

pub(in crate::api::attempts) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    finish_by_request(&state, &attempt_id, &user, FinalizeMode::ManualSubmit).await
}

pub(in crate::api::attempts) async fn abandon_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    finish_by_request(&state, &attempt_id, &user, FinalizeMode::Abandon).await
}

pub(in crate::api::attempts) async fn get_result(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    let assessment = repositories::assessments::find_by_id(state.db(), &submission.assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;

    if submission.user_id != user.id && assessment.created_by != user.id {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(Json(result_response(&submission, assessment.time_limit_minutes)))
}

pub(in crate::api::attempts) async fn list_my_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<MyAttemptsQuery>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let submissions =
        repositories::submissions::list_by_user(state.db(), &user.id, params.assessment_id.as_deref())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let mut limits: HashMap<String, Option<i32>> = HashMap::new();
    let mut response = Vec::with_capacity(submissions.len());

    for submission in &submissions {
        if !limits.contains_key(&submission.assessment_id) {
            let limit = repositories::assessments::find_by_id(state.db(), &submission.assessment_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch assessment"))?
                .and_then(|assessment| assessment.time_limit_minutes);
            limits.insert(submission.assessment_id.clone(), limit);
        }
        let limit = limits.get(&submission.assessment_id).copied().flatten();
        response.push(attempt_to_response(submission, limit));
    }

    Ok(Json(response))
}

async fn finish_by_request(
    state: &AppState,
    attempt_id: &str,
    user: &AuthUser,
    requested: FinalizeMode,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let submission = lock_owned_attempt(&mut tx, attempt_id, user).await?;
    AttemptState::from_status(submission.status, submission.completion_reason).apply(
        match requested {
            FinalizeMode::Abandon => AttemptEvent::Abandon,
            _ => AttemptEvent::Complete(CompletionReason::ManualSubmit),
        },
    )?;
    let assessment = fetch_assessment(&mut tx, &submission.assessment_id).await?;

    let now = primitive_now_utc();
    let grace = state.settings().attempts().submit_grace_seconds;
    let mode = if is_expired(submission.started_at, assessment.time_limit_minutes, now, grace) {
        FinalizeMode::AutoDeadline
    } else {
        requested
    };

    let finished = close(&mut tx, &assessment, &submission, mode).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(result_response(&finished, assessment.time_limit_minutes)))
}

async fn close(
    conn: &mut PgConnection,
    assessment: &Assessment,
    submission: &Submission,
    mode: FinalizeMode,
) -> Result<Submission, ApiError> {
    finalize_attempt(conn, assessment, submission, mode, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(format!("{e:#}"), "Failed to finalize attempt"))
}

/// The question issued earlier and not yet answered, if any.
async fn outstanding_question(
    conn: &mut PgConnection,
    submission: &Submission,
    history: &[AnsweredQuestion],
) -> Result<Option<Question>, ApiError> {
    let Some(question_id) = submission.current_question_id.as_deref() else {
        return Ok(None);
    };
    if history.iter().any(|item| item.question_id == question_id) {
        return Ok(None);
    }

    repositories::questions::find_by_id(&mut *conn, &submission.assessment_id, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))
}

fn adaptive_info(
    assessment: &Assessment,
    history: &[AnsweredQuestion],
    recent: &RecentPerformance,
    config: &SelectorConfig,
) -> Option<AdaptiveInfo> {
    assessment.is_adaptive.then(|| {
        let target = target_for_history(history, config);
        AdaptiveInfo {
            target_difficulty: target.difficulty,
            reason: target.reason.describe().to_string(),
            recent_accuracy: recent.accuracy(),
        }
    })
}

fn question_payload(
    question: &Question,
    history: &[AnsweredQuestion],
    submission: &Submission,
    assessment: &Assessment,
    adaptive: Option<AdaptiveInfo>,
) -> NextQuestionResponse {
    NextQuestionResponse::Question {
        question: public_question(question),
        question_number: history.len() + 1,
        answered_count: history.len(),
        remaining_seconds: remaining_seconds(
            submission.started_at,
            assessment.time_limit_minutes,
            primitive_now_utc(),
        ),
        adaptive,
    }
}

fn completed(submission: &Submission, assessment: &Assessment) -> NextQuestionResponse {
    NextQuestionResponse::Completed {
        result: result_response(submission, assessment.time_limit_minutes),
    }
}
