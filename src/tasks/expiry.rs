use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::TimedAttempt;
use crate::db::types::SubmissionStatus;
use crate::repositories;
use crate::services::attempt_finalize::{finalize_attempt, FinalizeMode};
use crate::services::attempt_timing::is_expired;

const SWEEP_BATCH: i64 = 200;

/// Finalizes every in-progress attempt whose time limit and grace have run out,
/// scoring whatever was answered before the deadline. A row that fails is
/// logged and rolled back without stopping the rest of the batch.
pub(crate) async fn close_overdue_attempts(state: &AppState) -> Result<usize> {
    let grace = state.settings().attempts().submit_grace_seconds;
    let candidates = repositories::submissions::list_overdue(
        state.db(),
        primitive_now_utc(),
        grace,
        SWEEP_BATCH,
    )
    .await
    .context("Failed to fetch overdue attempts")?;

    let mut closed = 0;
    let mut failed = 0;

    for candidate in candidates {
        match close_attempt(state, &candidate, grace).await {
            Ok(true) => closed += 1,
            Ok(false) => {}
            Err(err) => {
                failed += 1;
                tracing::error!(
                    submission_id = %candidate.id,
                    assessment_id = %candidate.assessment_id,
                    error = %format!("{err:#}"),
                    "Failed to close overdue attempt"
                );
            }
        }
    }

    if closed > 0 {
        tracing::info!(closed_attempts = closed, "Closed overdue attempts");
    }
    metrics::counter!("expired_attempts_closed_total").increment(closed as u64);
    metrics::counter!("expired_attempts_failed_total").increment(failed);

    Ok(closed)
}

/// Returns false when the attempt was already closed or is no longer overdue.
/// The transaction rolls back on drop when any step fails.
async fn close_attempt(state: &AppState, candidate: &TimedAttempt, grace: i64) -> Result<bool> {
    let mut tx = state.db().begin().await.context("Failed to start transaction")?;

    let Some(submission) =
        repositories::submissions::find_by_id_for_update(&mut *tx, &candidate.id)
            .await
            .context("Failed to lock attempt")?
    else {
        return Ok(false);
    };

    let now = primitive_now_utc();
    if submission.status != SubmissionStatus::InProgress
        || !is_expired(submission.started_at, Some(candidate.time_limit_minutes), now, grace)
    {
        return Ok(false);
    }

    let Some(assessment) =
        repositories::assessments::find_by_id(&mut *tx, &candidate.assessment_id)
            .await
            .context("Failed to fetch assessment")?
    else {
        return Ok(false);
    };

    finalize_attempt(&mut tx, &assessment, &submission, FinalizeMode::AutoDeadline, now).await?;
    tx.commit().await.context("Failed to commit expired attempt")?;
    Ok(true)
}
