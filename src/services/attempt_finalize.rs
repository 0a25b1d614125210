use anyhow::{anyhow, Context, Result};
use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::core::time::elapsed_seconds;
use crate::db::models::{Assessment, Submission};
use crate::db::types::CompletionReason;
use crate::repositories;
use crate::services::attempt_history::{self, AnsweredQuestion};
use crate::services::attempt_state::{AttemptEvent, AttemptState};
use crate::services::attempt_timing::effective_finish;
use crate::services::recommendations::build_feedback;
use crate::services::score_aggregate::{finalize, total_time_spent, ScoreSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    SelectorExhausted,
    AutoDeadline,
    Abandon,
}

impl FinalizeMode {
    fn event(self) -> AttemptEvent {
        match self {
            Self::ManualSubmit => AttemptEvent::Complete(CompletionReason::ManualSubmit),
            Self::SelectorExhausted => AttemptEvent::Complete(CompletionReason::SelectorExhausted),
            Self::AutoDeadline => AttemptEvent::Complete(CompletionReason::TimeLimitElapsed),
            Self::Abandon => AttemptEvent::Abandon,
        }
    }
}

fn answers_map(history: &[AnsweredQuestion]) -> serde_json::Map<String, serde_json::Value> {
    history.iter().map(|item| (item.question_id.clone(), item.answer.clone())).collect()
}

/// Scores the recorded answers and moves the attempt to its terminal state.
/// The caller must hold the submission row lock inside `conn`'s transaction.
pub(crate) async fn finalize_attempt(
    conn: &mut PgConnection,
    assessment: &Assessment,
    submission: &Submission,
    mode: FinalizeMode,
    now: PrimitiveDateTime,
) -> Result<Submission> {
    let current = AttemptState::from_status(submission.status, submission.completion_reason);
    let next = current.apply(mode.event()).map_err(|err| anyhow!("Cannot finalize attempt: {err}"))?;
    let status = next.status().ok_or_else(|| anyhow!("Finalized attempt has no status"))?;
    let reason = next.completion_reason().ok_or_else(|| anyhow!("Finalized attempt has no reason"))?;

    let rows = repositories::submission_answers::list_by_submission(&mut *conn, &submission.id)
        .await
        .context("Failed to load recorded answers")?;
    let history = attempt_history::from_rows(rows);

    let mut summary = finalize(&history, assessment.passing_score);
    if matches!(next, AttemptState::Abandoned) {
        summary = ScoreSummary { passed: false, ..summary };
    }

    let finished_at = effective_finish(submission.started_at, assessment.time_limit_minutes, now);
    let wall_clock = elapsed_seconds(submission.started_at, finished_at);
    let time_spent = i32::try_from(wall_clock).unwrap_or(i32::MAX).max(total_time_spent(&history));

    let feedback = serde_json::to_value(build_feedback(&history, &summary))
        .context("Failed to serialize attempt feedback")?;

    let updated = repositories::submissions::finish(
        &mut *conn,
        &submission.id,
        repositories::submissions::FinalizeUpdate {
            status,
            completion_reason: reason,
            answers: answers_map(&history),
            score: summary.score,
            max_score: summary.max_score,
            passed: summary.passed,
            time_spent_seconds: time_spent,
            feedback,
            completed_at: now,
        },
    )
    .await
    .context("Failed to store final score")?;

    if !updated {
        return Err(anyhow!("Attempt {} was already finished", submission.id));
    }

    metrics::counter!("attempts_finalized_total", "reason" => reason.as_str()).increment(1);
    tracing::info!(
        submission_id = %submission.id,
        assessment_id = %assessment.id,
        reason = reason.as_str(),
        score = summary.score,
        max_score = summary.max_score,
        passed = summary.passed,
        answered = history.len(),
        "Attempt finalized"
    );

    repositories::submissions::find_by_id(&mut *conn, &submission.id)
        .await
        .context("Failed to reload finalized attempt")?
        .ok_or_else(|| anyhow!("Attempt missing after finalize"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_expected_terminal_states() {
        let cases = [
            (FinalizeMode::ManualSubmit, AttemptState::Completed(CompletionReason::ManualSubmit)),
            (
                FinalizeMode::SelectorExhausted,
                AttemptState::Completed(CompletionReason::SelectorExhausted),
            ),
            (
                FinalizeMode::AutoDeadline,
                AttemptState::Completed(CompletionReason::TimeLimitElapsed),
            ),
            (FinalizeMode::Abandon, AttemptState::Abandoned),
        ];

        for (mode, expected) in cases {
            assert_eq!(AttemptState::InProgress.apply(mode.event()), Ok(expected));
        }
    }

    #[test]
    fn answers_map_is_keyed_by_question() {
        let mut first = AnsweredQuestion::new("q1", 3, true, None);
        first.answer = serde_json::json!("A");
        let mut second = AnsweredQuestion::new("q2", 5, false, None);
        second.answer = serde_json::json!(["x", "y"]);

        let map = answers_map(&[first, second]);
        assert_eq!(map["q1"], serde_json::json!("A"));
        assert_eq!(map["q2"], serde_json::json!(["x", "y"]));
    }
}
