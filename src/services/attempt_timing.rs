use anyhow::{anyhow, Result};
use time::{Duration, PrimitiveDateTime};

pub(crate) fn normalize_time_limit(time_limit_minutes: Option<i32>) -> Result<Option<i32>> {
    match time_limit_minutes {
        Some(minutes) if minutes <= 0 => {
            Err(anyhow!("time_limit_minutes must be positive when provided"))
        }
        other => Ok(other),
    }
}

pub(crate) fn compute_deadline(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
) -> Option<PrimitiveDateTime> {
    time_limit_minutes
        .filter(|minutes| *minutes > 0)
        .map(|minutes| started_at + Duration::minutes(i64::from(minutes)))
}

/// True once `now` is beyond the deadline plus the network grace period.
pub(crate) fn is_expired(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    now: PrimitiveDateTime,
    grace_seconds: i64,
) -> bool {
    compute_deadline(started_at, time_limit_minutes)
        .is_some_and(|deadline| now > deadline + Duration::seconds(grace_seconds))
}

pub(crate) fn remaining_seconds(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    now: PrimitiveDateTime,
) -> Option<i64> {
    compute_deadline(started_at, time_limit_minutes)
        .map(|deadline| (deadline - now).whole_seconds().max(0))
}

/// Time spent is capped at the deadline so a late sweep does not inflate it.
pub(crate) fn effective_finish(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    now: PrimitiveDateTime,
) -> PrimitiveDateTime {
    match compute_deadline(started_at, time_limit_minutes) {
        Some(deadline) if deadline < now => deadline,
        _ => now,
    }
}
