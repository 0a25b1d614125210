use std::cmp::Ordering;

use crate::db::models::CompletedAttempt;

/// Percentage bands, highest first. Each entry is the band label and its lower bound.
pub(crate) const SCORE_BANDS: [(&str, f64); 6] = [
    ("90-100", 90.0),
    ("80-89", 80.0),
    ("70-79", 70.0),
    ("60-69", 60.0),
    ("50-59", 50.0),
    ("0-49", 0.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct ScoreStats {
    pub(crate) passed: usize,
    pub(crate) pass_rate: f64,
    pub(crate) average_score: f64,
    pub(crate) min_score: f64,
    pub(crate) max_score: f64,
    pub(crate) average_time_seconds: f64,
}

pub(crate) fn attempt_percentage(attempt: &CompletedAttempt) -> f64 {
    if attempt.max_score > 0.0 {
        attempt.score / attempt.max_score * 100.0
    } else {
        0.0
    }
}

pub(crate) fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn score_band(percentage: f64) -> &'static str {
    SCORE_BANDS
        .iter()
        .find(|(_, lower)| percentage >= *lower)
        .map_or("0-49", |(label, _)| *label)
}

/// Pass rate and score spread over completed attempts. All zero when there are none.
pub(crate) fn score_stats(attempts: &[CompletedAttempt]) -> ScoreStats {
    if attempts.is_empty() {
        return ScoreStats::default();
    }

    let count = attempts.len() as f64;
    let percentages: Vec<f64> = attempts.iter().map(attempt_percentage).collect();
    let passed = attempts.iter().filter(|attempt| attempt.passed == Some(true)).count();
    let total_time: f64 =
        attempts.iter().map(|attempt| f64::from(attempt.time_spent_seconds)).sum();

    ScoreStats {
        passed,
        pass_rate: round_one(passed as f64 / count * 100.0),
        average_score: round_one(percentages.iter().sum::<f64>() / count),
        min_score: round_one(percentages.iter().copied().fold(f64::INFINITY, f64::min)),
        max_score: round_one(percentages.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        average_time_seconds: round_one(total_time / count),
    }
}

/// Count per band, every band present, highest band first.
pub(crate) fn score_distribution(attempts: &[CompletedAttempt]) -> Vec<(&'static str, usize)> {
    SCORE_BANDS
        .iter()
        .map(|(label, _)| {
            let count = attempts
                .iter()
                .filter(|attempt| score_band(attempt_percentage(attempt)) == *label)
                .count();
            (*label, count)
        })
        .collect()
}

fn by_percentage(left: &CompletedAttempt, right: &CompletedAttempt) -> Ordering {
    attempt_percentage(left).total_cmp(&attempt_percentage(right))
}

/// Best attempts first; an earlier attempt number wins a tie.
pub(crate) fn top_performers(
    attempts: &[CompletedAttempt],
    limit: usize,
) -> Vec<&CompletedAttempt> {
    let mut ranked: Vec<&CompletedAttempt> = attempts.iter().collect();
    ranked.sort_by(|left, right| {
        by_percentage(right, left).then_with(|| left.attempt_number.cmp(&right.attempt_number))
    });
    ranked.truncate(limit);
    ranked
}

/// Failed attempts, lowest score first; a later attempt number wins a tie.
pub(crate) fn struggling(attempts: &[CompletedAttempt], limit: usize) -> Vec<&CompletedAttempt> {
    let mut ranked: Vec<&CompletedAttempt> =
        attempts.iter().filter(|attempt| attempt.passed != Some(true)).collect();
    ranked.sort_by(|left, right| {
        by_percentage(left, right).then_with(|| right.attempt_number.cmp(&left.attempt_number))
    });
    ranked.truncate(limit);
    ranked
}

pub(crate) fn success_rate(attempts: i64, correct: i64) -> f64 {
    if attempts > 0 {
        round_one(correct as f64 / attempts as f64 * 100.0)
    } else {
        0.0
    }
}
