use crate::services::attempt_history::AnsweredQuestion;
use crate::services::question_selector::effective_weight;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) passed: bool,
}

impl ScoreSummary {
    pub(crate) fn percentage(&self) -> f64 {
        if self.max_score > 0.0 {
            self.score / self.max_score * 100.0
        } else {
            0.0
        }
    }
}

/// Weighted score over the whole attempt. An empty attempt is a zero-score fail.
pub(crate) fn finalize(history: &[AnsweredQuestion], passing_score: f64) -> ScoreSummary {
    let (score, max_score) = history.iter().fold((0.0, 0.0), |(score, max_score), item| {
        let weight = effective_weight(item.adaptive_weight);
        let earned = if item.correct { weight } else { 0.0 };
        (score + earned, max_score + weight)
    });

    let passed = max_score > 0.0 && score / max_score * 100.0 >= passing_score;

    ScoreSummary { score, max_score, passed }
}

pub(crate) fn total_time_spent(history: &[AnsweredQuestion]) -> i32 {
    history.iter().map(|item| item.time_spent_seconds.max(0)).sum()
}
