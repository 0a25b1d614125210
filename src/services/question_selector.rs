use std::cmp::Ordering;
use std::collections::HashSet;

use crate::core::config::AdaptiveSettings;
use crate::db::models::Question;
use crate::services::attempt_history::AnsweredQuestion;

pub(crate) const MIN_DIFFICULTY: i32 = 1;
pub(crate) const MAX_DIFFICULTY: i32 = 10;

const RAISE_FACTOR: f64 = 4.0;
const LOWER_FACTOR: f64 = 3.0;

/// Anything the selector can rank. Implemented for stored questions and for
/// lightweight fixtures in tests.
pub(crate) trait Candidate {
    fn id(&self) -> &str;
    fn difficulty(&self) -> Option<i32>;
    fn adaptive_weight(&self) -> Option<f64>;
    fn order_index(&self) -> i32;
}

impl Candidate for Question {
    fn id(&self) -> &str {
        &self.id
    }

    fn difficulty(&self) -> Option<i32> {
        self.difficulty
    }

    fn adaptive_weight(&self) -> Option<f64> {
        self.adaptive_weight
    }

    fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SelectorConfig {
    pub(crate) baseline_difficulty: f64,
    pub(crate) recent_window: usize,
    pub(crate) accuracy_threshold: f64,
    pub(crate) struggle_margin: f64,
    pub(crate) max_difficulty_step: f64,
    pub(crate) max_questions: usize,
}

impl SelectorConfig {
    pub(crate) fn from_settings(settings: &AdaptiveSettings) -> Self {
        Self {
            baseline_difficulty: settings.baseline_difficulty,
            recent_window: settings.recent_window,
            accuracy_threshold: settings.accuracy_threshold,
            struggle_margin: settings.struggle_margin,
            max_difficulty_step: settings.max_difficulty_step,
            max_questions: settings.max_questions,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            baseline_difficulty: 5.0,
            recent_window: 5,
            accuracy_threshold: 0.7,
            struggle_margin: 0.2,
            max_difficulty_step: 2.0,
            max_questions: 20,
        }
    }
}

/// Summary of the trailing window of answers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct RecentPerformance {
    pub(crate) correct: usize,
    pub(crate) total: usize,
    pub(crate) avg_difficulty: f64,
}

impl RecentPerformance {
    pub(crate) fn from_history(history: &[AnsweredQuestion], window: usize) -> Self {
        let start = history.len().saturating_sub(window);
        let recent = &history[start..];
        if recent.is_empty() {
            return Self::default();
        }

        let correct = recent.iter().filter(|item| item.correct).count();
        let difficulty_sum: f64 = recent.iter().map(|item| f64::from(item.difficulty)).sum();

        Self { correct, total: recent.len(), avg_difficulty: difficulty_sum / recent.len() as f64 }
    }

    pub(crate) fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionReason {
    Baseline,
    Raising,
    Lowering,
    Holding,
    Sequential,
}

impl SelectionReason {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Baseline => "Starting at baseline difficulty",
            Self::Raising => "Recent answers are strong; increasing difficulty",
            Self::Lowering => "Recent answers are weak; decreasing difficulty",
            Self::Holding => "Recent answers are mixed; keeping difficulty",
            Self::Sequential => "Fixed question order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Target {
    pub(crate) difficulty: f64,
    pub(crate) reason: SelectionReason,
}

#[derive(Debug)]
pub(crate) enum Selection<'a, Q> {
    Next { question: &'a Q, target: Target },
    Completed,
}

impl<'a, Q> Selection<'a, Q> {
    #[cfg(test)]
    fn question(&self) -> Option<&'a Q> {
        match self {
            Self::Next { question, .. } => Some(question),
            Self::Completed => None,
        }
    }
}

pub(crate) fn effective_weight(weight: Option<f64>) -> f64 {
    match weight {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => 1.0,
    }
}

fn is_well_formed<Q: Candidate>(question: &Q) -> bool {
    matches!(question.difficulty(), Some(value) if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value))
}

pub(crate) fn target_difficulty(recent: &RecentPerformance, config: &SelectorConfig) -> Target {
    let Some(accuracy) = recent.accuracy() else {
        return Target { difficulty: config.baseline_difficulty, reason: SelectionReason::Baseline };
    };

    let threshold = config.accuracy_threshold;
    let step = config.max_difficulty_step;

    let (change, reason) = if accuracy > threshold {
        (step.min((accuracy - threshold) * RAISE_FACTOR), SelectionReason::Raising)
    } else if accuracy < threshold - config.struggle_margin {
        (-step.min((threshold - accuracy) * LOWER_FACTOR), SelectionReason::Lowering)
    } else {
        (0.0, SelectionReason::Holding)
    };

    let difficulty = (recent.avg_difficulty + change)
        .clamp(f64::from(MIN_DIFFICULTY), f64::from(MAX_DIFFICULTY));

    Target { difficulty, reason }
}

/// Target for the next question of an attempt. Each step of the history moves
/// the target at most `max_difficulty_step` away from the previous one, so a
/// single answer on an outlying question cannot swing the attempt.
pub(crate) fn target_for_history(history: &[AnsweredQuestion], config: &SelectorConfig) -> Target {
    let mut target = target_difficulty(&RecentPerformance::default(), config);
    let step = config.max_difficulty_step;

    for answered in 1..=history.len() {
        let recent = RecentPerformance::from_history(&history[..answered], config.recent_window);
        let raw = target_difficulty(&recent, config);
        let low = (target.difficulty - step).max(f64::from(MIN_DIFFICULTY));
        let high = (target.difficulty + step).min(f64::from(MAX_DIFFICULTY));
        target = Target { difficulty: raw.difficulty.max(low).min(high), reason: raw.reason };
    }

    target
}

fn remaining<'a, Q: Candidate>(
    pool: &'a [Q],
    history: &[AnsweredQuestion],
    max_questions: usize,
) -> Option<Vec<&'a Q>> {
    if history.len() >= max_questions {
        return None;
    }

    let answered: HashSet<&str> = history.iter().map(|item| item.question_id.as_str()).collect();
    let candidates: Vec<&Q> = pool
        .iter()
        .filter(|question| is_well_formed(*question) && !answered.contains(question.id()))
        .collect();

    (!candidates.is_empty()).then_some(candidates)
}

/// Picks the unanswered question whose difficulty is closest to the target.
/// Ties go to the higher weight, then the lower order index, then the smaller id.
pub(crate) fn select_next<'a, Q: Candidate>(
    pool: &'a [Q],
    history: &[AnsweredQuestion],
    config: &SelectorConfig,
) -> Selection<'a, Q> {
    let Some(candidates) = remaining(pool, history, config.max_questions) else {
        return Selection::Completed;
    };

    let target = target_for_history(history, config);
    let distance = |question: &Q| {
        (f64::from(question.difficulty().unwrap_or(MIN_DIFFICULTY)) - target.difficulty).abs()
    };

    let chosen = candidates.into_iter().min_by(|left, right| {
        distance(*left)
            .total_cmp(&distance(*right))
            .then_with(|| {
                effective_weight(right.adaptive_weight())
                    .total_cmp(&effective_weight(left.adaptive_weight()))
            })
            .then_with(|| left.order_index().cmp(&right.order_index()))
            .then_with(|| left.id().cmp(right.id()))
    });

    match chosen {
        Some(question) => Selection::Next { question, target },
        None => Selection::Completed,
    }
}

/// Fixed-order selection for assessments that are not adaptive.
pub(crate) fn select_sequential<'a, Q: Candidate>(
    pool: &'a [Q],
    history: &[AnsweredQuestion],
    config: &SelectorConfig,
) -> Selection<'a, Q> {
    let Some(candidates) = remaining(pool, history, config.max_questions) else {
        return Selection::Completed;
    };

    let chosen = candidates.into_iter().min_by(|left, right| {
        match left.order_index().cmp(&right.order_index()) {
            Ordering::Equal => left.id().cmp(right.id()),
            other => other,
        }
    });

    match chosen {
        Some(question) => Selection::Next {
            question,
            target: Target {
                difficulty: f64::from(question.difficulty().unwrap_or(MIN_DIFFICULTY)),
                reason: SelectionReason::Sequential,
            },
        },
        None => Selection::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        difficulty: Option<i32>,
        weight: Option<f64>,
        order: i32,
    }

    impl Candidate for Item {
        fn id(&self) -> &str {
            self.id
        }

        fn difficulty(&self) -> Option<i32> {
            self.difficulty
        }

        fn adaptive_weight(&self) -> Option<f64> {
            self.weight
        }

        fn order_index(&self) -> i32 {
            self.order
        }
    }

    fn item(id: &'static str, difficulty: i32, order: i32) -> Item {
        Item { id, difficulty: Some(difficulty), weight: None, order }
    }

    fn answered(id: &str, difficulty: i32, correct: bool) -> AnsweredQuestion {
        AnsweredQuestion::new(id, difficulty, correct, None)
    }

    fn pick<'a>(
        pool: &'a [Item],
        history: &[AnsweredQuestion],
        config: &SelectorConfig,
    ) -> Option<&'a Item> {
        select_next(pool, history, config).question()
    }

    #[test]
    fn first_question_targets_baseline() {
        let pool = vec![item("a", 2, 0), item("b", 5, 1), item("c", 9, 2)];
        let config = SelectorConfig::default();

        match select_next(&pool, &[], &config) {
            Selection::Next { question, target } => {
                assert_eq!(question.id, "b");
                assert_eq!(target.difficulty, 5.0);
                assert_eq!(target.reason, SelectionReason::Baseline);
            }
            Selection::Completed => panic!("expected a question"),
        }
    }

    #[test]
    fn never_reissues_answered_question() {
        let pool = vec![item("a", 5, 0), item("b", 5, 1), item("c", 5, 2)];
        let history = vec![answered("a", 5, true), answered("b", 5, false)];

        let chosen = pick(&pool, &history, &SelectorConfig::default()).expect("question");
        assert_eq!(chosen.id, "c");
    }

    #[test]
    fn single_remaining_question_is_returned_regardless_of_distance() {
        let pool = vec![item("far", 10, 0)];
        let history = vec![answered("x", 1, false), answered("y", 1, false)];

        let chosen = pick(&pool, &history, &SelectorConfig::default()).expect("question");
        assert_eq!(chosen.id, "far");
    }

    #[test]
    fn empty_pool_completes() {
        let pool: Vec<Item> = Vec::new();
        assert!(pick(&pool, &[], &SelectorConfig::default()).is_none());
    }

    #[test]
    fn pool_of_only_malformed_questions_completes() {
        let pool = vec![
            Item { id: "legacy", difficulty: None, weight: None, order: 0 },
            Item { id: "broken", difficulty: Some(42), weight: None, order: 1 },
        ];
        assert!(pick(&pool, &[], &SelectorConfig::default()).is_none());
    }

    #[test]
    fn malformed_questions_are_skipped() {
        let pool = vec![
            Item { id: "legacy", difficulty: None, weight: None, order: 0 },
            item("ok", 9, 1),
        ];
        let chosen = pick(&pool, &[], &SelectorConfig::default()).expect("question");
        assert_eq!(chosen.id, "ok");
    }

    #[test]
    fn reaching_max_questions_completes() {
        let pool = vec![item("a", 5, 0), item("b", 5, 1), item("c", 5, 2)];
        let history = vec![answered("a", 5, true), answered("b", 5, true)];
        let config = SelectorConfig { max_questions: 2, ..SelectorConfig::default() };

        assert!(pick(&pool, &history, &config).is_none());
    }

    #[test]
    fn strong_performance_raises_target() {
        let history: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|id| answered(id, 5, true))
            .collect();
        let recent = RecentPerformance::from_history(&history, 5);
        let target = target_difficulty(&recent, &SelectorConfig::default());

        // (1.0 - 0.7) * 4 = 1.2
        assert!((target.difficulty - 6.2).abs() < 1e-9);
        assert_eq!(target.reason, SelectionReason::Raising);
    }

    #[test]
    fn weak_performance_lowers_target() {
        let history: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|id| answered(id, 6, false))
            .collect();
        let recent = RecentPerformance::from_history(&history, 5);
        let target = target_difficulty(&recent, &SelectorConfig::default());

        // min(2, 0.7 * 3) = 2
        assert!((target.difficulty - 4.0).abs() < 1e-9);
        assert_eq!(target.reason, SelectionReason::Lowering);
    }

    #[test]
    fn mixed_performance_holds_target() {
        let history = vec![
            answered("a", 4, true),
            answered("b", 6, false),
            answered("c", 5, true),
            answered("d", 5, false),
            answered("e", 5, true),
        ];
        let recent = RecentPerformance::from_history(&history, 5);
        let target = target_difficulty(&recent, &SelectorConfig::default());

        assert_eq!(target.difficulty, 5.0);
        assert_eq!(target.reason, SelectionReason::Holding);
    }

    #[test]
    fn adjustment_never_exceeds_step() {
        let config = SelectorConfig { max_difficulty_step: 0.5, ..SelectorConfig::default() };
        for (correct, total) in [(0, 5), (5, 5), (1, 1), (0, 1), (3, 4)] {
            let recent = RecentPerformance { correct, total, avg_difficulty: 5.0 };
            let target = target_difficulty(&recent, &config);
            assert!((target.difficulty - 5.0).abs() <= 0.5 + 1e-9, "{correct}/{total}");
        }
    }

    #[test]
    fn target_is_clamped_to_scale() {
        let config = SelectorConfig::default();
        let high = RecentPerformance { correct: 5, total: 5, avg_difficulty: 10.0 };
        let low = RecentPerformance { correct: 0, total: 5, avg_difficulty: 1.0 };

        assert_eq!(target_difficulty(&high, &config).difficulty, 10.0);
        assert_eq!(target_difficulty(&low, &config).difficulty, 1.0);
    }

    #[test]
    fn outlying_answer_moves_target_by_at_most_one_step() {
        let pool = vec![item("hard", 9, 0), item("easy", 1, 1), item("hard2", 9, 2)];
        let config = SelectorConfig::default();

        let first = pick(&pool, &[], &config).expect("question");
        assert_eq!(first.id, "hard");

        let history = vec![answered("hard", 9, true)];
        let target = target_for_history(&history, &config);
        assert!((target.difficulty - 7.0).abs() < 1e-9, "{target:?}");
        assert_eq!(target.reason, SelectionReason::Raising);
    }

    #[test]
    fn consecutive_targets_stay_within_step() {
        let pool: Vec<Item> = [
            ("d1", 1), ("d9", 9), ("d2", 2), ("d10", 10), ("d3", 3), ("d8", 8),
            ("d5", 5), ("d6", 6), ("d4", 4), ("d7", 7), ("e1", 1), ("e10", 10),
        ]
        .into_iter()
        .enumerate()
        .map(|(order, (id, difficulty))| item(id, difficulty, order as i32))
        .collect();

        for config in [
            SelectorConfig::default(),
            SelectorConfig {
                max_difficulty_step: 0.5,
                recent_window: 2,
                ..SelectorConfig::default()
            },
        ] {
            for pattern in [[true; 4], [false; 4], [true, false, false, true]] {
                let mut history = Vec::new();
                let mut previous = target_for_history(&history, &config);

                while let Selection::Next { question, target } =
                    select_next(&pool, &history, &config)
                {
                    assert!(
                        (target.difficulty - previous.difficulty).abs()
                            <= config.max_difficulty_step + 1e-9,
                        "{previous:?} -> {target:?}"
                    );
                    assert!((1.0..=10.0).contains(&target.difficulty));
                    previous = target;
                    let correct = pattern[history.len() % pattern.len()];
                    history.push(answered(
                        question.id,
                        question.difficulty.unwrap_or(MIN_DIFFICULTY),
                        correct,
                    ));
                }
                assert_eq!(history.len(), pool.len());
            }
        }
    }

    #[test]
    fn recent_window_only_counts_trailing_answers() {
        let mut history: Vec<_> =
            (0..3).map(|i| answered(&format!("old{i}"), 1, false)).collect();
        history.extend((0..5).map(|i| answered(&format!("new{i}"), 8, true)));

        let recent = RecentPerformance::from_history(&history, 5);
        assert_eq!(recent, RecentPerformance { correct: 5, total: 5, avg_difficulty: 8.0 });
    }

    #[test]
    fn ties_prefer_higher_weight_then_order_then_id() {
        let config = SelectorConfig::default();

        let weighted = vec![
            Item { id: "light", difficulty: Some(4), weight: Some(1.0), order: 0 },
            Item { id: "heavy", difficulty: Some(6), weight: Some(2.0), order: 1 },
        ];
        assert_eq!(pick(&weighted, &[], &config).expect("question").id, "heavy");

        let ordered = vec![item("late", 6, 3), item("early", 4, 1)];
        assert_eq!(pick(&ordered, &[], &config).expect("question").id, "early");

        let same = vec![item("zeta", 5, 0), item("alpha", 5, 0)];
        assert_eq!(pick(&same, &[], &config).expect("question").id, "alpha");
    }

    #[test]
    fn invalid_weights_count_as_default() {
        assert_eq!(effective_weight(None), 1.0);
        assert_eq!(effective_weight(Some(f64::NAN)), 1.0);
        assert_eq!(effective_weight(Some(-3.0)), 1.0);
        assert_eq!(effective_weight(Some(0.0)), 1.0);
        assert_eq!(effective_weight(Some(2.5)), 2.5);
    }

    #[test]
    fn identical_inputs_yield_identical_choice() {
        let pool = vec![item("a", 3, 0), item("b", 7, 1), item("c", 7, 2), item("d", 6, 3)];
        let history = vec![answered("a", 3, true), answered("x", 6, true)];
        let config = SelectorConfig::default();

        let first = pick(&pool, &history, &config).map(|q| q.id);
        let second = pick(&pool, &history, &config).map(|q| q.id);
        assert_eq!(first, second);
    }

    #[test]
    fn sequential_follows_order_index() {
        let pool = vec![item("third", 1, 2), item("first", 9, 0), item("second", 5, 1)];
        let config = SelectorConfig::default();

        let first = select_sequential(&pool, &[], &config).question().expect("question");
        assert_eq!(first.id, "first");

        let history = vec![answered("first", 9, true)];
        let next = select_sequential(&pool, &history, &config).question().expect("question");
        assert_eq!(next.id, "second");

        let history = vec![
            answered("first", 9, true),
            answered("second", 5, true),
            answered("third", 1, true),
        ];
        assert!(select_sequential(&pool, &history, &config).question().is_none());
    }
}
