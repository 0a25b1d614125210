pub(crate) mod answer_grading;
pub(crate) mod assessment_analytics;
pub(crate) mod attempt_finalize;
pub(crate) mod attempt_history;
pub(crate) mod attempt_state;
pub(crate) mod attempt_timing;
pub(crate) mod question_selector;
pub(crate) mod recommendations;
pub(crate) mod score_aggregate;
