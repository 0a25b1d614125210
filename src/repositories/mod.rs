pub(crate) mod analytics;
pub(crate) mod assessments;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod submission_answers;
pub(crate) mod submissions;
