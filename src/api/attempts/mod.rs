pub(crate) mod helpers;
mod student;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(in crate::api) use student::start_attempt;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(student::list_my_attempts))
        .route("/:attempt_id/next-question", post(student::next_question))
        .route("/:attempt_id/answer", post(student::submit_answer))
        .route("/:attempt_id/submit", post(student::submit_attempt))
        .route("/:attempt_id/abandon", post(student::abandon_attempt))
        .route("/:attempt_id/result", get(student::get_result))
}

#[cfg(test)]
mod tests;
