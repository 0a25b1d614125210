mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_assessment).get(handlers::list_assessments))
        .route("/:assessment_id", get(handlers::get_assessment).delete(handlers::delete_assessment))
        .route("/:assessment_id/submissions", get(handlers::list_submissions))
        .route("/:assessment_id/analytics", get(handlers::get_analytics))
        .route("/:assessment_id/start", post(crate::api::attempts::start_attempt))
}
