mod handlers;

use axum::{routing::get, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route(
        "/:answer_id",
        get(handlers::get_answer).patch(handlers::update_answer).delete(handlers::delete_answer),
    )
}
