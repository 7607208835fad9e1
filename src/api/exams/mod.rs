mod handlers;
mod helpers;
mod queries;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

/// `upload_limit` applies to the two upload routes only.
pub(crate) fn router(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam).get(handlers::list_exams))
        .route(
            "/:exam_id",
            get(handlers::get_exam).patch(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/status", post(handlers::change_status))
        .route(
            "/:exam_id/document",
            put(handlers::upload_exam_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:exam_id/answers",
            post(handlers::upload_answers)
                .layer(DefaultBodyLimit::max(upload_limit))
                .get(handlers::list_answers),
        )
        .route("/:exam_id/statistics", get(handlers::exam_statistics))
        .route("/:exam_id/grade", post(handlers::grade_exam))
        .route("/:exam_id/grading", get(handlers::grading_status))
}
