use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use serde_json::error::Category;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::grading::{GradeBatchRequest, GradeBatchResponse, GradingStatusResponse};
use crate::tasks::grading::{self, GradeOptions};

use super::super::helpers;

pub(in crate::api::exams) async fn grade_exam(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GradeBatchResponse>, ApiError> {
    let request = parse_grade_request(&headers, &body)?;

    let summary = grading::grade_exam(
        &state,
        &exam_id,
        GradeOptions { force: request.force, sheet_ids: request.sheet_ids },
    )
    .await?;

    Ok(Json(summary.into()))
}

/// An empty body means default mode. Anything else must be a valid JSON options object.
fn parse_grade_request(headers: &HeaderMap, body: &[u8]) -> Result<GradeBatchRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GradeBatchRequest::default());
    }

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err(ApiError::UnsupportedMediaType(
            "Grading options must be sent as application/json".to_string(),
        ));
    }

    serde_json::from_slice(body).map_err(|err| match err.classify() {
        Category::Data => ApiError::UnprocessableEntity(format!("Invalid grading options: {err}")),
        _ => ApiError::BadRequest(format!("Malformed grading options: {err}")),
    })
}

pub(in crate::api::exams) async fn grading_status(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GradingStatusResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let response = match state.grading_locks().progress(&exam.id) {
        Some(progress) => GradingStatusResponse {
            exam_id: exam.id,
            in_progress: true,
            total: progress.total,
            settled: progress.settled,
            failed: progress.failed,
        },
        None => GradingStatusResponse {
            exam_id: exam.id,
            in_progress: false,
            total: 0,
            settled: 0,
            failed: 0,
        },
    };

    Ok(Json(response))
}
