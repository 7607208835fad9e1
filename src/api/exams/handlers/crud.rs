use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::pagination::{PaginatedResponse, MAX_LIMIT};
use crate::api::validation::validate_name;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse, ExamStatusUpdate, ExamUpdate};

use super::super::helpers;
use super::super::queries::ListExamsQuery;

pub(in crate::api::exams) async fn create_exam(
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_name(&payload.name, "name")?;

    let exam_id = Uuid::new_v4().to_string();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &exam_id,
            name: payload.name.trim(),
            description: payload.description.as_deref(),
            rubric: &payload.rubric,
            answer_key: &payload.answer_key,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    tracing::info!(exam_id = %exam.id, name = %exam.name, "Exam created");

    Ok((StatusCode::CREATED, Json(exam.into())))
}

pub(in crate::api::exams) async fn list_exams(
    State(state): State<AppState>,
    Query(params): Query<ListExamsQuery>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, MAX_LIMIT);

    let exams = repositories::exams::list(state.db(), params.status, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count(state.db(), params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    Ok(Json(PaginatedResponse {
        items: exams.into_iter().map(ExamResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    Ok(Json(exam.into()))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_editable(&exam)?;

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(name) = payload.name.as_deref() {
        validate_name(name, "name")?;
    }

    repositories::exams::update(
        state.db(),
        &exam.id,
        repositories::exams::UpdateExam {
            name: payload.name.map(|name| name.trim().to_string()),
            description: payload.description,
            rubric: payload.rubric,
            answer_key: payload.answer_key,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    Ok(Json(updated.into()))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_not_grading(&state, &exam)?;

    let deleted = repositories::exams::delete_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;
    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(exam_id = %exam.id, "Exam deleted with its answer sheets");
    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn change_status(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ExamStatusUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    if !exam.status.can_transition_to(payload.status) {
        return Err(ApiError::BadRequest(format!(
            "Cannot change exam status from {} to {}",
            exam.status.as_str(),
            payload.status.as_str()
        )));
    }
    if payload.status.is_archived() {
        helpers::ensure_not_grading(&state, &exam)?;
    }

    repositories::exams::update_status(state.db(), &exam.id, payload.status, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update exam status"))?;

    tracing::info!(
        exam_id = %exam.id,
        from = exam.status.as_str(),
        to = payload.status.as_str(),
        "Exam status changed"
    );

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    Ok(Json(updated.into()))
}
