use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::errors::ApiError;
use crate::api::validation::{validate_name, validate_score};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::AnswerSheet;
use crate::repositories;
use crate::schemas::answer_sheet::{AnswerSheetResponse, AnswerSheetUpdate};

async fn fetch_sheet(state: &AppState, answer_id: &str) -> Result<AnswerSheet, ApiError> {
    repositories::answer_sheets::find_by_id(state.db(), answer_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch answer sheet"))?
        .ok_or_else(|| ApiError::NotFound("Answer sheet not found".to_string()))
}

async fn ensure_exam_editable(state: &AppState, sheet: &AnswerSheet) -> Result<(), ApiError> {
    let exam = repositories::exams::fetch_one_by_id(state.db(), &sheet.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;
    if exam.status.is_archived() {
        return Err(ApiError::Conflict("Exam is archived".to_string()));
    }
    if state.grading_locks().progress(&exam.id).is_some() {
        return Err(ApiError::Conflict(
            "A grading batch is already running for this exam".to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn get_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AnswerSheetResponse>, ApiError> {
    let sheet = fetch_sheet(&state, &answer_id).await?;
    Ok(Json(sheet.into()))
}

pub(super) async fn update_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<AnswerSheetUpdate>,
) -> Result<Json<AnswerSheetResponse>, ApiError> {
    let sheet = fetch_sheet(&state, &answer_id).await?;
    ensure_exam_editable(&state, &sheet).await?;

    if let Some(name) = payload.name.as_deref() {
        validate_name(name, "name")?;
    }
    if let Some(Some(score)) = payload.score {
        validate_score(score)?;
    }

    repositories::answer_sheets::update_manual(
        state.db(),
        &sheet.id,
        repositories::answer_sheets::ManualGradeUpdate {
            name: payload.name.map(|name| name.trim().to_string()),
            score: payload.score.flatten(),
            clear_score: matches!(payload.score, Some(None)),
            feedback: payload.feedback.clone().flatten(),
            clear_feedback: matches!(payload.feedback, Some(None)),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update answer sheet"))?;

    let updated = repositories::answer_sheets::fetch_one_by_id(state.db(), &sheet.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated answer sheet"))?;

    tracing::info!(
        sheet_id = %updated.id,
        exam_id = %updated.exam_id,
        status = ?updated.status(),
        "Answer sheet edited manually"
    );

    Ok(Json(updated.into()))
}

pub(super) async fn delete_answer(
    Path(answer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let sheet = fetch_sheet(&state, &answer_id).await?;
    ensure_exam_editable(&state, &sheet).await?;

    let deleted = repositories::answer_sheets::delete_by_id(state.db(), &sheet.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete answer sheet"))?;
    if !deleted {
        return Err(ApiError::NotFound("Answer sheet not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
