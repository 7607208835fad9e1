use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::uploads::read_upload_form;
use crate::api::validation::validate_name;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::answer_sheet::AnswerSheetResponse;
use crate::schemas::exam::ExamResponse;
use crate::services::exam_statistics::{self, ExamStatistics};

use super::super::helpers;

pub(in crate::api::exams) async fn upload_exam_document(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_editable(&exam)?;

    let mut form = read_upload_form(&state, multipart).await?;
    if form.files.len() != 1 {
        return Err(ApiError::BadRequest("Exactly one exam PDF is required".to_string()));
    }
    let upload = form.files.remove(0);
    let size = upload.bytes.len();

    let handle = state
        .files()
        .store(upload.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store exam document"))?;

    repositories::exams::set_exam_file(state.db(), &exam.id, &handle, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to attach exam document"))?;

    tracing::info!(exam_id = %exam.id, handle = %handle, size, "Exam document uploaded");

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    Ok(Json(updated.into()))
}

pub(in crate::api::exams) async fn upload_answers(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<AnswerSheetResponse>>), ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_editable(&exam)?;

    let form = read_upload_form(&state, multipart).await?;
    if form.files.is_empty() {
        return Err(ApiError::BadRequest("At least one answer PDF is required".to_string()));
    }

    let explicit_name = match form.fields.get("name") {
        Some(name) if form.files.len() > 1 => {
            tracing::debug!(name = %name, "Ignoring name field for multi-file upload");
            None
        }
        Some(name) => {
            validate_name(name, "name")?;
            Some(name.trim().to_string())
        }
        None => None,
    };

    let mut created = Vec::with_capacity(form.files.len());
    for upload in form.files {
        let name = explicit_name
            .clone()
            .unwrap_or_else(|| helpers::name_from_filename(&upload.filename));

        let handle = state
            .files()
            .store(upload.bytes)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to store answer sheet"))?;

        let sheet = repositories::answer_sheets::create(
            state.db(),
            repositories::answer_sheets::CreateAnswerSheet {
                id: &Uuid::new_v4().to_string(),
                exam_id: &exam.id,
                name: &name,
                answer_file: &handle,
                created_at: primitive_now_utc(),
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create answer sheet"))?;

        created.push(AnswerSheetResponse::from(sheet));
    }

    tracing::info!(exam_id = %exam.id, count = created.len(), "Answer sheets uploaded");

    Ok((StatusCode::CREATED, Json(created)))
}

pub(in crate::api::exams) async fn list_answers(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnswerSheetResponse>>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let sheets = repositories::answer_sheets::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list answer sheets"))?;

    Ok(Json(sheets.into_iter().map(AnswerSheetResponse::from).collect()))
}

pub(in crate::api::exams) async fn exam_statistics(
    Path(exam_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExamStatistics>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let sheets = repositories::answer_sheets::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list answer sheets"))?;

    Ok(Json(exam_statistics::summarize(&sheets)))
}
