use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::Exam;
use crate::repositories;

pub(super) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// Archived exams only accept status changes and deletion.
pub(super) fn ensure_editable(exam: &Exam) -> Result<(), ApiError> {
    if exam.status.is_archived() {
        return Err(ApiError::Conflict("Exam is archived".to_string()));
    }
    Ok(())
}

pub(super) fn ensure_not_grading(state: &AppState, exam: &Exam) -> Result<(), ApiError> {
    if state.grading_locks().progress(&exam.id).is_some() {
        return Err(ApiError::Conflict(
            "A grading batch is already running for this exam".to_string(),
        ));
    }
    Ok(())
}

/// Student name for an uploaded sheet: the file name without its extension.
pub(super) fn name_from_filename(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("")
        .trim();
    if stem.is_empty() {
        "Unnamed".to_string()
    } else {
        stem.to_string()
    }
}
