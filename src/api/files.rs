use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::services::storage::StorageError;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:handle", get(download))
}

async fn download(
    Path(handle): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.files().retrieve(&handle).await.map_err(|err| match err {
        StorageError::InvalidHandle(_) | StorageError::NotFound(_) => {
            ApiError::NotFound("File not found".to_string())
        }
        StorageError::Io(io) => ApiError::internal(io, "Failed to read stored file"),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{handle}.pdf\"")),
        ],
        bytes,
    ))
}
