use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::api::errors::ApiError;
use crate::api::validation::validate_pdf_upload;
use crate::core::{config::Settings, state::AppState};

/// Multipart uploads are capped per file and per request; a request may carry this many files.
pub(crate) const MAX_FILES_PER_REQUEST: usize = 50;

/// Headroom for multipart boundaries, part headers and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const MEBIBYTE: u64 = 1024 * 1024;

#[derive(Debug)]
pub(crate) struct PdfUpload {
    pub(crate) filename: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) files: Vec<PdfUpload>,
    pub(crate) fields: HashMap<String, String>,
}

/// Reads every `file` part as a validated PDF and every other part as text.
pub(crate) async fn read_upload_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<UploadForm, ApiError> {
    let storage = state.settings().storage();
    let max_upload_size_mb = storage.max_upload_size_mb;
    let max_request_mb = storage.max_upload_request_mb;
    let max_file_bytes = max_upload_size_mb * MEBIBYTE;
    let max_request_bytes = max_request_mb * MEBIBYTE;
    let mut request_bytes: u64 = 0;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, "Invalid multipart data", max_request_mb))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for '{name}'")))?;
            form.fields.insert(name, text);
            continue;
        }

        if form.files.len() >= MAX_FILES_PER_REQUEST {
            return Err(ApiError::BadRequest(format!(
                "At most {MAX_FILES_PER_REQUEST} files can be uploaded at once"
            )));
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| multipart_error(err, "Failed to read file", max_request_mb))?
        {
            let next_size = bytes.len() as u64 + chunk.len() as u64;
            if next_size > max_file_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File size exceeds {max_upload_size_mb}MB limit"
                )));
            }
            request_bytes += chunk.len() as u64;
            if request_bytes > max_request_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Upload exceeds {max_request_mb}MB per request"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        validate_pdf_upload(&filename, &content_type, &bytes)?;
        form.files.push(PdfUpload { filename, bytes });
    }

    Ok(form)
}

fn multipart_error(err: MultipartError, message: &str, max_request_mb: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge(format!("Upload exceeds {max_request_mb}MB per request"));
    }
    ApiError::BadRequest(message.to_string())
}

/// Request body ceiling for the upload routes. Every other route keeps axum's default.
pub(crate) fn body_limit(settings: &Settings) -> usize {
    let per_request = settings.storage().max_upload_request_mb.saturating_mul(MEBIBYTE);
    usize::try_from(per_request).unwrap_or(usize::MAX).saturating_add(MULTIPART_OVERHEAD_BYTES)
}
