use std::path::Path;

use crate::api::errors::ApiError;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

pub(crate) fn validate_pdf_upload(
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if extension != "pdf" {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime != "application/pdf" {
        return Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )));
    }

    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(ApiError::BadRequest(format!("File '{filename}' is not a PDF document")));
    }

    Ok(())
}

pub(crate) fn validate_name(name: &str, field: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn validate_score(score: f64) -> Result<(), ApiError> {
    if !score.is_finite() || score < 0.0 {
        return Err(ApiError::BadRequest("score must be a non-negative number".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_with_signature() {
        assert!(validate_pdf_upload("sheet.PDF", "application/pdf", b"%PDF-1.7 ...").is_ok());
    }

    #[test]
    fn rejects_wrong_extension_mime_or_signature() {
        assert!(validate_pdf_upload("sheet.png", "application/pdf", b"%PDF-1.7").is_err());
        assert!(validate_pdf_upload("sheet", "application/pdf", b"%PDF-1.7").is_err());
        assert!(validate_pdf_upload("sheet.pdf", "image/png", b"%PDF-1.7").is_err());
        assert!(validate_pdf_upload("sheet.pdf", "application/pdf", b"\x89PNG").is_err());
    }

    #[test]
    fn score_must_be_finite_and_non_negative() {
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(-0.5).is_err());
        assert!(validate_score(f64::INFINITY).is_err());
    }
}
