pub mod generate;
pub mod health;
pub mod jobs;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use http::{
    StatusCode,
    header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
};
use reportgen_common::{ReportConfig, ReportError, ReportRequest};
use reportgen_jobs::Artifact;

use crate::error::ApiError;

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub(crate) fn validated_config(
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<ReportConfig, ApiError> {
    let Json(request) = payload.map_err(|rejection| ReportError::InvalidField {
        field: "body".to_string(),
        reason: rejection.body_text(),
    })?;
    Ok(request.validate()?)
}

pub(crate) fn attachment_response(artifact: Artifact, filename: &str) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    let length = artifact.bytes.len().to_string();
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, artifact.content_type),
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_LENGTH, length),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// Strips characters that could break out of the quoted `Content-Disposition`
/// filename or smuggle a path. Returns `None` when nothing usable remains.
pub(crate) fn sanitize_filename(requested: &str) -> Option<String> {
    let cleaned: String = requested
        .chars()
        .filter(|ch| !matches!(ch, '"' | '\\' | '/' | ';') && !ch.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_filename;

    #[test]
    fn filename_override_is_sanitized() {
        assert_eq!(sanitize_filename("final.docx").as_deref(), Some("final.docx"));
        assert_eq!(
            sanitize_filename("my\"report\".docx").as_deref(),
            Some("myreport.docx")
        );
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("etcpasswd")
        );
        assert_eq!(
            sanitize_filename("a\r\nSet-Cookie: x.docx").as_deref(),
            Some("aSet-Cookie: x.docx")
        );
        assert_eq!(sanitize_filename("  \"/ "), None);
    }
}
