use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use reportgen_common::ReportError;
use serde::Serialize;
use tracing::{debug, error};

pub struct ApiError(pub ReportError);

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<u8>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ReportError::MissingField(_)
            | ReportError::InvalidField { .. }
            | ReportError::NotReady { .. } => StatusCode::BAD_REQUEST,
            ReportError::JobNotFound(_) => StatusCode::NOT_FOUND,
            ReportError::Upstream(_)
            | ReportError::Build(_)
            | ReportError::ArtifactMissing(_)
            | ReportError::JobFailed(_)
            | ReportError::InternalError(_)
            | ReportError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.error_code(), error = %self.0, "request failed");
        } else {
            debug!(code = self.0.error_code(), error = %self.0, "request rejected");
        }

        let (phase, percentage) = match &self.0 {
            ReportError::NotReady { phase, percentage } => (Some(phase.clone()), Some(*percentage)),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.error_code(),
            phase,
            percentage,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError(err)
    }
}
