use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Job not found: {0}")]
    JobNotFound(String),
    #[error("Report is not ready yet: phase={phase}, percentage={percentage}")]
    NotReady { phase: String, percentage: u8 },
    #[error("content generation failed: {0}")]
    Upstream(String),
    #[error("document build failed: {0}")]
    Build(String),
    #[error("completed job has no artifact: {0}")]
    ArtifactMissing(String),
    #[error("{0}")]
    JobFailed(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MissingField",
            Self::InvalidField { .. } => "InvalidField",
            Self::JobNotFound(_) => "JobNotFound",
            Self::NotReady { .. } => "NotReady",
            Self::Upstream(_) => "UpstreamError",
            Self::Build(_) => "BuildError",
            Self::ArtifactMissing(_) => "ArtifactMissing",
            Self::JobFailed(_) => "JobFailed",
            Self::InternalError(_) => "InternalError",
            Self::Io(_) => "InternalError",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::InvalidField { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
