use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::Response,
};
use reportgen_common::{ReportError, ReportRequest};
use reportgen_jobs::{JobStatus, Phase};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{attachment_response, sanitize_filename, validated_config};
use crate::{error::ApiResult, router::ApiState};

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    id: Option<String>,
    filename: Option<String>,
}

impl JobQuery {
    fn job_id(&self) -> Result<&str, ReportError> {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ReportError::MissingField("id".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub status_url: String,
}

pub async fn submit(
    State(state): State<ApiState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let config = validated_config(payload)?;
    let ticket = state.scheduler.submit(config).await?;
    let status_url = format!("/status?id={}", ticket.job_id);

    Ok(Json(SubmitResponse {
        job_id: ticket.job_id,
        status_url,
    }))
}

pub async fn status(
    State(state): State<ApiState>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Json<JobStatus>> {
    let id = query.job_id()?;
    Ok(Json(state.scheduler.status(id).await?))
}

pub async fn download(
    State(state): State<ApiState>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Response> {
    let id = query.job_id()?;
    let job = state
        .scheduler
        .get_job(id)
        .await?
        .ok_or_else(|| ReportError::JobNotFound(id.to_string()))?;

    // Failed jobs answer exactly like unfinished ones.
    if job.phase != Phase::Completed {
        return Err(ReportError::NotReady {
            phase: job.phase.to_string(),
            percentage: job.percentage,
        }
        .into());
    }
    let artifact = job
        .artifact
        .ok_or_else(|| ReportError::ArtifactMissing(id.to_string()))?;

    let filename = query
        .filename
        .as_deref()
        .and_then(sanitize_filename)
        .unwrap_or_else(|| artifact.filename.clone());
    info!(job_id = %id, filename = %filename, size = artifact.bytes.len(), "serving report download");

    let response = attachment_response(artifact, &filename);
    state
        .scheduler
        .schedule_cleanup(id, state.settings.download_grace);
    Ok(response)
}
