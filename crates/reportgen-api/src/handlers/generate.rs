use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use reportgen_common::{ReportError, ReportRequest};
use reportgen_jobs::{InMemoryJobStore, JobStore, Phase};
use tracing::info;

use super::{attachment_response, validated_config};
use crate::{error::ApiResult, router::ApiState};

/// One-shot generation: runs the pipeline inline against a private store and
/// answers with the document itself. Nothing is left behind in the shared store.
pub async fn generate(
    State(state): State<ApiState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let config = validated_config(payload)?;

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let pipeline = state.scheduler.pipeline();
    let pipeline = pipeline.with_tracker(pipeline.tracker().with_store(Arc::clone(&store)));

    let id = store.create(config.clone()).await?;
    pipeline.run(&id, &config).await;

    let job = store
        .get(&id)
        .await?
        .ok_or_else(|| ReportError::JobNotFound(id.clone()))?;
    match job.phase {
        Phase::Completed => {
            let artifact = job
                .artifact
                .ok_or_else(|| ReportError::ArtifactMissing(id.clone()))?;
            info!(
                filename = %artifact.filename,
                words = job.words_generated,
                "report generated inline"
            );
            let filename = artifact.filename.clone();
            Ok(attachment_response(artifact, &filename))
        }
        _ => Err(ReportError::JobFailed(
            job.error
                .unwrap_or_else(|| format!("generation stopped in phase {}", job.phase)),
        )
        .into()),
    }
}
