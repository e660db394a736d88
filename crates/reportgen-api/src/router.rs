use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use http::header::CONTENT_DISPOSITION;
use reportgen_jobs::JobScheduler;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;

pub const DEFAULT_DOWNLOAD_GRACE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// How long a downloaded job stays retrievable before its record is dropped.
    pub download_grace: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            download_grace: DEFAULT_DOWNLOAD_GRACE,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub scheduler: JobScheduler,
    pub settings: ApiSettings,
}

pub fn api_router(scheduler: JobScheduler, settings: ApiSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]);

    Router::new()
        .route(
            "/submit",
            post(handlers::jobs::submit).options(handlers::preflight),
        )
        .route(
            "/status",
            get(handlers::jobs::status).options(handlers::preflight),
        )
        .route(
            "/download",
            get(handlers::jobs::download).options(handlers::preflight),
        )
        .route(
            "/generate",
            post(handlers::generate::generate).options(handlers::preflight),
        )
        .route("/health/live", get(handlers::health::health_live))
        .route("/health/ready", get(handlers::health::health_ready))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState {
            scheduler,
            settings,
        })
}
