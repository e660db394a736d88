use std::{sync::Arc, time::Duration};

use clap::Parser;
use reportgen_api::{ApiSettings, api_router};
use reportgen_content::{
    ContentRenderer, DocxBuilder, FallbackRenderer, GenerativeRenderer, GeneratorConfig,
};
use reportgen_jobs::{InMemoryJobStore, JobScheduler, JobStore, SchedulerSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "reportgen", about = "Academic report generation service")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "8080")]
    port: u16,

    /// Per-call timeout for the generative backend before template text is used.
    #[arg(long, default_value_t = 8)]
    render_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    download_grace_secs: u64,

    /// Finished jobs that were never downloaded are dropped after this long.
    #[arg(long, default_value_t = 3600)]
    job_ttl_secs: u64,

    #[arg(long, default_value_t = 0.5)]
    seconds_per_percent: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("reportgen=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    let renderer: Arc<dyn ContentRenderer> = match GeneratorConfig::from_env() {
        Some(config) => {
            info!(
                endpoint = %config.endpoint,
                model = %config.model,
                "generative backend enabled"
            );
            let primary: Arc<dyn ContentRenderer> = Arc::new(GenerativeRenderer::new(config)?);
            Arc::new(FallbackRenderer::new(
                primary,
                Duration::from_secs(cli.render_timeout_secs),
            ))
        }
        None => {
            warn!("REPORTGEN_LLM_API_KEY not set, reports will use template content only");
            Arc::new(FallbackRenderer::templates_only())
        }
    };

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let scheduler = JobScheduler::new(
        store,
        renderer,
        Arc::new(DocxBuilder::new()),
        SchedulerSettings {
            seconds_per_percent: cli.seconds_per_percent,
        },
    );
    let dispatcher = scheduler.start()?;

    let sweeper =
        scheduler.spawn_expiry_sweeper(Duration::from_secs(cli.job_ttl_secs), SWEEP_INTERVAL);
    info!(ttl_secs = cli.job_ttl_secs, "expired job sweeper enabled");

    let app = api_router(
        scheduler.clone(),
        ApiSettings {
            download_grace: Duration::from_secs(cli.download_grace_secs),
        },
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("reportgen server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down job scheduler");
    scheduler.shutdown().await;
    sweeper.abort();
    if let Err(err) = dispatcher.await {
        warn!(error = %err, "job dispatcher exited abnormally");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
