use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use reportgen_common::{ReportConfig, ReportError, Result, time};
use reportgen_content::{ContentRenderer, DocumentBuilder};
use tokio::{
    sync::{RwLock, mpsc, watch},
    task::{AbortHandle, JoinHandle},
};
use tracing::{debug, error, info, warn};

use crate::{
    pipeline::GenerationPipeline,
    store::JobStore,
    tracker::{DEFAULT_SECONDS_PER_PERCENT, ProgressTracker},
    types::{Job, JobStatus, JobTicket, Phase},
};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub seconds_per_percent: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            seconds_per_percent: DEFAULT_SECONDS_PER_PERCENT,
        }
    }
}

struct QueuedJob {
    id: String,
    config: ReportConfig,
}

/// Accepts submissions onto a queue and runs each job's pipeline as its own
/// supervised task. Submission never waits for generation.
#[derive(Clone)]
pub struct JobScheduler {
    store: Arc<dyn JobStore>,
    pipeline: GenerationPipeline,
    queue_tx: mpsc::UnboundedSender<QueuedJob>,
    queue_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<QueuedJob>>>>,
    tasks: Arc<RwLock<HashMap<String, AbortHandle>>>,
    running: Arc<AtomicBool>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl JobScheduler {
    pub fn new(
        store: Arc<dyn JobStore>,
        renderer: Arc<dyn ContentRenderer>,
        builder: Arc<dyn DocumentBuilder>,
        settings: SchedulerSettings,
    ) -> Self {
        let tracker = ProgressTracker::new(Arc::clone(&store), settings.seconds_per_percent);
        let pipeline = GenerationPipeline::new(tracker, renderer, builder);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            store,
            pipeline,
            queue_tx,
            queue_rx: Arc::new(Mutex::new(Some(queue_rx))),
            tasks: Arc::new(RwLock::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the dispatcher loop. Can only be called once per scheduler.
    pub fn start(&self) -> Result<JoinHandle<()>> {
        let mut queue_rx = self
            .queue_rx
            .lock()
            .map_err(|_| ReportError::InternalError("job queue lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| {
                ReportError::InternalError("job dispatcher already started".to_string())
            })?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let scheduler = self.clone();
        self.running.store(true, Ordering::SeqCst);

        Ok(tokio::spawn(async move {
            info!("job dispatcher started");
            loop {
                tokio::select! {
                    queued = queue_rx.recv() => match queued {
                        Some(job) => scheduler.dispatch(job).await,
                        None => break,
                    },
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            scheduler.running.store(false, Ordering::SeqCst);

            queue_rx.close();
            while let Ok(job) = queue_rx.try_recv() {
                if let Err(err) = scheduler
                    .pipeline
                    .tracker()
                    .fail(&job.id, "scheduler stopped before generation started")
                    .await
                {
                    warn!(job_id = %job.id, error = %err, "failed to record job failure");
                }
            }
            info!("job dispatcher stopped");
        }))
    }

    pub async fn submit(&self, config: ReportConfig) -> Result<JobTicket> {
        if *self.shutdown_tx.borrow() {
            return Err(ReportError::InternalError(
                "job scheduler is shutting down".to_string(),
            ));
        }

        let id = self.store.create(config.clone()).await?;
        self.pipeline
            .tracker()
            .advance(&id, Phase::Analyzing, 0, "Queued for generation", Some(0))
            .await?;

        if self
            .queue_tx
            .send(QueuedJob {
                id: id.clone(),
                config,
            })
            .is_err()
        {
            self.store.delete(&id).await?;
            return Err(ReportError::InternalError("job queue is closed".to_string()));
        }

        info!(job_id = %id, "report job queued");
        Ok(JobTicket { job_id: id })
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        self.store.get(id).await
    }

    pub async fn status(&self, id: &str) -> Result<JobStatus> {
        self.store
            .get(id)
            .await?
            .map(|job| job.status())
            .ok_or_else(|| ReportError::JobNotFound(id.to_string()))
    }

    pub async fn active_tasks(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Deletes the job record once `grace` has elapsed, leaving room for retried downloads.
    pub fn schedule_cleanup(&self, id: &str, grace: Duration) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            match store.delete(&id).await {
                Ok(true) => info!(job_id = %id, "downloaded job removed"),
                Ok(false) => debug!(job_id = %id, "downloaded job was already removed"),
                Err(err) => warn!(job_id = %id, error = %err, "failed to remove downloaded job"),
            }
        })
    }

    pub async fn sweep_expired(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| ReportError::InternalError(format!("invalid job ttl: {err}")))?;
        let cutoff = time::now() - ttl;

        let mut removed = 0;
        for job in self.store.list().await? {
            if job.is_terminal() && job.last_updated <= cutoff && self.store.delete(&job.id).await? {
                debug!(job_id = %job.id, phase = %job.phase, "expired job removed");
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn spawn_expiry_sweeper(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match scheduler.sweep_expired(ttl).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "expired report jobs swept"),
                    Err(err) => warn!(error = %err, "report job sweep failed"),
                }
            }
        })
    }

    /// Stops the dispatcher and aborts in-flight generation; aborted jobs end up `failed`.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let tasks = self.tasks.read().await;
        for (id, handle) in tasks.iter() {
            debug!(job_id = %id, "aborting generation task");
            handle.abort();
        }
    }

    async fn dispatch(&self, job: QueuedJob) {
        let QueuedJob { id, config } = job;
        let pipeline = self.pipeline.clone();
        let worker_id = id.clone();
        let worker = tokio::spawn(async move {
            pipeline.run(&worker_id, &config).await;
        });
        self.tasks
            .write()
            .await
            .insert(id.clone(), worker.abort_handle());
        // shutdown() may have walked the task table before this insert
        if *self.shutdown_tx.borrow() {
            worker.abort();
        }
        debug!(job_id = %id, "generation task spawned");

        let supervisor = self.clone();
        tokio::spawn(async move {
            supervisor.supervise(id, worker).await;
        });
    }

    async fn supervise(&self, id: String, worker: JoinHandle<()>) {
        if let Err(err) = worker.await {
            let reason = if err.is_panic() {
                "generation task panicked"
            } else {
                "generation task was cancelled"
            };
            error!(job_id = %id, error = %err, "{reason}");
            if let Err(fail_err) = self.pipeline.tracker().fail(&id, reason).await {
                warn!(job_id = %id, error = %fail_err, "failed to record job failure");
            }
        }
        self.tasks.write().await.remove(&id);
    }
}
