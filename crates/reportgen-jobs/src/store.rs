use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use reportgen_common::{ReportConfig, Result, time};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::Job;

pub type JobMutator = Box<dyn FnOnce(&mut Job) + Send>;

/// Keyed storage for job records. The in-memory implementation is the default;
/// an external cache can stand in as long as `update` is atomic per key.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, config: ReportConfig) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<Job>>;

    /// Returns `false` when no record exists, which is not an error: the job may
    /// already have been removed by download cleanup.
    async fn update(&self, id: &str, mutator: JobMutator) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Job>>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, config: ReportConfig) -> Result<String> {
        let mut jobs = self.jobs.write().await;
        loop {
            let id = new_job_id();
            if let Entry::Vacant(slot) = jobs.entry(id.clone()) {
                slot.insert(Job::new(id.clone(), config, time::now()));
                return Ok(id);
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    // Mutators run under the write lock, so readers see either the previous or the next record.
    async fn update(&self, id: &str, mutator: JobMutator) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            return Ok(false);
        };
        mutator(job);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.jobs.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(jobs)
    }
}

fn new_job_id() -> String {
    format!("job_{}", Uuid::new_v4().simple())
}
