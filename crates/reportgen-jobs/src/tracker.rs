use std::sync::Arc;

use chrono::{DateTime, Utc};
use reportgen_common::{Result, time};
use tracing::{debug, warn};

use crate::{
    store::JobStore,
    types::{Artifact, Job, Phase, PhaseDetails},
};

pub const DEFAULT_SECONDS_PER_PERCENT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub percentage: i32,
    pub label: String,
    pub words_generated: Option<u64>,
}

/// Owns the rules for moving a job's visible progress. The pipeline only states
/// where it is; clamping, monotonicity, ETA and phase bookkeeping happen here.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn JobStore>,
    seconds_per_percent: f64,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn JobStore>, seconds_per_percent: f64) -> Self {
        Self {
            store,
            seconds_per_percent: seconds_per_percent.max(0.0),
        }
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        Arc::clone(&self.store)
    }

    /// Same progress rules, writing to a different store.
    pub fn with_store(&self, store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            seconds_per_percent: self.seconds_per_percent,
        }
    }

    pub fn seconds_per_percent(&self) -> f64 {
        self.seconds_per_percent
    }

    pub async fn advance(
        &self,
        id: &str,
        phase: Phase,
        percentage: i32,
        label: impl Into<String>,
        words_generated: Option<u64>,
    ) -> Result<()> {
        let update = ProgressUpdate {
            phase,
            percentage,
            label: label.into(),
            words_generated,
        };
        let seconds_per_percent = self.seconds_per_percent;
        self.store
            .update(
                id,
                Box::new(move |job| apply_progress(job, update, time::now(), seconds_per_percent)),
            )
            .await?;
        Ok(())
    }

    pub async fn complete(&self, id: &str, artifact: Artifact) -> Result<()> {
        self.store
            .update(
                id,
                Box::new(move |job| apply_completion(job, artifact, time::now())),
            )
            .await?;
        Ok(())
    }

    pub async fn fail(&self, id: &str, error: impl Into<String>) -> Result<()> {
        let error = error.into();
        self.store
            .update(id, Box::new(move |job| apply_failure(job, error, time::now())))
            .await?;
        Ok(())
    }
}

pub fn apply_progress(
    job: &mut Job,
    update: ProgressUpdate,
    now: DateTime<Utc>,
    seconds_per_percent: f64,
) {
    if job.is_terminal() {
        debug!(job_id = %job.id, phase = %job.phase, "ignoring progress for terminal job");
        return;
    }
    if update.phase.is_terminal() {
        warn!(
            job_id = %job.id,
            phase = %update.phase,
            "terminal phases are set by complete/fail only"
        );
        return;
    }
    if update.phase.rank() < job.phase.rank() {
        warn!(
            job_id = %job.id,
            current = %job.phase,
            requested = %update.phase,
            "ignoring phase regression"
        );
        return;
    }

    let percentage = update.percentage.clamp(0, 100) as u8;
    job.phase = update.phase;
    job.percentage = job.percentage.max(percentage);
    job.current_label = update.label;
    if let Some(words) = update.words_generated {
        job.words_generated = job.words_generated.max(words);
    }
    job.estimated_seconds_remaining = estimate_remaining(job.percentage, seconds_per_percent);
    stamp_phase_details(&mut job.phase_details, job.phase, job.percentage, now);
    job.last_updated = now;
}

pub fn apply_completion(job: &mut Job, artifact: Artifact, now: DateTime<Utc>) {
    if job.is_terminal() {
        debug!(job_id = %job.id, phase = %job.phase, "ignoring completion for terminal job");
        return;
    }

    job.phase = Phase::Completed;
    job.percentage = 100;
    job.current_label = "Report ready for download".to_string();
    job.estimated_seconds_remaining = 0;
    job.artifact = Some(artifact);
    stamp_phase_details(&mut job.phase_details, Phase::Formatting, 100, now);
    job.last_updated = now;
}

pub fn apply_failure(job: &mut Job, error: String, now: DateTime<Utc>) {
    if job.is_terminal() {
        debug!(job_id = %job.id, phase = %job.phase, "ignoring failure for terminal job");
        return;
    }

    job.phase = Phase::Failed;
    job.current_label = "Report generation failed".to_string();
    job.estimated_seconds_remaining = 0;
    job.error = Some(error);
    job.last_updated = now;
}

pub fn estimate_remaining(percentage: u8, seconds_per_percent: f64) -> u64 {
    let remaining = 100u8.saturating_sub(percentage) as f64;
    (remaining * seconds_per_percent).round() as u64
}

fn stamp_phase_details(
    details: &mut PhaseDetails,
    current: Phase,
    percentage: u8,
    now: DateTime<Utc>,
) {
    if let Some(timing) = details.get_mut(current) {
        timing.started_at.get_or_insert(now);
    }

    for phase in Phase::WORKING {
        let Some(threshold) = phase.completion_threshold() else {
            continue;
        };
        if percentage < threshold {
            continue;
        }

        if let Some(timing) = details.get_mut(phase)
            && !timing.completed
        {
            timing.completed = true;
            timing.started_at.get_or_insert(now);
            timing.completed_at = Some(now);
        } else {
            continue;
        }

        if let Some(next) = phase.next_working()
            && let Some(timing) = details.get_mut(next)
        {
            timing.started_at.get_or_insert(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use chrono::Utc;

    use super::{
        ProgressTracker, ProgressUpdate, apply_completion, apply_failure, apply_progress,
        estimate_remaining,
    };
    use crate::{
        store::{InMemoryJobStore, JobStore, tests::sample_config},
        types::{Artifact, Job, Phase},
    };

    fn job() -> Job {
        Job::new("job_test".to_string(), sample_config(), Utc::now())
    }

    fn update(phase: Phase, percentage: i32) -> ProgressUpdate {
        ProgressUpdate {
            phase,
            percentage,
            label: format!("{phase} {percentage}"),
            words_generated: None,
        }
    }

    fn artifact() -> Artifact {
        Artifact {
            filename: "T_Project_Report.docx".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: Bytes::from_static(b"PK\x03\x04"),
        }
    }

    #[test]
    fn percentage_is_clamped() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Analyzing, -20), Utc::now(), 1.0);
        assert_eq!(job.percentage, 0);
        apply_progress(&mut job, update(Phase::Formatting, 250), Utc::now(), 1.0);
        assert_eq!(job.percentage, 100);
    }

    #[test]
    fn percentage_and_words_never_decrease() {
        let mut job = job();
        let mut forward = update(Phase::Generating, 60);
        forward.words_generated = Some(500);
        apply_progress(&mut job, forward, Utc::now(), 1.0);

        let mut backward = update(Phase::Generating, 40);
        backward.words_generated = Some(100);
        apply_progress(&mut job, backward, Utc::now(), 1.0);

        assert_eq!(job.percentage, 60);
        assert_eq!(job.words_generated, 500);
        assert_eq!(job.current_label, "generating 40");
    }

    #[test]
    fn phase_regression_is_ignored() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Generating, 50), Utc::now(), 1.0);
        apply_progress(&mut job, update(Phase::Planning, 55), Utc::now(), 1.0);
        assert_eq!(job.phase, Phase::Generating);
        assert_eq!(job.percentage, 50);
    }

    #[test]
    fn eta_decreases_with_progress() {
        assert_eq!(estimate_remaining(0, 0.5), 50);
        assert_eq!(estimate_remaining(90, 0.5), 5);
        assert_eq!(estimate_remaining(100, 0.5), 0);

        let mut job = job();
        apply_progress(&mut job, update(Phase::Analyzing, 10), Utc::now(), 2.0);
        let early = job.estimated_seconds_remaining;
        apply_progress(&mut job, update(Phase::Generating, 50), Utc::now(), 2.0);
        assert!(job.estimated_seconds_remaining < early);
    }

    #[test]
    fn thresholds_complete_phases_and_start_the_next() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Analyzing, 14), Utc::now(), 1.0);
        assert!(!job.phase_details.analyzing.completed);

        apply_progress(&mut job, update(Phase::Analyzing, 15), Utc::now(), 1.0);
        assert!(job.phase_details.analyzing.completed);
        assert!(job.phase_details.analyzing.completed_at.is_some());
        assert!(job.phase_details.planning.started_at.is_some());
        assert!(!job.phase_details.planning.completed);

        apply_progress(&mut job, update(Phase::Generating, 90), Utc::now(), 1.0);
        assert!(job.phase_details.planning.completed);
        assert!(job.phase_details.generating.completed);
        assert!(job.phase_details.formatting.started_at.is_some());
        assert!(!job.phase_details.formatting.completed);
    }

    #[test]
    fn completion_sets_artifact_and_full_progress() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Formatting, 95), Utc::now(), 1.0);
        apply_completion(&mut job, artifact(), Utc::now());

        assert_eq!(job.phase, Phase::Completed);
        assert_eq!(job.percentage, 100);
        assert_eq!(job.estimated_seconds_remaining, 0);
        assert!(job.artifact.is_some());
        assert!(job.phase_details.formatting.completed);
    }

    #[test]
    fn terminal_jobs_are_frozen() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Generating, 40), Utc::now(), 1.0);
        apply_failure(&mut job, "builder exploded".to_string(), Utc::now());
        apply_failure(&mut job, "second error".to_string(), Utc::now());
        apply_progress(&mut job, update(Phase::Formatting, 99), Utc::now(), 1.0);
        apply_completion(&mut job, artifact(), Utc::now());

        assert_eq!(job.phase, Phase::Failed);
        assert_eq!(job.percentage, 40);
        assert_eq!(job.error.as_deref(), Some("builder exploded"));
        assert!(job.artifact.is_none());
    }

    #[test]
    fn terminal_phase_through_advance_is_rejected() {
        let mut job = job();
        apply_progress(&mut job, update(Phase::Completed, 100), Utc::now(), 1.0);
        assert_eq!(job.phase, Phase::Analyzing);
        assert_eq!(job.percentage, 0);
    }

    #[tokio::test]
    async fn tracker_writes_through_the_store() {
        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let tracker = ProgressTracker::new(Arc::clone(&store), 1.0);
        let id = store.create(sample_config()).await.unwrap();

        tracker
            .advance(&id, Phase::Planning, 20, "Planning", Some(0))
            .await
            .unwrap();
        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.phase, Phase::Planning);
        assert_eq!(job.estimated_seconds_remaining, 80);

        tracker.complete(&id, artifact()).await.unwrap();
        let status = store.get(&id).await.unwrap().unwrap().status();
        assert!(status.is_complete);
        assert_eq!(status.filename.as_deref(), Some("T_Project_Report.docx"));

        tracker.advance("job_gone", Phase::Planning, 20, "noop", None).await.unwrap();
    }

    #[tokio::test]
    async fn rebound_tracker_keeps_eta_rate() {
        let shared: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let tracker = ProgressTracker::new(shared, 2.0);

        let private: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let rebound = tracker.with_store(Arc::clone(&private));
        assert_eq!(rebound.seconds_per_percent(), 2.0);

        let id = private.create(sample_config()).await.unwrap();
        rebound
            .advance(&id, Phase::Generating, 50, "Writing", Some(10))
            .await
            .unwrap();
        let job = private.get(&id).await.unwrap().unwrap();
        assert_eq!(job.estimated_seconds_remaining, 100);
    }
}
