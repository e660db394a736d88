pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod tracker;
pub mod types;

pub use pipeline::GenerationPipeline;
pub use scheduler::{JobScheduler, SchedulerSettings};
pub use store::{InMemoryJobStore, JobMutator, JobStore};
pub use tracker::{DEFAULT_SECONDS_PER_PERCENT, ProgressTracker, ProgressUpdate};
pub use types::{Artifact, Job, JobStatus, JobTicket, Phase, PhaseDetails, PhaseTiming};
