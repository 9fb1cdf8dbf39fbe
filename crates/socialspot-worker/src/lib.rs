// Scheduled jobs for SocialSpot
//
// The same `Jobs` value backs the worker's built-in scheduler and the API's
// job trigger endpoint.

pub mod config;
pub mod jobs;
pub mod lock;
pub mod report;
pub mod scheduler;
pub mod setup;

pub use config::WorkerConfig;
pub use jobs::{JobDependencies, JobKind, Jobs};
pub use lock::JobLease;
pub use report::{DispatchOutcome, ItemOutcome, JobResponse, RecreationOutcome};
pub use scheduler::Scheduler;
pub use setup::{dependencies_from_env, jobs_from_env};
