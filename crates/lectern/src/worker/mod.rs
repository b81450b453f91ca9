pub mod job;
pub mod pool;

pub use job::{retry_backoff, Job, JobKind, JobOutcome, JobStatus};
pub use pool::{JobQueue, PoolConfig, WorkerPool};
