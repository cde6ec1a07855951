//! Background processing: job queue and ingestion workers

pub mod job_queue;
pub mod worker;

pub use job_queue::{IngestJob, JobQueue, JobState, QueueStats};
pub use worker::WorkerPool;
