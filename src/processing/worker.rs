//! Ingestion worker pool
//!
//! Consumes jobs from the queue with bounded concurrency. Each job runs under
//! a hard timeout so a hung extraction or provider call can never pin a
//! worker slot indefinitely.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

use crate::config::QueueConfig;
use crate::error::Error;
use crate::ingestion::{DocumentProcessor, ProcessOutcome};
use crate::providers::DataStore;
use crate::types::document::DocumentStatus;

use super::job_queue::{IngestJob, JobQueue, JobState};

/// Bounded worker pool draining the ingestion queue
pub struct WorkerPool {
    processor: Arc<DocumentProcessor>,
    store: Arc<dyn DataStore>,
    queue: JobQueue,
    config: QueueConfig,
}

impl WorkerPool {
    pub fn new(
        processor: Arc<DocumentProcessor>,
        store: Arc<dyn DataStore>,
        queue: JobQueue,
        config: QueueConfig,
    ) -> Self {
        Self {
            processor,
            store,
            queue,
            config,
        }
    }

    /// Drain the queue until the sender side closes
    ///
    /// Jobs for different documents run in parallel up to the worker count;
    /// a job never shares its document with another in-flight job because
    /// the processor's status compare-and-set rejects double claims.
    pub async fn run(self, mut receiver: mpsc::Receiver<IngestJob>) {
        let workers = self.config.workers.max(1).min(num_cpus::get().max(1) * 2);
        tracing::info!(workers, "ingestion worker pool started");

        let semaphore = Arc::new(Semaphore::new(workers));
        let pool = Arc::new(self);

        while let Some(job) = receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.run_job(job).await;
                drop(permit);
            });
        }

        tracing::info!("ingestion worker pool stopped");
    }

    /// Run one job with bounded delivery attempts and a per-attempt timeout
    async fn run_job(&self, job: IngestJob) {
        let document_id = job.document_id;
        let attempts = self.config.attempts.max(1);
        let document_timeout = Duration::from_secs(self.config.document_timeout_secs);

        for attempt in 0..attempts {
            self.queue.record_attempt(document_id);

            match timeout(document_timeout, self.processor.process(&job)).await {
                Ok(Ok(ProcessOutcome::Completed {
                    chunks_persisted,
                    chunks_skipped,
                })) => {
                    tracing::info!(
                        document_id = %document_id,
                        chunks_persisted,
                        chunks_skipped,
                        "job completed"
                    );
                    self.queue.update(document_id, JobState::Completed, None);
                    return;
                }
                Ok(Ok(ProcessOutcome::NotRunnable)) => {
                    self.queue.update(document_id, JobState::Skipped, None);
                    return;
                }
                Ok(Err(e)) if is_delivery_retriable(&e) && attempt + 1 < attempts => {
                    let delay = self.config.backoff_ms * 2u64.pow(attempt);
                    tracing::warn!(
                        document_id = %document_id,
                        attempt = attempt + 1,
                        delay_ms = delay,
                        "delivery failed, backing off: {e}"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Ok(Err(e)) => {
                    // Application-level failure: already recorded on the
                    // document row by the processor
                    tracing::error!(document_id = %document_id, "job failed: {e}");
                    self.queue
                        .update(document_id, JobState::Failed, Some(e.to_string()));
                    return;
                }
                Err(_) => {
                    let message = format!(
                        "Processing timeout after {}s",
                        self.config.document_timeout_secs
                    );
                    tracing::error!(document_id = %document_id, "{message}");
                    if let Err(e) = self
                        .store
                        .set_document_status(document_id, DocumentStatus::Failed, Some(&message))
                        .await
                    {
                        tracing::error!(document_id = %document_id, "failed to record timeout: {e}");
                    }
                    self.queue
                        .update(document_id, JobState::Failed, Some(message));
                    return;
                }
            }
        }

        let message = "job delivery gave up after repeated storage failures".to_string();
        tracing::error!(document_id = %document_id, "{message}");
        self.queue
            .update(document_id, JobState::Failed, Some(message));
    }
}

/// Whether a processing error is a queue-delivery problem worth redelivering
///
/// Only storage hiccups qualify: the pipeline has not claimed the document
/// yet (a failed claim is `NotRunnable`, not an error), so a fresh attempt is
/// safe. Everything else is an application outcome already recorded on the
/// document.
fn is_delivery_retriable(e: &Error) -> bool {
    matches!(e, Error::Storage(_))
}
