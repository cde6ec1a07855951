//! Job queue for background document processing
//!
//! Decouples uploads from processing. The payload contract mirrors what a
//! durable external queue would carry; the in-process implementation owns the
//! parts the core is responsible for: bounded capacity, per-document state
//! tracking, and the `pending -> queued` status transition on submit.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::DataStore;
use crate::types::document::DocumentStatus;

/// Payload of one ingestion job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestJob {
    pub document_id: Uuid,
    pub user_id: Uuid,
    /// Blob storage location of the raw file
    pub file_path: String,
    pub file_name: String,
    /// Declared MIME type
    pub file_type: String,
    /// Set when this is an operator-triggered reprocessing of a failed
    /// document
    #[serde(default)]
    pub retry: bool,
}

/// Queue-visible state of one document's job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Skipped,
}

/// Progress record for one job
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub document_id: Uuid,
    pub state: JobState,
    pub attempts: u32,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Handle for submitting jobs and observing queue state
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<IngestJob>,
    jobs: Arc<DashMap<Uuid, JobProgress>>,
    store: Arc<dyn DataStore>,
    worker_count: usize,
}

impl JobQueue {
    /// Create the queue; the receiver half goes to the worker pool
    pub fn new(
        capacity: usize,
        worker_count: usize,
        store: Arc<dyn DataStore>,
    ) -> (Self, mpsc::Receiver<IngestJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = Self {
            sender,
            jobs: Arc::new(DashMap::new()),
            store,
            worker_count,
        };
        (queue, receiver)
    }

    /// Submit a job for background processing
    ///
    /// Marks the document `queued` (best-effort; the worker's own
    /// compare-and-set is what actually guards execution) and enqueues it.
    pub async fn submit(&self, job: IngestJob) -> Result<()> {
        let document_id = job.document_id;

        if let Err(e) = self
            .store
            .try_transition_status(
                document_id,
                &[DocumentStatus::Pending],
                DocumentStatus::Queued,
            )
            .await
        {
            tracing::warn!(document_id = %document_id, "failed to mark document queued: {e}");
        }

        self.jobs.insert(
            document_id,
            JobProgress {
                document_id,
                state: JobState::Queued,
                attempts: 0,
                error: None,
                updated_at: Utc::now(),
            },
        );

        self.sender
            .send(job)
            .await
            .map_err(|e| Error::Internal(format!("job queue closed: {e}")))?;

        tracing::info!(document_id = %document_id, "job enqueued");
        Ok(())
    }

    /// Record a state change for a job
    pub fn update(&self, document_id: Uuid, state: JobState, error: Option<String>) {
        if let Some(mut progress) = self.jobs.get_mut(&document_id) {
            progress.state = state;
            progress.error = error;
            progress.updated_at = Utc::now();
        }
    }

    /// Record one delivery attempt
    pub fn record_attempt(&self, document_id: Uuid) {
        if let Some(mut progress) = self.jobs.get_mut(&document_id) {
            progress.attempts += 1;
            progress.state = JobState::Processing;
            progress.updated_at = Utc::now();
        }
    }

    /// Progress for a single job
    pub fn progress(&self, document_id: Uuid) -> Option<JobProgress> {
        self.jobs.get(&document_id).map(|p| p.clone())
    }

    /// Queue statistics for the status endpoint
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            worker_count: self.worker_count,
            ..QueueStats::default()
        };
        for entry in self.jobs.iter() {
            stats.total += 1;
            match entry.state {
                JobState::Queued => stats.queued += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
                JobState::Skipped => stats.skipped += 1,
            }
        }
        stats
    }
}

/// Aggregate queue statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub worker_count: usize,
}
