//! Shared application state

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::ingestion::DocumentProcessor;
use crate::processing::{JobQueue, WorkerPool};
use crate::providers::{self, BlobStore, DataStore};
use crate::providers::local::LocalBlobStore;
use crate::retrieval::AnswerPipeline;
use crate::storage::Database;

use super::auth::{BearerIdentity, IdentityProvider};

/// Shared application state, cheap to clone
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn DataStore>,
    blobs: Arc<dyn BlobStore>,
    queue: JobQueue,
    answers: AnswerPipeline,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wire up the full service: storage, providers, pipelines, and the
    /// background worker pool
    pub async fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("initializing application state");

        let store: Arc<dyn DataStore> =
            Arc::new(Database::open(&config.storage.database_path)?);
        let blobs: Arc<dyn BlobStore> =
            Arc::new(LocalBlobStore::new(config.storage.blob_dir.clone())?);
        tracing::info!(db = %config.storage.database_path.display(), "storage initialized");

        let provider_set = providers::build_providers(&config.provider)?;
        tracing::info!(
            embedder = provider_set.embedder.name(),
            generator = provider_set.generator.name(),
            summarizers = provider_set.summarizers.len(),
            "providers initialized"
        );

        let processor = Arc::new(DocumentProcessor::new(
            store.clone(),
            blobs.clone(),
            provider_set.embedder.clone(),
            provider_set.summarizers,
            config.chunking.clone(),
        ));

        let answers = AnswerPipeline::new(
            store.clone(),
            provider_set.embedder,
            provider_set.generator,
            config.retrieval.clone(),
        );

        let (queue, receiver) =
            JobQueue::new(config.queue.capacity, config.queue.workers, store.clone());
        let pool = WorkerPool::new(
            processor,
            store.clone(),
            queue.clone(),
            config.queue.clone(),
        );
        tokio::spawn(pool.run(receiver));
        tracing::info!(workers = config.queue.workers, "worker pool spawned");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                blobs,
                queue,
                answers,
                identity: Arc::new(BearerIdentity),
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.inner.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.inner.blobs
    }

    pub fn queue(&self) -> &JobQueue {
        &self.inner.queue
    }

    pub fn answers(&self) -> &AnswerPipeline {
        &self.inner.answers
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }
}
