//! Document processing pipeline
//!
//! Drives one document from raw bytes to embedded, searchable chunks:
//! download, extract, summarize (best-effort), chunk, embed, persist. Every
//! terminal failure is captured onto the document row, so upload callers can
//! poll status instead of handling errors.

use futures::future::join_all;
use std::sync::Arc;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::extract;
use crate::processing::job_queue::IngestJob;
use crate::providers::{BlobStore, DataStore, EmbeddingProvider, GenerationProvider};
use crate::types::document::{Chunk, DocumentStatus, DocumentSummary};

use super::chunker::chunk_text;

/// Result of one processing attempt
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Pipeline ran to completion; the document is `completed`
    Completed {
        chunks_persisted: usize,
        chunks_skipped: usize,
    },
    /// The document was not in a runnable state (already claimed by another
    /// worker, or its status changed since enqueueing); nothing was touched
    NotRunnable,
}

/// Ingestion orchestrator for a single document
pub struct DocumentProcessor {
    store: Arc<dyn DataStore>,
    blobs: Arc<dyn BlobStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    summarizers: Vec<Arc<dyn GenerationProvider>>,
    chunking: ChunkingConfig,
}

impl DocumentProcessor {
    pub fn new(
        store: Arc<dyn DataStore>,
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        summarizers: Vec<Arc<dyn GenerationProvider>>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            embedder,
            summarizers,
            chunking,
        }
    }

    /// Process one ingestion job
    ///
    /// Returns the causal error after persisting a terminal failure onto the
    /// document, so callers can log it; the document row is the source of
    /// truth either way.
    pub async fn process(&self, job: &IngestJob) -> Result<ProcessOutcome> {
        let document_id = job.document_id;
        tracing::info!(
            document_id = %document_id,
            file = %job.file_name,
            retry = job.retry,
            "starting document processing"
        );

        // Claim the document. A failed CAS means another worker already owns
        // it or its status changed; leave it alone. A storage error here
        // aborts the attempt without touching the document.
        let claimed = self
            .store
            .try_transition_status(
                document_id,
                &[DocumentStatus::Pending, DocumentStatus::Queued],
                DocumentStatus::Processing,
            )
            .await?;
        if !claimed {
            tracing::warn!(document_id = %document_id, "document not in a runnable state, skipping");
            return Ok(ProcessOutcome::NotRunnable);
        }

        let bytes = match self.blobs.download(&job.file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("Error downloading file: {e}");
                self.fail_document(document_id, &message).await;
                return Err(Error::Processing(message));
            }
        };

        if bytes.is_empty() {
            let message = "Downloaded file is empty".to_string();
            self.fail_document(document_id, &message).await;
            return Err(Error::Processing(message));
        }

        let text = match extract::extract_text(&bytes, &job.file_type) {
            Ok(text) => text,
            Err(e) => {
                self.fail_document(document_id, &format!("Error processing file: {e}"))
                    .await;
                return Err(e);
            }
        };

        if text.trim().is_empty() {
            let message = "Failed to extract text from document or document is empty".to_string();
            self.fail_document(document_id, &message).await;
            return Err(Error::Processing(message));
        }

        // Summaries are enrichment: collect every outcome, log the failures,
        // and move on regardless
        self.summarize_document(document_id, &text).await;

        let chunks = chunk_text(&text, self.chunking.chunk_size, self.chunking.chunk_overlap);
        if chunks.is_empty() {
            let message = "No text chunks could be created from the document".to_string();
            self.fail_document(document_id, &message).await;
            return Err(Error::Processing(message));
        }
        tracing::info!(document_id = %document_id, chunks = chunks.len(), "text chunked");

        // Clear chunks from any prior attempt so retries and duplicate
        // deliveries never accumulate duplicate rows
        let cleared = match self.store.delete_chunks_for_document(document_id).await {
            Ok(cleared) => cleared,
            Err(e) => {
                let message = format!("Error clearing previous chunks: {e}");
                self.fail_document(document_id, &message).await;
                return Err(Error::Processing(message));
            }
        };
        if cleared > 0 {
            tracing::info!(document_id = %document_id, cleared, "cleared chunks from a prior attempt");
        }

        let (persisted, skipped) = match self.embed_and_store(document_id, &chunks).await {
            Ok(counts) => counts,
            Err(e) => {
                // Quota exhaustion: continuing is guaranteed-futile
                let message =
                    "Embedding provider quota exceeded. Please try again later.".to_string();
                self.fail_document(document_id, &message).await;
                return Err(e);
            }
        };

        if persisted == 0 {
            let message = "Failed to process any chunks from the document".to_string();
            self.fail_document(document_id, &message).await;
            return Err(Error::Processing(message));
        }

        if let Err(e) = self
            .store
            .set_document_status(document_id, DocumentStatus::Completed, None)
            .await
        {
            let message = format!("Error updating document status: {e}");
            self.fail_document(document_id, &message).await;
            return Err(Error::Processing(message));
        }
        tracing::info!(
            document_id = %document_id,
            persisted,
            skipped,
            "document processing complete"
        );

        Ok(ProcessOutcome::Completed {
            chunks_persisted: persisted,
            chunks_skipped: skipped,
        })
    }

    /// Embed and persist chunks in index order
    ///
    /// Two-tier failure policy: a rate-limit error aborts the whole loop
    /// (returned as Err), any other per-chunk failure is logged and skipped.
    async fn embed_and_store(
        &self,
        document_id: uuid::Uuid,
        chunks: &[String],
    ) -> Result<(usize, usize)> {
        let mut persisted = 0usize;
        let mut skipped = 0usize;

        for (index, content) in chunks.iter().enumerate() {
            let embedding = match self.embedder.embed(content).await {
                Ok(embedding) => embedding,
                Err(e) if e.is_rate_limit() => {
                    tracing::error!(
                        document_id = %document_id,
                        chunk_index = index,
                        "quota exhausted, aborting remaining chunks"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        document_id = %document_id,
                        chunk_index = index,
                        "embedding failed, skipping chunk: {e}"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let chunk = Chunk::new(document_id, content.clone(), embedding, index as u32);
            match self.store.insert_chunk(&chunk).await {
                Ok(()) => persisted += 1,
                Err(e) => {
                    tracing::warn!(
                        document_id = %document_id,
                        chunk_index = index,
                        "chunk insert failed, skipping: {e}"
                    );
                    skipped += 1;
                }
            }
        }

        Ok((persisted, skipped))
    }

    /// Ask every configured summarizer for a whole-document summary and
    /// persist whatever succeeds. Failures never propagate into the pipeline
    /// result.
    async fn summarize_document(&self, document_id: uuid::Uuid, text: &str) {
        if self.summarizers.is_empty() {
            return;
        }

        let tasks = self.summarizers.iter().map(|summarizer| {
            let summarizer = Arc::clone(summarizer);
            async move {
                let model = summarizer.model().to_string();
                let result = summarizer.summarize(text).await;
                (model, result)
            }
        });

        for (model, result) in join_all(tasks).await {
            match result {
                Ok(summary) => {
                    let record = DocumentSummary::new(document_id, model.clone(), summary);
                    if let Err(e) = self.store.insert_summary(&record).await {
                        tracing::warn!(document_id = %document_id, model, "failed to store summary: {e}");
                    }
                }
                Err(e) => {
                    tracing::warn!(document_id = %document_id, model, "summarization failed: {e}");
                }
            }
        }
    }

    /// Record a terminal failure on the document; logging instead of failing
    /// when even that write goes wrong
    async fn fail_document(&self, document_id: uuid::Uuid, message: &str) {
        tracing::error!(document_id = %document_id, "document processing failed: {message}");
        if let Err(e) = self
            .store
            .set_document_status(document_id, DocumentStatus::Failed, Some(message))
            .await
        {
            tracing::error!(document_id = %document_id, "failed to record failure status: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::extract::MIME_TXT;
    use crate::providers::local::LocalBlobStore;
    use crate::storage::Database;
    use crate::test_support::{FakeEmbedder, FakeFailure, FakeGenerator};
    use crate::types::document::Document;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<Database>,
        blobs: Arc<LocalBlobStore>,
        _dir: tempfile::TempDir,
        document: Document,
        job: IngestJob,
    }

    async fn fixture(file_body: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Database::open_in_memory().unwrap());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()).unwrap());

        let user_id = Uuid::new_v4();
        let path = format!("{user_id}/notes.txt");
        blobs.upload(&path, file_body).await.unwrap();

        let document = Document::new(
            user_id,
            "notes.txt".to_string(),
            MIME_TXT.to_string(),
            file_body.len() as u64,
            path.clone(),
        );
        store.insert_document(&document).await.unwrap();

        let job = IngestJob {
            document_id: document.id,
            user_id,
            file_path: path,
            file_name: "notes.txt".to_string(),
            file_type: MIME_TXT.to_string(),
            retry: false,
        };

        Fixture {
            store,
            blobs,
            _dir: dir,
            document,
            job,
        }
    }

    fn processor(
        fx: &Fixture,
        embedder: FakeEmbedder,
        summarizers: Vec<Arc<dyn GenerationProvider>>,
        chunking: ChunkingConfig,
    ) -> DocumentProcessor {
        DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            Arc::new(embedder),
            summarizers,
            chunking,
        )
    }

    /// Text that chunks into exactly five pieces under the given config
    fn five_chunk_text(chunking: &ChunkingConfig) -> String {
        let text = (0..60)
            .map(|i| format!("word{i:03}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, chunking.chunk_size, chunking.chunk_overlap);
        assert_eq!(chunks.len(), 5, "fixture text must produce 5 chunks");
        text
    }

    fn small_chunking() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 120,
            chunk_overlap: 20,
        }
    }

    #[tokio::test]
    async fn successful_ingestion_completes_document() {
        let fx = fixture(b"A short document about refund policies.").await;
        let p = processor(&fx, FakeEmbedder::new(4), vec![], ChunkingConfig::default());

        let outcome = p.process(&fx.job).await.unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Completed {
                chunks_persisted: 1,
                chunks_skipped: 0
            }
        );

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.error_message, None);
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn quota_error_hard_stops_the_loop() {
        let chunking = small_chunking();
        let fx = fixture(five_chunk_text(&chunking).as_bytes()).await;
        let embedder = FakeEmbedder::new(4).fail_call(2, FakeFailure::RateLimited);
        let p = DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            Arc::new(embedder),
            vec![],
            chunking,
        );

        let err = p.process(&fx.job).await.unwrap_err();
        assert!(err.is_rate_limit());

        // Exactly chunks 0 and 1 persisted; 2-4 never attempted
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 2);
        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.error_message.unwrap().contains("quota"));
    }

    #[tokio::test]
    async fn quota_stop_does_not_attempt_later_chunks() {
        let chunking = small_chunking();
        let fx = fixture(five_chunk_text(&chunking).as_bytes()).await;
        let embedder = Arc::new(FakeEmbedder::new(4).fail_call(2, FakeFailure::RateLimited));
        let p = DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            embedder.clone(),
            vec![],
            chunking,
        );

        let _ = p.process(&fx.job).await;

        // 3 calls total: 0, 1, and the failing 2; chunks 3-4 never attempted
        assert_eq!(embedder.call_count(), 3);
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn transient_error_soft_skips_one_chunk() {
        let chunking = small_chunking();
        let fx = fixture(five_chunk_text(&chunking).as_bytes()).await;
        let embedder = FakeEmbedder::new(4).fail_call(2, FakeFailure::Transient);
        let p = DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            Arc::new(embedder),
            vec![],
            chunking,
        );

        let outcome = p.process(&fx.job).await.unwrap();
        assert_eq!(
            outcome,
            ProcessOutcome::Completed {
                chunks_persisted: 4,
                chunks_skipped: 1
            }
        );

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn all_chunks_failing_fails_the_document() {
        let fx = fixture(b"Only one chunk here.").await;
        let embedder = FakeEmbedder::new(4).fail_call(0, FakeFailure::Transient);
        let p = processor(&fx, embedder, vec![], ChunkingConfig::default());

        let err = p.process(&fx.job).await.unwrap_err();
        assert!(matches!(err, Error::Processing(_)));

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc
            .error_message
            .unwrap()
            .contains("Failed to process any chunks"));
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_terminal() {
        let fx = fixture(b"   \n\t   ").await;
        let p = processor(&fx, FakeEmbedder::new(4), vec![], ChunkingConfig::default());

        let err = p.process(&fx.job).await.unwrap_err();
        assert!(matches!(err, Error::Processing(_)));

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.error_message.unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn missing_blob_is_terminal() {
        let mut fx = fixture(b"content").await;
        fx.job.file_path = "does/not/exist.txt".to_string();
        let p = processor(&fx, FakeEmbedder::new(4), vec![], ChunkingConfig::default());

        let err = p.process(&fx.job).await.unwrap_err();
        assert!(matches!(err, Error::Processing(_)));

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.error_message.unwrap().contains("downloading"));
    }

    #[tokio::test]
    async fn unsupported_mime_is_terminal() {
        let mut fx = fixture(b"content").await;
        fx.job.file_type = "application/msword".to_string();
        let p = processor(&fx, FakeEmbedder::new(4), vec![], ChunkingConfig::default());

        let err = p.process(&fx.job).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
    }

    #[tokio::test]
    async fn already_claimed_document_is_not_runnable() {
        let fx = fixture(b"content").await;
        fx.store
            .set_document_status(fx.document.id, DocumentStatus::Processing, None)
            .await
            .unwrap();
        let p = processor(&fx, FakeEmbedder::new(4), vec![], ChunkingConfig::default());

        let outcome = p.process(&fx.job).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::NotRunnable);

        // untouched
        let doc = fx.store.get_document(fx.document.id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn summarizer_failure_never_blocks_ingestion() {
        let fx = fixture(b"A document worth summarizing.").await;
        let failing: Arc<dyn GenerationProvider> = Arc::new(
            FakeGenerator::new("unused")
                .with_model("broken-model")
                .failing_summarize(FakeFailure::Unavailable),
        );
        let working: Arc<dyn GenerationProvider> =
            Arc::new(FakeGenerator::new("unused").with_model("good-model"));
        let p = processor(
            &fx,
            FakeEmbedder::new(4),
            vec![failing, working],
            ChunkingConfig::default(),
        );

        let outcome = p.process(&fx.job).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Completed { .. }));

        // Only the working model's summary landed
        let summary = fx.store.latest_summary(fx.document.id).await.unwrap().unwrap();
        assert_eq!(summary.model, "good-model");
        assert_eq!(summary.summary, "summary from good-model");
    }

    #[tokio::test]
    async fn retry_clears_prior_chunks_instead_of_duplicating() {
        let chunking = small_chunking();
        let text = five_chunk_text(&chunking);
        let fx = fixture(text.as_bytes()).await;

        let p = DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            Arc::new(FakeEmbedder::new(4)),
            vec![],
            chunking.clone(),
        );
        p.process(&fx.job).await.unwrap();
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 5);

        // Operator retry: failed -> pending -> reprocess from scratch
        fx.store
            .set_document_status(fx.document.id, DocumentStatus::Pending, None)
            .await
            .unwrap();
        let retry_job = IngestJob {
            retry: true,
            ..fx.job.clone()
        };
        let p2 = DocumentProcessor::new(
            fx.store.clone(),
            fx.blobs.clone(),
            Arc::new(FakeEmbedder::new(4)),
            vec![],
            chunking,
        );
        p2.process(&retry_job).await.unwrap();

        // Same count as a fresh run; no duplicate rows
        assert_eq!(fx.store.count_chunks(fx.document.id).await.unwrap(), 5);

        // Index invariant: exactly 0..n-1, no gaps. All embeddings are
        // identical here, so equal similarities also exercise the
        // lower-index-first tie-break.
        let matches = fx
            .store
            .match_chunks(fx.document.id, fx.job.user_id, &[1.0, 0.0, 0.0, 0.0], 0.0, 10)
            .await
            .unwrap();
        let indexes: Vec<u32> = matches.iter().map(|m| m.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    }
}
