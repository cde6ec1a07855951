//! Data store provider trait: documents, chunks with vector search,
//! conversations, messages, citations, and summaries
//!
//! This is the interface the orchestrators use against the external
//! document/vector store. Every read or mutation of owned data is scoped by
//! user id; that scoping is a mandatory invariant, not an optimization.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::conversation::{Citation, Conversation, Message};
use crate::types::document::{Chunk, Document, DocumentStatus, DocumentSummary};

/// One row returned by the nearest-neighbor search
#[derive(Debug, Clone)]
pub struct MatchedChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: u32,
    /// Cosine similarity against the query embedding
    pub similarity: f32,
}

/// Trait for the relational + vector store
///
/// Implementations:
/// - `storage::Database`: embedded sqlite with in-process cosine scoring
#[async_trait]
pub trait DataStore: Send + Sync {
    // --- documents ---

    async fn insert_document(&self, document: &Document) -> Result<()>;

    /// Fetch a document regardless of owner; only for internal pipeline use
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Fetch a document only if `user_id` owns it
    async fn get_document_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Document>>;

    /// List a user's documents, newest first, with the total count
    async fn list_documents(
        &self,
        user_id: Uuid,
        status: Option<DocumentStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Document>, usize)>;

    /// Conditionally transition a document's status. Returns false when the
    /// document is not currently in one of `from` - the compare-and-set that
    /// keeps at most one worker on a document.
    async fn try_transition_status(
        &self,
        id: Uuid,
        from: &[DocumentStatus],
        to: DocumentStatus,
    ) -> Result<bool>;

    /// Unconditionally set status and error message
    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Apply an owner-scoped mutation (rename and/or status override);
    /// returns the updated row, or None when not owned
    async fn update_document(
        &self,
        id: Uuid,
        user_id: Uuid,
        name: Option<&str>,
        status: Option<DocumentStatus>,
    ) -> Result<Option<Document>>;

    // --- chunks ---

    async fn insert_chunk(&self, chunk: &Chunk) -> Result<()>;

    /// Delete all chunks of a document; returns how many were removed
    async fn delete_chunks_for_document(&self, document_id: Uuid) -> Result<usize>;

    async fn count_chunks(&self, document_id: Uuid) -> Result<usize>;

    /// Nearest-neighbor search scoped to one document and one owner.
    /// Returns at most `count` chunks with similarity >= `threshold`,
    /// highest similarity first, ties broken by lower chunk index.
    async fn match_chunks(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<MatchedChunk>>;

    // --- summaries ---

    async fn insert_summary(&self, summary: &DocumentSummary) -> Result<()>;

    /// Most recent summary for a document, if any
    async fn latest_summary(&self, document_id: Uuid) -> Result<Option<DocumentSummary>>;

    // --- conversations, messages, citations ---

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()>;

    async fn get_conversation_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>>;

    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Messages of a conversation in creation order
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    async fn insert_citations(&self, citations: &[Citation]) -> Result<()>;

    async fn list_citations_for_message(&self, message_id: Uuid) -> Result<Vec<Citation>>;
}
