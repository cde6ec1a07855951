//! Response DTOs for the API surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Document;

/// A redacted view of one retrieved chunk backing an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_id: Uuid,
    pub chunk_id: Uuid,
    /// Truncated content preview
    pub content: String,
    /// Similarity score against the question embedding
    pub similarity: f32,
}

/// Answer to a question, with the conversation it belongs to and its sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: Uuid,
    pub sources: Vec<SourceRef>,
}

/// Owner-scoped document listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Result of an upload: the pending document, already queued for processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document: Document,
}

/// Result of a document mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpdateResponse {
    pub message: String,
    pub document: Document,
}
