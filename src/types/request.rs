//! Request DTOs for the API surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::MessageRole;

/// One turn of prior conversation history supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// A question against a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    /// The question to answer
    #[serde(default)]
    pub question: String,
    /// Existing conversation to continue; a new one is created when absent
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    /// Prior dialogue, oldest first
    #[serde(default)]
    pub previous_messages: Vec<ChatMessage>,
    /// The document to answer from
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

/// Mutation request for a document
///
/// `retry_processing` re-enqueues a failed document; only `failed` documents
/// accept it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpdateRequest {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "retryProcessing")]
    pub retry_processing: bool,
}

/// Query parameters for listing documents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentListParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub status: Option<String>,
}
