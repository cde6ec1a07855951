//! Document, chunk, and summary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Lifecycle status of a document
///
/// `pending -> queued -> processing -> completed | failed`, with an
/// operator-triggered `failed -> pending` retry transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status string, rejecting unrecognized values
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Validation(format!(
                "invalid document status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document, exclusively owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Display name (usually the uploaded filename)
    pub name: String,
    /// Declared MIME type, drives text extraction
    pub mime_type: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Lifecycle status
    pub status: DocumentStatus,
    /// Why processing failed, when status is `failed`
    pub error_message: Option<String>,
    /// Location of the raw bytes in blob storage
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new pending document for an upload
    pub fn new(
        user_id: Uuid,
        name: String,
        mime_type: String,
        size_bytes: u64,
        storage_path: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            mime_type,
            size_bytes,
            status: DocumentStatus::Pending,
            error_message: None,
            storage_path,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A chunk of extracted text with its embedding
///
/// `chunk_index` is unique and contiguous per document; adjacent indices are
/// overlapping windows of the source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document
    pub document_id: Uuid,
    /// Whitespace-normalized text content
    pub content: String,
    /// Embedding vector; dimensionality fixed by the embedding model
    pub embedding: Vec<f32>,
    /// 0-based position within the document
    pub chunk_index: u32,
}

impl Chunk {
    pub fn new(document_id: Uuid, content: String, embedding: Vec<f32>, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding,
            chunk_index,
        }
    }
}

/// Best-effort whole-document summary produced during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Model that produced the summary
    pub model: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentSummary {
    pub fn new(document_id: Uuid, model: String, summary: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            model,
            summary,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            DocumentStatus::Pending,
            DocumentStatus::Queued,
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(DocumentStatus::parse("archived").is_err());
        assert!(DocumentStatus::parse("").is_err());
    }
}
