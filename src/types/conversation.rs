//! Conversation, message, and citation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A chat conversation owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Derived from the first question
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(Error::Validation(format!("invalid message role: {other}"))),
        }
    }
}

/// A single message within a conversation
///
/// Creation order reconstructs the dialogue: the user message is always
/// persisted before the assistant message that answers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: Uuid, role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Links an assistant message to a chunk that informed it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub id: Uuid,
    pub message_id: Uuid,
    pub document_id: Uuid,
    pub chunk_id: Uuid,
    /// Character span into the cited chunk's content; the full chunk span in
    /// the current implementation
    pub start_char: usize,
    pub end_char: usize,
}

impl Citation {
    /// Cite the full span of a chunk from an assistant message
    pub fn full_chunk(
        message_id: Uuid,
        document_id: Uuid,
        chunk_id: Uuid,
        content_len: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id,
            document_id,
            chunk_id,
            start_char: 0,
            end_char: content_len,
        }
    }
}
