//! Core types for the document Q&A service

pub mod conversation;
pub mod document;
pub mod request;
pub mod response;

pub use conversation::{Citation, Conversation, Message, MessageRole};
pub use document::{Chunk, Document, DocumentStatus, DocumentSummary};
pub use request::{AskRequest, ChatMessage, DocumentUpdateRequest};
pub use response::{AskResponse, DocumentListResponse, SourceRef};
