//! docuchat: document Q&A with async ingestion and citation-aware answers
//!
//! Documents are uploaded, extracted, chunked, and embedded in the background;
//! questions are answered by retrieving the most similar chunks for a single
//! document and grounding an LLM response on them, with one citation per
//! retrieved chunk.

pub mod config;
pub mod error;
pub mod extract;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use types::{
    conversation::{Citation, Conversation, Message, MessageRole},
    document::{Chunk, Document, DocumentStatus, DocumentSummary},
    request::AskRequest,
    response::AskResponse,
};
