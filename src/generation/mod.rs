//! Prompt assembly for answer generation and summarization

pub mod prompt;

pub use prompt::{PromptMessage, PromptRole, SYSTEM_INSTRUCTION};
