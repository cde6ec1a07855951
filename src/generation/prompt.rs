//! Prompt templates and message assembly
//!
//! The system instruction is part of the observable behavior contract: it
//! controls how the assistant balances document context against general
//! knowledge, and tests assert its presence verbatim in assembled prompts.

use serde::{Deserialize, Serialize};

use crate::providers::data_store::MatchedChunk;
use crate::types::request::ChatMessage;

/// Fixed system instruction for every answer request
pub const SYSTEM_INSTRUCTION: &str = r#"You are a knowledgeable assistant with two main capabilities:
1. Answer questions about the document content using the provided document context
2. Enhance your answers with relevant external knowledge when appropriate

When answering questions:
1. First, use the information from the provided document context
2. If the document context is insufficient or you can provide additional valuable insights:
   - Add relevant external knowledge to complement the document content
   - Clearly distinguish between document content and external information
   - Cite sources when possible
3. If the document context doesn't contain relevant information:
   - Provide a general answer based on your knowledge
   - Explain that the information is not from the document
   - Offer to elaborate further if needed

For document improvement requests:
- Analyze the current content
- Provide specific, actionable suggestions
- Include examples and best practices from your knowledge
- Focus on making the document more effective and comprehensive

Remember to:
- Be clear about which information comes from the document vs. external sources
- Maintain accuracy and relevance
- Provide comprehensive but concise answers
- Use a helpful and professional tone"#;

/// Instruction prepended to a document when asking a model for a summary
pub const SUMMARY_INSTRUCTION: &str = "You are a document processing assistant. Your task is to understand and summarize the following document. This will be used to provide context for future conversations. Here's the document:\n\n";

/// Role of a message in an assembled prompt
///
/// Distinct from `MessageRole`: stored dialogue only has user/assistant
/// turns, while prompts also carry system instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl PromptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of an assembled prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Build the context block from retrieved chunks, each tagged with a 1-based
/// ordinal for citation mapping. Empty input yields an empty string; the
/// answer pipeline still generates in that case.
pub fn build_context_block(chunks: &[MatchedChunk]) -> String {
    if chunks.is_empty() {
        return String::new();
    }
    let body = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Document Context:\n\n{body}")
}

/// Assemble the prompt: system instruction, prior messages oldest first, then
/// the current question
pub fn build_messages(question: &str, previous: &[ChatMessage]) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(previous.len() + 2);
    messages.push(PromptMessage::system(SYSTEM_INSTRUCTION));
    for msg in previous {
        messages.push(PromptMessage {
            role: match msg.role {
                crate::types::MessageRole::User => PromptRole::User,
                crate::types::MessageRole::Assistant => PromptRole::Assistant,
            },
            content: msg.content.clone(),
        });
    }
    messages.push(PromptMessage::user(question));
    messages
}

/// Build the context-bearing system message a provider prepends to the prompt
pub fn context_system_message(context: &str, summary: Option<&str>) -> String {
    if context.is_empty() {
        return "You are a helpful assistant.".to_string();
    }
    let summary_context = summary
        .map(|s| format!("\n\nDocument Summary:\n{s}"))
        .unwrap_or_default();
    format!(
        "You are a helpful assistant. Use the following context to answer the user's question:{summary_context}\n\nRelevant Document Chunks:\n{context}\n\nIf the context doesn't contain relevant information, say so."
    )
}

/// Build the summarization prompt for a document's full text
pub fn summary_prompt(text: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}{text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;
    use uuid::Uuid;

    fn matched(content: &str, similarity: f32) -> MatchedChunk {
        MatchedChunk {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            content: content.to_string(),
            chunk_index: 0,
            similarity,
        }
    }

    #[test]
    fn context_block_tags_chunks_with_ordinals() {
        let chunks = vec![matched("first chunk", 0.9), matched("second chunk", 0.8)];
        let block = build_context_block(&chunks);
        assert!(block.starts_with("Document Context:\n\n"));
        assert!(block.contains("[1] first chunk"));
        assert!(block.contains("[2] second chunk"));
    }

    #[test]
    fn empty_retrieval_gives_empty_context() {
        assert_eq!(build_context_block(&[]), "");
    }

    #[test]
    fn messages_start_with_verbatim_system_instruction() {
        let history = vec![
            ChatMessage {
                role: MessageRole::User,
                content: "earlier question".into(),
            },
            ChatMessage {
                role: MessageRole::Assistant,
                content: "earlier answer".into(),
            },
        ];
        let messages = build_messages("What is the refund policy?", &history);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, PromptRole::System);
        assert_eq!(messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(messages[1].role, PromptRole::User);
        assert_eq!(messages[2].role, PromptRole::Assistant);
        assert_eq!(messages[3].content, "What is the refund policy?");
    }

    #[test]
    fn context_message_includes_summary_when_present() {
        let with = context_system_message("Document Context:\n\n[1] x", Some("a summary"));
        assert!(with.contains("Document Summary:\na summary"));
        assert!(with.contains("Relevant Document Chunks:"));

        let without = context_system_message("", None);
        assert_eq!(without, "You are a helpful assistant.");
    }

    #[test]
    fn summary_prompt_carries_instruction() {
        let prompt = summary_prompt("document body");
        assert!(prompt.starts_with(SUMMARY_INSTRUCTION));
        assert!(prompt.ends_with("document body"));
    }
}
