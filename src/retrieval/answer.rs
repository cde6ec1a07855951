//! Answer pipeline: embed the question, retrieve relevant chunks, generate a
//! grounded answer, and persist the dialogue with citations
//!
//! The user's message is persisted before any provider call, so a question is
//! never lost even when generation fails downstream.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::generation::prompt;
use crate::providers::{DataStore, EmbeddingProvider, GenerationProvider};
use crate::types::conversation::{Citation, Conversation, Message, MessageRole};
use crate::types::request::AskRequest;
use crate::types::response::{AskResponse, SourceRef};

/// Maximum characters of the question used as a new conversation's title
const TITLE_CHARS: usize = 100;

/// Retrieval orchestrator
pub struct AnswerPipeline {
    store: Arc<dyn DataStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    config: RetrievalConfig,
}

impl AnswerPipeline {
    pub fn new(
        store: Arc<dyn DataStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            config,
        }
    }

    /// Answer a question against one of the user's documents
    pub async fn ask(&self, user_id: Uuid, request: AskRequest) -> Result<AskResponse> {
        // Validation happens before any persistence or external call
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(Error::Validation("Question is required".into()));
        }
        let document_id = request
            .document_id
            .ok_or_else(|| Error::Validation("Document ID is required".into()))?;

        // Ownership gate: another user's document is indistinguishable from a
        // missing one
        self.store
            .get_document_owned(document_id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Document not found or access denied".into()))?;

        let conversation_id = self
            .resolve_conversation(user_id, request.conversation_id, &question)
            .await?;

        // Persist the question immediately; it survives any failure below
        let user_message = Message::new(conversation_id, MessageRole::User, question.clone());
        self.store.insert_message(&user_message).await?;

        let query_embedding = self.embedder.embed(&question).await?;

        let matches = self
            .store
            .match_chunks(
                document_id,
                user_id,
                &query_embedding,
                self.config.match_threshold,
                self.config.match_count,
            )
            .await?;
        tracing::info!(
            conversation_id = %conversation_id,
            document_id = %document_id,
            retrieved = matches.len(),
            "retrieved relevant chunks"
        );

        // Zero matches still generate: the system instruction covers the
        // general-knowledge fallback
        let context = prompt::build_context_block(&matches);

        let summary = match self.store.latest_summary(document_id).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(document_id = %document_id, "summary lookup failed: {e}");
                None
            }
        };

        let messages = prompt::build_messages(&question, &request.previous_messages);
        let answer = self
            .generator
            .generate(&messages, &context, summary.as_ref().map(|s| s.summary.as_str()))
            .await?;

        let assistant_message =
            Message::new(conversation_id, MessageRole::Assistant, answer.clone());
        self.store.insert_message(&assistant_message).await?;

        // One citation per retrieved chunk, spanning its full content
        let citations: Vec<Citation> = matches
            .iter()
            .map(|m| {
                Citation::full_chunk(
                    assistant_message.id,
                    m.document_id,
                    m.id,
                    m.content.chars().count(),
                )
            })
            .collect();
        if !citations.is_empty() {
            if let Err(e) = self.store.insert_citations(&citations).await {
                tracing::warn!(message_id = %assistant_message.id, "failed to store citations: {e}");
            }
        }

        let sources = matches
            .iter()
            .map(|m| SourceRef {
                document_id: m.document_id,
                chunk_id: m.id,
                content: truncate_preview(&m.content, self.config.source_preview_chars),
                similarity: m.similarity,
            })
            .collect();

        Ok(AskResponse {
            answer,
            conversation_id,
            sources,
        })
    }

    /// Use the caller's conversation when they own it, otherwise create one
    /// titled after the question
    async fn resolve_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Option<Uuid>,
        question: &str,
    ) -> Result<Uuid> {
        match conversation_id {
            Some(id) => {
                let conversation = self
                    .store
                    .get_conversation_owned(id, user_id)
                    .await?
                    .ok_or_else(|| {
                        Error::NotFound("Conversation not found or access denied".into())
                    })?;
                Ok(conversation.id)
            }
            None => {
                let title: String = question.chars().take(TITLE_CHARS).collect();
                let conversation = Conversation::new(user_id, title);
                self.store.insert_conversation(&conversation).await?;
                Ok(conversation.id)
            }
        }
    }
}

fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let preview: String = content.chars().take(max_chars).collect();
    format!("{preview}...")
}
