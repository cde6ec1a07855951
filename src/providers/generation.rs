//! Answer generation provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::prompt::PromptMessage;

/// Trait for LLM-based answer generation and document summarization
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API
/// - `OllamaClient`: local Ollama server
///
/// Failures are surfaced to the caller; there is no automatic retry.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate an answer from assembled prompt messages plus the retrieved
    /// document context and an optional whole-document summary
    async fn generate(
        &self,
        messages: &[PromptMessage],
        context: &str,
        summary: Option<&str>,
    ) -> Result<String>;

    /// Produce a whole-document summary; used best-effort during ingestion
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier, recorded on stored summaries
    fn model(&self) -> &str;
}
