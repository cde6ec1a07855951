//! Embedding provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for turning text into a fixed-length embedding vector
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API
/// - `OllamaClient`: local Ollama server
///
/// The same provider (and therefore the same model) must be used to embed
/// chunks at ingestion and questions at query time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimensionality for the configured model
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}
