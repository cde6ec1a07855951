//! Provider abstractions for embeddings, answer generation, and the external
//! document/vector store
//!
//! Gateways are constructed explicitly from configuration and injected where
//! they are used, so tests can substitute fakes.

pub mod blob_store;
pub mod data_store;
pub mod embedding;
pub mod gemini;
pub mod generation;
pub mod local;
pub mod ollama;

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::Result;

pub use blob_store::BlobStore;
pub use data_store::{DataStore, MatchedChunk};
pub use embedding::EmbeddingProvider;
pub use generation::GenerationProvider;

use gemini::GeminiClient;
use ollama::OllamaClient;

/// The AI gateways one backend provides
pub struct ProviderSet {
    /// Embeds chunks at ingestion and questions at query time; the same
    /// instance for both so the vector spaces stay comparable
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Generates grounded answers
    pub generator: Arc<dyn GenerationProvider>,
    /// One summarizer per configured summary model; all best-effort
    pub summarizers: Vec<Arc<dyn GenerationProvider>>,
}

/// Construct the gateway set for the configured backend
pub fn build_providers(config: &ProviderConfig) -> Result<ProviderSet> {
    match config {
        ProviderConfig::Gemini(gemini) => {
            let embedder = Arc::new(GeminiClient::new(gemini.clone())?);
            let generator = Arc::new(GeminiClient::new(gemini.clone())?);
            let summarizers = gemini
                .summary_models
                .iter()
                .map(|model| {
                    GeminiClient::with_model(gemini.clone(), model.clone())
                        .map(|c| Arc::new(c) as Arc<dyn GenerationProvider>)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ProviderSet {
                embedder,
                generator,
                summarizers,
            })
        }
        ProviderConfig::Ollama(ollama) => {
            let embedder = Arc::new(OllamaClient::new(ollama.clone())?);
            let generator = Arc::new(OllamaClient::new(ollama.clone())?);
            let summarizers = ollama
                .summary_models
                .iter()
                .map(|model| {
                    OllamaClient::with_model(ollama.clone(), model.clone())
                        .map(|c| Arc::new(c) as Arc<dyn GenerationProvider>)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ProviderSet {
                embedder,
                generator,
                summarizers,
            })
        }
    }
}
