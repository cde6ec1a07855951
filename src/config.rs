//! Configuration for the document Q&A service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Text chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Background processing queue configuration
    #[serde(default)]
    pub queue: QueueConfig,
    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// AI provider backend
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. Environment variables override provider secrets.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| Error::Config(format!("failed to read {}: {}", p.display(), e)))?;
                toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("failed to parse {}: {}", p.display(), e)))?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Pick up secrets from the environment so they never need to live in a
    /// config file.
    fn apply_env(&mut self) {
        if let ProviderConfig::Gemini(ref mut gemini) = self.provider {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                if !key.is_empty() {
                    gemini.api_key = Some(key);
                }
            }
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        // Larger chunks reduce the number of embedding calls per document
        Self {
            chunk_size: 2000,
            chunk_overlap: 400,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per question
    pub match_count: usize,
    /// Minimum cosine similarity for a chunk to be considered relevant
    pub match_threshold: f32,
    /// Maximum characters of chunk content echoed back in source previews
    pub source_preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_count: 8,
            match_threshold: 0.5,
            source_preview_chars: 200,
        }
    }
}

/// Background processing queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of concurrent ingestion workers
    pub workers: usize,
    /// Channel capacity before submission blocks
    pub capacity: usize,
    /// Delivery attempts per job before giving up
    pub attempts: u32,
    /// Base delay for exponential backoff between delivery attempts
    pub backoff_ms: u64,
    /// Hard timeout for processing a single document in seconds
    pub document_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: 256,
            attempts: 3,
            backoff_ms: 1000,
            document_timeout_secs: 300,
        }
    }
}

/// Storage locations for the local store implementations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the sqlite database
    pub database_path: PathBuf,
    /// Directory for raw uploaded files
    pub blob_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docuchat");
        Self {
            database_path: data_dir.join("docuchat.db"),
            blob_dir: data_dir.join("blobs"),
        }
    }
}

/// AI provider backend selection
///
/// A closed set: adding a provider means adding a variant and handling it
/// everywhere the compiler points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Google Generative Language API
    Gemini(GeminiConfig),
    /// Local Ollama server
    Ollama(OllamaConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Gemini(GeminiConfig::default())
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; normally supplied via the GEMINI_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Embedding model; must match between ingestion and query time
    pub embed_model: String,
    /// Embedding dimensionality for the chosen model
    pub embed_dimensions: usize,
    /// Answer generation model
    pub generate_model: String,
    /// Models asked for a best-effort document summary during ingestion
    pub summary_models: Vec<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embed_model: "text-embedding-004".to_string(),
            embed_dimensions: 768,
            generate_model: "gemini-2.0-flash".to_string(),
            summary_models: vec!["gemini-2.0-flash".to_string()],
            timeout_secs: 60,
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensionality for the chosen model
    pub embed_dimensions: usize,
    /// Answer generation model
    pub generate_model: String,
    /// Models asked for a best-effort document summary during ingestion
    pub summary_models: Vec<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            embed_dimensions: 768,
            generate_model: "llama3.2:3b".to_string(),
            summary_models: vec!["llama3.2:3b".to_string()],
            timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.chunking.chunk_size, 2000);
        assert_eq!(config.chunking.chunk_overlap, 400);
        assert_eq!(config.retrieval.match_count, 8);
        assert!(config.retrieval.match_threshold > 0.0);
        assert_eq!(config.queue.workers, 4);
    }

    #[test]
    fn parses_ollama_backend() {
        let raw = r#"
            [provider]
            backend = "ollama"
            base_url = "http://127.0.0.1:11434"
            embed_model = "nomic-embed-text"
            embed_dimensions = 768
            generate_model = "llama3.2:3b"
            summary_models = ["llama3.2:3b"]
            timeout_secs = 60
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        match config.provider {
            ProviderConfig::Ollama(o) => assert_eq!(o.embed_model, "nomic-embed-text"),
            ProviderConfig::Gemini(_) => panic!("expected ollama backend"),
        }
    }
}
