//! Ollama provider for embeddings and answer generation
//!
//! Local backend against an Ollama server. Useful for development and for
//! deployments that keep documents off third-party APIs.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::generation::prompt::{self, PromptMessage, PromptRole};

use super::embedding::EmbeddingProvider;
use super::generation::GenerationProvider;

/// Ollama API client
pub struct OllamaClient {
    http: reqwest::Client,
    config: OllamaConfig,
    generate_model: String,
}

impl OllamaClient {
    /// Create a client using the configured generation model
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let model = config.generate_model.clone();
        Self::with_model(config, model)
    }

    /// Create a client generating with a specific model
    pub fn with_model(mut config: OllamaConfig, generate_model: String) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            config,
            generate_model,
        })
    }

    async fn post_json<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(&self.config.base_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse Ollama response: {e}")))
    }

    async fn chat(&self, messages: Vec<OllamaMessage>) -> Result<String> {
        let request = ChatRequest {
            model: self.generate_model.clone(),
            messages,
            stream: false,
        };
        let response: ChatResponse = self.post_json("/api/chat", &request).await?;
        Ok(response.message.content)
    }
}

fn map_transport_error(host: &str, e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::UpstreamUnavailable(format!("Ollama server not running at {host}: {e}"))
    } else if e.is_timeout() {
        Error::Upstream(format!("Ollama request timed out: {e}"))
    } else {
        Error::Upstream(format!("Ollama request failed: {e}"))
    }
}

fn map_api_error(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::UpstreamRateLimited(format!("Ollama rate limited: {body}"))
    } else if status == reqwest::StatusCode::NOT_FOUND || body.contains("not found") {
        Error::UpstreamUnavailable(format!("Ollama model not found: {body}"))
    } else {
        Error::Upstream(format!("Ollama error ({status}): {body}"))
    }
}

#[derive(serde::Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            prompt: text.to_string(),
        };
        let response: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;
        Ok(response.embedding)
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[async_trait]
impl GenerationProvider for OllamaClient {
    async fn generate(
        &self,
        messages: &[PromptMessage],
        context: &str,
        summary: Option<&str>,
    ) -> Result<String> {
        // Ollama's chat endpoint takes roles natively; the context-bearing
        // helper message leads, mirroring the flattened Gemini prompt order
        let mut chat_messages = vec![OllamaMessage {
            role: "system".to_string(),
            content: prompt::context_system_message(context, summary),
        }];
        chat_messages.extend(messages.iter().map(|m| OllamaMessage {
            role: match m.role {
                PromptRole::System => "system",
                PromptRole::User => "user",
                PromptRole::Assistant => "assistant",
            }
            .to_string(),
            content: m.content.clone(),
        }));
        self.chat(chat_messages).await
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.chat(vec![OllamaMessage {
            role: "user".to_string(),
            content: prompt::summary_prompt(text),
        }])
        .await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.generate_model
    }
}
