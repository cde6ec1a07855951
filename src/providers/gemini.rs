//! Gemini provider for embeddings and answer generation
//!
//! Talks to the Google Generative Language API with a plain API key. One
//! client serves both gateway traits so ingestion and retrieval share the
//! same embedding model.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::generation::prompt::{self, PromptMessage};

use super::embedding::EmbeddingProvider;
use super::generation::GenerationProvider;

/// Gemini API client
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    /// Generation model for this instance; summarizers override it
    generate_model: String,
}

impl GeminiClient {
    /// Create a client using the configured generation model
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let model = config.generate_model.clone();
        Self::with_model(config, model)
    }

    /// Create a client generating with a specific model
    pub fn with_model(config: GeminiConfig, generate_model: String) -> Result<Self> {
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

    /// API key, or `UpstreamUnavailable` when it was never configured.
    /// Credentials problems are fatal, not retried.
    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::UpstreamUnavailable("Gemini API key is not configured".into()))
    }

    fn endpoint(&self, model: &str, action: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url, model, action)
    }

    async fn post_json<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        request: &Req,
    ) -> Result<Resp> {
        let key = self.api_key()?;
        let response = self
            .http
            .post(url)
            .query(&[("key", key)])
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse Gemini response: {e}")))
    }

    /// Flatten prompt messages into a single Gemini prompt. Gemini takes the
    /// conversation as one text block: the context-bearing helper message
    /// first, then every assembled message in order.
    fn flatten_prompt(
        messages: &[PromptMessage],
        context: &str,
        summary: Option<&str>,
    ) -> String {
        let mut parts = vec![prompt::context_system_message(context, summary)];
        parts.extend(messages.iter().map(|m| m.content.clone()));
        parts.join("\n\n")
    }

    async fn generate_text(&self, model: &str, prompt_text: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt_text }],
            }],
        };

        let response: GenerateResponse = self
            .post_json(&self.endpoint(model, "generateContent"), &request)
            .await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Upstream("no text in Gemini response".into()))
    }
}

/// Map reqwest transport errors onto the upstream taxonomy
fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::UpstreamUnavailable(format!("Gemini unreachable: {e}"))
    } else if e.is_timeout() {
        Error::Upstream(format!("Gemini request timed out: {e}"))
    } else {
        Error::Upstream(format!("Gemini request failed: {e}"))
    }
}

/// Map non-success API responses onto the upstream taxonomy
fn map_api_error(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        Error::UpstreamRateLimited(format!("Gemini quota exceeded ({status}): {body}"))
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        Error::UpstreamUnavailable(format!("Gemini rejected credentials ({status}): {body}"))
    } else {
        Error::Upstream(format!("Gemini error ({status}): {body}"))
    }
}

#[derive(serde::Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(serde::Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(serde::Serialize)]
struct Part {
    text: String,
}

#[derive(serde::Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(serde::Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    text: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = &self.config.embed_model;
        let request = EmbedRequest {
            model: format!("models/{model}"),
            content: Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response: EmbedResponse = self
            .post_json(&self.endpoint(model, "embedContent"), &request)
            .await?;

        Ok(response.embedding.values)
    }

    fn dimensions(&self) -> usize {
        self.config.embed_dimensions
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(
        &self,
        messages: &[PromptMessage],
        context: &str,
        summary: Option<&str>,
    ) -> Result<String> {
        let prompt_text = Self::flatten_prompt(messages, context, summary);
        self.generate_text(&self.generate_model, prompt_text).await
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.generate_text(&self.generate_model, prompt::summary_prompt(text))
            .await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.generate_model
    }
}
