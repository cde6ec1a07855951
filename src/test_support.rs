//! Scripted fakes shared by orchestrator tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::generation::prompt::PromptMessage;
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::generation::GenerationProvider;

/// Failure kinds a fake can be scripted to raise
#[derive(Debug, Clone, Copy)]
pub enum FakeFailure {
    RateLimited,
    Transient,
    Unavailable,
}

impl FakeFailure {
    fn to_error(self) -> Error {
        match self {
            Self::RateLimited => Error::UpstreamRateLimited("scripted quota failure".into()),
            Self::Transient => Error::Upstream("scripted transient failure".into()),
            Self::Unavailable => Error::UpstreamUnavailable("scripted unavailable".into()),
        }
    }
}

/// Embedding provider with per-call scripted failures
pub struct FakeEmbedder {
    dims: usize,
    /// Vector returned on success; defaults to a unit vector
    fixed: Vec<f32>,
    /// Call index -> failure
    failures: HashMap<usize, FakeFailure>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dims: usize) -> Self {
        let mut fixed = vec![0.0; dims];
        if dims > 0 {
            fixed[0] = 1.0;
        }
        Self {
            dims,
            fixed,
            failures: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return a specific vector on every successful call
    pub fn with_fixed(mut self, fixed: Vec<f32>) -> Self {
        self.dims = fixed.len();
        self.fixed = fixed;
        self
    }

    /// Fail the nth call (0-based) with the given kind
    pub fn fail_call(mut self, index: usize, failure: FakeFailure) -> Self {
        self.failures.insert(index, failure);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failures.get(&index) {
            return Err(failure.to_error());
        }
        Ok(self.fixed.clone())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "fake-embedder"
    }
}

/// Captured arguments of the last `generate` call
#[derive(Debug, Clone)]
pub struct CapturedGenerate {
    pub messages: Vec<PromptMessage>,
    pub context: String,
    pub summary: Option<String>,
}

/// Generation provider with a canned answer and optional scripted failures
pub struct FakeGenerator {
    model: String,
    answer: String,
    generate_failure: Option<FakeFailure>,
    summarize_failure: Option<FakeFailure>,
    generate_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
    last_generate: Mutex<Option<CapturedGenerate>>,
}

impl FakeGenerator {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            model: "fake-model".to_string(),
            answer: answer.into(),
            generate_failure: None,
            summarize_failure: None,
            generate_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            last_generate: Mutex::new(None),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn failing_generate(mut self, failure: FakeFailure) -> Self {
        self.generate_failure = Some(failure);
        self
    }

    pub fn failing_summarize(mut self, failure: FakeFailure) -> Self {
        self.summarize_failure = Some(failure);
        self
    }

    pub fn generate_call_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn summarize_call_count(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn last_generate(&self) -> Option<CapturedGenerate> {
        self.last_generate.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for FakeGenerator {
    async fn generate(
        &self,
        messages: &[PromptMessage],
        context: &str,
        summary: Option<&str>,
    ) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_generate.lock() = Some(CapturedGenerate {
            messages: messages.to_vec(),
            context: context.to_string(),
            summary: summary.map(String::from),
        });
        if let Some(failure) = self.generate_failure {
            return Err(failure.to_error());
        }
        Ok(self.answer.clone())
    }

    async fn summarize(&self, _text: &str) -> Result<String> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.summarize_failure {
            return Err(failure.to_error());
        }
        Ok(format!("summary from {}", self.model))
    }

    fn name(&self) -> &str {
        "fake-generator"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
