//! Inference backends.
//!
//! The orchestrator only sees [`InferenceBackend`]; which server sits behind
//! it is picked once at startup from `model.backend`:
//! - [`ollama::OllamaBackend`] — `POST {endpoint}/api/generate`, completion style
//! - [`chat::ChatBackend`] — `POST {endpoint}/v1/chat/completions`, OpenAI-compatible

pub mod chat;
pub mod ollama;

use crate::{
    config::{BackendKind, Model},
    errors::AppError,
    prompt::GroundedPrompt,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

pub type DynBackend = Arc<dyn InferenceBackend>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn from_model(cfg: &Model) -> Self {
        Self { temperature: cfg.temperature, max_tokens: cfg.max_output_tokens }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.2, max_tokens: 512 }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus { status: StatusCode, url: String, snippet: String },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("model {model} is not available at {endpoint}")]
    ModelUnavailable { model: String, endpoint: String },
    #[error("backend returned no completion")]
    EmptyCompletion,
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn model(&self) -> &str;

    /// Whether concurrent `generate` calls are safe against this backend.
    fn supports_concurrency(&self) -> bool {
        true
    }

    /// Checks that the server is reachable and serves the configured model.
    async fn ensure_ready(&self) -> Result<(), BackendError>;

    /// Generates an answer for `prompt`. Implementations return only newly
    /// generated text where the server allows it.
    async fn generate(&self, prompt: &GroundedPrompt, params: GenerationParams) -> Result<String, BackendError>;
}

pub fn build(cfg: &Model) -> anyhow::Result<DynBackend> {
    let backend: DynBackend = match cfg.backend {
        BackendKind::Ollama => Arc::new(ollama::OllamaBackend::new(cfg)?),
        BackendKind::Chat => Arc::new(chat::ChatBackend::new(cfg)?),
    };
    Ok(backend)
}

fn http_client(cfg: &Model) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_s)).build()
}

fn base_url(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// Turns a response into `T`, mapping non-2xx to [`BackendError::HttpStatus`]
/// with a short body snippet.
async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T, BackendError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let snippet = text.chars().take(240).collect::<String>();
        return Err(BackendError::HttpStatus { status, url: url.to_string(), snippet });
    }
    resp.json::<T>()
        .await
        .map_err(|e| BackendError::Decode { url: url.to_string(), message: e.to_string() })
}
