use super::{base_url, decode_json, http_client, BackendError, GenerationParams, InferenceBackend};
use crate::{config::Model, prompt::GroundedPrompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Completion-style backend on a local Ollama server.
///
/// The prompt is flattened into a single `... Answer:` string. Ollama returns
/// only the newly generated text, so no echo is expected.
pub struct OllamaBackend {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    url_generate: String,
    url_tags: String,
    context_size: u32,
    threads: u32,
    batch: u32,
}

impl OllamaBackend {
    pub fn new(cfg: &Model) -> anyhow::Result<Self> {
        let base = base_url(&cfg.endpoint);
        Ok(Self {
            client: http_client(cfg)?,
            model: cfg.name.clone(),
            url_generate: format!("{base}/api/generate"),
            url_tags: format!("{base}/api/tags"),
            endpoint: base,
            context_size: cfg.context_size,
            threads: cfg.threads,
            batch: cfg.batch,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    num_ctx: u32,
    num_thread: u32,
    num_batch: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama reports untagged models as `name:latest`.
fn same_model(listed: &str, wanted: &str) -> bool {
    listed == wanted || (!wanted.contains(':') && listed.strip_suffix(":latest") == Some(wanted))
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn ensure_ready(&self) -> Result<(), BackendError> {
        debug!("GET {}", self.url_tags);
        let resp = self.client.get(&self.url_tags).send().await?;
        let tags: TagsResponse = decode_json(resp, &self.url_tags).await?;
        if tags.models.iter().any(|m| same_model(&m.name, &self.model)) {
            Ok(())
        } else {
            Err(BackendError::ModelUnavailable { model: self.model.clone(), endpoint: self.endpoint.clone() })
        }
    }

    #[instrument(skip_all, fields(model = %self.model, max_tokens = params.max_tokens))]
    async fn generate(&self, prompt: &GroundedPrompt, params: GenerationParams) -> Result<String, BackendError> {
        let rendered = prompt.render_completion();
        let body = GenerateRequest {
            model: &self.model,
            prompt: &rendered,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
                num_ctx: self.context_size,
                num_thread: self.threads,
                num_batch: self.batch,
            },
        };
        debug!("POST {}", self.url_generate);
        let resp = self.client.post(&self.url_generate).json(&body).send().await?;
        let out: GenerateResponse = decode_json(resp, &self.url_generate).await?;
        Ok(out.response)
    }
}
