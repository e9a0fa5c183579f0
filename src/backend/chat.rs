use super::{base_url, decode_json, http_client, BackendError, GenerationParams, InferenceBackend};
use crate::{config::Model, prompt::{GroundedPrompt, Message}};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// OpenAI-compatible chat completion backend (llama.cpp `llama-server`,
/// vLLM, hosted APIs). Sends the role-tagged messages as-is.
pub struct ChatBackend {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    url_chat: String,
    url_models: String,
}

impl ChatBackend {
    pub fn new(cfg: &Model) -> anyhow::Result<Self> {
        let base = base_url(&cfg.endpoint);
        Ok(Self {
            client: http_client(cfg)?,
            model: cfg.name.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            url_chat: format!("{base}/v1/chat/completions"),
            url_models: format!("{base}/v1/models"),
            endpoint: base,
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[async_trait]
impl InferenceBackend for ChatBackend {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn ensure_ready(&self) -> Result<(), BackendError> {
        debug!("GET {}", self.url_models);
        let resp = self.authorized(self.client.get(&self.url_models)).send().await?;
        let models: ModelsResponse = decode_json(resp, &self.url_models).await?;
        if models.data.iter().any(|m| m.id == self.model) {
            Ok(())
        } else {
            Err(BackendError::ModelUnavailable { model: self.model.clone(), endpoint: self.endpoint.clone() })
        }
    }

    #[instrument(skip_all, fields(model = %self.model, max_tokens = params.max_tokens))]
    async fn generate(&self, prompt: &GroundedPrompt, params: GenerationParams) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: prompt.messages(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };
        debug!("POST {}", self.url_chat);
        let resp = self.authorized(self.client.post(&self.url_chat)).json(&body).send().await?;
        let out: ChatResponse = decode_json(resp, &self.url_chat).await?;
        out.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(BackendError::EmptyCompletion)
    }
}
