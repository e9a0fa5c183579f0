//! Grounded question answering: validate, read, build the prompt, generate.
//!
//! A call with a path goes through the sandbox and the reader first; any
//! failure there ends the call. There is no fallback to answering without
//! context once the caller named a file.

use crate::{
    backend::{BackendError, DynBackend, GenerationParams},
    errors::AppResult,
    prompt::{strip_prompt_echo, GroundedPrompt},
    reader,
    sandbox::Sandbox,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct Orchestrator {
    sandbox: Arc<Sandbox>,
    backend: DynBackend,
    params: GenerationParams,
    /// Held around `generate` when the backend must not be called concurrently.
    gate: Option<Mutex<()>>,
}

impl Orchestrator {
    pub fn new(sandbox: Arc<Sandbox>, backend: DynBackend, params: GenerationParams, serialize: bool) -> Self {
        let gate = (serialize || !backend.supports_concurrency()).then(|| Mutex::new(()));
        Self { sandbox, backend, params, gate }
    }

    pub fn read_file(&self, path: &str) -> AppResult<String> {
        let resolved = self.sandbox.validate(path)?;
        reader::read_text(&resolved)
    }

    /// Builds the prompt for `question`, reading `path` when one is given.
    pub fn prompt_for(&self, question: &str, path: Option<&str>) -> AppResult<GroundedPrompt> {
        let context = match path.filter(|p| !p.trim().is_empty()) {
            Some(p) => {
                let text = self.read_file(p)?;
                debug!(path = p, bytes = text.len(), "context loaded");
                text
            }
            None => String::new(),
        };
        Ok(GroundedPrompt::new(question, &context))
    }

    pub async fn answer(&self, question: &str, path: Option<&str>) -> AppResult<String> {
        let prompt = self.prompt_for(question, path)?;
        debug!(question_len = prompt.question().len(), context_len = prompt.context().len(), "prompt built");

        let guard = match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };
        let raw = self.backend.generate(&prompt, self.params).await?;
        drop(guard);

        let answer = strip_prompt_echo(&prompt.render_completion(), &raw).to_string();
        if answer.is_empty() {
            return Err(BackendError::EmptyCompletion.into());
        }
        info!(backend = self.backend.name(), grounded = path.is_some(), answer_len = answer.len(), "answer generated");
        Ok(answer)
    }
}
