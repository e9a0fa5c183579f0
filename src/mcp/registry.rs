use crate::{errors::AppError, orchestrator::Orchestrator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type DynTool = Arc<dyn Tool + Send + Sync + 'static>;
pub type DynPrompt = Arc<dyn Prompt + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<(String, DynTool)>,
    prompts: Vec<(String, DynPrompt)>,
}

impl ToolRegistry {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        use crate::tools::{ask_local::AskLocalTool, file_qa_prompt::FileQaPrompt, read_file::ReadFileTool};
        let mut tools: Vec<(String, DynTool)> = vec![
            ("read_file".to_string(), Arc::new(ReadFileTool::new(orchestrator.clone()))),
            ("ask_local".to_string(), Arc::new(AskLocalTool::new(orchestrator))),
        ];
        tools.sort_by(|a, b| a.0.cmp(&b.0));
        let prompts: Vec<(String, DynPrompt)> = vec![("file_qa_prompt".to_string(), Arc::new(FileQaPrompt))];
        Self { tools, prompts }
    }

    pub fn get(&self, name: &str) -> Option<DynTool> { self.tools.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone()) }
    pub fn list_names(&self) -> Vec<String> { self.tools.iter().map(|(n, _)| n.clone()).collect() }
    pub fn tools(&self) -> impl Iterator<Item = &DynTool> { self.tools.iter().map(|(_, t)| t) }

    pub fn get_prompt(&self, name: &str) -> Option<DynPrompt> { self.prompts.iter().find(|(n, _)| n == name).map(|(_, p)| p.clone()) }
    pub fn prompts(&self) -> impl Iterator<Item = &DynPrompt> { self.prompts.iter().map(|(_, p)| p) }
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    pub id: String,
    pub tool: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")] pub error: Option<super::types::ErrorObj>,
}

impl CallResponse {
    pub fn ok(id: String, result: serde_json::Value) -> Self { Self { id, result: Some(result), error: None } }
    pub fn err(id: String, e: &AppError) -> Self {
        Self { id, result: None, error: Some(super::types::ErrorObj { code: e.code().to_string(), message: e.to_string() }) }
    }
}

#[async_trait]
pub trait Tool {
    fn name(&self) -> &'static str;
    fn capabilities(&self) -> serde_json::Value;
    async fn call(&self, params: serde_json::Value) -> Result<serde_json::Value, AppError>;
}

/// Prompt templates are rendered locally and never touch the filesystem.
pub trait Prompt {
    fn name(&self) -> &'static str;
    fn arguments(&self) -> serde_json::Value;
    fn render(&self, params: &serde_json::Value) -> Result<serde_json::Value, AppError>;
}

/// Required string parameter.
pub fn str_param<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, AppError> {
    params.get(key).and_then(|v| v.as_str()).ok_or_else(|| AppError::ToolError(format!("missing {key}")))
}

/// Optional string parameter; `null` counts as absent.
pub fn opt_str_param<'a>(params: &'a serde_json::Value, key: &str) -> Result<Option<&'a str>, AppError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| AppError::ToolError(format!("{key} must be a string"))),
    }
}
