use crate::{
    errors::AppError,
    mcp::registry::{str_param, Tool},
    orchestrator::Orchestrator,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct ReadFileTool { orchestrator: Arc<Orchestrator> }

impl ReadFileTool { pub fn new(orchestrator: Arc<Orchestrator>) -> Self { Self { orchestrator } } }

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str { "read_file" }
    fn capabilities(&self) -> serde_json::Value {
        json!({
            "description": "Return the content of a text file within the allowed root.",
            "input": {"type":"object","required":["path"],"properties": {"path": {"type":"string"}}},
            "output": {"type":"string"}
        })
    }
    async fn call(&self, params: serde_json::Value) -> Result<serde_json::Value, AppError> {
        let path = str_param(&params, "path")?;
        let text = self.orchestrator.read_file(path)?;
        Ok(serde_json::Value::String(text))
    }
}
