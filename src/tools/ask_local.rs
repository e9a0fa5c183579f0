use crate::{
    errors::AppError,
    mcp::registry::{opt_str_param, str_param, Tool},
    orchestrator::Orchestrator,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct AskLocalTool { orchestrator: Arc<Orchestrator> }

impl AskLocalTool { pub fn new(orchestrator: Arc<Orchestrator>) -> Self { Self { orchestrator } } }

#[async_trait]
impl Tool for AskLocalTool {
    fn name(&self) -> &'static str { "ask_local" }
    fn capabilities(&self) -> serde_json::Value {
        json!({
            "description": "Answer a question using the local model, optionally grounded with a file.",
            "input": {"type":"object","required":["question"],"properties": {"question": {"type":"string"},"path":{"type":["string","null"]}}},
            "output": {"type":"string"}
        })
    }
    async fn call(&self, params: serde_json::Value) -> Result<serde_json::Value, AppError> {
        let question = str_param(&params, "question")?;
        let path = opt_str_param(&params, "path")?;
        let answer = self.orchestrator.answer(question, path).await?;
        Ok(serde_json::Value::String(answer))
    }
}
