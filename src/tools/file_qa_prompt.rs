use crate::{
    errors::AppError,
    mcp::registry::{opt_str_param, str_param, Prompt},
    prompt::file_qa_prompt,
};
use serde_json::json;

pub struct FileQaPrompt;

impl Prompt for FileQaPrompt {
    fn name(&self) -> &'static str { "file_qa_prompt" }
    fn arguments(&self) -> serde_json::Value {
        json!({"type":"object","required":["question","context"],"properties": {"question": {"type":"string"},"context":{"type":"string"}}})
    }
    fn render(&self, params: &serde_json::Value) -> Result<serde_json::Value, AppError> {
        let question = str_param(params, "question")?;
        let context = opt_str_param(params, "context")?.unwrap_or("");
        serde_json::to_value(file_qa_prompt(question, context)).map_err(|e| AppError::Internal(e.to_string()))
    }
}
