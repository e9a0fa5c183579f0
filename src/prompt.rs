//! Role-tagged prompts handed to the inference backend or returned to clients
//! that assemble their own.

use serde::{Deserialize, Serialize};

/// Rendered in place of the context block whenever there is nothing to ground on.
pub const NO_CONTEXT_MARKER: &str = "(no context provided)";

/// Marker that ends a flattened completion prompt.
pub const ANSWER_MARKER: &str = "Answer:";

const GROUNDED_SYSTEM: &str = "You are a local MCP assistant. You can only answer using the provided files \
and must refuse to guess when information is missing.";

const FILE_QA_SYSTEM: &str =
    "You are a local assistant reading project files. Answer succinctly and cite the file names you used.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Prompt built for one `ask_local` call. Keeps the context segment next to
/// the messages so callers can see exactly what was grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundedPrompt {
    question: String,
    context: String,
    messages: Vec<Message>,
}

impl GroundedPrompt {
    pub fn new(question: &str, context: &str) -> Self {
        let context = context_block(context).to_string();
        let messages = vec![
            Message::new(Role::System, GROUNDED_SYSTEM),
            Message::new(Role::User, format!("Question: {question}\n\nContext from files:\n{context}")),
        ];
        Self { question: question.to_string(), context, messages }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// The context segment exactly as embedded in the user message.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Single-string form for completion-style backends, ending in `Answer:`.
    pub fn render_completion(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            out.push_str(m.role.label());
            out.push_str(": ");
            out.push_str(&m.content);
            out.push_str("\n\n");
        }
        out.push_str(ANSWER_MARKER);
        out
    }
}

/// Client-facing prompt template payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub messages: Vec<Message>,
}

/// Builds the `file_qa_prompt` template. No validation or I/O.
pub fn file_qa_prompt(question: &str, context: &str) -> PromptTemplate {
    PromptTemplate {
        messages: vec![
            Message::new(Role::System, FILE_QA_SYSTEM),
            Message::new(Role::User, format!("Question: {question}\n\nContext:\n{}", context_block(context))),
        ],
    }
}

fn context_block(context: &str) -> &str {
    if context.trim().is_empty() { NO_CONTEXT_MARKER } else { context }
}

/// Drops a prompt echoed back in front of the completion.
///
/// Only an output that starts with the whole rendered prompt counts as an
/// echo, and the prefix is removed once, so an answer that itself contains
/// `Answer:` is returned intact.
pub fn strip_prompt_echo<'a>(rendered: &str, output: &'a str) -> &'a str {
    output.strip_prefix(rendered).unwrap_or(output).trim()
}
