use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub root: Root,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub model: Model,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Root {
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}
fn default_root_dir() -> PathBuf { std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")) }

impl Default for Root {
    fn default() -> Self { Self { root_dir: default_root_dir() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_path")]
    pub base_path: String,
}
fn default_bind_addr() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8765 }
fn default_base_path() -> String { "/mcp".to_string() }

impl Default for Server {
    fn default() -> Self { Self { bind_addr: default_bind_addr(), port: default_port(), base_path: default_base_path() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    #[serde(default = "default_max_request_kb")]
    pub max_request_kb: usize,
}
fn default_max_request_kb() -> usize { 256 }

impl Default for Limits {
    fn default() -> Self { Self { max_request_kb: default_max_request_kb() } }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Ollama `/api/generate`.
    Ollama,
    /// OpenAI-compatible `/v1/chat/completions` (llama.cpp server, vLLM, ...).
    Chat,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "chat" | "openai" => Ok(BackendKind::Chat),
            other => anyhow::bail!("unknown model backend: {other}"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Model {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_batch")]
    pub batch: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    /// Force one generation at a time even if the backend accepts more.
    #[serde(default)]
    pub serialize: bool,
}
fn default_backend() -> BackendKind { BackendKind::Ollama }
fn default_model_name() -> String { "qwen2.5:7b-instruct-q4_0".to_string() }
fn default_endpoint() -> String { "http://127.0.0.1:11434".to_string() }
fn default_context_size() -> u32 { 4096 }
fn default_threads() -> u32 { std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1) }
fn default_batch() -> u32 { 512 }
fn default_temperature() -> f32 { 0.2 }
fn default_max_output_tokens() -> u32 { 512 }
fn default_timeout_s() -> u64 { 120 }

impl Default for Model {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            name: default_model_name(),
            endpoint: default_endpoint(),
            api_key: None,
            context_size: default_context_size(),
            threads: default_threads(),
            batch: default_batch(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_s: default_timeout_s(),
            serialize: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// Overlays environment variables on top of file values.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("ALLOWED_ROOT") { self.root.root_dir = PathBuf::from(v); }
        if let Some(v) = lookup("BIND_ADDR") { self.server.bind_addr = v; }
        override_parsed(&lookup, "PORT", &mut self.server.port)?;
        override_parsed(&lookup, "MODEL_BACKEND", &mut self.model.backend)?;
        if let Some(v) = lookup("MODEL_NAME") { self.model.name = v; }
        if let Some(v) = lookup("MODEL_ENDPOINT") { self.model.endpoint = v; }
        if let Some(v) = lookup("MODEL_API_KEY") { self.model.api_key = Some(v); }
        override_parsed(&lookup, "CONTEXT_SIZE", &mut self.model.context_size)?;
        override_parsed(&lookup, "N_THREADS", &mut self.model.threads)?;
        override_parsed(&lookup, "N_BATCH", &mut self.model.batch)?;
        override_parsed(&lookup, "TEMPERATURE", &mut self.model.temperature)?;
        override_parsed(&lookup, "MAX_OUTPUT_TOKENS", &mut self.model.max_output_tokens)?;
        override_parsed(&lookup, "MODEL_TIMEOUT_S", &mut self.model.timeout_s)?;
        override_parsed(&lookup, "MODEL_SERIALIZE", &mut self.model.serialize)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root.root_dir.as_os_str().is_empty() { anyhow::bail!("root_dir must not be empty"); }
        if !self.root.root_dir.is_dir() {
            anyhow::bail!("root_dir does not exist or is not a directory: {}", self.root.root_dir.display());
        }
        if self.model.name.trim().is_empty() { anyhow::bail!("model name must not be empty"); }
        let endpoint = self.model.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!("model endpoint must start with http:// or https://: {endpoint}");
        }
        if !(0.0..=2.0).contains(&self.model.temperature) { anyhow::bail!("temperature must be within [0, 2]"); }
        if self.model.max_output_tokens == 0 { anyhow::bail!("max_output_tokens must be > 0"); }
        if self.model.context_size == 0 { anyhow::bail!("context_size must be > 0"); }
        if self.model.threads == 0 { anyhow::bail!("threads must be > 0"); }
        if self.model.batch == 0 { anyhow::bail!("batch must be > 0"); }
        if self.model.timeout_s == 0 { anyhow::bail!("timeout_s must be > 0"); }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        Ok(())
    }
}

fn override_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) -> anyhow::Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}"))?;
    }
    Ok(())
}
