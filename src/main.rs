mod backend;
mod config;
mod errors;
mod logging;
mod mcp;
mod orchestrator;
mod prompt;
mod reader;
mod sandbox;
mod server;
mod tools;


use crate::{backend::GenerationParams, config::Config, orchestrator::Orchestrator, sandbox::Sandbox};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = Some(PathBuf::from(&args[i]));
            }
            _ => {}
        }
        i += 1;
    }

    let mut cfg = match config_path {
        Some(path) => Config::load(&path).with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new("fileqa.toml").is_file() => Config::load(Path::new("fileqa.toml")).context("loading config fileqa.toml")?,
        None => Config::default(),
    };
    cfg.apply_env().context("reading environment overrides")?;
    cfg.validate().context("validating config")?;

    let sandbox = Arc::new(Sandbox::new(&cfg.root.root_dir).context("resolving allowed root")?);

    // Nothing is served until the model is known to be loadable.
    let backend = backend::build(&cfg.model).context("building inference backend")?;
    backend
        .ensure_ready()
        .await
        .with_context(|| format!("model {} unavailable on {} backend", cfg.model.name, backend.name()))?;

    let orchestrator = Arc::new(Orchestrator::new(
        sandbox.clone(),
        backend.clone(),
        GenerationParams::from_model(&cfg.model),
        cfg.model.serialize,
    ));
    let registry = mcp::registry::ToolRegistry::new(orchestrator);

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(
        addr = %addr,
        base_path = %cfg.server.base_path,
        allowed_root = %sandbox.root().display(),
        backend = backend.name(),
        model = backend.model(),
        tools = ?registry.list_names(),
        "fileqa ready"
    );

    let state = server::AppState {
        cfg: Arc::new(cfg),
        registry: Arc::new(registry),
        backend: backend.name(),
        model: Arc::from(backend.model()),
    };
    server::serve(state).await
}
