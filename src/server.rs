use crate::{
    config::Config,
    errors::{into_response, AppError},
    mcp::{
        registry::{CallRequest, CallResponse, PromptRequest, ToolRegistry},
        types::{Capabilities, PromptInfo, ToolInfo},
    },
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub registry: Arc<ToolRegistry>,
    pub backend: &'static str,
    pub model: Arc<str>,
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", state.cfg.server.bind_addr, state.cfg.server.port).parse()?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let base = state.cfg.server.base_path.trim_end_matches('/').to_string();
    let limit_bytes = state.cfg.limits.max_request_kb * 1024;
    Router::new()
        .route("/healthz", get(health))
        .route(&format!("{base}/capabilities"), get(capabilities))
        .route(&format!("{base}/call"), post(call))
        .route(&format!("{base}/prompt"), post(prompt))
        .layer(RequestBodyLimitLayer::new(limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok", "backend": state.backend, "model": &*state.model})))
}

async fn capabilities(State(state): State<AppState>) -> Response {
    let tools: Vec<ToolInfo> = state
        .registry
        .tools()
        .map(|t| {
            let caps = t.capabilities();
            ToolInfo { name: t.name().to_string(), input_schema: caps["input"].clone(), output_schema: caps["output"].clone() }
        })
        .collect();
    let prompts: Vec<PromptInfo> = state
        .registry
        .prompts()
        .map(|p| PromptInfo { name: p.name().to_string(), arguments: p.arguments() })
        .collect();
    let caps = Capabilities { mcp_version: "1.0", server: "fileqa", tools, prompts };
    (StatusCode::OK, Json(caps)).into_response()
}

async fn call(State(state): State<AppState>, body: Result<Json<CallRequest>, JsonRejection>) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return reject(&request_id, "-", started, rejection),
    };

    let Some(tool) = state.registry.get(&req.tool) else {
        let e = AppError::UnknownTool(req.tool.clone());
        audit(&request_id, &req.tool, "deny", e.code(), started, 0);
        return into_response(e).into_response();
    };

    match tool.call(req.params).await {
        Ok(result) => {
            let payload = CallResponse::ok(req.id, result);
            let bytes_out = serde_json::to_vec(&payload).map(|v| v.len()).unwrap_or(0) as u64;
            audit(&request_id, &req.tool, "allow", "OK", started, bytes_out);
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => {
            let status = e.status();
            let payload = CallResponse::err(req.id, &e);
            let bytes_out = serde_json::to_vec(&payload).map(|v| v.len()).unwrap_or(0) as u64;
            let decision = if matches!(e, AppError::OutOfBounds { .. }) { "deny" } else { "error" };
            audit(&request_id, &req.tool, decision, e.code(), started, bytes_out);
            (status, Json(payload)).into_response()
        }
    }
}

async fn prompt(State(state): State<AppState>, body: Result<Json<PromptRequest>, JsonRejection>) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return reject(&request_id, "-", started, rejection),
    };

    let Some(template) = state.registry.get_prompt(&req.prompt) else {
        let e = AppError::UnknownTool(req.prompt.clone());
        audit(&request_id, &req.prompt, "deny", e.code(), started, 0);
        return into_response(e).into_response();
    };

    match template.render(&req.params) {
        Ok(result) => {
            audit(&request_id, &req.prompt, "allow", "OK", started, 0);
            (StatusCode::OK, Json(CallResponse::ok(req.id, result))).into_response()
        }
        Err(e) => {
            audit(&request_id, &req.prompt, "error", e.code(), started, 0);
            (e.status(), Json(CallResponse::err(req.id, &e))).into_response()
        }
    }
}

/// Malformed bodies get the regular error envelope; oversized ones keep their 413.
fn reject(request_id: &str, tool: &str, started: Instant, rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        audit(request_id, tool, "deny", "RequestTooLarge", started, 0);
        return rejection.into_response();
    }
    let e = AppError::ToolError(format!("invalid request body: {}", rejection.body_text()));
    audit(request_id, tool, "deny", e.code(), started, 0);
    (e.status(), Json(CallResponse::err(String::new(), &e))).into_response()
}

fn audit(request_id: &str, tool: &str, decision: &str, code: &str, started: Instant, bytes_out: u64) {
    tracing::info!(
        request_id = request_id,
        tool = tool,
        decision = decision,
        code = code,
        duration_ms = started.elapsed().as_millis() as u64,
        bytes_out = bytes_out,
        "audit"
    );
}
