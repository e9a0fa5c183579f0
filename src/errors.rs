use axum::{http::StatusCode, Json};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("access to {} is outside allowed root {}", .resolved.display(), .root.display())]
    OutOfBounds { resolved: PathBuf, root: PathBuf },
    #[error("expected a file path, got directory: {}", .0.display())]
    IsDirectory(PathBuf),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("unknown tool or prompt: {0}")]
    UnknownTool(String),
    #[error("tool error: {0}")]
    ToolError(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::OutOfBounds { .. } => "OutOfBounds",
            AppError::IsDirectory(_) => "IsDirectory",
            AppError::NotFound(_) => "NotFound",
            AppError::Io { .. } => "IoError",
            AppError::Backend(_) => "BackendError",
            AppError::UnknownTool(_) => "UnknownTool",
            AppError::ToolError(_) => "ToolError",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::OutOfBounds { .. } => StatusCode::FORBIDDEN,
            AppError::IsDirectory(_) | AppError::ToolError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::UnknownTool(_) => StatusCode::NOT_FOUND,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Io { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { code: self.code(), message: self.to_string() }
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn into_response(err: AppError) -> (StatusCode, Json<ErrorBody>) {
    (err.status(), Json(err.body()))
}
