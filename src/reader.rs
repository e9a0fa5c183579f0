use crate::{errors::{AppError, AppResult}, sandbox::ResolvedPath};
use std::fs;

/// Reads the whole file as text. Invalid UTF-8 is replaced with U+FFFD
/// instead of failing; only I/O errors surface.
pub fn read_text(path: &ResolvedPath) -> AppResult<String> {
    let bytes = fs::read(path).map_err(|source| AppError::Io { path: path.as_path().to_path_buf(), source })?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(path = %path.as_path().display(), "file is not valid utf-8, replacing invalid sequences");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    };
    Ok(text)
}
