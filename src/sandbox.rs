//! Path sandbox: admits caller-supplied paths only when their fully resolved
//! form lies strictly inside the allowed root.
//!
//! Containment is decided on the symlink-resolved path before anything about
//! the target (existence, type) is looked at, so callers learn nothing about
//! the filesystem outside the root beyond "out of bounds".

use crate::errors::{AppError, AppResult};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Upper bound on symlinks followed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

/// A path that passed [`Sandbox::validate`]. Canonical, inside the root and
/// naming an existing non-directory entry at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        let root = canonicalize_existing(root)?;
        if !root.is_dir() {
            anyhow::bail!("allowed root is not a directory: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate(&self, candidate: &str) -> AppResult<ResolvedPath> {
        let expanded = expand_home(candidate);
        let absolute = if expanded.is_absolute() { expanded } else { self.root.join(expanded) };
        let resolved = match resolve(&absolute) {
            Ok(resolved) => resolved,
            Err(source) => {
                // Unresolvable paths outside the root get the same answer as any other outside path.
                let normalized = normalize_lexically(&absolute);
                if !self.contains(&normalized) {
                    return Err(self.out_of_bounds(candidate, normalized));
                }
                return Err(AppError::Io { path: normalized, source });
            }
        };

        if !self.contains(&resolved) {
            return Err(self.out_of_bounds(candidate, resolved));
        }

        match fs::metadata(&resolved) {
            Ok(meta) if meta.is_dir() => Err(AppError::IsDirectory(resolved)),
            Ok(_) => Ok(ResolvedPath(resolved)),
            Err(source) if source.kind() == io::ErrorKind::PermissionDenied => Err(AppError::Io { path: resolved, source }),
            Err(_) => Err(AppError::NotFound(resolved)),
        }
    }

    fn contains(&self, path: &Path) -> bool {
        path != self.root && path.starts_with(&self.root)
    }

    fn out_of_bounds(&self, candidate: &str, resolved: PathBuf) -> AppError {
        tracing::warn!(candidate, resolved = %resolved.display(), "path rejected: outside allowed root");
        AppError::OutOfBounds { resolved, root: self.root.clone() }
    }
}

/// Drops `.` and pops `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `~` and `~/rest` expand to the home directory; `~user` forms are left alone.
fn expand_home(candidate: &str) -> PathBuf {
    let rest = match candidate.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR) => rest,
        _ => return PathBuf::from(candidate),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', std::path::MAIN_SEPARATOR])),
        None => PathBuf::from(candidate),
    }
}

fn canonicalize_existing(path: &Path) -> io::Result<PathBuf> {
    dunce::canonicalize(path)
}

/// Resolves `path` the way `realpath` does, but tolerates a missing tail.
///
/// The fully existing case goes through `dunce::canonicalize`. Otherwise the
/// path is walked component by component: the prefix built so far is always
/// symlink-free, so `..` can pop it, and every existing symlink is replaced
/// by its (recursively resolved) target.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    match canonicalize_existing(path) {
        Ok(p) => Ok(p),
        Err(_) => {
            let mut hops = 0;
            resolve_lossy(path, &mut hops)
        }
    }
}

fn resolve_lossy(path: &Path, hops: &mut usize) -> io::Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => {
                let next = out.join(name);
                match fs::symlink_metadata(&next) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        *hops += 1;
                        if *hops > MAX_SYMLINK_HOPS {
                            return Err(io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"));
                        }
                        let target = fs::read_link(&next)?;
                        let target = if target.is_absolute() { target } else { out.join(target) };
                        out = resolve_lossy(&target, hops)?;
                    }
                    // Missing or unreadable entries cannot redirect anywhere.
                    _ => out = next,
                }
            }
        }
    }
    Ok(out)
}
