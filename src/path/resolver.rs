// src/path/resolver.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{DirflowError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::path::clean;

/// Environment variable holding colon-separated search roots.
pub const SEARCH_PATH_ENV: &str = "DIRFLOW_PATH";

/// Turns a user-supplied path into an absolute path that exists.
///
/// Candidates are tried in order:
/// 1. the path itself, if absolute;
/// 2. the path joined onto each configured search root;
/// 3. the path joined onto the working directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    roots: Vec<PathBuf>,
    cwd: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PathResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            cwd: std::env::current_dir().ok(),
            fs: Arc::new(RealFileSystem),
        }
    }

    /// Build a resolver from `DIRFLOW_PATH`. The variable is read once, here.
    pub fn from_env() -> Self {
        let value = std::env::var(SEARCH_PATH_ENV).ok();
        Self::new(split_search_roots(value.as_deref()))
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn resolve(&self, raw: impl AsRef<Path>) -> Result<PathBuf> {
        let raw = raw.as_ref();

        if raw.is_absolute() {
            let candidate = clean(raw);
            if self.fs.exists(&candidate) {
                return Ok(candidate);
            }
        }

        for root in &self.roots {
            let candidate = clean(&root.join(raw));
            if self.fs.exists(&candidate) {
                debug!(?raw, root = ?root, "resolved through search root");
                return Ok(candidate);
            }
        }

        if let Some(cwd) = &self.cwd {
            let candidate = clean(&cwd.join(raw));
            if candidate.is_absolute() && self.fs.exists(&candidate) {
                return Ok(candidate);
            }
        }

        Err(DirflowError::PathNotFound(raw.display().to_string()))
    }
}

/// Split a colon-separated list of search roots, skipping empty entries.
pub fn split_search_roots(value: Option<&str>) -> Vec<PathBuf> {
    value
        .map(|v| {
            v.split(':')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}
