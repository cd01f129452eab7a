// src/path/transform.rs

//! Target transformers: functions from a task's source path to the path of
//! the artifact it produces (e.g. `style.scss` -> `style.css`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type Transformer = Arc<dyn Fn(&Path) -> PathBuf + Send + Sync>;

/// Target is the source itself.
pub fn identity() -> Transformer {
    Arc::new(|p: &Path| p.to_path_buf())
}

/// Replace (or add) the extension of the source path.
pub fn ext_transformer(new_ext: impl Into<String>) -> Transformer {
    let new_ext = new_ext.into();
    Arc::new(move |p: &Path| p.with_extension(new_ext.trim_start_matches('.')))
}

/// Directory of `path` relative to `base`, or an empty path when `path` is
/// not below `base`.
pub fn rel_dir(base: &Path, path: &Path) -> PathBuf {
    path.parent()
        .and_then(|dir| dir.strip_prefix(base).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// `path` relative to `base`, or an empty path when it is not below `base`.
pub fn rel_base(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
