// src/watch/native.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::exec::OutputSink;
use crate::types::EventSlice;
use crate::watch::backend::NotifyBackend;
use crate::watch::Watcher;

/// Native watcher: every watch covers the full subtree (FSEvents on macOS).
///
/// Because recursion is implicit, adding a directory that already sits
/// under a watched root is skipped, and adding a parent of existing roots
/// replaces them.
#[derive(Debug)]
pub struct NativeWatcher {
    backend: NotifyBackend,
    roots: Vec<PathBuf>,
}

impl NativeWatcher {
    pub fn new() -> Self {
        Self {
            backend: NotifyBackend::new(RecursiveMode::Recursive),
            roots: Vec::new(),
        }
    }

    fn covered(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

impl Default for NativeWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Watcher for NativeWatcher {
    fn set_verbose(&mut self, out: OutputSink) {
        self.backend.set_verbose(out);
    }

    fn start(
        &mut self,
        latency: Duration,
        paths: &[PathBuf],
    ) -> Result<mpsc::Receiver<EventSlice>> {
        self.roots.clear();
        let batches = self.backend.start(latency, &[])?;
        let mut ordered: Vec<&PathBuf> = paths.iter().collect();
        ordered.sort_by_key(|path| path.components().count());
        for path in ordered {
            if let Err(err) = self.add(path) {
                warn!(path = ?path, error = %err, "skipping path that cannot be watched");
            }
        }
        Ok(batches)
    }

    fn add(&mut self, path: &Path) -> Result<()> {
        if !self.backend.is_running() {
            return Ok(());
        }
        if self.covered(path) {
            debug!(?path, "already covered by a recursive watch");
            return Ok(());
        }
        self.backend.add(path)?;
        let (nested, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.roots)
            .into_iter()
            .partition(|root| root.starts_with(path));
        self.roots = kept;
        for root in nested {
            if let Err(err) = self.backend.remove(&root) {
                debug!(path = ?root, error = %err, "could not drop nested watch");
            }
        }
        self.roots.push(path.to_path_buf());
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        let before = self.roots.len();
        self.roots.retain(|root| root != path);
        if self.roots.len() == before {
            return Ok(());
        }
        self.backend.remove(path)
    }

    fn stop(&mut self) -> Result<()> {
        self.roots.clear();
        self.backend.stop()
    }

    fn is_recursive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn child_listed_before_parent_shares_the_parent_watch() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let child = root.join("a").join("b");
        std::fs::create_dir_all(&child).unwrap();

        let mut watcher = NativeWatcher::new();
        let _batches = watcher
            .start(Duration::from_millis(50), &[child.clone(), root.clone()])
            .unwrap();
        assert_eq!(watcher.roots, vec![root.clone()]);

        watcher.add(&root.join("a")).unwrap();
        assert_eq!(watcher.roots, vec![root.clone()]);
        watcher.stop().unwrap();
    }

    #[tokio::test]
    async fn adding_a_parent_replaces_nested_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let left = root.join("left");
        let right = root.join("right");
        std::fs::create_dir_all(&left).unwrap();
        std::fs::create_dir_all(&right).unwrap();

        let mut watcher = NativeWatcher::new();
        let _batches = watcher
            .start(Duration::from_millis(50), &[left.clone(), right.clone()])
            .unwrap();
        assert_eq!(watcher.roots.len(), 2);

        watcher.add(&root).unwrap();
        assert_eq!(watcher.roots, vec![root.clone()]);
        watcher.stop().unwrap();
    }
}
