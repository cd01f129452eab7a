// src/watch/portable.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use tokio::sync::mpsc;

use crate::errors::Result;
use crate::exec::OutputSink;
use crate::types::EventSlice;
use crate::watch::backend::NotifyBackend;
use crate::watch::Watcher;

/// Portable watcher: one non-recursive OS watch per registered directory.
///
/// Subdirectories are only seen if they are added explicitly, which is what
/// the pipeline's recursive-directory tracking does.
#[derive(Debug)]
pub struct PortableWatcher {
    backend: NotifyBackend,
}

impl PortableWatcher {
    pub fn new() -> Self {
        Self {
            backend: NotifyBackend::new(RecursiveMode::NonRecursive),
        }
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }
}

impl Default for PortableWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Watcher for PortableWatcher {
    fn set_verbose(&mut self, out: OutputSink) {
        self.backend.set_verbose(out);
    }

    fn start(
        &mut self,
        latency: Duration,
        paths: &[PathBuf],
    ) -> Result<mpsc::Receiver<EventSlice>> {
        self.backend.start(latency, paths)
    }

    fn add(&mut self, path: &Path) -> Result<()> {
        self.backend.add(path)
    }

    fn remove(&mut self, path: &Path) -> Result<()> {
        self.backend.remove(path)
    }

    fn stop(&mut self) -> Result<()> {
        self.backend.stop()
    }

    fn is_recursive(&self) -> bool {
        false
    }
}
