// src/watch/watcher.rs

//! The capability every watcher implementation satisfies, and the runtime
//! factory that picks one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::exec::OutputSink;
use crate::types::{EventSlice, WatcherKind};
use crate::watch::{NativeWatcher, PortableWatcher};

/// A filesystem change source.
///
/// `start` hands back a stream of non-empty batches. The stream is lazy,
/// unbounded and not restartable; it closes without error once `stop` has
/// completed. Calling `start` again after `stop` yields a fresh stream.
pub trait Watcher: Send {
    /// Report watch/unwatch activity to `out`.
    fn set_verbose(&mut self, out: OutputSink);

    /// Create the OS facility and begin watching `paths`. Fails with
    /// `InitializationError` if the facility cannot be created; a path that
    /// cannot be watched is logged and skipped.
    fn start(
        &mut self,
        latency: Duration,
        paths: &[PathBuf],
    ) -> Result<mpsc::Receiver<EventSlice>>;

    /// Add a path. Fails with `WatchError` if the path cannot be monitored.
    /// Before `start` this is a no-op.
    fn add(&mut self, path: &Path) -> Result<()>;

    fn remove(&mut self, path: &Path) -> Result<()>;

    /// Fails with `NotRunningError` before `start` or after a prior `stop`.
    fn stop(&mut self) -> Result<()>;

    /// True when every watch implicitly covers its whole subtree, so callers
    /// must not walk directories themselves.
    fn is_recursive(&self) -> bool;
}

/// Build the watcher for `kind`, resolving `Auto` by platform.
pub fn new_watcher(kind: WatcherKind) -> Box<dyn Watcher> {
    match kind.resolve() {
        WatcherKind::Native => Box::new(NativeWatcher::new()),
        _ => Box::new(PortableWatcher::new()),
    }
}
