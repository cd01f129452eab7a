// src/watch/backend.rs

//! `notify`-backed machinery shared by both watcher variants: the notify
//! callback feeding the raw channel, the batcher, and start/stop state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{DirflowError, Result};
use crate::exec::OutputSink;
use crate::types::{Event, EventSlice};
use crate::watch::batcher::spawn_batcher;
use crate::watch::convert::events_from_notify;

pub(crate) struct NotifyBackend {
    mode: RecursiveMode,
    inner: Option<RecommendedWatcher>,
    stop_tx: Option<oneshot::Sender<()>>,
    out: Option<OutputSink>,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("mode", &self.mode)
            .field("running", &self.inner.is_some())
            .finish()
    }
}

impl NotifyBackend {
    pub(crate) fn new(mode: RecursiveMode) -> Self {
        Self {
            mode,
            inner: None,
            stop_tx: None,
            out: None,
        }
    }

    pub(crate) fn set_verbose(&mut self, out: OutputSink) {
        self.out = Some(out);
    }

    pub(crate) fn start(
        &mut self,
        latency: Duration,
        paths: &[PathBuf],
    ) -> Result<mpsc::Receiver<EventSlice>> {
        if self.inner.is_some() {
            return Err(DirflowError::AlreadyRunning("watcher".to_string()));
        }

        // Channel from the blocking notify callback into the async batcher.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Event>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for ev in events_from_notify(event) {
                        if raw_tx.send(ev).is_err() {
                            // Batcher is gone; the watcher is being torn down.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, paths = ?err.paths, "file watch error");
                }
            },
            Config::default(),
        )
        .map_err(|e| DirflowError::InitializationError(e.to_string()))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let (batches, _handle) = spawn_batcher(raw_rx, latency, stop_rx);

        self.inner = Some(watcher);
        self.stop_tx = Some(stop_tx);

        for path in paths {
            if let Err(err) = self.add(path) {
                warn!(path = ?path, error = %err, "skipping path that cannot be watched");
                if let Some(out) = &self.out {
                    out.write_line(&err);
                }
            }
        }

        info!(mode = ?self.mode, paths = paths.len(), "file watcher started");
        Ok(batches)
    }

    pub(crate) fn add(&mut self, path: &Path) -> Result<()> {
        let Some(watcher) = self.inner.as_mut() else {
            return Ok(());
        };
        watcher
            .watch(path, self.mode)
            .map_err(|source| DirflowError::WatchError {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, "watching");
        if let Some(out) = &self.out {
            out.write_line(format!("> Watching {}", path.display()));
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, path: &Path) -> Result<()> {
        let Some(watcher) = self.inner.as_mut() else {
            return Ok(());
        };
        watcher
            .unwatch(path)
            .map_err(|source| DirflowError::WatchError {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, "unwatched");
        if let Some(out) = &self.out {
            out.write_line(format!("> Removing {}", path.display()));
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self) -> Result<()> {
        let (Some(watcher), Some(stop_tx)) = (self.inner.take(), self.stop_tx.take()) else {
            return Err(DirflowError::NotRunningError(
                "watcher not started or already stopped".to_string(),
            ));
        };
        // Dropping the notify watcher releases the OS handles; the batcher
        // then closes the batch stream.
        drop(watcher);
        let _ = stop_tx.send(());
        info!("file watcher stopped");
        if let Some(out) = &self.out {
            out.write_line("> Watcher stopped");
        }
        Ok(())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.is_some()
    }
}
