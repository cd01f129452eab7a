// src/pipeline/tracker.rs

//! Consumer that extends recursive watches when new directories appear.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::pipeline::registry::WatchRegistry;
use crate::types::Event;

pub(crate) async fn track_new_directories(
    registry: Arc<WatchRegistry>,
    mut events: mpsc::Receiver<Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        // Stat + directory walk touch the filesystem; keep them off the
        // async workers.
        let registry = Arc::clone(&registry);
        let res =
            tokio::task::spawn_blocking(move || registry.rewatch_if_new_directory(&event)).await;
        if let Err(err) = res {
            warn!(error = %err, "recursive directory check panicked");
        }
    }
    debug!("recursive directory tracker finished");
}
