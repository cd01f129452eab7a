// src/pipeline/fanout.rs

//! Forward every event of every batch to both pipeline consumers.

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::types::{Event, EventSlice};

/// Runs until the batch stream closes or shutdown is signalled.
///
/// Events keep their batch order on both channels. Each send also watches
/// the shutdown signal, so a stalled consumer cannot keep the loop alive
/// after `stop`.
pub(crate) async fn distribute(
    mut batches: mpsc::Receiver<EventSlice>,
    recursive_tx: mpsc::Sender<Event>,
    workflow_tx: mpsc::Sender<Event>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let batch = tokio::select! {
            batch = batches.recv() => match batch {
                Some(batch) => batch,
                None => {
                    debug!("batch stream closed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        };

        trace!(len = batch.len(), "distributing batch");
        for event in batch {
            if !forward(&recursive_tx, event.clone(), &mut shutdown).await
                || !forward(&workflow_tx, event, &mut shutdown).await
            {
                debug!("fan-out interrupted");
                return;
            }
        }
    }
    debug!("fan-out finished");
}

/// Returns false if shutdown fired or the consumer is gone.
async fn forward(
    tx: &mpsc::Sender<Event>,
    event: Event,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        res = tx.send(event) => res.is_ok(),
        _ = shutdown.changed() => false,
    }
}
