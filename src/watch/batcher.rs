// src/watch/batcher.rs

//! Time-windowed event batching.
//!
//! The batcher loop multiplexes four sources:
//! 1. a raw event arrives: append it to the buffer;
//! 2. the timer ticks: if the buffer is non-empty, arm the output;
//! 3. the output is armed and the consumer has room: hand over the buffer
//!    and start a fresh one;
//! 4. stop: exit and close the output channel.
//!
//! Raw events keep being accepted while a batch waits for the consumer, and
//! empty batches are never sent.

use std::mem;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

use crate::types::{Event, EventSlice};

pub const DEFAULT_BATCH_LATENCY: Duration = Duration::from_millis(300);

const BATCH_CAPACITY_HINT: usize = 10;

/// Spawn the batching loop. The returned receiver yields non-empty batches
/// and is closed once `stop` fires (or its sender is dropped).
pub fn spawn_batcher(
    raw_rx: mpsc::UnboundedReceiver<Event>,
    latency: Duration,
    stop: oneshot::Receiver<()>,
) -> (mpsc::Receiver<EventSlice>, JoinHandle<()>) {
    let (out_tx, out_rx) = mpsc::channel::<EventSlice>(1);
    let handle = tokio::spawn(run_batcher(raw_rx, out_tx, latency, stop));
    (out_rx, handle)
}

async fn run_batcher(
    mut raw_rx: mpsc::UnboundedReceiver<Event>,
    out_tx: mpsc::Sender<EventSlice>,
    latency: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(time::Instant::now() + latency, latency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut buf: EventSlice = Vec::with_capacity(BATCH_CAPACITY_HINT);
    let mut ready = false;
    let mut raw_open = true;

    debug!(?latency, "batcher started");

    loop {
        tokio::select! {
            event = raw_rx.recv(), if raw_open => match event {
                Some(event) => {
                    trace!(%event, "buffered event");
                    buf.push(event);
                }
                None => {
                    debug!("raw event source closed");
                    raw_open = false;
                }
            },
            _ = ticker.tick() => {
                if !buf.is_empty() {
                    ready = true;
                }
            }
            permit = out_tx.reserve(), if ready => match permit {
                Ok(permit) => {
                    let batch = mem::replace(&mut buf, Vec::with_capacity(BATCH_CAPACITY_HINT));
                    trace!(len = batch.len(), "sending batch");
                    permit.send(batch);
                    ready = false;
                }
                Err(_) => {
                    debug!("batch consumer went away");
                    break;
                }
            },
            _ = &mut stop => break,
        }
    }

    debug!("batcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Op;

    fn ev(name: &str) -> Event {
        Event::new(format!("/w/{name}"), Op::WRITE)
    }

    #[tokio::test(start_paused = true)]
    async fn one_window_one_batch_in_order() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let (mut out, _h) = spawn_batcher(raw_rx, DEFAULT_BATCH_LATENCY, stop_rx);

        for name in ["a", "b", "c"] {
            raw_tx.send(ev(name)).unwrap();
        }

        let batch = out.recv().await.unwrap();
        assert_eq!(batch, vec![ev("a"), ev("b"), ev("c")]);

        // Nothing else arrived, so no further (empty) batch.
        let next = time::timeout(Duration::from_secs(2), out.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_make_separate_batches() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let (mut out, _h) = spawn_batcher(raw_rx, DEFAULT_BATCH_LATENCY, stop_rx);

        raw_tx.send(ev("a")).unwrap();
        assert_eq!(out.recv().await.unwrap(), vec![ev("a")]);

        raw_tx.send(ev("b")).unwrap();
        assert_eq!(out.recv().await.unwrap(), vec![ev("b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_accepting_while_consumer_is_slow() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let (mut out, _h) = spawn_batcher(raw_rx, DEFAULT_BATCH_LATENCY, stop_rx);

        // First batch fills the single output slot and is never read while
        // further events keep arriving over several windows.
        raw_tx.send(ev("a")).unwrap();
        time::sleep(Duration::from_millis(400)).await;
        for (i, name) in ["b", "c", "d"].into_iter().enumerate() {
            raw_tx.send(ev(name)).unwrap();
            time::sleep(Duration::from_millis(100 * (i as u64 + 1))).await;
        }
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(out.recv().await.unwrap(), vec![ev("a")]);
        assert_eq!(out.recv().await.unwrap(), vec![ev("b"), ev("c"), ev("d")]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_the_output() {
        let (_raw_tx, raw_rx) = mpsc::unbounded_channel::<Event>();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (mut out, handle) = spawn_batcher(raw_rx, DEFAULT_BATCH_LATENCY, stop_rx);

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(out.recv().await.is_none());
    }
}
