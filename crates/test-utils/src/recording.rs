use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dirflow::path::Transformer;
use dirflow::workflow::{TaskFuture, TaskInfo, Tasker};

/// A task that:
/// - records the source it was given
/// - optionally sleeps, sets a target, or fails.
///
/// Clones share the same records, so keep one clone in the test and move
/// the other into a workflow.
#[derive(Clone, Default)]
pub struct RecordingTask {
    sources: Arc<Mutex<Vec<PathBuf>>>,
    completed: Arc<AtomicUsize>,
    transform: Option<Transformer>,
    delay: Option<Duration>,
    fail: bool,
}

impl RecordingTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, transform: Transformer) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Every source seen, in call order.
    pub fn sources(&self) -> Vec<PathBuf> {
        self.sources.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    /// Runs that got past the delay (successfully or not).
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Tasker for RecordingTask {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a> {
        Box::pin(async move {
            self.sources.lock().unwrap().push(info.source.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);

            if let Some(transform) = &self.transform {
                info.target = transform(&info.source);
            }
            if self.fail {
                anyhow::bail!("recording task failed on {}", info.source.display());
            }
            Ok(())
        })
    }
}
