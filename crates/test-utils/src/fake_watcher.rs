use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dirflow::errors::{DirflowError, Result};
use dirflow::exec::OutputSink;
use dirflow::types::EventSlice;
use dirflow::watch::Watcher;
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
struct FakeState {
    tx: Option<mpsc::Sender<EventSlice>>,
    started_with: Vec<PathBuf>,
    added: Vec<PathBuf>,
    starts: usize,
}

/// A watcher that never touches the OS:
/// - records the paths handed to `start` and `add`
/// - delivers whatever batches the test pushes through its handle.
pub struct FakeWatcher {
    state: Arc<Mutex<FakeState>>,
    started: Arc<Notify>,
    recursive: bool,
}

/// Test-side view of a [`FakeWatcher`] that has been moved into a pipeline.
#[derive(Clone)]
pub struct FakeWatcherHandle {
    state: Arc<Mutex<FakeState>>,
    started: Arc<Notify>,
}

impl FakeWatcher {
    pub fn new() -> (Self, FakeWatcherHandle) {
        Self::with_recursion(false)
    }

    /// A fake that claims to cover whole subtrees, like the native watcher.
    pub fn recursive() -> (Self, FakeWatcherHandle) {
        Self::with_recursion(true)
    }

    fn with_recursion(recursive: bool) -> (Self, FakeWatcherHandle) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let started = Arc::new(Notify::new());
        let handle = FakeWatcherHandle {
            state: Arc::clone(&state),
            started: Arc::clone(&started),
        };
        (
            Self {
                state,
                started,
                recursive,
            },
            handle,
        )
    }
}

impl Watcher for FakeWatcher {
    fn set_verbose(&mut self, _out: OutputSink) {}

    fn start(
        &mut self,
        _latency: Duration,
        paths: &[PathBuf],
    ) -> Result<mpsc::Receiver<EventSlice>> {
        let (tx, rx) = mpsc::channel(16);
        {
            let mut state = self.state.lock().unwrap();
            if state.tx.is_some() {
                return Err(DirflowError::AlreadyRunning("fake watcher".to_string()));
            }
            state.tx = Some(tx);
            state.started_with = paths.to_vec();
            state.starts += 1;
        }
        self.started.notify_waiters();
        Ok(rx)
    }

    fn add(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.tx.is_some() {
            state.added.push(path.to_path_buf());
        }
        Ok(())
    }

    fn remove(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        match self.state.lock().unwrap().tx.take() {
            Some(_) => Ok(()),
            None => Err(DirflowError::NotRunningError("fake watcher".to_string())),
        }
    }

    fn is_recursive(&self) -> bool {
        self.recursive
    }
}

impl FakeWatcherHandle {
    /// Push one batch into the running stream. Returns false if the watcher
    /// is not running.
    pub async fn emit(&self, batch: EventSlice) -> bool {
        let tx = self.state.lock().unwrap().tx.clone();
        match tx {
            Some(tx) => tx.send(batch).await.is_ok(),
            None => false,
        }
    }

    /// Close the stream without going through `stop`, as if the OS facility
    /// went away.
    pub fn close(&self) {
        self.state.lock().unwrap().tx = None;
    }

    pub async fn wait_started(&self) {
        loop {
            let notified = self.started.notified();
            if self.is_started() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().tx.is_some()
    }

    /// Paths passed to the most recent `start`.
    pub fn started_with(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().started_with.clone()
    }

    /// Paths added while running.
    pub fn added(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().added.clone()
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().unwrap().starts
    }
}
