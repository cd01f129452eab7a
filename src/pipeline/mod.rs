// src/pipeline/mod.rs

//! The pipeline: a set of watched directories, a set of workflows and the
//! event loop that connects them.
//!
//! ```text
//!   watcher ──batches──► fan-out ──► tracker     (extends recursive watches)
//!                               └──► dispatcher  (runs matching workflows)
//! ```
//!
//! Every event is delivered to both consumers, in batch order. `start`
//! drives the fan-out on the caller's task and returns once `stop` has been
//! called or the watcher stream ends.

mod dispatch;
mod fanout;
pub(crate) mod registry;
mod tracker;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::{DirflowError, Result};
use crate::exec::OutputSink;
use crate::fs::{FileSystem, RealFileSystem};
use crate::path::PathResolver;
use crate::types::{Event, WatcherKind};
use crate::watch::{new_watcher, Watcher, DEFAULT_BATCH_LATENCY};
use crate::workflow::Workflower;

pub use dispatch::{dispatch_event, DispatchContext};
pub use registry::{owning_root, RecursiveRoot, WatchSet};

use registry::{lock, WatchRegistry};

/// Name used when a pipeline is created without one.
pub const UNNAMED: &str = "<UNNAMED>";

/// Capacity of the channel feeding the recursive-directory tracker.
pub const DEFAULT_RECURSIVE_CAPACITY: usize = 25;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Print watch and lifecycle activity to the output sink.
    pub verbose: bool,
    pub batch_latency: Duration,
    pub recursive_capacity: usize,
    pub watcher_kind: WatcherKind,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            batch_latency: DEFAULT_BATCH_LATENCY,
            recursive_capacity: DEFAULT_RECURSIVE_CAPACITY,
            watcher_kind: WatcherKind::Auto,
        }
    }
}

enum Lifecycle {
    Idle,
    Starting,
    Running { run: u64, shutdown: watch::Sender<bool> },
    Stopped,
}

impl Lifecycle {
    fn label(&self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Starting => "starting",
            Lifecycle::Running { .. } => "running",
            Lifecycle::Stopped => "stopped",
        }
    }
}

pub struct Pipeline {
    name: String,
    options: PipelineOptions,
    out: OutputSink,
    err: OutputSink,
    registry: Arc<WatchRegistry>,
    workflows: Mutex<Vec<Arc<dyn Workflower>>>,
    lifecycle: Mutex<Lifecycle>,
    next_run: AtomicU64,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("workflows", &lock(&self.workflows).len())
            .field("state", &lock(&self.lifecycle).label())
            .finish()
    }
}

/// Assembles a [`Pipeline`], letting callers swap out the filesystem,
/// resolver, watcher and output sinks.
pub struct PipelineBuilder {
    name: String,
    options: PipelineOptions,
    fs: Option<Arc<dyn FileSystem>>,
    resolver: Option<PathResolver>,
    watcher: Option<Box<dyn Watcher>>,
    out: OutputSink,
    err: OutputSink,
}

impl PipelineBuilder {
    fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { UNNAMED.to_string() } else { name },
            options: PipelineOptions::default(),
            fs: None,
            resolver: None,
            watcher: None,
            out: OutputSink::stdout(),
            err: OutputSink::stderr(),
        }
    }

    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use this watcher instead of one built from `options.watcher_kind`.
    pub fn watcher(mut self, watcher: Box<dyn Watcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn out(mut self, out: OutputSink) -> Self {
        self.out = out;
        self
    }

    pub fn err(mut self, err: OutputSink) -> Self {
        self.err = err;
        self
    }

    pub fn build(self) -> Pipeline {
        let fs: Arc<dyn FileSystem> = self.fs.unwrap_or_else(|| Arc::new(RealFileSystem));
        let resolver = self
            .resolver
            .unwrap_or_else(PathResolver::from_env)
            .with_file_system(Arc::clone(&fs));
        let watcher = self
            .watcher
            .unwrap_or_else(|| new_watcher(self.options.watcher_kind));

        let registry = WatchRegistry::new(
            fs,
            resolver,
            watcher,
            self.options.verbose,
            self.out.clone(),
            self.err.clone(),
        );

        Pipeline {
            name: self.name,
            options: self.options,
            out: self.out,
            err: self.err,
            registry: Arc::new(registry),
            workflows: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(Lifecycle::Idle),
            next_run: AtomicU64::new(0),
        }
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, options: PipelineOptions) -> Self {
        Self::builder(name).options(options).build()
    }

    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Add one directory (non-recursively). Duplicates are ignored. While
    /// the pipeline is running the directory is handed to the live watcher.
    pub fn watch(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.registry.watch(dir.as_ref())
    }

    /// Watch `root` and every directory below it. Directories created under
    /// the root later are picked up automatically while the pipeline runs.
    /// Only a failure to resolve `root` is returned; per-directory failures
    /// are logged and skipped.
    pub fn watch_recursive(&self, root: impl AsRef<Path>, ignore_hidden: bool) -> Result<PathBuf> {
        self.registry.watch_recursive(root.as_ref(), ignore_hidden)
    }

    pub fn add_workflow(&self, workflow: impl Workflower + 'static) {
        self.add_shared_workflow(Arc::new(workflow));
    }

    pub fn add_shared_workflow(&self, workflow: Arc<dyn Workflower>) {
        debug!(pipeline = %self.name, workflow = %workflow.name(), "workflow registered");
        lock(&self.workflows).push(workflow);
    }

    pub fn extend_workflows<I>(&self, workflows: I)
    where
        I: IntoIterator<Item = Arc<dyn Workflower>>,
    {
        for workflow in workflows {
            self.add_shared_workflow(workflow);
        }
    }

    pub fn workflow_count(&self) -> usize {
        lock(&self.workflows).len()
    }

    /// Snapshot of the watch set, in registration order.
    pub fn watches(&self) -> Vec<PathBuf> {
        self.registry.watches()
    }

    pub fn recursive_roots(&self) -> Vec<RecursiveRoot> {
        self.registry.recursive_roots()
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.lifecycle), Lifecycle::Running { .. })
    }

    /// Offer a single event to the registered workflows without going
    /// through the watcher. Returns the number of workflows triggered.
    pub async fn dispatch(&self, event: &Event) -> usize {
        let workflows = self.workflow_snapshot();
        dispatch_event(&workflows, event, &self.dispatch_context()).await
    }

    fn workflow_snapshot(&self) -> Arc<[Arc<dyn Workflower>]> {
        lock(&self.workflows).iter().cloned().collect()
    }

    fn dispatch_context(&self) -> DispatchContext {
        DispatchContext {
            out: self.out.clone(),
            err: self.err.clone(),
            verbose: self.options.verbose,
        }
    }

    /// Run the pipeline until [`stop`](Self::stop) is called or the watcher
    /// stream ends.
    ///
    /// A pipeline with nothing to watch or no workflows still starts, with a
    /// warning. Fails with `AlreadyRunning` if another `start` is in
    /// progress, or with the watcher's error if it cannot be brought up.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = lock(&self.lifecycle);
            if matches!(*state, Lifecycle::Starting | Lifecycle::Running { .. }) {
                return Err(DirflowError::AlreadyRunning(format!(
                    "pipeline {} is {}",
                    self.name,
                    state.label()
                )));
            }
            *state = Lifecycle::Starting;
        }

        self.warn_if_inert();

        let batches = match self.registry.start_watcher(self.options.batch_latency) {
            Ok(batches) => batches,
            Err(err) => {
                *lock(&self.lifecycle) = Lifecycle::Idle;
                return Err(err);
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (recursive_tx, recursive_rx) = mpsc::channel(self.options.recursive_capacity.max(1));
        let (workflow_tx, workflow_rx) = mpsc::channel(1);

        let tracker = tokio::spawn(tracker::track_new_directories(
            Arc::clone(&self.registry),
            recursive_rx,
            shutdown_rx.clone(),
        ));
        let dispatcher = tokio::spawn(dispatch::dispatch_workflows(
            self.workflow_snapshot(),
            self.dispatch_context(),
            workflow_rx,
            shutdown_rx.clone(),
        ));

        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        *lock(&self.lifecycle) = Lifecycle::Running {
            run,
            shutdown: shutdown_tx,
        };
        info!(pipeline = %self.name, watches = self.watches().len(), "pipeline started");

        fanout::distribute(batches, recursive_tx, workflow_tx, shutdown_rx).await;

        for (consumer, handle) in [("tracker", tracker), ("dispatcher", dispatcher)] {
            if let Err(err) = handle.await {
                warn!(pipeline = %self.name, consumer, error = %err, "consumer task failed");
            }
        }

        // The stream can end on its own (watcher gone); settle the state so
        // a later `stop` reports the pipeline as already stopped. A newer run
        // may already own the state after a stop and restart.
        let ended_by_itself = {
            let mut state = lock(&self.lifecycle);
            if matches!(*state, Lifecycle::Running { run: current, .. } if current == run) {
                *state = Lifecycle::Stopped;
                true
            } else {
                false
            }
        };
        if ended_by_itself {
            debug!(pipeline = %self.name, "event stream ended without stop");
            if let Err(err) = self.registry.stop_watcher() {
                debug!(pipeline = %self.name, error = %err, "watcher already stopped");
            }
        }

        info!(pipeline = %self.name, "pipeline finished");
        Ok(())
    }

    /// Stop a running pipeline. Fails with `NotRunningError` before `start`,
    /// while `start` is still bringing the watcher up, and after a previous
    /// `stop`.
    pub fn stop(&self) -> Result<()> {
        let shutdown = {
            let mut state = lock(&self.lifecycle);
            match std::mem::replace(&mut *state, Lifecycle::Stopped) {
                Lifecycle::Running { shutdown, .. } => shutdown,
                other => {
                    let reason = match other {
                        Lifecycle::Idle => "was not started",
                        Lifecycle::Starting => "is still starting",
                        _ => "is already stopped",
                    };
                    *state = other;
                    return Err(DirflowError::NotRunningError(format!(
                        "pipeline {} {reason}",
                        self.name
                    )));
                }
            }
        };

        let stopped = self.registry.stop_watcher();
        // Receivers may already be gone if the stream ended first.
        let _ = shutdown.send(true);

        info!(pipeline = %self.name, "pipeline stopped");
        if self.options.verbose {
            self.out.write_line("> Pipeline stopped");
        }
        stopped
    }

    fn warn_if_inert(&self) {
        if self.registry.watches().is_empty() {
            warn!(pipeline = %self.name, "pipeline is not watching anything");
            self.err
                .write_line(format!("Pipeline {} is not watching anything", self.name));
        }
        if lock(&self.workflows).is_empty() {
            warn!(pipeline = %self.name, "pipeline has no workflows");
            self.err
                .write_line(format!("Pipeline {} has no Workflows", self.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn mock_pipeline(fs: MockFileSystem) -> Pipeline {
        Pipeline::builder("test")
            .file_system(Arc::new(fs))
            .resolver(PathResolver::new(Vec::new()).with_cwd("/work"))
            .watcher(new_watcher(WatcherKind::Portable))
            .out(OutputSink::memory())
            .err(OutputSink::memory())
            .build()
    }

    #[test]
    fn empty_name_becomes_unnamed() {
        let p = Pipeline::builder("").build();
        assert_eq!(p.name(), UNNAMED);
    }

    #[test]
    fn default_options() {
        let opts = PipelineOptions::default();
        assert!(!opts.verbose);
        assert_eq!(opts.batch_latency, Duration::from_millis(300));
        assert_eq!(opts.recursive_capacity, 25);
        assert_eq!(opts.watcher_kind, WatcherKind::Auto);
    }

    #[test]
    fn stop_before_start_is_not_running() {
        let p = mock_pipeline(MockFileSystem::new());
        let err = p.stop().unwrap_err();
        assert!(err.is_not_running());
        // The failed stop does not poison a later start.
        assert!(!p.is_running());
        assert!(p.stop().unwrap_err().is_not_running());
    }

    #[test]
    fn watch_resolves_and_deduplicates() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/src");
        let p = mock_pipeline(fs);

        assert_eq!(p.watch("src").unwrap(), PathBuf::from("/work/src"));
        assert_eq!(p.watch("/work/src").unwrap(), PathBuf::from("/work/src"));
        assert_eq!(p.watches(), vec![PathBuf::from("/work/src")]);
    }

    #[test]
    fn unresolvable_watch_fails() {
        let p = mock_pipeline(MockFileSystem::new());
        let err = p.watch("missing").unwrap_err();
        assert!(matches!(err, DirflowError::PathNotFound(_)));
        assert!(p.watches().is_empty());
    }

    #[test]
    fn recursive_watch_prunes_hidden_dirs() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/proj/src/lib");
        fs.add_dir("/work/proj/.git/objects");
        fs.add_file("/work/proj/README");
        let p = mock_pipeline(fs);

        p.watch_recursive("proj", true).unwrap();

        assert_eq!(
            p.watches(),
            vec![
                PathBuf::from("/work/proj"),
                PathBuf::from("/work/proj/src"),
                PathBuf::from("/work/proj/src/lib"),
            ]
        );
        assert_eq!(
            p.recursive_roots(),
            vec![RecursiveRoot {
                path: PathBuf::from("/work/proj"),
                ignore_hidden: true
            }]
        );
    }

    #[test]
    fn recursive_watch_can_include_hidden_dirs() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/proj/.git/objects");
        let p = mock_pipeline(fs);

        p.watch_recursive("proj", false).unwrap();
        assert!(p.watches().contains(&PathBuf::from("/work/proj/.git/objects")));
    }
}
