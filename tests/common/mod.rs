#![allow(dead_code)]

use std::sync::Arc;

use dirflow::exec::OutputSink;
use dirflow::fs::mock::MockFileSystem;
use dirflow::path::PathResolver;
use dirflow::pipeline::{Pipeline, PipelineOptions};
use dirflow_test_utils::{FakeWatcher, FakeWatcherHandle};

pub use dirflow_test_utils::{init_tracing, wait_until, with_timeout, RecordingTask};

/// Pipeline over a mock filesystem rooted at `/proj`, driven by a fake
/// watcher, writing to memory sinks.
pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub watcher: FakeWatcherHandle,
    pub fs: MockFileSystem,
    pub out: OutputSink,
    pub err: OutputSink,
}

impl Harness {
    pub fn new(fs: MockFileSystem) -> Self {
        Self::with_options(fs, PipelineOptions::default(), false)
    }

    pub fn verbose(fs: MockFileSystem) -> Self {
        let options = PipelineOptions {
            verbose: true,
            ..PipelineOptions::default()
        };
        Self::with_options(fs, options, false)
    }

    pub fn recursive_watcher(fs: MockFileSystem) -> Self {
        Self::with_options(fs, PipelineOptions::default(), true)
    }

    fn with_options(fs: MockFileSystem, options: PipelineOptions, recursive: bool) -> Self {
        init_tracing();
        let (watcher, handle) = if recursive {
            FakeWatcher::recursive()
        } else {
            FakeWatcher::new()
        };
        let out = OutputSink::memory();
        let err = OutputSink::memory();
        let pipeline = Pipeline::builder("test")
            .options(options)
            .file_system(Arc::new(fs.clone()))
            .resolver(PathResolver::new(Vec::new()).with_cwd("/proj"))
            .watcher(Box::new(watcher))
            .out(out.clone())
            .err(err.clone())
            .build();
        Self {
            pipeline: Arc::new(pipeline),
            watcher: handle,
            fs,
            out,
            err,
        }
    }

    /// Spawn `start` and wait until the pipeline reports itself running.
    pub async fn start(&self) -> tokio::task::JoinHandle<dirflow::errors::Result<()>> {
        let pipeline = Arc::clone(&self.pipeline);
        let runner = tokio::spawn(async move { pipeline.start().await });
        self.watcher.wait_started().await;
        let pipeline = Arc::clone(&self.pipeline);
        wait_until(move || pipeline.is_running()).await;
        runner
    }
}
