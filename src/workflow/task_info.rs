// src/workflow/task_info.rs

//! Per-invocation execution context threaded through a task chain.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::exec::OutputSink;

/// Mutable record owned by exactly one workflow invocation.
///
/// - `source` is the input of the task about to run.
/// - `target` is reset to empty before each task; a task sets it to the
///   artifact it produced, which then becomes the next task's `source`.
/// - `buffer` holds the last task's captured output.
/// - `collected` lists every artifact produced by the chain, in order.
#[derive(Debug)]
pub struct TaskInfo {
    pub source: PathBuf,
    pub target: PathBuf,
    pub buffer: Vec<u8>,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    pub verbose: bool,
    pub collected: Vec<PathBuf>,
}

impl TaskInfo {
    pub fn new(
        source: impl Into<PathBuf>,
        stdout: OutputSink,
        stderr: OutputSink,
        verbose: bool,
    ) -> Self {
        Self {
            source: source.into(),
            target: PathBuf::new(),
            buffer: Vec::new(),
            stdout,
            stderr,
            verbose,
            collected: Vec::new(),
        }
    }

    /// Context writing to in-memory sinks. Mostly useful in tests.
    pub fn detached(source: impl Into<PathBuf>) -> Self {
        Self::new(source, OutputSink::memory(), OutputSink::memory(), false)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn set_target(&mut self, target: impl Into<PathBuf>) {
        self.target = target.into();
    }

    pub fn has_target(&self) -> bool {
        !self.target.as_os_str().is_empty()
    }

    pub fn buffer_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }
}
