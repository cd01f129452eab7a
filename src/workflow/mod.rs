// src/workflow/mod.rs

//! Workflows: a path predicate, an operation predicate and an ordered task
//! chain.
//!
//! The dispatcher only talks to the [`Workflower`] trait; [`Workflow`] is the
//! regex/glob-backed implementation used by the binary and most callers.

pub mod matcher;
pub mod task_info;
pub mod tasker;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::{DirflowError, Result};
use crate::types::{ConcurrencyMode, Op};

pub use matcher::PathMatcher;
pub use task_info::TaskInfo;
pub use tasker::{Task, TaskFuture, Tasker};

pub type WorkflowFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Capability the pipeline dispatches to.
pub trait Workflower: Send + Sync {
    fn name(&self) -> &str;

    /// Decide whether an event should trigger this workflow.
    fn matches(&self, path: &Path, op: Op) -> bool;

    /// Execute for one matched event. Failures are reported, not returned.
    fn run(&self, info: TaskInfo) -> WorkflowFuture<'_>;
}

pub struct Workflow {
    name: String,
    concurrency: ConcurrencyMode,
    ops: Op,
    matcher: PathMatcher,
    tasks: Vec<Arc<dyn Tasker>>,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("concurrency", &self.concurrency)
            .field("ops", &self.ops)
            .field("patterns", &self.matcher.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl Workflow {
    /// Create a workflow matching any of the given regexes. Every pattern is
    /// compiled here; the first invalid one fails construction.
    pub fn new<I, S>(name: impl Into<String>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = PathMatcher::new();
        for pattern in patterns {
            matcher.add_regex(pattern.as_ref())?;
        }
        Ok(Self {
            name: name.into(),
            concurrency: ConcurrencyMode::default(),
            ops: Op::DEFAULT_ALLOWED,
            matcher,
            tasks: Vec::new(),
        })
    }

    /// Restrict the operations this workflow reacts to. An empty set means
    /// "unset" and restores the default.
    pub fn with_ops(mut self, ops: Op) -> Self {
        self.ops = if ops.is_empty() {
            Op::DEFAULT_ALLOWED
        } else {
            ops
        };
        self
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency = mode;
        self
    }

    pub fn with_task(mut self, task: impl Tasker + 'static) -> Self {
        self.add_task(task);
        self
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        self.matcher.add_regex(pattern)
    }

    pub fn add_glob(&mut self, pattern: &str) -> Result<()> {
        self.matcher.add_glob(pattern)
    }

    pub fn add_task(&mut self, task: impl Tasker + 'static) {
        self.tasks.push(Arc::new(task));
    }

    pub fn add_shared_task(&mut self, task: Arc<dyn Tasker>) {
        self.tasks.push(task);
    }

    pub fn ops(&self) -> Op {
        self.ops
    }

    pub fn concurrency(&self) -> ConcurrencyMode {
        self.concurrency
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run the chain to completion and return the error instead of
    /// reporting it. [`Workflower::run`] is built on top of this.
    pub async fn execute(&self, info: &mut TaskInfo) -> Result<()> {
        run_chain(&self.name, &self.tasks, info).await
    }
}

impl Workflower for Workflow {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, path: &Path, op: Op) -> bool {
        self.ops.contains(op) && self.matcher.is_match(path)
    }

    fn run(&self, info: TaskInfo) -> WorkflowFuture<'_> {
        match self.concurrency {
            ConcurrencyMode::Sequential => {
                Box::pin(run_and_report(self.name.clone(), self.tasks.clone(), info))
            }
            ConcurrencyMode::Concurrent => {
                let name = self.name.clone();
                let tasks = self.tasks.clone();
                debug!(workflow = %name, source = ?info.source, "spawning concurrent workflow");
                tokio::spawn(run_and_report(name, tasks, info));
                Box::pin(async {})
            }
        }
    }
}

async fn run_and_report(name: String, tasks: Vec<Arc<dyn Tasker>>, mut info: TaskInfo) {
    if info.verbose {
        info.stdout
            .write_line(format!("> Running workflow {name} for {}", info.source.display()));
    }
    if let Err(err) = run_chain(&name, &tasks, &mut info).await {
        let source = failed_source(&err).unwrap_or(&info.source);
        error!(workflow = %name, source = ?source, error = %err, "workflow aborted");
        info.stderr.write_line(&err);
        info.stderr
            .write_line(format!("Workflow did not complete for {}", source.display()));
    }
}

fn failed_source(err: &DirflowError) -> Option<&PathBuf> {
    match err {
        DirflowError::TaskError { source_path, .. } => Some(source_path),
        _ => None,
    }
}

/// Execute `tasks` in order against one context.
///
/// Before each task `target` is cleared. A non-empty `target` after a
/// successful task becomes the next `source` and is appended to
/// `collected`. The first failure stops the chain and is reported with the
/// failing task's input path.
pub async fn run_chain(name: &str, tasks: &[Arc<dyn Tasker>], info: &mut TaskInfo) -> Result<()> {
    for (index, task) in tasks.iter().enumerate() {
        info.target = PathBuf::new();
        debug!(workflow = %name, task = index, source = ?info.source, "running task");

        if let Err(err) = task.run(info).await {
            return Err(DirflowError::TaskError {
                workflow: name.to_string(),
                source_path: info.source.clone(),
                message: format!("{err:#}"),
            });
        }

        if info.has_target() {
            let target = info.target.clone();
            info.collected.push(target.clone());
            info.source = target;
        }
    }
    Ok(())
}
