// src/workflow/tasker.rs

//! The single-method contract every task implements, plus a generic
//! transformer + closure task.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

use crate::path::Transformer;
use crate::workflow::TaskInfo;

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A unit of work in a workflow's chain.
///
/// `run` should set `info.target` to the artifact it produced (or leave it
/// empty to keep the current source for the next task), refill
/// `info.buffer` if it has output, and return an error only when the rest
/// of the chain must not run. Recoverable problems should be written to
/// `info.stderr` and swallowed.
pub trait Tasker: Send + Sync {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a>;
}

type Runner = Arc<dyn Fn(&mut TaskInfo) -> Result<()> + Send + Sync>;

/// Sets `target = transform(source)` and then calls a synchronous runner.
#[derive(Clone)]
pub struct Task {
    transform: Transformer,
    runner: Runner,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

impl Task {
    pub fn new<F>(transform: Transformer, runner: F) -> Self
    where
        F: Fn(&mut TaskInfo) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            transform,
            runner: Arc::new(runner),
        }
    }
}

impl Tasker for Task {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a> {
        Box::pin(async move {
            info.target = (self.transform)(&info.source);
            (self.runner)(info)
        })
    }
}
