// src/exec/shell.rs

//! External command task.

use std::process::Stdio;
use std::time::Instant;

use anyhow::{bail, Context};
use tokio::process::Command;
use tracing::{debug, info};

use crate::path::{identity, Transformer};
use crate::workflow::{TaskFuture, TaskInfo, Tasker};

/// Runs `cmd args... <target>` where `target = transform(source)`.
///
/// Stdout is captured into the context buffer and echoed to the output
/// sink; stderr goes to the error sink. A non-zero exit aborts the chain.
#[derive(Clone)]
pub struct ShellTask {
    cmd: String,
    args: Vec<String>,
    transform: Transformer,
}

impl std::fmt::Debug for ShellTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellTask")
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl ShellTask {
    pub fn new<I, S>(cmd: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            transform: identity(),
        }
    }

    pub fn with_transform(mut self, transform: Transformer) -> Self {
        self.transform = transform;
        self
    }

    async fn execute(&self, info: &mut TaskInfo) -> anyhow::Result<()> {
        let started = Instant::now();
        info.target = (self.transform)(&info.source);
        info.buffer.clear();

        debug!(cmd = %self.cmd, args = ?self.args, target = ?info.target, "spawning command");

        let output = Command::new(&self.cmd)
            .args(&self.args)
            .arg(&info.target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawning '{}'", self.cmd))?;

        info.buffer = output.stdout;
        info.stdout.write_all(&info.buffer);
        info.stderr.write_all(&output.stderr);

        if !output.status.success() {
            if info.verbose {
                info.stdout.write_line(format!(
                    ">>> {} {:?} {:?}",
                    self.cmd,
                    self.args,
                    started.elapsed()
                ));
            }
            match output.status.code() {
                Some(code) => bail!("'{}' exited with status {code}", self.cmd),
                None => bail!("'{}' was terminated by a signal", self.cmd),
            }
        }

        info!(cmd = %self.cmd, target = ?info.target, elapsed = ?started.elapsed(), "command finished");
        Ok(())
    }
}

impl Tasker for ShellTask {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a> {
        Box::pin(self.execute(info))
    }
}
