// src/exec/restart.rs

//! Long-running process that is relaunched every time the task runs
//! (e.g. a dev server after a rebuild).

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::exec::OutputSink;
use crate::workflow::{TaskFuture, TaskInfo, Tasker};

/// At most one child process is alive per `RestartTask`. Running the task
/// kills the previous child (if still alive) and starts a fresh one. The
/// task never changes `target`.
#[derive(Debug)]
pub struct RestartTask {
    cmd: String,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl RestartTask {
    pub fn new<I, S>(cmd: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            child: Mutex::new(None),
        }
    }

    /// OS pid of the current child, if one is running.
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }

    /// Kill the current child, if any.
    pub async fn kill(&self, info: &TaskInfo) -> Result<()> {
        let mut guard = self.child.lock().await;
        kill_child(&self.cmd, &mut guard, info).await
    }

    async fn restart(&self, info: &mut TaskInfo) -> Result<()> {
        if self.cmd.is_empty() {
            bail!("restart task has no command to run");
        }

        let mut guard = self.child.lock().await;
        kill_child(&self.cmd, &mut guard, info).await?;

        let mut child = Command::new(&self.cmd)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning '{}'", self.cmd))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, info.stdout.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, info.stderr.clone());
        }

        info!(cmd = %self.cmd, pid = ?child.id(), "process started");
        if info.verbose {
            info.stdout.write_line(format!("Process {} started", self.cmd));
        }

        *guard = Some(child);
        Ok(())
    }
}

async fn kill_child(cmd: &str, slot: &mut Option<Child>, info: &TaskInfo) -> Result<()> {
    let Some(mut child) = slot.take() else {
        return Ok(());
    };

    if let Ok(Some(status)) = child.try_wait() {
        debug!(cmd = %cmd, ?status, "process already exited");
        if info.verbose {
            info.stdout.write_line(format!("Process {cmd} already exited"));
        }
        return Ok(());
    }

    if let Err(err) = child.kill().await {
        warn!(cmd = %cmd, error = %err, "failed to kill process");
        return Err(err).with_context(|| format!("killing '{cmd}'"));
    }

    if info.verbose {
        info.stdout.write_line(format!("Process {cmd} killed"));
    }
    Ok(())
}

/// Copy a child's output stream to a sink line by line.
fn forward_lines<R>(stream: R, sink: OutputSink)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            sink.write_line(line);
        }
    });
}

impl Tasker for RestartTask {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a> {
        Box::pin(self.restart(info))
    }
}
