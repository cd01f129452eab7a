// src/exec/sink.rs

//! Shared, append-only output streams.
//!
//! Concurrent workflows write to the same sinks. Each `write_*` call is
//! applied atomically; interleaving between calls is expected.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

enum SinkTarget {
    Stdout,
    Stderr,
    Memory(Vec<u8>),
    Writer(Box<dyn Write + Send>),
}

#[derive(Clone)]
pub struct OutputSink {
    target: Arc<Mutex<SinkTarget>>,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &*self.target.lock().unwrap_or_else(PoisonError::into_inner) {
            SinkTarget::Stdout => "stdout",
            SinkTarget::Stderr => "stderr",
            SinkTarget::Memory(_) => "memory",
            SinkTarget::Writer(_) => "writer",
        };
        f.debug_tuple("OutputSink").field(&kind).finish()
    }
}

impl OutputSink {
    fn from_target(target: SinkTarget) -> Self {
        Self {
            target: Arc::new(Mutex::new(target)),
        }
    }

    pub fn stdout() -> Self {
        Self::from_target(SinkTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::from_target(SinkTarget::Stderr)
    }

    /// In-memory sink; read it back with [`OutputSink::contents`].
    pub fn memory() -> Self {
        Self::from_target(SinkTarget::Memory(Vec::new()))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::from_target(SinkTarget::Writer(Box::new(writer)))
    }

    pub fn write_all(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        let res = match &mut *target {
            SinkTarget::Stdout => io::stdout().lock().write_all(bytes),
            SinkTarget::Stderr => io::stderr().lock().write_all(bytes),
            SinkTarget::Memory(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            SinkTarget::Writer(w) => w.write_all(bytes).and_then(|_| w.flush()),
        };
        if let Err(err) = res {
            debug!(error = %err, "failed to write to output sink");
        }
    }

    pub fn write_line(&self, line: impl fmt::Display) {
        self.write_all(format!("{line}\n").as_bytes());
    }

    /// Everything written so far, for memory sinks. Other sinks return an
    /// empty string.
    pub fn contents(&self) -> String {
        match &*self.target.lock().unwrap_or_else(PoisonError::into_inner) {
            SinkTarget::Memory(buf) => String::from_utf8_lossy(buf).into_owned(),
            _ => String::new(),
        }
    }
}
