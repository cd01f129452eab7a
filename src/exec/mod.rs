// src/exec/mod.rs

//! Built-in tasks and the output sinks they write to.
//!
//! - [`shell`] runs an external command against the current source.
//! - [`file_ops`] covers cat / copy / move / remove / mkdir.
//! - [`restart`] keeps one long-running process alive, relaunching it on
//!   every run.
//! - [`sink`] provides the shared stdout/stderr streams.

pub mod file_ops;
pub mod restart;
pub mod shell;
pub mod sink;

pub use file_ops::{cat_task, copy_task, mkdir_task, move_task, remove_task, FileTask};
pub use restart::RestartTask;
pub use shell::ShellTask;
pub use sink::OutputSink;
