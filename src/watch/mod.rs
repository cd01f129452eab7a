// src/watch/mod.rs

//! Filesystem watching.
//!
//! This module is responsible for:
//! - the [`Watcher`] capability and its two `notify`-backed variants
//!   ([`PortableWatcher`], [`NativeWatcher`]);
//! - translating notify events into [`crate::types::Event`]s;
//! - batching raw events on a fixed-latency timer.
//!
//! It does **not** know about workflows; it only produces batches.

mod backend;
pub mod batcher;
pub mod convert;
pub mod native;
pub mod portable;
pub mod watcher;

pub use batcher::{spawn_batcher, DEFAULT_BATCH_LATENCY};
pub use native::NativeWatcher;
pub use portable::PortableWatcher;
pub use watcher::{new_watcher, Watcher};
