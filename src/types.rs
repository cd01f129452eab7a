// src/types.rs

//! Shared value types: operation sets, events and the small enums that the
//! config layer deserializes directly.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Set of filesystem operations carried by a single notification.
///
/// One notification may carry several flags at once (e.g. `CREATE|WRITE`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Op(u32);

impl Op {
    pub const CREATE: Op = Op(1);
    pub const WRITE: Op = Op(1 << 1);
    pub const REMOVE: Op = Op(1 << 2);
    pub const RENAME: Op = Op(1 << 3);
    pub const CHMOD: Op = Op(1 << 4);

    /// What a workflow accepts when it does not say otherwise. `CHMOD` is
    /// deliberately left out.
    pub const DEFAULT_ALLOWED: Op = Op(0b01111);
    pub const ALL: Op = Op(0b11111);

    const NAMES: [(Op, &'static str); 5] = [
        (Op::CREATE, "CREATE"),
        (Op::WRITE, "WRITE"),
        (Op::REMOVE, "REMOVE"),
        (Op::RENAME, "RENAME"),
        (Op::CHMOD, "CHMOD"),
    ];

    pub const fn empty() -> Op {
        Op(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build a set from raw bits, dropping anything outside the vocabulary.
    pub const fn from_bits_truncate(bits: u32) -> Op {
        Op(bits & Op::ALL.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every flag in `other` is also in `self`.
    pub const fn contains(self, other: Op) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Op) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Op) {
        self.0 |= other.0;
    }
}

impl BitOr for Op {
    type Output = Op;

    fn bitor(self, rhs: Op) -> Op {
        Op(self.0 | rhs.0)
    }
}

impl BitOrAssign for Op {
    fn bitor_assign(&mut self, rhs: Op) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Op {
    type Output = Op;

    fn bitand(self, rhs: Op) -> Op {
        Op(self.0 & rhs.0)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in Op::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({self})")
    }
}

impl FromStr for Op {
    type Err = String;

    /// Parse a single operation name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Op::NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(flag, _)| *flag)
            .ok_or_else(|| {
                format!(
                    "invalid operation: {s} (expected create, write, remove, rename or chmod)"
                )
            })
    }
}

/// A single filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub path: PathBuf,
    pub op: Op,
}

impl Event {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.op, self.path.display())
    }
}

/// A non-empty, ordered batch of events emitted by a watcher.
pub type EventSlice = Vec<Event>;

/// How a workflow's task chain is scheduled relative to the dispatcher.
///
/// - `Sequential`: the dispatcher waits for the chain to finish.
/// - `Concurrent`: the chain runs on its own task and the dispatcher moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    #[default]
    Sequential,
    Concurrent,
}

impl FromStr for ConcurrencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(ConcurrencyMode::Sequential),
            "concurrent" => Ok(ConcurrencyMode::Concurrent),
            other => Err(format!(
                "invalid concurrency: {other} (expected \"sequential\" or \"concurrent\")"
            )),
        }
    }
}

/// Which watcher implementation a pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    /// Pick at startup: `Native` on macOS, `Portable` everywhere else.
    #[default]
    Auto,
    /// One non-recursive OS watch per directory.
    Portable,
    /// Every watch covers its full subtree.
    Native,
}

impl WatcherKind {
    /// Platform detection for `Auto`.
    pub fn detect() -> WatcherKind {
        if std::env::consts::OS == "macos" {
            WatcherKind::Native
        } else {
            WatcherKind::Portable
        }
    }

    /// Resolve `Auto` to a concrete kind; other kinds are returned unchanged.
    pub fn resolve(self) -> WatcherKind {
        match self {
            WatcherKind::Auto => WatcherKind::detect(),
            other => other,
        }
    }
}
