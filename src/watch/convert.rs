// src/watch/convert.rs

//! Translation from `notify` events to [`Event`]s.

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;

use crate::types::{Event, Op};

/// Map a notify event kind onto the operation vocabulary.
///
/// Access notifications map to the empty set and are dropped. A rename that
/// reports both sides in one event (`RenameMode::Both`) is also dropped:
/// backends that produce it report each side separately as well.
pub fn op_from_kind(kind: &EventKind) -> Op {
    match kind {
        EventKind::Create(_) => Op::CREATE,
        EventKind::Remove(_) => Op::REMOVE,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Op::empty(),
        EventKind::Modify(ModifyKind::Name(_)) => Op::RENAME,
        EventKind::Modify(ModifyKind::Metadata(_)) => Op::CHMOD,
        EventKind::Modify(_) => Op::WRITE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Op::empty(),
    }
}

/// One [`Event`] per path carried by the notification.
pub fn events_from_notify(event: notify::Event) -> Vec<Event> {
    let op = op_from_kind(&event.kind);
    if op.is_empty() {
        return Vec::new();
    }
    event
        .paths
        .into_iter()
        .map(|path| Event::new(path, op))
        .collect()
}
