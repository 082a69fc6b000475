//! Child-added notifications.
//!
//! `DirRef::set` fires exactly one [`ChildAdded`] per insertion, synchronously,
//! after the child is attached. Lazy resolution of existing disk entries does
//! not fire it. Sinks run with the tree lock held but with no node state
//! borrowed, so they may call back into the tree.

use crate::tree::node::{DirRef, NodeRef};
use parking_lot::Mutex;
use std::path::PathBuf;

/// Payload of the child-added notification
#[derive(Debug, Clone)]
pub struct ChildAdded {
    pub parent: DirRef,
    pub name: String,
    pub node: NodeRef,
}

/// Receiver of tree notifications
pub trait EventSink: Send + Sync {
    fn child_added(&self, event: &ChildAdded);
}

/// Sink that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn child_added(&self, _event: &ChildAdded) {}
}

/// Adapts a closure into a sink
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(&ChildAdded) + Send + Sync,
{
    fn child_added(&self, event: &ChildAdded) {
        (self.0)(event)
    }
}

/// Record of one insertion as seen by [`EventLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedRecord {
    pub name: String,
    pub is_dir: bool,
    /// Filesystem path of the new child, `None` for unbound trees
    pub path: Option<PathBuf>,
}

/// Sink that keeps every notification in memory
#[derive(Debug, Default)]
pub struct EventLog {
    records: Mutex<Vec<AddedRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AddedRecord> {
        self.records.lock().clone()
    }

    pub fn take(&self) -> Vec<AddedRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl EventSink for EventLog {
    fn child_added(&self, event: &ChildAdded) {
        let record = AddedRecord {
            name: event.name.clone(),
            is_dir: event.node.is_dir(),
            path: event.node.path().ok(),
        };
        self.records.lock().push(record);
    }
}
