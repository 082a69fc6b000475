use std::fs;
use std::sync::Arc;

use fstree::events::{EventLog, FnSink};
use fstree::{ChildAdded, DirectoryNode, FileNode, Tree};
use tempfile::TempDir;

use crate::support::isolated_options;

#[test]
fn set_fires_one_event_per_insert() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::new());
    let tree = Tree::open_with(temp.path(), isolated_options().with_events(log.clone())).unwrap();
    let root = tree.root();

    root.set("a.txt", FileNode::text("a")).unwrap();
    root.set("sub", DirectoryNode::new()).unwrap();

    let records = log.take();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "a.txt");
    assert!(!records[0].is_dir);
    assert_eq!(records[0].path.as_deref(), Some(temp.path().join("a.txt").as_path()));
    assert_eq!(records[1].name, "sub");
    assert!(records[1].is_dir);
}

#[test]
fn lazy_resolution_fires_no_events() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("disk.txt"), "").unwrap();
    let log = Arc::new(EventLog::new());
    let tree = Tree::open_with(temp.path(), isolated_options().with_events(log.clone())).unwrap();

    tree.root().get("disk.txt").unwrap();
    tree.root().keys().unwrap();
    assert!(log.records().is_empty());
}

#[test]
fn sink_can_call_back_into_tree() {
    let temp = TempDir::new().unwrap();
    let sink = FnSink(|event: &ChildAdded| {
        // Reentrant: the handler reads the directory it was notified about.
        let keys = event.parent.keys().unwrap();
        assert!(keys.contains(&event.name));
        if event.name == "trigger" {
            event.parent.set("echo", FileNode::new()).unwrap();
        }
    });
    let tree = Tree::open_with(temp.path(), isolated_options().with_events(Arc::new(sink))).unwrap();
    tree.root().set("trigger", FileNode::new()).unwrap();
    assert_eq!(tree.root().keys().unwrap(), vec!["echo", "trigger"]);
}
