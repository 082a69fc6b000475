use std::fs;

use fstree::factory::text_file_factory;
use fstree::{DirectoryNode, FileNode, Tree, TreeError};
use tempfile::TempDir;

use crate::support::isolated_options;

#[test]
fn insert_persist_then_delete_removes_file() {
    let temp = TempDir::new().unwrap();
    let root_path = temp.path().join("fresh");
    let tree = Tree::with_root(DirectoryNode::bound(&root_path), isolated_options()).unwrap();
    let root = tree.root();

    root.set("readme.txt", FileNode::text("hello")).unwrap();
    tree.persist().unwrap();
    assert_eq!(fs::read(root_path.join("readme.txt")).unwrap(), b"hello");

    root.remove("readme.txt").unwrap();
    tree.persist().unwrap();
    assert!(!root_path.join("readme.txt").exists());
    assert!(root_path.is_dir());
}

#[test]
fn cfg_suffix_factory_selects_file_type() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.cfg"), "key = 1\n").unwrap();
    fs::write(temp.path().join("b.txt"), "plain").unwrap();

    let root = DirectoryNode::bound(temp.path())
        .with_factory(".cfg", text_file_factory("config"))
        .unwrap();
    let tree = Tree::with_root(root, isolated_options()).unwrap();
    let dir = tree.root();

    let names: Vec<String> = dir.iter().unwrap().collect();
    assert!(names.contains(&"a.cfg".to_string()));
    assert!(names.contains(&"b.txt".to_string()));

    let cfg = dir.get_file("a.cfg").unwrap();
    assert_eq!(cfg.kind().unwrap(), "config");
    assert_eq!(cfg.text().unwrap(), "key = 1\n");

    let txt = dir.get_file("b.txt").unwrap();
    assert_eq!(txt.kind().unwrap(), "file");
    assert_eq!(txt.text().unwrap(), "plain");
}

#[test]
fn nested_subtree_persists_in_one_pass() {
    let temp = TempDir::new().unwrap();
    let tree = Tree::open_with(temp.path(), isolated_options()).unwrap();
    tree.root()
        .set(
            "project",
            DirectoryNode::new()
                .with_child("src", DirectoryNode::new().with_child("main.rs", FileNode::text("fn main() {}")))
                .with_child("README", FileNode::text("docs")),
        )
        .unwrap();
    tree.persist().unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join("project/src/main.rs")).unwrap(),
        "fn main() {}"
    );
    assert_eq!(fs::read_to_string(temp.path().join("project/README")).unwrap(), "docs");

    let walked: Vec<_> = walkdir::WalkDir::new(temp.path())
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(walked.len(), 4);
}

#[test]
fn second_persist_without_changes_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("gone.txt"), "old").unwrap();
    let tree = Tree::open_with(temp.path(), isolated_options()).unwrap();
    let root = tree.root();
    root.set("kept.txt", FileNode::text("mine")).unwrap();
    root.remove("gone.txt").unwrap();
    tree.persist().unwrap();
    assert!(!temp.path().join("gone.txt").exists());
    assert!(root.pending_deletions().unwrap().is_empty());

    // Nothing is dirty or queued, so a second pass must not touch the disk.
    fs::write(temp.path().join("kept.txt"), "edited outside").unwrap();
    fs::write(temp.path().join("gone.txt"), "recreated outside").unwrap();
    tree.persist().unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("kept.txt")).unwrap(),
        "edited outside"
    );
    assert!(temp.path().join("gone.txt").exists());
}

#[test]
fn queued_directory_is_removed_recursively() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("old/deep/deeper")).unwrap();
    fs::write(temp.path().join("old/a.txt"), "a").unwrap();
    fs::write(temp.path().join("old/deep/deeper/b.txt"), "b").unwrap();
    let tree = Tree::open_with(temp.path(), isolated_options()).unwrap();

    tree.root().remove("old").unwrap();
    assert!(temp.path().join("old/deep/deeper/b.txt").exists());
    tree.persist().unwrap();
    assert!(!temp.path().join("old").exists());
    assert!(tree.root().keys().unwrap().is_empty());
}

#[test]
fn directory_over_file_is_conflict() {
    let temp = TempDir::new().unwrap();
    let tree = Tree::open_with(temp.path(), isolated_options()).unwrap();
    tree.root().set("clash", DirectoryNode::new()).unwrap();
    fs::write(temp.path().join("clash"), "a file").unwrap();

    match tree.persist() {
        Err(TreeError::Conflict { path, .. }) => assert_eq!(path, temp.path().join("clash")),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(fs::read_to_string(temp.path().join("clash")).unwrap(), "a file");
}
