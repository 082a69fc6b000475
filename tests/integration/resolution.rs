use std::fs;

use fstree::{DirectoryNode, FileNode, NodeRef, Tree, TreeError};

use crate::support::{isolated_options, temp_tree};

#[test]
fn lazy_resolution_is_memoized() {
    let (temp, tree) = temp_tree();
    fs::write(temp.path().join("data.txt"), "x").unwrap();

    let first = tree.root().get("data.txt").unwrap();
    let second = tree.root().get("data.txt").unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(first, second);
    assert_eq!(tree.root().resolved_names().unwrap(), vec!["data.txt"]);
}

#[test]
fn missing_name_is_not_found() {
    let (_temp, tree) = temp_tree();
    assert!(matches!(tree.root().get("absent"), Err(TreeError::NotFound(_))));
    assert!(tree.root().resolved_names().unwrap().is_empty());
}

#[test]
fn directories_resolve_as_directories() {
    let (temp, tree) = temp_tree();
    fs::create_dir_all(temp.path().join("a/b")).unwrap();
    fs::write(temp.path().join("a/b/c.txt"), "deep").unwrap();

    let node = tree.resolve("a/b/c.txt").unwrap();
    assert!(node.is_file());
    assert_eq!(node.path().unwrap(), temp.path().join("a/b/c.txt"));
    assert_eq!(node.into_file().unwrap().text().unwrap(), "deep");

    assert!(matches!(tree.resolve("a").unwrap(), NodeRef::Directory(_)));
    assert!(matches!(
        tree.resolve("a/b/c.txt/d"),
        Err(TreeError::WrongKind { .. })
    ));
}

#[test]
fn iteration_merges_disk_and_overlay_sorted() {
    let (temp, tree) = temp_tree();
    fs::write(temp.path().join("b.txt"), "").unwrap();
    fs::create_dir(temp.path().join("d")).unwrap();
    let root = tree.root();
    root.set("a.txt", FileNode::new()).unwrap();
    root.set("c", DirectoryNode::new()).unwrap();

    assert_eq!(root.keys().unwrap(), vec!["a.txt", "b.txt", "c", "d"]);
    assert_eq!(root.len().unwrap(), 4);
    assert!(root.contains("b.txt").unwrap());
    assert!(!root.contains("e").unwrap());
}

#[test]
fn ignored_names_are_invisible() {
    let (temp, tree) = temp_tree();
    fs::write(temp.path().join(".git"), "").unwrap();
    fs::write(temp.path().join("kept"), "").unwrap();
    let root = tree.root();
    root.add_ignore(".git").unwrap();

    assert_eq!(root.keys().unwrap(), vec!["kept"]);
    assert!(matches!(root.get(".git"), Err(TreeError::NotFound(_))));
}

#[test]
fn pending_deletion_hides_disk_entry_until_reinserted() {
    let (temp, tree) = temp_tree();
    fs::write(temp.path().join("old.txt"), "old").unwrap();
    let root = tree.root();

    root.remove("old.txt").unwrap();
    assert_eq!(root.pending_deletions().unwrap(), vec!["old.txt"]);
    assert!(root.keys().unwrap().is_empty());
    assert!(matches!(root.get("old.txt"), Err(TreeError::NotFound(_))));

    root.set("old.txt", FileNode::text("new")).unwrap();
    assert!(root.pending_deletions().unwrap().is_empty());
    tree.persist().unwrap();
    assert_eq!(fs::read_to_string(temp.path().join("old.txt")).unwrap(), "new");
}

#[test]
fn invalid_names_are_rejected() {
    let (_temp, tree) = temp_tree();
    let root = tree.root();
    for bad in ["", ".", "..", "a/b"] {
        assert!(
            matches!(root.set(bad, FileNode::new()), Err(TreeError::InvalidKey(_))),
            "{:?} should be rejected",
            bad
        );
        assert!(
            matches!(root.get(bad), Err(TreeError::InvalidKey(_))),
            "get({:?}) should be rejected",
            bad
        );
    }
    match root.set("", FileNode::new()) {
        Err(TreeError::InvalidKey(msg)) => assert_eq!(msg, "Empty key not allowed in directories"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn get_rejects_names_that_are_not_one_component() {
    let temp = tempfile::TempDir::new().unwrap();
    let root_path = temp.path().join("root");
    fs::create_dir_all(root_path.join("sub")).unwrap();
    fs::write(root_path.join("sub/inner.txt"), "inner").unwrap();
    fs::write(temp.path().join("victim.txt"), "outside").unwrap();
    let tree = Tree::open_with(&root_path, isolated_options()).unwrap();
    let root = tree.root();

    for bad in ["", ".", "..", "sub/inner.txt", "../victim.txt"] {
        assert!(
            matches!(root.get(bad), Err(TreeError::InvalidKey(_))),
            "{:?} should be rejected",
            bad
        );
    }
    assert!(matches!(tree.resolve("../victim.txt"), Err(TreeError::InvalidKey(_))));
    assert!(root.resolved_names().unwrap().is_empty());
    assert_eq!(root.keys().unwrap(), vec!["sub"]);

    tree.persist().unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("victim.txt")).unwrap(),
        "outside"
    );
    assert_eq!(tree.resolve("sub/inner.txt").unwrap().path().unwrap(), root_path.join("sub/inner.txt"));
}

#[test]
fn bound_directory_cannot_be_a_child() {
    let (temp, tree) = temp_tree();
    let other = DirectoryNode::bound(temp.path().join("elsewhere"));
    assert!(matches!(
        tree.root().set("nested", other),
        Err(TreeError::InvalidChild(_))
    ));
}

#[test]
fn replaced_child_handles_go_stale() {
    let (_temp, tree) = temp_tree();
    let root = tree.root();
    let first = root.set("x", DirectoryNode::new()).unwrap().into_dir().unwrap();
    let inner = first.set("inner.txt", FileNode::new()).unwrap();
    root.set("x", FileNode::text("now a file")).unwrap();

    assert!(!first.is_attached());
    assert!(matches!(inner.path(), Err(TreeError::Detached)));
    assert!(root.get("x").unwrap().is_file());
}

#[test]
fn unbound_tree_binds_later() {
    let temp = tempfile::TempDir::new().unwrap();
    let tree = Tree::unbound(isolated_options());
    let root = tree.root();
    root.set("a.txt", FileNode::text("a")).unwrap();
    assert!(matches!(tree.persist(), Err(TreeError::ConfigError(_))));

    tree.bind(temp.path()).unwrap();
    tree.persist().unwrap();
    assert_eq!(fs::read_to_string(temp.path().join("a.txt")).unwrap(), "a");
}

#[test]
fn name_encoding_normalizes_keys() {
    use fstree::NameEncoding;
    let temp = tempfile::TempDir::new().unwrap();
    let tree = Tree::open_with(
        temp.path(),
        isolated_options().with_encoding(NameEncoding::Utf8Nfc),
    )
    .unwrap();
    let root = tree.root();
    // "e" followed by a combining acute accent
    root.set("cafe\u{301}", FileNode::text("nfd input")).unwrap();
    assert_eq!(root.resolved_names().unwrap(), vec!["caf\u{e9}"]);
    assert!(root.get("caf\u{e9}").is_ok());
    assert!(root.get("cafe\u{301}").is_ok());
}

#[test]
fn disk_names_outside_normal_form_are_not_listed() {
    use fstree::NameEncoding;
    let temp = tempfile::TempDir::new().unwrap();
    // Decomposed spelling on disk, composed keys in the tree
    fs::write(temp.path().join("cafe\u{301}.txt"), "nfd").unwrap();
    fs::write(temp.path().join("plain.txt"), "ascii").unwrap();
    let tree = Tree::open_with(
        temp.path(),
        isolated_options().with_encoding(NameEncoding::Utf8Nfc),
    )
    .unwrap();
    let root = tree.root();

    let keys = root.keys().unwrap();
    assert_eq!(keys, vec!["plain.txt"]);
    for key in &keys {
        assert!(root.get(key).is_ok());
    }
    assert_eq!(root.children().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn dangling_symlinks_are_not_listed() {
    let (temp, tree) = temp_tree();
    std::os::unix::fs::symlink(temp.path().join("missing"), temp.path().join("broken")).unwrap();
    fs::write(temp.path().join("real.txt"), "x").unwrap();
    let root = tree.root();

    assert_eq!(root.keys().unwrap(), vec!["real.txt"]);
    assert_eq!(root.children().unwrap().len(), 1);
    assert!(matches!(root.get("broken"), Err(TreeError::NotFound(_))));

    // Still on disk, so it can be queued and removed.
    root.remove("broken").unwrap();
    tree.persist().unwrap();
    assert!(fs::symlink_metadata(temp.path().join("broken")).is_err());
}
