use std::fs;
use std::sync::Arc;

use fstree::factory::{binary_file_factory, directory_factory, factory, text_file_factory};
use fstree::{
    DirectoryNode, FactoryError, FactoryRegistry, FileMode, FileNode, Node, SuffixTable, Tree,
};
use tempfile::TempDir;

use crate::support::{options_with_global, special_global};

#[test]
fn longer_global_suffix_beats_shorter_local() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("x.special.txt"), "b").unwrap();
    fs::write(temp.path().join("y.txt"), "a").unwrap();

    let root = DirectoryNode::bound(temp.path())
        .with_factory(".txt", text_file_factory("local-text"))
        .unwrap();
    let tree = Tree::with_root(root, options_with_global(special_global())).unwrap();
    let dir = tree.root();

    assert_eq!(dir.get_file("x.special.txt").unwrap().kind().unwrap(), "special");
    assert_eq!(dir.get_file("y.txt").unwrap().kind().unwrap(), "local-text");
}

#[test]
fn local_factories_do_not_leak_to_subdirectories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    fs::write(temp.path().join("sub/inner.cfg"), "").unwrap();

    let root = DirectoryNode::bound(temp.path())
        .with_factory(".cfg", text_file_factory("config"))
        .unwrap();
    let tree = Tree::with_root(root, options_with_global(SuffixTable::new())).unwrap();
    let inner = tree.resolve("sub/inner.cfg").unwrap().into_file().unwrap();
    assert_eq!(inner.kind().unwrap(), "file");
}

#[test]
fn registered_after_open_applies_to_unresolved_names() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("image.png"), [137u8, 80, 78, 71]).unwrap();
    let tree = Tree::open_with(temp.path(), options_with_global(SuffixTable::new())).unwrap();
    tree.root()
        .register_factory(".png", binary_file_factory("image"))
        .unwrap();

    let image = tree.root().get_file("image.png").unwrap();
    assert_eq!(image.kind().unwrap(), "image");
    assert_eq!(image.mode().unwrap(), FileMode::Binary);
    assert_eq!(image.bytes().unwrap(), Some(vec![137u8, 80, 78, 71]));
}

#[test]
fn failing_factory_falls_back_to_plain_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("broken.cfg"), "still readable").unwrap();
    fs::write(temp.path().join("dir.cfg"), "").unwrap();

    let root = DirectoryNode::bound(temp.path())
        .with_factory(
            "broken.cfg",
            factory(|ctx| Err(FactoryError::rejected(ctx.name, "malformed"))),
        )
        .unwrap()
        .with_factory("dir.cfg", directory_factory())
        .unwrap();
    let tree = Tree::with_root(root, options_with_global(SuffixTable::new())).unwrap();

    let broken = tree.root().get_file("broken.cfg").unwrap();
    assert_eq!(broken.kind().unwrap(), "file");
    assert_eq!(broken.text().unwrap(), "still readable");

    // A file factory that yields a directory is recovered the same way.
    let dir_cfg = tree.root().get("dir.cfg").unwrap();
    assert!(dir_cfg.is_file());
}

#[test]
fn factory_sees_name_and_parent_path() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("seen.log"), "").unwrap();
    let expected = temp.path().join("seen.log");

    let root = DirectoryNode::bound(temp.path())
        .with_factory(
            ".log",
            factory(move |ctx| {
                assert_eq!(ctx.name, "seen.log");
                assert_eq!(ctx.path(), expected);
                Ok(FileNode::new().with_kind("log").into())
            }),
        )
        .unwrap();
    let tree = Tree::with_root(root, options_with_global(SuffixTable::new())).unwrap();
    assert_eq!(tree.root().get_file("seen.log").unwrap().kind().unwrap(), "log");
}

#[test]
fn default_and_directory_factories_are_used() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("nested")).unwrap();
    fs::write(temp.path().join("anything"), "").unwrap();

    let mut registry = FactoryRegistry::with_global(Arc::new(SuffixTable::new()));
    registry.default_file = Some(text_file_factory("generic"));
    registry.directory = Some(factory(|_| {
        Ok(Node::from(DirectoryNode::new().with_ignore("hidden")))
    }));
    let options = fstree::TreeOptions::default().with_factories(registry);
    let tree = Tree::open_with(temp.path(), options).unwrap();

    assert_eq!(tree.root().get_file("anything").unwrap().kind().unwrap(), "generic");
    let nested = tree.root().get_dir("nested").unwrap();
    assert_eq!(nested.ignores().unwrap(), vec!["hidden"]);
}

#[test]
fn fallback_file_keeps_configured_direct_sync() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("broken.cfg"), "").unwrap();
    fs::write(temp.path().join("plain.txt"), "").unwrap();

    let root = DirectoryNode::bound(temp.path())
        .with_factory(
            ".cfg",
            factory(|ctx| Err(FactoryError::rejected(ctx.name, "malformed"))),
        )
        .unwrap();
    let mut options = options_with_global(SuffixTable::new());
    options.direct_sync = true;
    let tree = Tree::with_root(root, options).unwrap();

    let broken = tree.root().get_file("broken.cfg").unwrap();
    assert_eq!(broken.kind().unwrap(), "file");
    assert!(broken.direct_sync().unwrap());
    assert!(tree.root().get_file("plain.txt").unwrap().direct_sync().unwrap());
}
