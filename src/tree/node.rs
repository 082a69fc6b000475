//! Node values and handles.
//!
//! [`Node`] and its variants are *detached* values: built by callers or
//! factories, then moved into a tree by `DirRef::set` or lazy resolution.
//! [`NodeRef`], [`DirRef`] and [`FileRef`] are cheap handles to nodes that
//! live inside a [`Tree`].

use crate::error::{Result, TreeError};
use crate::factory::{Factory, SuffixTable};
use crate::tree::{path, Tree};
use crate::types::{Content, FileMode, NodeId};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Kind label of plain files
pub const PLAIN_FILE_KIND: &str = "file";

/// A detached node
#[derive(Debug)]
pub enum Node {
    Directory(DirectoryNode),
    File(FileNode),
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File(_))
    }
}

impl From<DirectoryNode> for Node {
    fn from(dir: DirectoryNode) -> Self {
        Node::Directory(dir)
    }
}

impl From<FileNode> for Node {
    fn from(file: FileNode) -> Self {
        Node::File(file)
    }
}

/// Detached directory, optionally carrying pre-built children
#[derive(Debug, Default)]
pub struct DirectoryNode {
    pub(crate) root_path: Option<PathBuf>,
    pub(crate) ignores: BTreeSet<String>,
    pub(crate) factories: SuffixTable,
    pub(crate) permissions: Option<u32>,
    pub(crate) children: Vec<(String, Node)>,
}

impl DirectoryNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory bound to a filesystem location; only valid as a tree root
    pub fn bound(path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn root_path(&self) -> Option<&PathBuf> {
        self.root_path.as_ref()
    }

    /// Exclude `name` from iteration and lazy resolution
    pub fn with_ignore(mut self, name: impl Into<String>) -> Self {
        self.ignores.insert(name.into());
        self
    }

    pub fn with_ignores<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignores.extend(names.into_iter().map(Into::into));
        self
    }

    /// Directory-scoped suffix factories
    pub fn with_factories(mut self, factories: SuffixTable) -> Self {
        self.factories = factories;
        self
    }

    pub fn with_factory(mut self, suffix: impl Into<String>, factory: Factory) -> Result<Self> {
        self.factories.register(suffix, factory)?;
        Ok(self)
    }

    /// Unix permission bits applied when the directory is persisted
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    /// Add a pre-built child; a later child with the same name replaces it
    pub fn with_child(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        let name = name.into();
        self.children.retain(|(existing, _)| *existing != name);
        self.children.push((name, node.into()));
        self
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }
}

/// Detached file
#[derive(Debug, Clone)]
pub struct FileNode {
    pub(crate) kind: String,
    pub(crate) mode: FileMode,
    pub(crate) content: Option<Content>,
    pub(crate) direct_sync: bool,
    pub(crate) permissions: Option<u32>,
}

impl Default for FileNode {
    fn default() -> Self {
        Self {
            kind: PLAIN_FILE_KIND.to_string(),
            mode: FileMode::Text,
            content: None,
            direct_sync: false,
            permissions: None,
        }
    }
}

impl FileNode {
    /// Text file whose content loads lazily from disk
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary file whose content loads lazily from disk
    pub fn binary_file() -> Self {
        Self {
            mode: FileMode::Binary,
            ..Self::default()
        }
    }

    /// Text file with assigned content
    pub fn text(content: impl Into<String>) -> Self {
        Self::new().with_content(Content::Text(content.into()))
    }

    /// Binary file with assigned content
    pub fn binary(content: impl Into<Vec<u8>>) -> Self {
        Self::new().with_content(Content::Binary(content.into()))
    }

    /// Assign content; the mode follows the content's form
    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        let content = content.into();
        self.mode = content.mode();
        self.content = Some(content);
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the mode; drops assigned content of the other form
    pub fn with_mode(mut self, mode: FileMode) -> Self {
        if self.content.as_ref().is_some_and(|c| c.mode() != mode) {
            self.content = None;
        }
        self.mode = mode;
        self
    }

    /// Flush and fsync after every write
    pub fn with_direct_sync(mut self, direct_sync: bool) -> Self {
        self.direct_sync = direct_sync;
        self
    }

    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn direct_sync(&self) -> bool {
        self.direct_sync
    }
}

/// Handle to an attached node
#[derive(Clone)]
pub enum NodeRef {
    Directory(DirRef),
    File(FileRef),
}

impl NodeRef {
    pub(crate) fn new(tree: Tree, id: NodeId, is_dir: bool) -> Self {
        if is_dir {
            NodeRef::Directory(DirRef { tree, id })
        } else {
            NodeRef::File(FileRef { tree, id })
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Directory(dir) => dir.id,
            NodeRef::File(file) => file.id,
        }
    }

    pub fn tree(&self) -> &Tree {
        match self {
            NodeRef::Directory(dir) => &dir.tree,
            NodeRef::File(file) => &file.tree,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeRef::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, NodeRef::File(_))
    }

    pub fn as_dir(&self) -> Option<&DirRef> {
        match self {
            NodeRef::Directory(dir) => Some(dir),
            NodeRef::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            NodeRef::File(file) => Some(file),
            NodeRef::Directory(_) => None,
        }
    }

    pub fn into_dir(self) -> Result<DirRef> {
        match self {
            NodeRef::Directory(dir) => Ok(dir),
            NodeRef::File(_) => Err(TreeError::WrongKind {
                expected: "directory",
            }),
        }
    }

    pub fn into_file(self) -> Result<FileRef> {
        match self {
            NodeRef::File(file) => Ok(file),
            NodeRef::Directory(_) => Err(TreeError::WrongKind { expected: "file" }),
        }
    }

    pub fn name(&self) -> Result<String> {
        self.tree().node_name(self.id())
    }

    pub fn path(&self) -> Result<PathBuf> {
        self.tree().node_path(self.id())
    }

    pub fn parent(&self) -> Result<Option<DirRef>> {
        self.tree().node_parent(self.id())
    }

    /// Write this node (and, for directories, its overlay) to disk
    pub fn persist(&self) -> Result<()> {
        match self {
            NodeRef::Directory(dir) => dir.persist(),
            NodeRef::File(file) => file.persist(),
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Directory(dir) => dir.fmt(f),
            NodeRef::File(file) => file.fmt(f),
        }
    }
}

impl From<DirRef> for NodeRef {
    fn from(dir: DirRef) -> Self {
        NodeRef::Directory(dir)
    }
}

impl From<FileRef> for NodeRef {
    fn from(file: FileRef) -> Self {
        NodeRef::File(file)
    }
}

/// Handle to an attached directory
#[derive(Clone)]
pub struct DirRef {
    pub(crate) tree: Tree,
    pub(crate) id: NodeId,
}

/// Handle to an attached file
#[derive(Clone)]
pub struct FileRef {
    pub(crate) tree: Tree,
    pub(crate) id: NodeId,
}

macro_rules! handle_common {
    ($ty:ident, $label:literal) => {
        impl $ty {
            pub fn id(&self) -> NodeId {
                self.id
            }

            pub fn tree(&self) -> &Tree {
                &self.tree
            }

            /// Name under the parent; empty for the root
            pub fn name(&self) -> Result<String> {
                self.tree.node_name(self.id)
            }

            /// Absolute filesystem path
            pub fn path(&self) -> Result<PathBuf> {
                self.tree.node_path(self.id)
            }

            pub fn parent(&self) -> Result<Option<DirRef>> {
                self.tree.node_parent(self.id)
            }

            /// Whether the handle still refers to a node in the tree
            pub fn is_attached(&self) -> bool {
                let arena = self.tree.arena();
                arena.contains(self.id) && path::resolve(&arena, self.id).is_ok()
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id && self.tree.same_tree(&other.tree)
            }
        }

        impl Eq for $ty {}

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct($label)
                    .field("id", &self.id)
                    .field("path", &self.path().ok())
                    .finish()
            }
        }
    };
}

handle_common!(DirRef, "DirRef");
handle_common!(FileRef, "FileRef");

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.tree().same_tree(other.tree())
    }
}

impl Eq for NodeRef {}
