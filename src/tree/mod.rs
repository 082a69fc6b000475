//! Mapping view over a filesystem directory tree
//!
//! A [`Tree`] owns every node reachable from its root directory. Directories
//! resolve children lazily from disk, record deletions, and write everything
//! back on persist. All nodes of a tree share one reentrant [`TreeLock`].

pub(crate) mod arena;
pub mod directory;
pub mod file;
pub mod node;
pub(crate) mod path;

use crate::concurrency::{TreeLock, TreeLockGuard};
use crate::config::TreeConfig;
use crate::error::{Result, TreeError};
use crate::events::{EventSink, NullSink};
use crate::factory::FactoryRegistry;
use crate::types::{NameEncoding, NodeId};
use arena::Arena;
use node::{DirRef, DirectoryNode, Node, NodeRef};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Runtime options shared by every node of a tree
#[derive(Clone)]
pub struct TreeOptions {
    /// Normalization applied to child names
    pub encoding: NameEncoding,
    /// `direct_sync` for files built by the default file type
    pub direct_sync: bool,
    /// Permission bits for persisted files that carry none of their own
    pub file_permissions: Option<u32>,
    /// Permission bits for persisted directories that carry none of their own
    pub dir_permissions: Option<u32>,
    /// Names hidden from the root directory, in addition to its own ignores
    pub root_ignores: Vec<String>,
    pub factories: FactoryRegistry,
    pub events: Arc<dyn EventSink>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            encoding: NameEncoding::default(),
            direct_sync: false,
            file_permissions: None,
            dir_permissions: None,
            root_ignores: Vec::new(),
            factories: FactoryRegistry::default(),
            events: Arc::new(NullSink),
        }
    }
}

impl TreeOptions {
    /// Options from loaded configuration; factories and events keep their defaults
    pub fn from_config(config: &TreeConfig) -> Result<Self> {
        Ok(Self {
            encoding: config.encoding,
            direct_sync: config.direct_sync,
            file_permissions: config.file_permissions()?,
            dir_permissions: config.dir_permissions()?,
            root_ignores: config.ignores.clone(),
            ..Self::default()
        })
    }

    pub fn with_factories(mut self, factories: FactoryRegistry) -> Self {
        self.factories = factories;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_encoding(mut self, encoding: NameEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl fmt::Debug for TreeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("encoding", &self.encoding)
            .field("direct_sync", &self.direct_sync)
            .field("file_permissions", &self.file_permissions)
            .field("dir_permissions", &self.dir_permissions)
            .field("root_ignores", &self.root_ignores)
            .field("factories", &self.factories)
            .finish()
    }
}

pub(crate) struct TreeShared {
    lock: TreeLock,
    arena: Mutex<Arena>,
    options: TreeOptions,
}

/// Handle to a whole tree; clones share the same nodes and lock
#[derive(Clone)]
pub struct Tree {
    shared: Arc<TreeShared>,
}

impl Tree {
    /// Tree rooted at `path` with default options
    ///
    /// Nothing is read or created on disk until children are resolved or the
    /// tree is persisted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, TreeOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: TreeOptions) -> Result<Self> {
        Self::with_root(DirectoryNode::bound(path.as_ref()), options)
    }

    /// Tree with no filesystem location yet; see [`Tree::bind`]
    pub fn unbound(options: TreeOptions) -> Self {
        let mut state = arena::DirState::default();
        state.ignores.extend(options.root_ignores.iter().cloned());
        let arena = Arena::new(state, None);
        Self::from_arena(arena, options)
    }

    /// Tree whose root is `root`, including any pre-built children
    pub fn with_root(root: DirectoryNode, options: TreeOptions) -> Result<Self> {
        let root_path = root.root_path.clone().map(|p| clean_root(&p)).transpose()?;
        for (name, child) in &root.children {
            validate_subtree(&options.encoding, name, child)?;
        }
        let (mut state, children) = root.into_parts();
        state.ignores.extend(options.root_ignores.iter().cloned());
        let mut arena = Arena::new(state, root_path);
        let root_id = arena.root;
        for (name, child) in children {
            let name = options.encoding.normalize(&name);
            let id = arena.attach(root_id, name.clone(), child, &options.encoding);
            let replaced = arena
                .dir_mut(root_id)
                .ok()
                .and_then(|dir| dir.overlay.insert(name, id));
            if let Some(replaced) = replaced {
                arena.free_subtree(replaced);
            }
        }
        Ok(Self::from_arena(arena, options))
    }

    fn from_arena(arena: Arena, options: TreeOptions) -> Self {
        Self {
            shared: Arc::new(TreeShared {
                lock: TreeLock::new(),
                arena: Mutex::new(arena),
                options,
            }),
        }
    }

    /// Bind (or rebind) the root to a filesystem location
    pub fn bind(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = clean_root(path.as_ref())?;
        let _guard = self.lock();
        debug!(path = %path.display(), "Binding tree root");
        self.arena().root_path = Some(path);
        Ok(())
    }

    pub fn root_path(&self) -> Option<PathBuf> {
        self.arena().root_path.clone()
    }

    pub fn root(&self) -> DirRef {
        let id = self.arena().root;
        DirRef {
            tree: self.clone(),
            id,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.shared.options
    }

    /// Acquire the tree lock, e.g. to make several operations atomic
    pub fn lock(&self) -> TreeLockGuard<'_> {
        self.shared.lock.lock()
    }

    /// Persist the whole resolved tree
    pub fn persist(&self) -> Result<()> {
        self.root().persist()
    }

    /// Resolve a `/`-separated path relative to the root
    ///
    /// Empty and `.` segments are skipped; `..` is rejected with `InvalidKey`.
    pub fn resolve(&self, relative: &str) -> Result<NodeRef> {
        let mut current = NodeRef::Directory(self.root());
        for part in relative.split('/').filter(|p| !p.is_empty() && *p != ".") {
            validate_name(part)?;
            current = current.into_dir()?.get(part)?;
        }
        Ok(current)
    }

    /// Number of attached nodes, root included
    pub fn node_count(&self) -> usize {
        self.arena().len()
    }

    pub fn same_tree(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn arena(&self) -> MutexGuard<'_, Arena> {
        self.shared.arena.lock()
    }

    pub(crate) fn normalize(&self, name: &str) -> String {
        self.shared.options.encoding.normalize(name)
    }

    pub(crate) fn node_name(&self, id: NodeId) -> Result<String> {
        Ok(self.arena().slot(id)?.name.clone())
    }

    pub(crate) fn node_path(&self, id: NodeId) -> Result<PathBuf> {
        path::fs_path(&self.arena(), id)
    }

    pub(crate) fn node_parent(&self, id: NodeId) -> Result<Option<DirRef>> {
        let parent = self.arena().slot(id)?.parent;
        Ok(parent.map(|id| DirRef {
            tree: self.clone(),
            id,
        }))
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> Result<NodeRef> {
        let is_dir = self.arena().is_dir(id)?;
        Ok(NodeRef::new(self.clone(), id, is_dir))
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("root_path", &self.root_path())
            .field("nodes", &self.node_count())
            .finish()
    }
}

fn clean_root(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(TreeError::ConfigError(
            "Tree root path must not be empty".to_string(),
        ));
    }
    Ok(dunce::simplified(path).to_path_buf())
}

/// Reject empty names and names that are not a single path component
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TreeError::InvalidKey(
            "Empty key not allowed in directories".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains('\0') || name.chars().any(std::path::is_separator)
    {
        return Err(TreeError::InvalidKey(format!(
            "{:?} is not a single path component",
            name
        )));
    }
    Ok(())
}

/// Check a detached node before any of it is attached
pub(crate) fn validate_subtree(encoding: &NameEncoding, name: &str, node: &Node) -> Result<()> {
    validate_name(&encoding.normalize(name))?;
    if let Node::Directory(dir) = node {
        if let Some(bound) = &dir.root_path {
            return Err(TreeError::InvalidChild(format!(
                "directory bound to {} is a tree root and cannot be attached as {:?}",
                bound.display(),
                name
            )));
        }
        for (child_name, child) in &dir.children {
            validate_subtree(encoding, child_name, child)?;
        }
    }
    Ok(())
}
