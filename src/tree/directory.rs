//! Directory operations: lazy resolution, mutation, iteration and persist.

use crate::error::{FactoryError, Result, TreeError};
use crate::events::ChildAdded;
use crate::factory::{Factory, FactoryContext, SuffixTable};
use crate::tree::node::{DirRef, DirectoryNode, FileNode, FileRef, Node, NodeRef};
use crate::tree::{path, validate_name, validate_subtree};
use crate::types::{NameEncoding, NodeId};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};

impl DirRef {
    /// Child `name`, resolved from disk on first access
    ///
    /// Repeated calls return the same node. Names queued for deletion or
    /// ignored by this directory are not resolved.
    pub fn get(&self, name: &str) -> Result<NodeRef> {
        let name = self.tree.normalize(name);
        validate_name(&name)?;
        let _guard = self.tree.lock();

        let (child_path, parent_path, local) = {
            let arena = self.tree.arena();
            let dir = arena.dir(self.id)?;
            if let Some(&id) = dir.overlay.get(&name) {
                let is_dir = arena.is_dir(id)?;
                return Ok(NodeRef::new(self.tree.clone(), id, is_dir));
            }
            if dir.pending_deletions.contains(&name) || dir.ignores.contains(&name) {
                return Err(TreeError::NotFound(name));
            }
            let parent_path = path::fs_path(&arena, self.id)?;
            (parent_path.join(&name), parent_path, dir.factories.clone())
        };

        let metadata = match fs::metadata(&child_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TreeError::NotFound(child_path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let ctx = FactoryContext {
            name: &name,
            parent_path: &parent_path,
        };
        let node = if metadata.is_dir() {
            self.construct_directory(&ctx)
        } else {
            self.construct_file(&ctx, &local)
        };
        debug!(
            path = %child_path.display(),
            is_dir = node.is_dir(),
            "Resolved child from disk"
        );

        let id = self.link(name, node)?;
        self.tree.node_ref(id)
    }

    /// Like [`DirRef::get`] but requires a directory
    pub fn get_dir(&self, name: &str) -> Result<DirRef> {
        self.get(name)?.into_dir()
    }

    /// Like [`DirRef::get`] but requires a file
    pub fn get_file(&self, name: &str) -> Result<FileRef> {
        self.get(name)?.into_file()
    }

    fn construct_directory(&self, ctx: &FactoryContext<'_>) -> Node {
        let Some(factory) = self.tree.options().factories.directory.clone() else {
            return DirectoryNode::new().into();
        };
        match factory(ctx) {
            Ok(node @ Node::Directory(_)) => node,
            Ok(Node::File(_)) => {
                error!(
                    name = ctx.name,
                    "Directory factory produced a file. Fall back to a plain directory"
                );
                DirectoryNode::new().into()
            }
            Err(e) => {
                error!(
                    name = ctx.name,
                    "Directory creation by factory failed. Fall back to a plain directory. Reason: {}",
                    e
                );
                DirectoryNode::new().into()
            }
        }
    }

    fn construct_file(&self, ctx: &FactoryContext<'_>, local: &SuffixTable) -> Node {
        let options = self.tree.options();
        let Some(factory) = options.factories.resolve_file(ctx.name, local) else {
            return FileNode::new().with_direct_sync(options.direct_sync).into();
        };
        let built = factory(ctx).and_then(|node| match node {
            Node::File(_) => Ok(node),
            Node::Directory(_) => Err(FactoryError::UnexpectedDirectory {
                name: ctx.name.to_string(),
            }),
        });
        match built {
            Ok(node) => node,
            Err(e) => {
                // The one recovered failure: a broken factory degrades to a plain file.
                error!(
                    name = ctx.name,
                    "File creation by factory failed. Fall back to plain file. Reason: {}",
                    e
                );
                FileNode::new().with_direct_sync(options.direct_sync).into()
            }
        }
    }

    /// Attach `node` as `name`, replacing any previous child of that name
    fn link(&self, name: String, node: Node) -> Result<NodeId> {
        let encoding = self.tree.options().encoding;
        let mut arena = self.tree.arena();
        arena.dir(self.id)?;
        let id = arena.attach(self.id, name.clone(), node, &encoding);
        let dir = arena.dir_mut(self.id)?;
        dir.pending_deletions.retain(|pending| *pending != name);
        let replaced = dir.overlay.insert(name, id);
        if let Some(replaced) = replaced {
            arena.free_subtree(replaced);
        }
        Ok(id)
    }

    /// Insert `node` as child `name`
    ///
    /// Replaces any existing child of that name, takes the name off the
    /// deletion queue and fires one child-added notification.
    pub fn set(&self, name: &str, node: impl Into<Node>) -> Result<NodeRef> {
        validate_name(name)?;
        let name = self.tree.normalize(name);
        let node = node.into();
        validate_subtree(&self.tree.options().encoding, &name, &node)?;

        let _guard = self.tree.lock();
        let id = self.link(name.clone(), node)?;
        let child = self.tree.node_ref(id)?;
        debug!(name = %name, is_dir = child.is_dir(), "Inserted child");

        self.tree.options().events.child_added(&ChildAdded {
            parent: self.clone(),
            name,
            node: child.clone(),
        });
        Ok(child)
    }

    /// Remove child `name` from the tree
    ///
    /// If an entry of that name exists on disk it is queued and removed on
    /// the next persist. Fails with `NotFound` when the name is neither
    /// resolved nor on disk, or is already queued.
    pub fn remove(&self, name: &str) -> Result<()> {
        let name = self.tree.normalize(name);
        validate_name(&name)?;
        let _guard = self.tree.lock();

        let child_path = {
            let arena = self.tree.arena();
            arena.dir(self.id)?;
            path::child_fs_path(&arena, self.id, &name)?
        };
        let on_disk = match fs::symlink_metadata(&child_path) {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut arena = self.tree.arena();
        let dir = arena.dir_mut(self.id)?;
        let queued = dir.pending_deletions.contains(&name);
        let removed = dir.overlay.remove(&name);
        if removed.is_none() && (queued || !on_disk) {
            return Err(TreeError::NotFound(name));
        }
        if on_disk && !queued {
            dir.pending_deletions.push(name.clone());
        }
        if let Some(id) = removed {
            arena.free_subtree(id);
        }
        debug!(name = %name, on_disk, "Removed child");
        Ok(())
    }

    /// Whether `name` is visible in this directory
    pub fn contains(&self, name: &str) -> Result<bool> {
        let name = self.tree.normalize(name);
        Ok(self.keys()?.binary_search(&name).is_ok())
    }

    /// Visible child names, sorted
    ///
    /// Union of the on-disk listing and resolved children, minus names queued
    /// for deletion and ignored names. A missing directory lists as empty.
    pub fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.tree.lock();
        let (dir_path, mut names, hidden) = {
            let arena = self.tree.arena();
            let dir = arena.dir(self.id)?;
            let names: BTreeSet<String> = dir.overlay.keys().cloned().collect();
            let hidden: BTreeSet<String> = dir
                .pending_deletions
                .iter()
                .chain(dir.ignores.iter())
                .cloned()
                .collect();
            (path::fs_path(&arena, self.id)?, names, hidden)
        };

        names.extend(list_disk(&dir_path, &self.tree.options().encoding));
        Ok(names.into_iter().filter(|name| !hidden.contains(name)).collect())
    }

    /// Iterate visible child names, see [`DirRef::keys`]
    pub fn iter(&self) -> Result<std::vec::IntoIter<String>> {
        Ok(self.keys()?.into_iter())
    }

    /// Visible children, resolving each
    pub fn children(&self) -> Result<Vec<(String, NodeRef)>> {
        let _guard = self.tree.lock();
        self.keys()?
            .into_iter()
            .map(|name| {
                let node = self.get(&name)?;
                Ok((name, node))
            })
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Names queued for removal on the next persist, oldest first
    pub fn pending_deletions(&self) -> Result<Vec<String>> {
        Ok(self.tree.arena().dir(self.id)?.pending_deletions.clone())
    }

    /// Names resolved into memory so far
    pub fn resolved_names(&self) -> Result<Vec<String>> {
        Ok(self.tree.arena().dir(self.id)?.overlay.keys().cloned().collect())
    }

    pub fn ignores(&self) -> Result<Vec<String>> {
        Ok(self.tree.arena().dir(self.id)?.ignores.iter().cloned().collect())
    }

    /// Exclude `name` from iteration and lazy resolution
    pub fn add_ignore(&self, name: &str) -> Result<()> {
        let name = self.tree.normalize(name);
        let _guard = self.tree.lock();
        self.tree.arena().dir_mut(self.id)?.ignores.insert(name);
        Ok(())
    }

    /// Register a factory for children of this directory only
    pub fn register_factory(
        &self,
        suffix: impl Into<String>,
        factory: Factory,
    ) -> Result<()> {
        let _guard = self.tree.lock();
        self.tree
            .arena()
            .dir_mut(self.id)?
            .factories
            .register(suffix, factory)
    }

    /// Write this directory and every resolved descendant to disk
    ///
    /// Creates the directory if missing, removes queued deletions, then
    /// persists each resolved child in name order. The first failure aborts
    /// the remaining children.
    pub fn persist(&self) -> Result<()> {
        let _guard = self.tree.lock();

        let (dir_path, is_root, permissions) = {
            let arena = self.tree.arena();
            let dir = arena.dir(self.id)?;
            let permissions = dir.permissions.or(self.tree.options().dir_permissions);
            (path::fs_path(&arena, self.id)?, self.id == arena.root, permissions)
        };

        ensure_directory(&dir_path, is_root)?;
        if let Some(mode) = permissions {
            set_permissions(&dir_path, mode)?;
        }

        self.drain_deletions(&dir_path)?;

        let children: Vec<NodeId> = {
            let arena = self.tree.arena();
            arena.dir(self.id)?.overlay.values().copied().collect()
        };
        for id in children {
            self.tree.node_ref(id)?.persist()?;
        }
        Ok(())
    }

    fn drain_deletions(&self, dir_path: &Path) -> Result<()> {
        loop {
            // Pop only after the removal succeeds so a failed persist can be retried.
            let next = self.tree.arena().dir(self.id)?.pending_deletions.last().cloned();
            let Some(name) = next else {
                return Ok(());
            };
            remove_entry(&dir_path.join(&name))?;
            self.tree.arena().dir_mut(self.id)?.pending_deletions.pop();
        }
    }
}

/// Names on disk that `get` can resolve
///
/// Skips names that are not UTF-8, names not already in the tree's
/// normalization form (their key would not map back to the disk entry)
/// and dangling symlinks.
fn list_disk(dir_path: &Path, encoding: &NameEncoding) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir_path) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, dir = %dir_path.display(), "Skipping non UTF-8 name");
                    return None;
                }
            };
            if encoding.normalize(&name) != name {
                warn!(
                    name = %name,
                    dir = %dir_path.display(),
                    encoding = ?encoding,
                    "Skipping name not in the configured normalization form"
                );
                return None;
            }
            if fs::metadata(entry.path()).is_err() {
                debug!(name = %name, dir = %dir_path.display(), "Skipping dangling entry");
                return None;
            }
            Some(name)
        })
        .collect()
}

fn ensure_directory(path: &Path, is_root: bool) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(TreeError::Conflict {
            path: path.to_path_buf(),
            reason: "Attempt to create a directory with name which already exists as file"
                .to_string(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if is_root {
                fs::create_dir_all(path)?;
            } else {
                fs::create_dir(path)?;
            }
            info!(path = %path.display(), "Created directory");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn remove_entry(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    info!(path = %path.display(), "Removed entry");
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
