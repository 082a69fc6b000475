//! Path derivation by walking parent links.

use crate::error::{Result, TreeError};
use crate::tree::arena::Arena;
use crate::types::NodeId;
use std::path::PathBuf;

/// Root-to-node sequence of names, the root itself excluded
///
/// Fails with `Detached` when the chain does not end at the tree root, and
/// never caches: the tree shape may change between calls.
pub(crate) fn resolve(arena: &Arena, id: NodeId) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut current = id;
    // A chain longer than the live node count can only be a cycle.
    let limit = arena.len();
    loop {
        let slot = arena.slot(current)?;
        if current == arena.root {
            break;
        }
        if names.len() >= limit {
            return Err(TreeError::ConfigError(
                "parent chain does not terminate at the tree root".to_string(),
            ));
        }
        names.push(slot.name.clone());
        current = slot.parent.ok_or(TreeError::Detached)?;
    }
    names.reverse();
    Ok(names)
}

/// Absolute filesystem path of `id`
pub(crate) fn fs_path(arena: &Arena, id: NodeId) -> Result<PathBuf> {
    let names = resolve(arena, id)?;
    let mut path = bound_root(arena)?;
    path.extend(names);
    Ok(path)
}

/// Absolute filesystem path of child `name` under directory `id`
pub(crate) fn child_fs_path(arena: &Arena, id: NodeId, name: &str) -> Result<PathBuf> {
    let mut path = fs_path(arena, id)?;
    path.push(name);
    Ok(path)
}

fn bound_root(arena: &Arena) -> Result<PathBuf> {
    arena
        .root_path
        .clone()
        .ok_or_else(|| TreeError::ConfigError("no filesystem root path bound".to_string()))
}
