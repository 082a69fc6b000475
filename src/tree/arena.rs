//! Generational arena holding the state of every attached node.
//!
//! Directories own their children through the overlay map of ids; children
//! point back at their parent by id only. Freeing a subtree bumps the
//! generation of each slot so outstanding handles fail with `Detached`.

use crate::error::{Result, TreeError};
use crate::factory::SuffixTable;
use crate::tree::node::{DirectoryNode, FileNode, Node};
use crate::types::{Content, FileMode, NameEncoding, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// State of an attached directory
#[derive(Debug, Default)]
pub(crate) struct DirState {
    /// Already resolved children
    pub(crate) overlay: BTreeMap<String, NodeId>,
    /// Names to remove from disk on the next persist, oldest first
    pub(crate) pending_deletions: Vec<String>,
    pub(crate) ignores: BTreeSet<String>,
    pub(crate) factories: SuffixTable,
    pub(crate) permissions: Option<u32>,
}

/// State of an attached file
#[derive(Debug)]
pub(crate) struct FileState {
    pub(crate) kind: String,
    pub(crate) mode: FileMode,
    /// Cached content; meaningful only once `loaded` is set
    pub(crate) content: Option<Content>,
    pub(crate) loaded: bool,
    pub(crate) dirty: bool,
    pub(crate) direct_sync: bool,
    pub(crate) permissions: Option<u32>,
}

#[derive(Debug)]
pub(crate) enum SlotData {
    Directory(DirState),
    File(FileState),
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: SlotData,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

/// Node storage for one tree
#[derive(Debug)]
pub(crate) struct Arena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Filesystem location of the root directory
    pub(crate) root_path: Option<PathBuf>,
    pub(crate) root: NodeId,
}

impl Arena {
    /// Arena holding only an empty root directory
    pub(crate) fn new(root: DirState, root_path: Option<PathBuf>) -> Self {
        let mut arena = Self {
            entries: Vec::new(),
            free: Vec::new(),
            root_path,
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        arena.root = arena.alloc(Slot {
            name: String::new(),
            parent: None,
            data: SlotData::Directory(root),
        });
        arena
    }

    fn alloc(&mut self, slot: Slot) -> NodeId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.slot = Some(slot);
            return NodeId {
                index,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            slot: Some(slot),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    pub(crate) fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.entries
            .get(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_ref())
            .ok_or(TreeError::Detached)
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_mut())
            .ok_or(TreeError::Detached)
    }

    pub(crate) fn dir(&self, id: NodeId) -> Result<&DirState> {
        match &self.slot(id)?.data {
            SlotData::Directory(dir) => Ok(dir),
            SlotData::File(_) => Err(TreeError::WrongKind {
                expected: "directory",
            }),
        }
    }

    pub(crate) fn dir_mut(&mut self, id: NodeId) -> Result<&mut DirState> {
        match &mut self.slot_mut(id)?.data {
            SlotData::Directory(dir) => Ok(dir),
            SlotData::File(_) => Err(TreeError::WrongKind {
                expected: "directory",
            }),
        }
    }

    pub(crate) fn file(&self, id: NodeId) -> Result<&FileState> {
        match &self.slot(id)?.data {
            SlotData::File(file) => Ok(file),
            SlotData::Directory(_) => Err(TreeError::WrongKind { expected: "file" }),
        }
    }

    pub(crate) fn file_mut(&mut self, id: NodeId) -> Result<&mut FileState> {
        match &mut self.slot_mut(id)?.data {
            SlotData::File(file) => Ok(file),
            SlotData::Directory(_) => Err(TreeError::WrongKind { expected: "file" }),
        }
    }

    pub(crate) fn is_dir(&self, id: NodeId) -> Result<bool> {
        Ok(matches!(self.slot(id)?.data, SlotData::Directory(_)))
    }

    /// Attach a detached node (and its pre-built children) under `parent`
    ///
    /// Does not touch the parent's overlay; the caller links the returned id.
    /// Nested child names are normalized with `encoding`; `name` must already be.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        name: String,
        node: Node,
        encoding: &NameEncoding,
    ) -> NodeId {
        match node {
            Node::File(file) => self.alloc(Slot {
                name,
                parent: Some(parent),
                data: SlotData::File(FileState::from(file)),
            }),
            Node::Directory(dir) => {
                let (state, children) = dir.into_parts();
                let id = self.alloc(Slot {
                    name,
                    parent: Some(parent),
                    data: SlotData::Directory(state),
                });
                for (child_name, child) in children {
                    let child_name = encoding.normalize(&child_name);
                    let child_id = self.attach(id, child_name.clone(), child, encoding);
                    let replaced = self
                        .dir_mut(id)
                        .ok()
                        .and_then(|dir| dir.overlay.insert(child_name, child_id));
                    if let Some(replaced) = replaced {
                        self.free_subtree(replaced);
                    }
                }
                id
            }
        }
    }

    /// Release `id` and everything below it
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let Some(entry) = self
            .entries
            .get_mut(id.index as usize)
            .filter(|entry| entry.generation == id.generation)
        else {
            return;
        };
        let Some(slot) = entry.slot.take() else {
            return;
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);

        if let SlotData::Directory(dir) = slot.data {
            for child in dir.overlay.into_values() {
                self.free_subtree(child);
            }
        }
    }

    /// Number of live nodes, root included
    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }
}

impl From<FileNode> for FileState {
    fn from(file: FileNode) -> Self {
        let loaded = file.content.is_some();
        FileState {
            kind: file.kind,
            mode: file.mode,
            content: file.content,
            loaded,
            dirty: loaded,
            direct_sync: file.direct_sync,
            permissions: file.permissions,
        }
    }
}

impl DirectoryNode {
    pub(crate) fn into_parts(self) -> (DirState, Vec<(String, Node)>) {
        let state = DirState {
            overlay: BTreeMap::new(),
            pending_deletions: Vec::new(),
            ignores: self.ignores,
            factories: self.factories,
            permissions: self.permissions,
        };
        (state, self.children)
    }
}
