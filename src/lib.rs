//! fstree: Mapping View Over a Filesystem Tree
//!
//! Directories behave as ordered mappings from child name to child node,
//! files as lazily loaded content holders. Changes stay in memory until
//! `persist` writes creations, deletions and content edits back to disk.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod logging;
pub mod tooling;
pub mod tree;
pub mod types;

pub use error::{FactoryError, Result, TreeError};
pub use events::{ChildAdded, EventSink};
pub use factory::{Factory, FactoryContext, FactoryRegistry, SuffixTable};
pub use tree::node::{DirRef, DirectoryNode, FileNode, FileRef, Node, NodeRef};
pub use tree::{Tree, TreeOptions};
pub use types::{Content, FileMode, NameEncoding, NodeId};
