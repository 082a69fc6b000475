//! Suffix Factory Registry
//!
//! Decides which concrete node a not yet resolved filesystem entry becomes.
//! Factories are keyed by filename suffix in two tiers: per-directory tables
//! and a process-wide table installed once at startup.

use crate::error::{FactoryError, TreeError};
use crate::tree::node::{DirectoryNode, FileNode, Node};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Constructor for a child node
pub type Factory = Arc<dyn Fn(&FactoryContext<'_>) -> Result<Node, FactoryError> + Send + Sync>;

/// Wrap a closure as a [`Factory`]
pub fn factory<F>(f: F) -> Factory
where
    F: Fn(&FactoryContext<'_>) -> Result<Node, FactoryError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What a factory knows about the entry it builds
#[derive(Debug, Clone, Copy)]
pub struct FactoryContext<'a> {
    /// Child name (already normalized)
    pub name: &'a str,
    /// Absolute filesystem path of the parent directory
    pub parent_path: &'a Path,
}

impl FactoryContext<'_> {
    /// Absolute filesystem path of the entry being built
    pub fn path(&self) -> PathBuf {
        self.parent_path.join(self.name)
    }
}

/// Suffix to factory mapping
///
/// Backed by a `BTreeMap`, so lookups walk suffixes in the same order on
/// every call.
#[derive(Clone, Default)]
pub struct SuffixTable {
    entries: BTreeMap<String, Factory>,
}

impl SuffixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for names ending in `suffix`, replacing any previous entry
    pub fn register(&mut self, suffix: impl Into<String>, factory: Factory) -> Result<(), TreeError> {
        let suffix = suffix.into();
        if suffix.is_empty() {
            return Err(TreeError::InvalidKey(
                "Empty suffix not allowed in factory tables".to_string(),
            ));
        }
        self.entries.insert(suffix, factory);
        Ok(())
    }

    /// Builder form of [`SuffixTable::register`]
    pub fn with(mut self, suffix: impl Into<String>, factory: Factory) -> Result<Self, TreeError> {
        self.register(suffix, factory)?;
        Ok(self)
    }

    pub fn remove(&mut self, suffix: &str) -> Option<Factory> {
        self.entries.remove(suffix)
    }

    pub fn get(&self, suffix: &str) -> Option<&Factory> {
        self.entries.get(suffix)
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest registered suffix that `name` ends with
    pub fn longest_match(&self, name: &str) -> Option<(&str, &Factory)> {
        let mut best: Option<(&str, &Factory)> = None;
        for (suffix, factory) in &self.entries {
            if !name.ends_with(suffix.as_str()) {
                continue;
            }
            match best {
                Some((current, _)) if current.len() >= suffix.len() => {}
                _ => best = Some((suffix.as_str(), factory)),
            }
        }
        best
    }
}

impl fmt::Debug for SuffixTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Pick a factory for `name` from the directory tier and the global tier
///
/// The longer suffix wins across tiers; on equal length the directory tier wins.
pub fn resolve_factory(name: &str, local: &SuffixTable, global: &SuffixTable) -> Option<Factory> {
    match (local.longest_match(name), global.longest_match(name)) {
        (Some((local_key, local_factory)), Some((global_key, global_factory))) => {
            if global_key.len() > local_key.len() {
                Some(global_factory.clone())
            } else {
                Some(local_factory.clone())
            }
        }
        (Some((_, local_factory)), None) => Some(local_factory.clone()),
        (None, Some((_, global_factory))) => Some(global_factory.clone()),
        (None, None) => None,
    }
}

static GLOBAL_FACTORIES: OnceLock<Arc<SuffixTable>> = OnceLock::new();

/// Install the process-wide suffix table
///
/// Intended to run once during startup; a second call fails so readers
/// never observe the table changing underneath them.
pub fn install_global(table: SuffixTable) -> Result<(), TreeError> {
    GLOBAL_FACTORIES.set(Arc::new(table)).map_err(|_| {
        TreeError::ConfigError("Global factory table is already installed".to_string())
    })
}

/// Process-wide suffix table, empty if none was installed
pub fn global() -> Arc<SuffixTable> {
    GLOBAL_FACTORIES
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(SuffixTable::new()))
}

/// Factory configuration a tree resolves children with
#[derive(Clone)]
pub struct FactoryRegistry {
    /// Process-wide tier
    pub global: Arc<SuffixTable>,
    /// Used for regular files when no suffix matches
    pub default_file: Option<Factory>,
    /// Used for every directory entry
    pub directory: Option<Factory>,
}

impl FactoryRegistry {
    /// Registry backed by the installed process-wide table
    pub fn from_global() -> Self {
        Self::with_global(global())
    }

    pub fn with_global(global: Arc<SuffixTable>) -> Self {
        Self {
            global,
            default_file: None,
            directory: None,
        }
    }

    /// Suffix factory for `name`, falling back to the configured default file factory
    pub fn resolve_file(&self, name: &str, local: &SuffixTable) -> Option<Factory> {
        resolve_factory(name, local, &self.global).or_else(|| self.default_file.clone())
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::from_global()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("global", &self.global)
            .field("default_file", &self.default_file.is_some())
            .field("directory", &self.directory.is_some())
            .finish()
    }
}

/// Factory producing plain text files tagged with `kind`
pub fn text_file_factory(kind: &'static str) -> Factory {
    factory(move |_| Ok(FileNode::new().with_kind(kind).into()))
}

/// Factory producing binary files tagged with `kind`
pub fn binary_file_factory(kind: &'static str) -> Factory {
    factory(move |_| Ok(FileNode::binary_file().with_kind(kind).into()))
}

/// Factory producing empty directories
pub fn directory_factory() -> Factory {
    factory(|_| Ok(DirectoryNode::new().into()))
}
