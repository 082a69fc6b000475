//! CLI Tooling
//!
//! Command-line interface over a [`Tree`]. Every command opens the tree at
//! `--root`, works on the in-memory view and persists before returning.

use crate::config::{ConfigLoader, FstreeConfig};
use crate::error::TreeError;
use crate::logging::LoggingConfig;
use crate::tree::node::{DirRef, DirectoryNode, FileNode, NodeRef};
use crate::tree::{Tree, TreeOptions};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// fstree - mapping view over a directory tree
#[derive(Parser, Debug)]
#[command(name = "fstree")]
#[command(about = "Read and edit a directory tree as nested mappings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tree root directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging configuration with command-line flags applied on top of `base`
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the entries of a directory
    Ls {
        /// Directory relative to the root
        #[arg(default_value = "")]
        dir: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the text content of a file
    Cat {
        /// File relative to the root
        path: String,
    },
    /// Write text to a file, creating missing parent directories
    Put {
        /// File relative to the root
        path: String,
        /// New content
        text: String,
    },
    /// Delete a file or directory
    Rm {
        /// Entry relative to the root
        path: String,
    },
}

/// Load configuration for a CLI invocation
pub fn load_config(cli: &Cli) -> Result<FstreeConfig, TreeError> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(&cli.root)?,
    };
    Ok(config)
}

/// CLI context holding the opened tree
pub struct CliContext {
    tree: Tree,
}

impl CliContext {
    /// Open the tree at `root` with options taken from `config`
    pub fn new(root: PathBuf, config: &FstreeConfig) -> Result<Self, TreeError> {
        let options = TreeOptions::from_config(&config.tree)?;
        let tree = Tree::open_with(&root, options)?;
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, TreeError> {
        match command {
            Commands::Ls { dir, format } => self.handle_ls(dir, format),
            Commands::Cat { path } => {
                let text = self.tree.resolve(path)?.into_file()?.text()?;
                Ok(text)
            }
            Commands::Put { path, text } => self.handle_put(path, text),
            Commands::Rm { path } => self.handle_rm(path),
        }
    }

    fn handle_ls(&self, dir: &str, format: &str) -> Result<String, TreeError> {
        let dir = self.tree.resolve(dir)?.into_dir()?;
        let entries = dir.children()?;
        match format {
            "json" => {
                let mut items = Vec::with_capacity(entries.len());
                for (name, node) in &entries {
                    let kind = match node {
                        NodeRef::Directory(_) => "directory".to_string(),
                        NodeRef::File(file) => file.kind()?,
                    };
                    items.push(json!({ "name": name, "kind": kind }));
                }
                Ok(serde_json::to_string_pretty(&items)?)
            }
            "text" => Ok(entries
                .iter()
                .map(|(name, node)| {
                    if node.is_dir() {
                        format!("{}/", name)
                    } else {
                        name.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")),
            other => Err(TreeError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    fn handle_put(&self, path: &str, text: &str) -> Result<String, TreeError> {
        let (parents, name) = split_path(path)?;
        let _guard = self.tree.lock();
        let mut dir = self.tree.root();
        for part in parents {
            dir = child_dir_or_create(&dir, part)?;
        }
        let file = match dir.get(name) {
            Ok(NodeRef::File(file)) => file,
            Ok(NodeRef::Directory(_)) => {
                return Err(TreeError::Conflict {
                    path: dir.path()?.join(name),
                    reason: "Cannot write text to a directory".to_string(),
                })
            }
            Err(TreeError::NotFound(_)) => dir.set(name, FileNode::new())?.into_file()?,
            Err(e) => return Err(e),
        };
        file.set_data(text)?;
        self.tree.persist()?;
        info!(path = %file.path()?.display(), bytes = text.len(), "Wrote file");
        Ok(format!("Wrote {}", path))
    }

    fn handle_rm(&self, path: &str) -> Result<String, TreeError> {
        let (parents, name) = split_path(path)?;
        let _guard = self.tree.lock();
        let mut dir = self.tree.root();
        for part in parents {
            dir = dir.get_dir(part)?;
        }
        dir.remove(name)?;
        dir.persist()?;
        info!(path = %dir.path()?.join(name).display(), "Removed entry");
        Ok(format!("Removed {}", path))
    }
}

fn child_dir_or_create(dir: &DirRef, name: &str) -> Result<DirRef, TreeError> {
    match dir.get(name) {
        Ok(node) => node.into_dir(),
        Err(TreeError::NotFound(_)) => dir.set(name, DirectoryNode::new())?.into_dir(),
        Err(e) => Err(e),
    }
}

/// Split `a/b/c` into its parent components and final name
fn split_path(path: &str) -> Result<(Vec<&str>, &str), TreeError> {
    let mut parts: Vec<&str> = path
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    if parts.contains(&"..") {
        return Err(TreeError::InvalidKey(format!(
            "{:?} must not leave the tree root",
            path
        )));
    }
    let name = parts
        .pop()
        .ok_or_else(|| TreeError::InvalidKey(format!("{:?} does not name an entry", path)))?;
    Ok((parts, name))
}
