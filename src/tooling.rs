//! Tooling & Integration Layer
//!
//! Command-line access to a tree: list, read, write and delete entries
//! relative to a root directory.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
