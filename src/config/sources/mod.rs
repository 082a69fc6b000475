//! Configuration sources.

pub mod environment;
pub mod root_file;
