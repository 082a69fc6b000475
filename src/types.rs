//! Core types shared across the tree.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Generational handle of a node inside a tree arena
///
/// The generation changes whenever a slot is reused, so handles to removed
/// nodes never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// How file content is read and written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    #[default]
    Text,
    Binary,
}

/// File content in its mode-appropriate form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn mode(&self) -> FileMode {
        match self {
            Content::Text(_) => FileMode::Text,
            Content::Binary(_) => FileMode::Binary,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Binary(bytes.to_vec())
    }
}

/// Text encoding applied to child names before they are used as keys
///
/// Names are always UTF-8; the normalizing variants fold canonically
/// equivalent spellings onto one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-8-nfc")]
    Utf8Nfc,
    #[serde(rename = "utf-8-nfd")]
    Utf8Nfd,
}

impl NameEncoding {
    pub fn normalize(&self, name: &str) -> String {
        match self {
            NameEncoding::Utf8 => name.to_string(),
            NameEncoding::Utf8Nfc => name.nfc().collect(),
            NameEncoding::Utf8Nfd => name.nfd().collect(),
        }
    }
}
