//! File operations: lazy content, line view and write-back.

use crate::error::{Result, TreeError};
use crate::tree::directory::set_permissions;
use crate::tree::node::FileRef;
use crate::tree::path;
use crate::types::{Content, FileMode};
use std::fs;
use std::io::{self, Write};
use tracing::debug;

impl FileRef {
    /// Label given by the factory that built this file
    pub fn kind(&self) -> Result<String> {
        Ok(self.tree.arena().file(self.id)?.kind.clone())
    }

    pub fn mode(&self) -> Result<FileMode> {
        Ok(self.tree.arena().file(self.id)?.mode)
    }

    /// Change the mode; only allowed before content is read or assigned
    pub fn set_mode(&self, mode: FileMode) -> Result<()> {
        let _guard = self.tree.lock();
        let mut arena = self.tree.arena();
        let file = arena.file_mut(self.id)?;
        if file.loaded && file.mode != mode {
            return Err(TreeError::Mode(
                "Cannot change mode after content was read or assigned".to_string(),
            ));
        }
        file.mode = mode;
        Ok(())
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.tree.arena().file(self.id)?.dirty)
    }

    pub fn direct_sync(&self) -> Result<bool> {
        Ok(self.tree.arena().file(self.id)?.direct_sync)
    }

    pub fn set_direct_sync(&self, direct_sync: bool) -> Result<()> {
        self.tree.arena().file_mut(self.id)?.direct_sync = direct_sync;
        Ok(())
    }

    /// Content, read from disk on first access and cached afterwards
    ///
    /// A text file that does not exist reads as empty text; a binary file
    /// that does not exist reads as `None`.
    pub fn data(&self) -> Result<Option<Content>> {
        let _guard = self.tree.lock();
        let (mode, file_path) = {
            let arena = self.tree.arena();
            let file = arena.file(self.id)?;
            if file.loaded {
                return Ok(file.content.clone());
            }
            (file.mode, path::fs_path(&arena, self.id)?)
        };

        let content = match mode {
            FileMode::Text => match fs::read_to_string(&file_path) {
                Ok(text) => Some(Content::Text(text)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Some(Content::Text(String::new())),
                Err(e) => return Err(e.into()),
            },
            FileMode::Binary => match fs::read(&file_path) {
                Ok(bytes) => Some(Content::Binary(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            },
        };
        debug!(path = %file_path.display(), "Loaded file content");

        let mut arena = self.tree.arena();
        let file = arena.file_mut(self.id)?;
        file.content = content.clone();
        file.loaded = true;
        Ok(content)
    }

    /// Text content; `Mode` error for binary files
    pub fn text(&self) -> Result<String> {
        self.require_text("read text from")?;
        match self.data()? {
            Some(Content::Text(text)) => Ok(text),
            _ => Ok(String::new()),
        }
    }

    /// Raw bytes of the content in either mode
    pub fn bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.data()?.map(|content| content.as_bytes().to_vec()))
    }

    /// Assign content and mark the file dirty
    ///
    /// The content's form must match the file's mode.
    pub fn set_data(&self, content: impl Into<Content>) -> Result<()> {
        let content = content.into();
        let _guard = self.tree.lock();
        let mut arena = self.tree.arena();
        let file = arena.file_mut(self.id)?;
        if content.mode() != file.mode {
            return Err(TreeError::Mode(format!(
                "Cannot assign {:?} content to a {:?} file",
                content.mode(),
                file.mode
            )));
        }
        file.content = Some(content);
        file.loaded = true;
        file.dirty = true;
        Ok(())
    }

    /// Content split on `\n`; empty content gives no lines
    pub fn lines(&self) -> Result<Vec<String>> {
        self.require_text("read lines from")?;
        let text = self.text()?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split('\n').map(str::to_string).collect())
    }

    /// Replace the content with `lines` joined by `\n`
    pub fn set_lines<I, S>(&self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.require_text("write lines to")?;
        let joined = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.set_data(Content::Text(joined))
    }

    fn require_text(&self, action: &str) -> Result<()> {
        if self.mode()? == FileMode::Binary {
            return Err(TreeError::Mode(format!("Cannot {} binary file", action)));
        }
        Ok(())
    }

    /// Write the content to disk if it changed or the file does not exist yet
    pub fn persist(&self) -> Result<()> {
        let _guard = self.tree.lock();
        let (file_path, dirty, loaded, direct_sync, permissions) = {
            let arena = self.tree.arena();
            let file = arena.file(self.id)?;
            let permissions = file.permissions.or(self.tree.options().file_permissions);
            (
                path::fs_path(&arena, self.id)?,
                file.dirty,
                file.loaded,
                file.direct_sync,
                permissions,
            )
        };

        let exists = match fs::metadata(&file_path) {
            Ok(metadata) if metadata.is_dir() => {
                return Err(TreeError::Conflict {
                    path: file_path,
                    reason: "Attempt to write a file where a directory exists".to_string(),
                })
            }
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if dirty || !exists {
            let bytes = if loaded {
                self.tree
                    .arena()
                    .file(self.id)?
                    .content
                    .as_ref()
                    .map(|content| content.as_bytes().to_vec())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            let mut handle = fs::File::create(&file_path)?;
            handle.write_all(&bytes)?;
            if direct_sync {
                handle.flush()?;
                handle.sync_all()?;
            }
            debug!(path = %file_path.display(), bytes = bytes.len(), "Wrote file");

            let mut arena = self.tree.arena();
            let file = arena.file_mut(self.id)?;
            if !file.loaded {
                file.content = Some(match file.mode {
                    FileMode::Text => Content::Text(String::new()),
                    FileMode::Binary => Content::Binary(Vec::new()),
                });
                file.loaded = true;
            }
            file.dirty = false;
        }

        if let Some(mode) = permissions {
            set_permissions(&file_path, mode)?;
        }
        Ok(())
    }
}
