use crate::error::RewriteError;
use crate::rule::{RuleHit, RuleSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A file loaded for rewriting.
///
/// Read once, rewritten in memory, and written back at most once by
/// [`FileRecord::commit`] when the current text differs from the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    original: String,
    current: String,
}

impl FileRecord {
    /// Read `path` as UTF-8 text.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RewriteError> {
        let path = path.into();
        let original = fs::read_to_string(&path).map_err(|source| RewriteError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_text(path, original))
    }

    /// Build a record from in-memory text (nothing is read).
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let original = text.into();
        Self {
            path: path.into(),
            current: original.clone(),
            original,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Run `rules` over the current text and return the rules that fired.
    pub fn apply(&mut self, rules: &RuleSet) -> Vec<RuleHit> {
        let rewrite = rules.apply(&self.current);
        self.current = rewrite.text;
        rewrite.hits
    }

    pub fn is_modified(&self) -> bool {
        self.current != self.original
    }

    /// Write the current text back if it changed. Returns whether a write
    /// happened; an unchanged file is not touched at all.
    pub fn commit(&self) -> Result<bool, RewriteError> {
        if !self.is_modified() {
            return Ok(false);
        }
        atomic_write(&self.path, self.current.as_bytes()).map_err(|source| {
            RewriteError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(true)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The temp file lives in the target's directory so the rename stays on one
/// filesystem. Permissions of an existing target are carried over.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
