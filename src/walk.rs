//! Recursive discovery of files to rewrite.

use crate::error::RewriteError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// True if the file name ends with one of `suffixes`.
pub fn matches_suffix(path: &Path, suffixes: &[String]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s.as_str())))
}

fn is_excluded(entry: &DirEntry, exclude: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| exclude.iter().any(|e| e == name))
}

/// Every regular file under `root` whose name ends with one of `suffixes`.
///
/// Entries are visited in file-name order so runs are deterministic.
/// Symlinks are not followed, and directories named in `exclude` are pruned.
pub fn discover(
    root: &Path,
    suffixes: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, RewriteError> {
    if !root.exists() {
        return Err(RewriteError::MissingRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, exclude));

    for entry in walker {
        let entry = entry.map_err(|source| RewriteError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && matches_suffix(entry.path(), suffixes) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
