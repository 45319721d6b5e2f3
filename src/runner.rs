//! Run orchestration: discover, rewrite, commit, summarize.
//!
//! Processing is strictly sequential: roots in configuration order, files in
//! walk order. The first I/O error aborts the run; files already committed
//! stay committed.

use crate::config::ScanConfig;
use crate::error::RewriteError;
use crate::record::FileRecord;
use crate::rule::{RuleHit, RuleSet};
use crate::safety::WorkspaceGuard;
use crate::walk::discover;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// How a run treats the files it rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Write changed files back. When false nothing on disk is touched.
    pub write: bool,
    /// Keep before/after text of changed files for diff output.
    pub capture_diff: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            write: true,
            capture_diff: false,
        }
    }
}

impl RunOptions {
    pub fn dry_run() -> Self {
        Self {
            write: false,
            capture_diff: false,
        }
    }

    pub fn with_diff(mut self, capture_diff: bool) -> Self {
        self.capture_diff = capture_diff;
        self
    }
}

/// One changed (or, in a dry run, would-be-changed) file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub hits: Vec<RuleHit>,
    #[serde(skip)]
    pub before: Option<String>,
    #[serde(skip)]
    pub after: Option<String>,
}

/// Aggregate result of one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub scanned: usize,
    pub written: bool,
    pub changes: Vec<FileChange>,
    /// Scanned files no rule changed, relative to the workspace.
    pub unchanged: Vec<PathBuf>,
}

impl RunSummary {
    /// Number of files whose content changed.
    pub fn modified(&self) -> usize {
        self.changes.len()
    }
}

/// Rewrite every selected file under the workspace.
///
/// Roots are resolved against `workspace` and must stay inside it. A file
/// reached through more than one root is processed once.
pub fn run(
    scan: &ScanConfig,
    workspace: &Path,
    rules: &RuleSet,
    options: RunOptions,
) -> Result<RunSummary, RewriteError> {
    let guard = WorkspaceGuard::new(workspace)?;
    let mut summary = RunSummary {
        written: options.write,
        ..RunSummary::default()
    };
    let mut seen = HashSet::new();

    for root in &scan.roots {
        let joined = guard.workspace_root().join(root);
        if !joined.exists() {
            return Err(RewriteError::MissingRoot(joined));
        }
        let root = guard.validate_path(&joined)?;

        for path in discover(&root, &scan.suffixes, &scan.exclude)? {
            if !seen.insert(path.clone()) {
                continue;
            }
            summary.scanned += 1;
            match rewrite_file(&guard, &path, rules, options)? {
                Some(change) => summary.changes.push(change),
                None => summary.unchanged.push(relative_to(&guard, &path)),
            }
        }
    }

    Ok(summary)
}

/// Rewrite a single file. Returns `None` when no rule changed it.
pub fn rewrite_file(
    guard: &WorkspaceGuard,
    path: &Path,
    rules: &RuleSet,
    options: RunOptions,
) -> Result<Option<FileChange>, RewriteError> {
    let mut record = FileRecord::load(path)?;
    let hits = record.apply(rules);

    if !record.is_modified() {
        return Ok(None);
    }

    if options.write {
        guard.validate_path(path)?;
        record.commit()?;
    }

    let (before, after) = if options.capture_diff {
        (
            Some(record.original().to_string()),
            Some(record.current().to_string()),
        )
    } else {
        (None, None)
    };

    Ok(Some(FileChange {
        path: relative_to(guard, path),
        hits,
        before,
        after,
    }))
}

fn relative_to(guard: &WorkspaceGuard, path: &Path) -> PathBuf {
    path.strip_prefix(guard.workspace_root())
        .unwrap_or(path)
        .to_path_buf()
}
