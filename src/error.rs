use crate::safety::SafetyError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors of a rewrite run. Pattern misses are never errors.
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("Scan root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error(transparent)]
    Safety(#[from] SafetyError),
}
