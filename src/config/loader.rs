use crate::config::schema::{RewriteConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = "api-rewriter.toml";

/// Why a rewriter configuration could not be loaded.
///
/// Parse and validation failures come from the document itself; reading it
/// from disk wraps them in [`ConfigError::InFile`] so the message names the file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read rewriter config from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rewriter config TOML: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("invalid rewriter config: {0}")]
    Validation(#[from] ValidationError),

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// The document-level error, with any file context peeled off.
    pub fn root(&self) -> &ConfigError {
        match self {
            ConfigError::InFile { source, .. } => source.root(),
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RewriteConfig, ConfigError> {
    let config: RewriteConfig = toml_edit::de::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RewriteConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|source| ConfigError::InFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Load `<workspace>/api-rewriter.toml` if present, otherwise the defaults.
pub fn load_for_workspace(workspace: &Path) -> Result<RewriteConfig, ConfigError> {
    let path = workspace.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_from_path(&path)
    } else {
        Ok(RewriteConfig::default())
    }
}
