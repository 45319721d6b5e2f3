pub mod loader;
pub mod schema;

pub use loader::{load_for_workspace, load_from_path, load_from_str, ConfigError, CONFIG_FILE_NAME};
pub use schema::{
    RewriteConfig, RewriteOptions, RuleDefinition, ScanConfig, ValidationError, ValidationIssue,
    DEFAULT_ROOTS, DEFAULT_SUFFIXES,
};
