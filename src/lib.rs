//! api-rewriter: pattern-based source rewriting for WebGPU API migrations
//!
//! Walks a set of directories, applies an ordered list of textual rules to
//! every selected file, and writes a file back only when its content changed.
//!
//! # Architecture
//!
//! Every transformation is a tagged [`Rule`] variant: a regex substitution
//! (template or computed descriptor) or an include insertion. A [`RuleSet`]
//! applies its rules in order; a [`FileRecord`] carries one file through a
//! pass and commits it at most once; [`run`] drives a whole traversal and
//! returns a [`RunSummary`].
//!
//! # Guarantees
//!
//! - The built-in rule set is idempotent: a second pass changes nothing
//! - Unchanged files are never written
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement for roots and written files
//!
//! Rules are textual heuristics, not a C++ parser. A pattern that happens to
//! match an unintended construct is rewritten like any other match.
//!
//! # Example
//!
//! ```
//! use api_rewriter::{webgpu_rules, LengthStyle};
//!
//! let rules = webgpu_rules(LengthStyle::Literal);
//! let rewrite = rules.apply("desc.label = \"hello\";\n");
//!
//! assert_eq!(
//!     rewrite.text,
//!     "WGPUStringView descLabel = {\"hello\", 5};\ndesc.label = descLabel;\n"
//! );
//! ```

pub mod builtin;
pub mod config;
pub mod error;
pub mod record;
pub mod rule;
pub mod runner;
pub mod safety;
pub mod walk;

// Re-exports
pub use builtin::webgpu_rules;
pub use config::{
    load_for_workspace, load_from_path, load_from_str, ConfigError, RewriteConfig, ScanConfig,
    ValidationError,
};
pub use error::RewriteError;
pub use record::FileRecord;
pub use rule::{
    DescriptorSource, DescriptorSpec, LengthStyle, Replacement, Rewrite, Rule, RuleHit, RuleKind,
    RuleSet,
};
pub use runner::{run, FileChange, RunOptions, RunSummary};
pub use safety::{SafetyError, WorkspaceGuard};
