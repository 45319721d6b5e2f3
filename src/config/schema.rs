use crate::builtin::webgpu_rules;
use crate::rule::{LengthStyle, Rule, RuleSet};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Directories scanned when no configuration names any.
pub const DEFAULT_ROOTS: &[&str] = &["src/mbgl/webgpu", "src/mbgl/shaders/webgpu"];

/// File-name suffixes selected when no configuration names any.
pub const DEFAULT_SUFFIXES: &[&str] = &[".cpp"];

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RewriteConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub rewrite: RewriteOptions,
    /// Custom rules, applied after the built-in set in file order.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Which files a run visits.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Scan roots, relative to the workspace.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    /// Directory names pruned anywhere below a root.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_roots() -> Vec<PathBuf> {
    DEFAULT_ROOTS.iter().map(PathBuf::from).collect()
}

fn default_suffixes() -> Vec<String> {
    DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            suffixes: default_suffixes(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Include the built-in WebGPU rule set.
    #[serde(default = "default_true")]
    pub builtin: bool,
    #[serde(default)]
    pub length: LengthStyle,
}

fn default_true() -> bool {
    true
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            builtin: true,
            length: LengthStyle::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleDefinition {
    Substitute {
        name: String,
        #[serde(default)]
        description: Option<String>,
        pattern: String,
        replace: String,
    },
    EnsureInclude {
        name: String,
        #[serde(default)]
        description: Option<String>,
        trigger: String,
        /// Header with delimiters, `<cstdint>` or `"local.hpp"`.
        header: String,
        #[serde(default)]
        equivalents: Vec<String>,
    },
}

impl RuleDefinition {
    pub fn name(&self) -> &str {
        match self {
            RuleDefinition::Substitute { name, .. } | RuleDefinition::EnsureInclude { name, .. } => {
                name
            }
        }
    }

    fn compile(&self) -> Result<Rule, ValidationIssue> {
        let compile = |field: &'static str, src: &str| {
            Regex::new(src).map_err(|e| ValidationIssue::InvalidPattern {
                rule: self.name().to_string(),
                field,
                message: e.to_string(),
            })
        };

        match self {
            RuleDefinition::Substitute {
                name,
                description,
                pattern,
                replace,
            } => Ok(Rule::substitute(
                name,
                description.clone().unwrap_or_default(),
                compile("pattern", pattern)?,
                replace,
            )),
            RuleDefinition::EnsureInclude {
                name,
                description,
                trigger,
                header,
                equivalents,
            } => Ok(Rule::ensure_include(
                name,
                description.clone().unwrap_or_default(),
                compile("trigger", trigger)?,
                header,
            )
            .with_equivalents(equivalents.iter().cloned())),
        }
    }
}

fn is_delimited_header(header: &str) -> bool {
    header.len() > 2
        && ((header.starts_with('<') && header.ends_with('>'))
            || (header.starts_with('"') && header.ends_with('"')))
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.scan.roots.is_empty() {
            issues.push(ValidationIssue::EmptyList { field: "scan.roots" });
        }
        if self.scan.suffixes.is_empty() {
            issues.push(ValidationIssue::EmptyList {
                field: "scan.suffixes",
            });
        }
        if self.scan.suffixes.iter().any(|s| s.trim().is_empty()) {
            issues.push(ValidationIssue::BlankEntry {
                field: "scan.suffixes",
            });
        }
        if self.scan.exclude.iter().any(|s| s.trim().is_empty()) {
            issues.push(ValidationIssue::BlankEntry {
                field: "scan.exclude",
            });
        }

        let mut seen: HashSet<String> = HashSet::new();
        if self.rewrite.builtin {
            seen.extend(
                webgpu_rules(self.rewrite.length)
                    .iter()
                    .map(|r| r.name.clone()),
            );
        }

        for def in &self.rules {
            let name = def.name();
            if name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: None,
                    field: "name",
                });
            } else if !seen.insert(name.to_string()) {
                issues.push(ValidationIssue::DuplicateRule(name.to_string()));
            }

            if let RuleDefinition::EnsureInclude {
                header,
                equivalents,
                ..
            } = def
            {
                for h in std::iter::once(header).chain(equivalents) {
                    if !is_delimited_header(h) {
                        issues.push(ValidationIssue::InvalidHeader {
                            rule: name.to_string(),
                            header: h.clone(),
                        });
                    }
                }
            }

            if let Err(issue) = def.compile() {
                issues.push(issue);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Build the ordered rule set: built-ins first (if enabled), then the
    /// custom rules in file order.
    pub fn rule_set(&self) -> Result<RuleSet, ValidationError> {
        self.validate()?;

        let mut rules = if self.rewrite.builtin {
            webgpu_rules(self.rewrite.length)
        } else {
            RuleSet::new()
        };
        for def in &self.rules {
            rules.push(def.compile().map_err(|issue| ValidationError {
                issues: vec![issue],
            })?);
        }
        Ok(rules)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyList {
        field: &'static str,
    },
    BlankEntry {
        field: &'static str,
    },
    MissingField {
        rule: Option<String>,
        field: &'static str,
    },
    DuplicateRule(String),
    InvalidPattern {
        rule: String,
        field: &'static str,
        message: String,
    },
    InvalidHeader {
        rule: String,
        header: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyList { field } => write!(f, "'{field}' must not be empty"),
            ValidationIssue::BlankEntry { field } => {
                write!(f, "'{field}' contains a blank entry")
            }
            ValidationIssue::MissingField { rule, field } => match rule {
                Some(name) => write!(f, "rule '{name}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateRule(name) => {
                write!(f, "rule name '{name}' is used more than once")
            }
            ValidationIssue::InvalidPattern {
                rule,
                field,
                message,
            } => write!(f, "rule '{rule}' has an invalid {field}: {message}"),
            ValidationIssue::InvalidHeader { rule, header } => write!(
                f,
                "rule '{rule}' header {header} must be written as <name> or \"name\""
            ),
        }
    }
}
