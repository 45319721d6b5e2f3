//! Rule variants and ordered rule-set application.
//!
//! Every transformation is a [`Rule`]: a name, a description, and a tagged
//! [`RuleKind`] saying how it matches and what it produces. A [`RuleSet`]
//! applies its rules in order, each one seeing the output of the previous
//! one. Rules never fail: a pattern that matches nothing leaves the text as is.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A single named transformation.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub description: String,
    pub kind: RuleKind,
}

/// How a rule matches and rewrites text.
#[derive(Clone)]
pub enum RuleKind {
    /// Global, non-overlapping substitution of every match.
    Substitute {
        pattern: Regex,
        replacement: Replacement,
    },
    /// Insert `#include <header>` after the last include directive whenever
    /// `trigger` matches and the include is not already present.
    EnsureInclude {
        trigger: Regex,
        header: String,
        /// Headers that satisfy the requirement just as well (e.g. the C
        /// spelling of a C++ header).
        equivalents: Vec<String>,
    },
}

/// Replacement strategy for [`RuleKind::Substitute`].
#[derive(Debug, Clone)]
pub enum Replacement {
    /// `regex` expansion template (`$name`, `${name}`, `$1`).
    Template(String),
    /// Two-statement string-view descriptor form, computed from the captures.
    Descriptor(DescriptorSpec),
}

/// Descriptor produced for a field assignment.
///
/// The pattern must capture `indent`, `obj` (the assigned-to object path) and
/// either `text` (literal source) or `src` and `ptr` (buffer source).
#[derive(Debug, Clone)]
pub struct DescriptorSpec {
    /// Type of the declared descriptor, e.g. `WGPUStringView`.
    pub type_name: String,
    /// Field being assigned, e.g. `label`.
    pub field: String,
    /// Suffix appended to the descriptor's base name: the assigned object
    /// for literal sources, the source object for buffer sources.
    pub suffix: String,
    pub source: DescriptorSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSource {
    /// A quoted string literal paired with its length.
    Literal(LengthStyle),
    /// A string object's buffer pointer paired with its `length()` accessor.
    Buffer,
}

/// How the length of a literal is spelled in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthStyle {
    /// The byte length as a number: `{"hello", 5}`.
    #[default]
    Literal,
    /// A `strlen` call: `{"hello", strlen("hello")}`.
    Strlen,
}

impl fmt::Display for LengthStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthStyle::Literal => write!(f, "literal"),
            LengthStyle::Strlen => write!(f, "strlen"),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Substitute {
                pattern,
                replacement,
            } => f
                .debug_struct("Substitute")
                .field("pattern", &pattern.as_str())
                .field("replacement", replacement)
                .finish(),
            RuleKind::EnsureInclude {
                trigger,
                header,
                equivalents,
            } => f
                .debug_struct("EnsureInclude")
                .field("trigger", &trigger.as_str())
                .field("header", header)
                .field("equivalents", equivalents)
                .finish(),
        }
    }
}

impl Rule {
    /// Substitution with a `regex` expansion template.
    pub fn substitute(
        name: impl Into<String>,
        description: impl Into<String>,
        pattern: Regex,
        template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: RuleKind::Substitute {
                pattern,
                replacement: Replacement::Template(template.into()),
            },
        }
    }

    /// Substitution producing a two-statement descriptor.
    pub fn descriptor(
        name: impl Into<String>,
        description: impl Into<String>,
        pattern: Regex,
        spec: DescriptorSpec,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: RuleKind::Substitute {
                pattern,
                replacement: Replacement::Descriptor(spec),
            },
        }
    }

    /// Include insertion. `header` carries its delimiters: `<cstring>` or
    /// `"local.hpp"`.
    pub fn ensure_include(
        name: impl Into<String>,
        description: impl Into<String>,
        trigger: Regex,
        header: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: RuleKind::EnsureInclude {
                trigger,
                header: header.into(),
                equivalents: Vec::new(),
            },
        }
    }

    /// Add headers that also satisfy an include rule. No effect on
    /// substitution rules.
    pub fn with_equivalents<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let RuleKind::EnsureInclude { equivalents, .. } = &mut self.kind {
            equivalents.extend(headers.into_iter().map(Into::into));
        }
        self
    }

    /// Apply the rule to `text`.
    ///
    /// Returns the rewritten text and the number of replacements made.
    /// When nothing matches the input is returned borrowed with a count of 0.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        match &self.kind {
            RuleKind::Substitute {
                pattern,
                replacement,
            } => substitute(pattern, replacement, text),
            RuleKind::EnsureInclude {
                trigger,
                header,
                equivalents,
            } => ensure_include(trigger, header, equivalents, text),
        }
    }
}

fn substitute<'t>(
    pattern: &Regex,
    replacement: &Replacement,
    text: &'t str,
) -> (Cow<'t, str>, usize) {
    let mut hits = 0;
    let rewritten = pattern.replace_all(text, |caps: &Captures<'_>| {
        hits += 1;
        match replacement {
            Replacement::Template(template) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                out
            }
            Replacement::Descriptor(spec) => {
                let end = caps.get(0).map_or(0, |m| m.end());
                render_descriptor(spec, caps, line_ending(&text[end..]))
            }
        }
    });

    // A replacement identical to its match does not count as a change.
    if matches!(&rewritten, Cow::Owned(s) if s == text) {
        return (Cow::Borrowed(text), 0);
    }
    (rewritten, hits)
}

fn render_descriptor(spec: &DescriptorSpec, caps: &Captures<'_>, eol: &str) -> String {
    let indent = caps.name("indent").map_or("", |m| m.as_str());
    let obj = caps.name("obj").map_or("", |m| m.as_str());

    // One object can be fed from several buffers in the same scope
    // (`wgslDesc.code` for the vertex and then the fragment module), so buffer
    // descriptors are named after their source.
    let (var, init) = match spec.source {
        DescriptorSource::Literal(style) => {
            let text = caps.name("text").map_or("", |m| m.as_str());
            let init = match style {
                LengthStyle::Literal => format!("{{\"{text}\", {}}}", literal_len(text)),
                LengthStyle::Strlen => format!("{{\"{text}\", strlen(\"{text}\")}}"),
            };
            (descriptor_var(obj, &spec.suffix), init)
        }
        DescriptorSource::Buffer => {
            let src = caps.name("src").map_or("", |m| m.as_str());
            let ptr = caps.name("ptr").map_or("c_str", |m| m.as_str());
            (
                descriptor_var(src, &spec.suffix),
                format!("{{{src}.{ptr}(), {src}.length()}}"),
            )
        }
    };

    format!(
        "{indent}{} {var} = {init};{eol}{indent}{obj}.{} = {var};",
        spec.type_name, spec.field
    )
}

/// Terminator of the line `rest` starts in; `\n` when it is the last line.
fn line_ending(rest: &str) -> &'static str {
    match rest.split_inclusive('\n').next() {
        Some(line) if line.ends_with("\r\n") => "\r\n",
        _ => "\n",
    }
}

/// Descriptor variable name: last segment of the path plus `suffix`.
pub fn descriptor_var(obj: &str, suffix: &str) -> String {
    let last = obj.rsplit('.').next().unwrap_or(obj);
    format!("{last}{suffix}")
}

/// Byte length of a C string literal body, as `strlen` would report it for
/// literals without embedded NULs.
///
/// Simple escapes (`\n`, `\"`), hex escapes (`\x41`) and octal escapes of up
/// to three digits (`\101`) each count as one byte. Universal character
/// names (`\u00e9`, `\U0001F600`) count as their UTF-8 encoding.
pub fn literal_len(body: &str) -> usize {
    let bytes = body.as_bytes();
    let mut len = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            len += 1;
            i += 1;
            continue;
        }

        i += 1;
        match bytes[i] {
            b'x' => {
                i += 1 + hex_run(&bytes[i + 1..], usize::MAX);
                len += 1;
            }
            b'0'..=b'7' => {
                let digits = bytes[i..]
                    .iter()
                    .take(3)
                    .take_while(|b| matches!(**b, b'0'..=b'7'))
                    .count();
                i += digits;
                len += 1;
            }
            marker @ (b'u' | b'U') => {
                let want = if marker == b'u' { 4 } else { 8 };
                let digits = hex_run(&bytes[i + 1..], want);
                let encoded = std::str::from_utf8(&bytes[i + 1..i + 1 + digits])
                    .ok()
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .map_or(1, char::len_utf8);
                i += 1 + digits;
                len += encoded;
            }
            _ => {
                i += 1;
                len += 1;
            }
        }
    }
    len
}

/// Number of leading hex digits in `bytes`, capped at `max`.
fn hex_run(bytes: &[u8], max: usize) -> usize {
    bytes
        .iter()
        .take(max)
        .take_while(|b| b.is_ascii_hexdigit())
        .count()
}

fn ensure_include<'t>(
    trigger: &Regex,
    header: &str,
    equivalents: &[String],
    text: &'t str,
) -> (Cow<'t, str>, usize) {
    if !trigger.is_match(text) {
        return (Cow::Borrowed(text), 0);
    }

    let present = std::iter::once(header)
        .chain(equivalents.iter().map(String::as_str))
        .any(|h| has_include(text, h));
    if present {
        return (Cow::Borrowed(text), 0);
    }

    let directive = format!("#include {header}");
    let mut out = String::with_capacity(text.len() + directive.len() + 1);
    match last_include_end(text) {
        Some((end, eol)) => {
            out.push_str(&text[..end]);
            out.push_str(eol);
            out.push_str(&directive);
            out.push_str(&text[end..]);
        }
        None => {
            out.push_str(&directive);
            out.push('\n');
            out.push_str(text);
        }
    }
    (Cow::Owned(out), 1)
}

/// True if some line of `text` is `#include <header>` (whitespace-tolerant).
pub fn has_include(text: &str, header: &str) -> bool {
    text.lines().any(|line| {
        include_target(line).is_some_and(|target| target == header)
    })
}

/// Byte offset of the end of the last `#include` line (before its line
/// terminator) and the terminator to reuse for the inserted line.
fn last_include_end(text: &str) -> Option<(usize, &'static str)> {
    let mut offset = 0;
    let mut last = None;
    for line in text.split_inclusive('\n') {
        if include_target(line).is_some() {
            let eol = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
            last = Some((offset + line.trim_end_matches(['\n', '\r']).len(), eol));
        }
        offset += line.len();
    }
    last
}

/// The `<...>` or `"..."` operand of an include directive line.
fn include_target(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('#')?;
    let rest = rest.trim_start().strip_prefix("include")?;
    let rest = rest.trim();
    let close = match rest.chars().next()? {
        '<' => '>',
        '"' => '"',
        _ => return None,
    };
    let end = rest[1..].find(close)? + 2;
    Some(&rest[..end])
}

/// Per-rule outcome of a rule-set pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule: String,
    pub count: usize,
}

/// Result of running a [`RuleSet`] over some text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Rewrite carries the rewritten text"]
pub struct Rewrite {
    pub text: String,
    /// Only rules that changed something are listed, in rule order.
    pub hits: Vec<RuleHit>,
}

impl Rewrite {
    pub fn changed(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Ordered list of rules. Later rules see the output of earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Run every rule in order over `text`.
    pub fn apply(&self, text: &str) -> Rewrite {
        let mut current = text.to_string();
        let mut hits = Vec::new();

        for rule in &self.rules {
            let (next, count) = rule.apply(&current);
            if let Cow::Owned(next) = next {
                current = next;
            }
            if count > 0 {
                hits.push(RuleHit {
                    rule: rule.name.clone(),
                    count,
                });
            }
        }

        Rewrite {
            text: current,
            hits,
        }
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<T: IntoIterator<Item = Rule>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
