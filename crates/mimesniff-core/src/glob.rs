//! Filename-based detection.
//!
//! Glob rules fall into four specificity classes, tried from most to least
//! specific:
//!
//! 1. [`SpecificityClass::Literal`] -- the whole name, e.g. `winmail.dat`
//! 2. [`SpecificityClass::Extension`] -- `*.ext`, resolved longest suffix first
//!    so `e.1.3.jar` finds `*.jar` after `1.3.jar` and `3.jar` miss
//! 3. [`SpecificityClass::Wildcard`] -- anything else `glob::Pattern` accepts,
//!    e.g. `*.anim[1-9j]`
//! 4. [`SpecificityClass::FilenamePrefix`] -- `README*` style families
//!
//! Wildcard and prefix rules are only consulted when no literal or extension
//! rule matched.

use std::fmt;

use glob::{MatchOptions, Pattern};

use crate::database::RuleDatabase;
use crate::error::RuleError;

const WILDCARD_CHARS: &[char] = &['*', '?', '['];

/// Relative precedence of a glob rule. Sorts highest-specificity first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecificityClass {
    Literal,
    Extension,
    Wildcard,
    FilenamePrefix,
}

impl SpecificityClass {
    /// All classes in evaluation order.
    pub const ALL: [SpecificityClass; 4] = [
        SpecificityClass::Literal,
        SpecificityClass::Extension,
        SpecificityClass::Wildcard,
        SpecificityClass::FilenamePrefix,
    ];

    /// Classify a pattern by its shape.
    pub fn infer(pattern: &str) -> Self {
        if !has_wildcard(pattern) {
            return SpecificityClass::Literal;
        }
        if let Some(ext) = pattern.strip_prefix("*.") {
            if !ext.is_empty() && !has_wildcard(ext) {
                return SpecificityClass::Extension;
            }
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            if !prefix.is_empty() && !has_wildcard(prefix) {
                return SpecificityClass::FilenamePrefix;
            }
        }
        SpecificityClass::Wildcard
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpecificityClass::Literal => "literal",
            SpecificityClass::Extension => "extension",
            SpecificityClass::Wildcard => "wildcard",
            SpecificityClass::FilenamePrefix => "prefix",
        }
    }

    /// Parse the names used by the rule tables (`literal`, `extension`,
    /// `wildcard`, `prefix`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.as_str() == name)
    }
}

impl fmt::Display for SpecificityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_wildcard(s: &str) -> bool {
    s.contains(WILDCARD_CHARS)
}

/// A filename pattern mapped to a MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobRule {
    pub pattern: String,
    pub mime_type: String,
    pub class: SpecificityClass,
    pub case_sensitive: bool,
    /// Precedence among rules of the same class; higher wins.
    pub weight: u32,
}

impl GlobRule {
    pub const DEFAULT_WEIGHT: u32 = 50;

    /// Create a rule whose class is inferred from `pattern`.
    ///
    /// Literal rules default to case-sensitive matching, all other classes
    /// to ASCII case-insensitive matching.
    pub fn new(pattern: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let class = SpecificityClass::infer(&pattern);
        Self {
            pattern,
            mime_type: mime_type.into(),
            class,
            case_sensitive: class == SpecificityClass::Literal,
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    /// Override the inferred class. Resets case sensitivity to the class
    /// default, so call [`with_case_sensitive`](Self::with_case_sensitive)
    /// afterwards to change it.
    pub fn with_class(mut self, class: SpecificityClass) -> Self {
        self.class = class;
        self.case_sensitive = class == SpecificityClass::Literal;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

#[derive(Debug, Clone)]
enum GlobKind {
    Literal(String),
    Extension(String),
    Wildcard(Pattern),
    Prefix(String),
}

/// A [`GlobRule`] validated and prepared for matching.
#[derive(Debug, Clone)]
pub struct CompiledGlob {
    rule: GlobRule,
    order_index: usize,
    kind: GlobKind,
}

impl CompiledGlob {
    pub(crate) fn compile(rule: GlobRule, order_index: usize) -> Result<Self, RuleError> {
        let mismatch = || RuleError::ClassMismatch {
            pattern: rule.pattern.clone(),
            class: rule.class.to_string(),
        };

        let kind = match rule.class {
            SpecificityClass::Literal => {
                if rule.pattern.is_empty() || has_wildcard(&rule.pattern) {
                    return Err(mismatch());
                }
                GlobKind::Literal(rule.pattern.clone())
            }
            SpecificityClass::Extension => match rule.pattern.strip_prefix("*.") {
                Some(ext) if !ext.is_empty() && !has_wildcard(ext) => {
                    GlobKind::Extension(ext.to_string())
                }
                _ => return Err(mismatch()),
            },
            SpecificityClass::FilenamePrefix => match rule.pattern.strip_suffix('*') {
                Some(prefix) if !prefix.is_empty() && !has_wildcard(prefix) => {
                    GlobKind::Prefix(prefix.to_string())
                }
                _ => return Err(mismatch()),
            },
            SpecificityClass::Wildcard => {
                let pattern =
                    Pattern::new(&rule.pattern).map_err(|e| RuleError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        message: e.to_string(),
                    })?;
                GlobKind::Wildcard(pattern)
            }
        };

        Ok(Self {
            rule,
            order_index,
            kind,
        })
    }

    pub fn rule(&self) -> &GlobRule {
        &self.rule
    }

    /// Position of the rule in declaration order.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    /// Key used by the extension index: the text after `*.`, lowercased for
    /// case-insensitive rules.
    pub(crate) fn extension_key(&self) -> Option<String> {
        match &self.kind {
            GlobKind::Extension(ext) if self.rule.case_sensitive => Some(ext.clone()),
            GlobKind::Extension(ext) => Some(ext.to_ascii_lowercase()),
            _ => None,
        }
    }

    /// Test a bare file name (no directory components) against this rule.
    pub fn matches(&self, name: &str) -> bool {
        let case_sensitive = self.rule.case_sensitive;
        let same = |a: &str, b: &str| {
            if case_sensitive {
                a == b
            } else {
                a.eq_ignore_ascii_case(b)
            }
        };

        match &self.kind {
            GlobKind::Literal(literal) => same(name, literal),
            GlobKind::Extension(ext) => name
                .len()
                .checked_sub(ext.len() + 1)
                .and_then(|dot| name.get(dot..))
                .is_some_and(|tail| tail.starts_with('.') && same(&tail[1..], ext)),
            GlobKind::Prefix(prefix) => name
                .get(..prefix.len())
                .is_some_and(|head| same(head, prefix)),
            GlobKind::Wildcard(pattern) => pattern.matches_with(
                name,
                MatchOptions {
                    case_sensitive,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                },
            ),
        }
    }
}

/// A glob rule that matched a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobMatch<'a> {
    pub mime_type: &'a str,
    pub class: SpecificityClass,
    pub pattern: &'a str,
    pub weight: u32,
}

impl<'a> From<&'a CompiledGlob> for GlobMatch<'a> {
    fn from(glob: &'a CompiledGlob) -> Self {
        Self {
            mime_type: &glob.rule.mime_type,
            class: glob.rule.class,
            pattern: &glob.rule.pattern,
            weight: glob.rule.weight,
        }
    }
}

/// Reduce a path-like name to its final component.
///
/// `/` separates components everywhere; on Windows `\` does too, so
/// `C:\mail\winmail.dat` reduces to `winmail.dat` on Windows.
pub(crate) fn file_name(name: &str) -> &str {
    name.rsplit(std::path::is_separator)
        .find(|part| !part.is_empty())
        .unwrap_or("")
}

/// Resolves candidate MIME types from a file name alone.
#[derive(Debug, Clone, Copy)]
pub struct GlobMatcher<'a> {
    database: &'a RuleDatabase,
}

impl<'a> GlobMatcher<'a> {
    pub fn new(database: &'a RuleDatabase) -> Self {
        Self { database }
    }

    /// All matching rules, at most one per class, ordered by specificity.
    ///
    /// Wildcard and prefix classes are only evaluated when neither a literal
    /// nor an extension rule matched.
    pub fn matches(&self, name: &str) -> Vec<GlobMatch<'a>> {
        let name = file_name(name);
        if name.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<GlobMatch<'a>> = Vec::new();
        found.extend(self.first_of(SpecificityClass::Literal, name));
        found.extend(self.extension(name));

        if found.is_empty() {
            found.extend(self.first_of(SpecificityClass::Wildcard, name));
            found.extend(self.first_of(SpecificityClass::FilenamePrefix, name));
        }
        found
    }

    /// The highest-specificity match, if any.
    pub fn best(&self, name: &str) -> Option<GlobMatch<'a>> {
        self.matches(name).into_iter().next()
    }

    fn first_of(&self, class: SpecificityClass, name: &str) -> Option<GlobMatch<'a>> {
        self.database
            .globs_of_class(class)
            .iter()
            .find(|glob| glob.matches(name))
            .map(GlobMatch::from)
    }

    /// Try every trailing dot-separated suffix, longest first.
    fn extension(&self, name: &str) -> Option<GlobMatch<'a>> {
        let lower = name.to_ascii_lowercase();
        name.match_indices('.')
            .map(|(dot, _)| dot + 1)
            .filter(|&start| start < name.len())
            .find_map(|start| self.database.extension_rule(&name[start..], &lower[start..]))
            .map(GlobMatch::from)
    }
}
