//! Content-based detection using magic signatures.
//!
//! A [`MagicRule`] holds OR-combined top-level [`Matchlet`]s. A matchlet
//! tests a byte sequence at every offset of its range; each child is
//! AND-joined with its parent and siblings are OR-combined, so
//!
//! ```text
//! "RIFF" @0
//!   +-- "WAVE" @8
//!   +-- "AVI " @8
//! ```
//!
//! matches `RIFF....WAVE` and `RIFF....AVI ` but not a bare `RIFF` header.

use tracing::trace;

use crate::database::RuleDatabase;
use crate::error::RuleError;

/// A byte test over an offset range, optionally guarding nested tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchlet {
    /// First offset searched.
    pub low: usize,
    /// Last offset searched (inclusive).
    pub high: usize,
    pub value: Vec<u8>,
    /// Applied to both the value and the content before comparison.
    pub mask: Option<Vec<u8>>,
    pub children: Vec<Matchlet>,
}

impl Matchlet {
    /// A test for `value` at exactly `offset`.
    pub fn new(offset: usize, value: impl Into<Vec<u8>>) -> Self {
        Self {
            low: offset,
            high: offset,
            value: value.into(),
            mask: None,
            children: Vec::new(),
        }
    }

    /// Search every offset in `low..=high` instead of a single offset.
    pub fn with_range(mut self, low: usize, high: usize) -> Self {
        self.low = low;
        self.high = high;
        self
    }

    pub fn with_mask(mut self, mask: impl Into<Vec<u8>>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Add a child that must also match. Multiple children are alternatives.
    pub fn with_child(mut self, child: Matchlet) -> Self {
        self.children.push(child);
        self
    }

    /// True if the value occurs somewhere in the range and, when children
    /// exist, at least one child matches too.
    pub fn matches(&self, data: &[u8]) -> bool {
        let width = self.value.len();
        let found = (self.low..=self.high)
            .take_while(|offset| offset.saturating_add(width) <= data.len())
            .any(|offset| self.matches_at(data, offset));

        found && (self.children.is_empty() || self.children.iter().any(|c| c.matches(data)))
    }

    fn matches_at(&self, data: &[u8], offset: usize) -> bool {
        let Some(window) = data.get(offset..offset + self.value.len()) else {
            return false;
        };
        match &self.mask {
            None => window == self.value.as_slice(),
            Some(mask) => window
                .iter()
                .zip(&self.value)
                .zip(mask)
                .all(|((&byte, &expected), &m)| byte & m == expected & m),
        }
    }

    /// Number of leading content bytes this matchlet (and its children)
    /// can ever look at.
    pub fn extent(&self) -> usize {
        let own = self.high.saturating_add(self.value.len());
        self.children
            .iter()
            .map(Matchlet::extent)
            .fold(own, usize::max)
    }

    pub(crate) fn validate(&self, mime_type: &str) -> Result<(), RuleError> {
        if self.value.is_empty() {
            return Err(RuleError::EmptyValue {
                mime_type: mime_type.to_string(),
            });
        }
        if let Some(mask) = &self.mask {
            if mask.len() != self.value.len() {
                return Err(RuleError::MaskLength {
                    mime_type: mime_type.to_string(),
                    mask_len: mask.len(),
                    value_len: self.value.len(),
                });
            }
        }
        if self.low > self.high {
            return Err(RuleError::InvertedRange {
                mime_type: mime_type.to_string(),
                low: self.low,
                high: self.high,
            });
        }
        self.children
            .iter()
            .try_for_each(|child| child.validate(mime_type))
    }
}

/// A content signature mapped to a MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicRule {
    pub mime_type: String,
    /// Higher priorities are evaluated first.
    pub priority: u32,
    /// OR-combined top-level tests.
    pub matchlets: Vec<Matchlet>,
    pub(crate) order_index: usize,
}

impl MagicRule {
    pub const DEFAULT_PRIORITY: u32 = 50;

    pub fn new(mime_type: impl Into<String>, priority: u32) -> Self {
        Self {
            mime_type: mime_type.into(),
            priority,
            matchlets: Vec::new(),
            order_index: 0,
        }
    }

    pub fn with_matchlet(mut self, matchlet: Matchlet) -> Self {
        self.matchlets.push(matchlet);
        self
    }

    /// Declaration position, assigned when the rule is added to a database.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        self.matchlets.iter().any(|m| m.matches(data))
    }

    pub fn extent(&self) -> usize {
        self.matchlets.iter().map(Matchlet::extent).max().unwrap_or(0)
    }

    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        if self.matchlets.is_empty() {
            return Err(RuleError::NoMatchlets {
                mime_type: self.mime_type.clone(),
            });
        }
        self.matchlets
            .iter()
            .try_for_each(|m| m.validate(&self.mime_type))
    }
}

/// A magic rule that matched the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicMatch<'a> {
    pub mime_type: &'a str,
    pub priority: u32,
    pub order_index: usize,
}

impl<'a> From<&'a MagicRule> for MagicMatch<'a> {
    fn from(rule: &'a MagicRule) -> Self {
        Self {
            mime_type: &rule.mime_type,
            priority: rule.priority,
            order_index: rule.order_index,
        }
    }
}

/// Resolves candidate MIME types from a content prefix.
#[derive(Debug, Clone, Copy)]
pub struct MagicMatcher<'a> {
    database: &'a RuleDatabase,
}

impl<'a> MagicMatcher<'a> {
    pub fn new(database: &'a RuleDatabase) -> Self {
        Self { database }
    }

    /// Every matching rule in `(priority desc, declaration order)` order.
    ///
    /// All rules are evaluated; duplicates by MIME type are kept.
    pub fn candidates(&self, data: &[u8]) -> Vec<MagicMatch<'a>> {
        self.database
            .magic_rules()
            .iter()
            .filter(|rule| rule.matches(data))
            .inspect(|rule| {
                trace!(
                    mime_type = %rule.mime_type,
                    priority = rule.priority,
                    order_index = rule.order_index,
                    "magic candidate"
                )
            })
            .map(MagicMatch::from)
            .collect()
    }

    /// The winning candidate: highest priority, then first declared.
    pub fn best(&self, data: &[u8]) -> Option<MagicMatch<'a>> {
        self.candidates(data).into_iter().next()
    }
}
