//! The immutable rule database shared by every detection call.

use std::collections::HashMap;
#[cfg(feature = "builtin")]
use std::sync::{Arc, OnceLock};

#[cfg(feature = "builtin")]
use tracing::error;

use crate::error::RuleError;
use crate::glob::{CompiledGlob, GlobRule, SpecificityClass};
use crate::magic::MagicRule;

/// A source of glob and magic rules.
///
/// Implement this trait to feed rules from somewhere other than the built-in
/// tables (a vendor-specific rule set, rules loaded by the application, ...).
///
/// # Example
///
/// ```
/// use mimesniff_core::{GlobRule, MagicRule, Matchlet, RuleDatabase, RuleProvider};
///
/// struct Acme;
///
/// impl RuleProvider for Acme {
///     fn globs(&self) -> Vec<GlobRule> {
///         vec![GlobRule::new("*.acme", "application/x-acme")]
///     }
///
///     fn magic(&self) -> Vec<MagicRule> {
///         vec![MagicRule::new("application/x-acme", 60)
///             .with_matchlet(Matchlet::new(0, *b"ACME"))]
///     }
/// }
///
/// let db = RuleDatabase::builder().with_provider(&Acme).build().unwrap();
/// assert_eq!(db.glob_count(), 1);
/// assert_eq!(db.magic_count(), 1);
/// ```
pub trait RuleProvider: Send + Sync {
    /// Human-readable name for this provider.
    ///
    /// Defaults to the unqualified type name.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Glob rules in declaration order.
    fn globs(&self) -> Vec<GlobRule>;

    /// Magic rules in declaration order.
    fn magic(&self) -> Vec<MagicRule>;
}

/// Rules compiled into the `mimesniff-rules` crate.
#[cfg(feature = "builtin")]
pub struct BuiltinRules;

#[cfg(feature = "builtin")]
impl BuiltinRules {
    fn convert_matchlet(entry: &mimesniff_rules::MatchletEntry) -> crate::magic::Matchlet {
        let mut matchlet = crate::magic::Matchlet::new(entry.low as usize, entry.value)
            .with_range(entry.low as usize, entry.high as usize);
        if let Some(mask) = entry.mask {
            matchlet = matchlet.with_mask(mask);
        }
        entry.children.iter().fold(matchlet, |parent, child| {
            parent.with_child(Self::convert_matchlet(child))
        })
    }
}

#[cfg(feature = "builtin")]
impl RuleProvider for BuiltinRules {
    fn name(&self) -> &str {
        "BuiltinRules"
    }

    fn globs(&self) -> Vec<GlobRule> {
        mimesniff_rules::GLOB_DATA
            .iter()
            .map(|entry| {
                let mut rule = GlobRule::new(entry.pattern, entry.mime_type).with_weight(entry.weight);
                if let Some(class) = entry.class.and_then(SpecificityClass::from_name) {
                    rule = rule.with_class(class);
                }
                if let Some(case_sensitive) = entry.case_sensitive {
                    rule = rule.with_case_sensitive(case_sensitive);
                }
                rule
            })
            .collect()
    }

    fn magic(&self) -> Vec<MagicRule> {
        mimesniff_rules::MAGIC_DATA
            .iter()
            .map(|entry| MagicRule {
                mime_type: entry.mime_type.to_string(),
                priority: entry.priority,
                matchlets: entry.matchlets.iter().map(Self::convert_matchlet).collect(),
                order_index: 0,
            })
            .collect()
    }
}

/// Extension rules keyed by the text after `*.`.
///
/// Values index into the extension class slice; only the first rule in
/// evaluation order is kept per key.
#[derive(Debug, Default)]
struct ExtensionIndex {
    case_sensitive: HashMap<String, usize>,
    case_insensitive: HashMap<String, usize>,
}

/// Immutable set of glob and magic rules.
///
/// Build one with [`RuleDatabase::builder`] or share the process-wide
/// built-in set via [`RuleDatabase::builtin`]. Nothing mutates a database
/// after construction, so one instance can serve any number of concurrent
/// detection calls.
#[derive(Debug)]
pub struct RuleDatabase {
    /// Indexed by `SpecificityClass as usize`; each sorted by
    /// `(weight desc, order_index asc)`.
    globs: [Vec<CompiledGlob>; 4],
    extensions: ExtensionIndex,
    /// Sorted by `(priority desc, order_index asc)`.
    magic: Vec<MagicRule>,
    max_extent: usize,
}

impl RuleDatabase {
    /// Create a [`RuleDatabaseBuilder`].
    pub fn builder() -> RuleDatabaseBuilder {
        RuleDatabaseBuilder::new()
    }

    /// A database with no rules: every name is unknown and all content goes
    /// through the text heuristic.
    pub fn empty() -> Self {
        Self {
            globs: Default::default(),
            extensions: ExtensionIndex::default(),
            magic: Vec::new(),
            max_extent: 0,
        }
    }

    /// The built-in rules, built on first use and shared afterwards.
    #[cfg(feature = "builtin")]
    pub fn try_builtin() -> Result<Arc<RuleDatabase>, RuleError> {
        static BUILTIN: OnceLock<Result<Arc<RuleDatabase>, RuleError>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                RuleDatabase::builder()
                    .with_builtin()
                    .build()
                    .map(Arc::new)
            })
            .clone()
    }

    /// Like [`try_builtin`](Self::try_builtin), but falls back to an empty
    /// database when the built-in tables are rejected.
    #[cfg(feature = "builtin")]
    pub fn builtin() -> Arc<RuleDatabase> {
        static EMPTY: OnceLock<Arc<RuleDatabase>> = OnceLock::new();
        match Self::try_builtin() {
            Ok(db) => db,
            Err(e) => {
                error!(error = %e, "built-in rule tables rejected, using an empty database");
                EMPTY.get_or_init(|| Arc::new(RuleDatabase::empty())).clone()
            }
        }
    }

    /// All glob rules in evaluation order.
    pub fn globs(&self) -> impl Iterator<Item = &CompiledGlob> {
        self.globs.iter().flatten()
    }

    pub(crate) fn globs_of_class(&self, class: SpecificityClass) -> &[CompiledGlob] {
        &self.globs[class as usize]
    }

    /// First extension rule (in evaluation order) registered for `suffix`.
    /// `lower` must be `suffix` lowercased.
    pub(crate) fn extension_rule(&self, suffix: &str, lower: &str) -> Option<&CompiledGlob> {
        let sensitive = self.extensions.case_sensitive.get(suffix).copied();
        let insensitive = self.extensions.case_insensitive.get(lower).copied();
        sensitive
            .into_iter()
            .chain(insensitive)
            .min()
            .map(|idx| &self.globs[SpecificityClass::Extension as usize][idx])
    }

    /// Magic rules in evaluation order.
    pub fn magic_rules(&self) -> &[MagicRule] {
        &self.magic
    }

    pub fn glob_count(&self) -> usize {
        self.globs.iter().map(Vec::len).sum()
    }

    pub fn magic_count(&self) -> usize {
        self.magic.len()
    }

    /// Longest content prefix any magic rule can inspect.
    pub fn max_extent(&self) -> usize {
        self.max_extent
    }
}

impl Default for RuleDatabase {
    fn default() -> Self {
        Self::empty()
    }
}

/// `type/subtype` with RFC 6838 restricted-name characters.
pub(crate) fn is_valid_mime(mime: &str) -> bool {
    let Some((top, sub)) = mime.split_once('/') else {
        return false;
    };
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.len() <= 127
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
    };
    valid_part(top) && valid_part(sub)
}

/// Builder for a [`RuleDatabase`].
///
/// Rules keep the order in which they are added; that order is the
/// tie-breaker for glob rules of equal class and weight and for magic rules
/// of equal priority.
///
/// # Example
///
/// ```
/// use mimesniff_core::{GlobRule, MagicRule, Matchlet, RuleDatabase};
///
/// let db = RuleDatabase::builder()
///     .glob(GlobRule::new("*.ogg", "audio/ogg"))
///     .magic(MagicRule::new("application/ogg", 40).with_matchlet(Matchlet::new(0, *b"OggS")))
///     .build()
///     .expect("valid rules");
/// assert_eq!(db.max_extent(), 4);
/// ```
#[derive(Default)]
pub struct RuleDatabaseBuilder {
    globs: Vec<GlobRule>,
    magic: Vec<MagicRule>,
}

impl RuleDatabaseBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Add the built-in rules.
    ///
    /// This method is additive: calling it twice registers every rule twice.
    #[cfg(feature = "builtin")]
    pub fn with_builtin(&mut self) -> &mut Self {
        self.with_provider(&BuiltinRules)
    }

    /// Add all rules from a [`RuleProvider`].
    pub fn with_provider(&mut self, provider: &dyn RuleProvider) -> &mut Self {
        self.globs.extend(provider.globs());
        self.magic.extend(provider.magic());
        self
    }

    pub fn glob(&mut self, rule: GlobRule) -> &mut Self {
        self.globs.push(rule);
        self
    }

    pub fn magic(&mut self, rule: MagicRule) -> &mut Self {
        self.magic.push(rule);
        self
    }

    /// Validate the collected rules and produce the database.
    ///
    /// Drains the builder via [`std::mem::take`].
    pub fn build(&mut self) -> Result<RuleDatabase, RuleError> {
        let globs = std::mem::take(&mut self.globs);
        let magic = std::mem::take(&mut self.magic);

        let mut by_class: [Vec<CompiledGlob>; 4] = Default::default();
        for (order_index, rule) in globs.into_iter().enumerate() {
            if !is_valid_mime(&rule.mime_type) {
                return Err(RuleError::InvalidMimeType {
                    mime_type: rule.mime_type,
                });
            }
            let class = rule.class;
            by_class[class as usize].push(CompiledGlob::compile(rule, order_index)?);
        }
        for class in &mut by_class {
            class.sort_by_key(|g| (std::cmp::Reverse(g.rule().weight), g.order_index()));
        }

        let mut extensions = ExtensionIndex::default();
        for (idx, glob) in by_class[SpecificityClass::Extension as usize]
            .iter()
            .enumerate()
        {
            if let Some(key) = glob.extension_key() {
                let index = if glob.rule().case_sensitive {
                    &mut extensions.case_sensitive
                } else {
                    &mut extensions.case_insensitive
                };
                index.entry(key).or_insert(idx);
            }
        }

        let mut rules = Vec::with_capacity(magic.len());
        for (order_index, mut rule) in magic.into_iter().enumerate() {
            if !is_valid_mime(&rule.mime_type) {
                return Err(RuleError::InvalidMimeType {
                    mime_type: rule.mime_type,
                });
            }
            rule.validate()?;
            rule.order_index = order_index;
            rules.push(rule);
        }
        // Stable sort: equal priorities keep declaration order.
        rules.sort_by_key(|r| (std::cmp::Reverse(r.priority), r.order_index));
        let max_extent = rules.iter().map(MagicRule::extent).max().unwrap_or(0);

        Ok(RuleDatabase {
            globs: by_class,
            extensions,
            magic: rules,
            max_extent,
        })
    }
}
