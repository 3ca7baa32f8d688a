//! Built-in rule tables for mimesniff.
//!
//! This crate provides the glob and magic rules compiled into mimesniff.
//! The tables are generated at build time from `rules.json` and are plain
//! static data: the detection engine in `mimesniff-core` turns them into a
//! searchable rule database.
//!
//! # Usage
//!
//! ```
//! use mimesniff_rules::{GLOB_DATA, MAGIC_DATA};
//!
//! for glob in GLOB_DATA {
//!     println!("{} -> {}", glob.pattern, glob.mime_type);
//! }
//! for rule in MAGIC_DATA {
//!     println!("[{}] {}", rule.priority, rule.mime_type);
//! }
//! ```
//!
//! # Ordering
//!
//! Both tables keep the declaration order of `rules.json`. Magic rules with
//! equal priority are resolved by that order, so the tables must never be
//! re-sorted by anything other than priority.

/// A filename pattern mapped to a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobEntry {
    pub pattern: &'static str,
    pub mime_type: &'static str,
    /// Precedence among rules of the same specificity class (0-100).
    pub weight: u32,
    /// `None` lets the engine pick the default for the pattern's class.
    pub case_sensitive: Option<bool>,
    /// Explicit specificity class (`literal`, `extension`, `wildcard`,
    /// `prefix`). `None` means inferred from the pattern.
    pub class: Option<&'static str>,
}

/// A content signature mapped to a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicEntry {
    pub mime_type: &'static str,
    /// Higher priorities are evaluated first (0-100).
    pub priority: u32,
    /// OR-combined top-level tests.
    pub matchlets: &'static [MatchletEntry],
}

/// A single byte test, searched at every offset in `low..=high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchletEntry {
    pub low: u32,
    pub high: u32,
    pub value: &'static [u8],
    pub mask: Option<&'static [u8]>,
    /// Each child is AND-joined with this matchlet; siblings are OR-combined.
    pub children: &'static [MatchletEntry],
}

// Include the auto-generated tables from build.rs
include!(concat!(env!("OUT_DIR"), "/rules_data.rs"));

/// Returns the total number of glob rules.
pub fn glob_count() -> usize {
    GLOB_DATA.len()
}

/// Returns the total number of magic rules.
pub fn magic_count() -> usize {
    MAGIC_DATA.len()
}

/// All glob rules that map to `mime_type`, in declaration order.
pub fn globs_for(mime_type: &str) -> Vec<&'static GlobEntry> {
    GLOB_DATA
        .iter()
        .filter(|glob| glob.mime_type == mime_type)
        .collect()
}

/// The first magic rule declared for `mime_type`, if any.
pub fn magic_for(mime_type: &str) -> Option<&'static MagicEntry> {
    MAGIC_DATA.iter().find(|rule| rule.mime_type == mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(entry: &MatchletEntry) -> usize {
        1 + entry.children.iter().map(depth).max().unwrap_or(0)
    }

    #[test]
    fn test_tables_not_empty() {
        assert!(!GLOB_DATA.is_empty(), "GLOB_DATA should not be empty");
        assert!(!MAGIC_DATA.is_empty(), "MAGIC_DATA should not be empty");
    }

    #[test]
    fn test_counts() {
        assert_eq!(glob_count(), GLOB_DATA.len());
        assert_eq!(magic_count(), MAGIC_DATA.len());
    }

    #[test]
    fn test_globs_for_text_plain() {
        let globs = globs_for("text/plain");
        assert!(globs.iter().any(|g| g.pattern == "*.txt"));
    }

    #[test]
    fn test_globs_for_unknown_type() {
        assert!(globs_for("application/x-nonexistent").is_empty());
    }

    #[test]
    fn test_magic_for_returns_first_declared() {
        let ogg = magic_for("application/ogg").expect("application/ogg has magic");
        assert_eq!(ogg.matchlets[0].value, b"OggS");
    }

    #[test]
    fn test_ogg_family_declared_in_container_first_order() {
        let position = |mime: &str| {
            MAGIC_DATA
                .iter()
                .position(|rule| rule.mime_type == mime)
                .unwrap()
        };
        assert!(position("application/ogg") < position("audio/ogg"));
        assert!(position("audio/ogg") < position("video/ogg"));
    }

    #[test]
    fn test_matchlet_ranges_are_ordered() {
        fn check(entry: &MatchletEntry) {
            assert!(entry.low <= entry.high);
            assert!(!entry.value.is_empty());
            if let Some(mask) = entry.mask {
                assert_eq!(mask.len(), entry.value.len());
            }
            entry.children.iter().for_each(check);
        }
        for rule in MAGIC_DATA {
            rule.matchlets.iter().for_each(check);
        }
    }

    #[test]
    fn test_nested_matchlets_generated() {
        let bmp = magic_for("image/bmp").unwrap();
        assert_eq!(depth(&bmp.matchlets[0]), 2);
        assert_eq!(bmp.matchlets[0].children.len(), 5);
    }

    #[test]
    fn test_integer_values_encoded_with_declared_endianness() {
        let mkv = magic_for("video/x-matroska").unwrap();
        assert_eq!(mkv.matchlets[0].value, &[0x1a, 0x45, 0xdf, 0xa3]);

        let tnef = magic_for("application/vnd.ms-tnef").unwrap();
        assert_eq!(tnef.matchlets[0].value, &[0x78, 0x9f, 0x3e, 0x22]);
    }

    #[test]
    fn test_priorities_in_range() {
        assert!(MAGIC_DATA.iter().all(|rule| rule.priority <= 100));
        assert!(GLOB_DATA.iter().all(|glob| glob.weight <= 100));
    }
}
