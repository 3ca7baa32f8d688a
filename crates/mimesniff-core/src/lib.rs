//! # mimesniff-core
//!
//! MIME type detection from file names and content.
//!
//! Combines:
//! - Glob rules on the file name (literal names, extensions, wildcards and
//!   `README*` style prefixes)
//! - Magic rules on the leading bytes of the content
//! - A text/binary heuristic when nothing matches
//!
//! ```
//! use mimesniff_core::Detector;
//!
//! let detector = Detector::with_builtin();
//! assert_eq!(detector.detect_by_name("e.1.3.jar"), Some("application/x-java-archive"));
//! assert_eq!(detector.detect("unknown", Some(b"OggS\x00\x02")), "application/ogg");
//! assert_eq!(detector.detect("unknown", Some(b"plain words")), "text/plain");
//! ```

pub mod config;
pub mod content;
pub mod database;
pub mod detector;
pub mod error;
pub mod glob;
pub mod heuristic;
pub mod magic;

pub use config::{DetectorConfig, DetectorConfigBuilder};
pub use content::{ContentSource, read_prefix};
#[cfg(feature = "builtin")]
pub use database::BuiltinRules;
pub use database::{RuleDatabase, RuleDatabaseBuilder, RuleProvider};
pub use detector::{Detection, DetectionSource, Detector, Explanation};
pub use error::{BoxError, ConfigError, ContentAcquisitionError, DetectResult, RuleError};
pub use glob::{CompiledGlob, GlobMatch, GlobMatcher, GlobRule, SpecificityClass};
pub use heuristic::{OCTET_STREAM, TEXT_PLAIN};
pub use magic::{MagicMatch, MagicMatcher, MagicRule, Matchlet};
