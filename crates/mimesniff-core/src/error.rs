//! Error types for rule loading, configuration and content acquisition

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by caller-supplied byte producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type DetectResult<T> = Result<T, ContentAcquisitionError>;

/// Failure to obtain the bytes of the content being classified.
///
/// This is the only error a detection call can return. It wraps I/O errors,
/// callback failures and failed futures alike, and always keeps the original
/// cause reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
#[error("Failed to acquire content for '{name}'")]
pub struct ContentAcquisitionError {
    name: String,
    #[source]
    source: BoxError,
}

impl ContentAcquisitionError {
    pub fn new(name: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            name: name.into(),
            source: cause.into(),
        }
    }

    /// Name of the content whose bytes could not be read.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying failure.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Unwrap into the underlying failure.
    pub fn into_cause(self) -> BoxError {
        self.source
    }

    /// The underlying failure as an I/O error, when it is one.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        self.source.downcast_ref::<std::io::Error>()
    }
}

/// Errors raised while assembling a [`RuleDatabase`](crate::RuleDatabase).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Glob pattern '{pattern}' cannot be used as a {class} rule")]
    ClassMismatch { pattern: String, class: String },

    #[error("Invalid MIME type '{mime_type}'")]
    InvalidMimeType { mime_type: String },

    #[error("Magic rule for '{mime_type}' has no matchlets")]
    NoMatchlets { mime_type: String },

    #[error("Magic rule for '{mime_type}' has a matchlet with an empty value")]
    EmptyValue { mime_type: String },

    #[error(
        "Magic rule for '{mime_type}' has a mask of {mask_len} bytes for a value of {value_len} bytes"
    )]
    MaskLength {
        mime_type: String,
        mask_len: usize,
        value_len: usize,
    },

    #[error("Magic rule for '{mime_type}' has inverted offset range {low}:{high}")]
    InvertedRange {
        mime_type: String,
        low: usize,
        high: usize,
    },
}

/// Errors loading or validating a [`DetectorConfig`](crate::DetectorConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}
