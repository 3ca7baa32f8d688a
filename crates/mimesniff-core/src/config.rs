//! Detector configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for a [`Detector`](crate::Detector).
///
/// Loaded from TOML:
///
/// ```toml
/// max_read_bytes = 65536
/// text_probe_bytes = 512
/// ```
///
/// Unknown keys are rejected; missing keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Upper bound on bytes read from readers and files.
    pub max_read_bytes: usize,
    /// Bytes inspected by the text/binary heuristic.
    pub text_probe_bytes: usize,
}

impl DetectorConfig {
    pub const DEFAULT_MAX_READ_BYTES: usize = 64 * 1024;
    pub const DEFAULT_TEXT_PROBE_BYTES: usize = 512;

    /// Create a new [`DetectorConfigBuilder`].
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DetectorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text_probe_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "text_probe_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.max_read_bytes < self.text_probe_bytes {
            return Err(ConfigError::Invalid {
                field: "max_read_bytes",
                message: format!(
                    "must be at least text_probe_bytes ({})",
                    self.text_probe_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: Self::DEFAULT_MAX_READ_BYTES,
            text_probe_bytes: Self::DEFAULT_TEXT_PROBE_BYTES,
        }
    }
}

/// Builder for a validated [`DetectorConfig`].
///
/// ```rust
/// use mimesniff_core::DetectorConfig;
///
/// let config = DetectorConfig::builder()
///     .max_read_bytes(4096)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.max_read_bytes, 4096);
/// assert_eq!(config.text_probe_bytes, 512);
/// ```
#[derive(Debug, Default)]
pub struct DetectorConfigBuilder {
    max_read_bytes: Option<usize>,
    text_probe_bytes: Option<usize>,
}

impl DetectorConfigBuilder {
    pub fn max_read_bytes(&mut self, bytes: usize) -> &mut Self {
        self.max_read_bytes = Some(bytes);
        self
    }

    pub fn text_probe_bytes(&mut self, bytes: usize) -> &mut Self {
        self.text_probe_bytes = Some(bytes);
        self
    }

    /// Apply defaults to unset fields and validate.
    pub fn build(&mut self) -> Result<DetectorConfig, ConfigError> {
        let defaults = DetectorConfig::default();
        let config = DetectorConfig {
            max_read_bytes: self.max_read_bytes.take().unwrap_or(defaults.max_read_bytes),
            text_probe_bytes: self
                .text_probe_bytes
                .take()
                .unwrap_or(defaults.text_probe_bytes),
        };
        config.validate()?;
        Ok(config)
    }
}
