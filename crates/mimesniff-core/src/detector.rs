//! Detection entry points and the glob/magic precedence policy.

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::DetectorConfig;
use crate::content::ContentSource;
use crate::database::RuleDatabase;
use crate::error::{BoxError, ContentAcquisitionError, DetectResult};
use crate::glob::{GlobMatch, GlobMatcher, SpecificityClass};
use crate::heuristic::{self, OCTET_STREAM};
use crate::magic::{MagicMatch, MagicMatcher};

/// Which signal decided a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionSource {
    /// A magic rule matched the content.
    Magic,
    /// No magic rule matched; a glob rule of this class matched the name.
    Glob(SpecificityClass),
    /// Nothing matched; the content looked like text.
    TextHeuristic,
    /// Nothing matched; the content was empty or looked binary.
    BinaryFallback,
    /// Name-only detection with no matching glob rule.
    NameFallback,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::Magic => f.write_str("magic"),
            DetectionSource::Glob(class) => write!(f, "glob:{class}"),
            DetectionSource::TextHeuristic => f.write_str("text-heuristic"),
            DetectionSource::BinaryFallback => f.write_str("binary-fallback"),
            DetectionSource::NameFallback => f.write_str("name-fallback"),
        }
    }
}

/// Result of a detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection<'a> {
    pub mime_type: &'a str,
    pub source: DetectionSource,
}

/// Everything that matched, plus the final decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation<'a> {
    /// Glob matches ordered by specificity.
    pub glob_matches: Vec<GlobMatch<'a>>,
    /// Magic candidates in evaluation order. Empty when no content was given.
    pub magic_candidates: Vec<MagicMatch<'a>>,
    pub detection: Detection<'a>,
}

/// Classifies content by name and bytes against a shared [`RuleDatabase`].
///
/// Cloning is cheap; clones share the same database.
///
/// # Precedence
///
/// 1. The first magic candidate (highest priority, then first declared).
/// 2. The most specific glob match.
/// 3. `text/plain` or `application/octet-stream` from the content heuristic.
///
/// Empty content skips the heuristic and resolves to
/// `application/octet-stream` unless a glob rule matched the name.
///
/// # Example
///
/// ```
/// use mimesniff_core::Detector;
///
/// let detector = Detector::with_builtin();
/// assert_eq!(detector.detect("abc.txt", None), "text/plain");
/// assert_eq!(detector.detect("photo", Some(b"\x89PNG\r\n\x1a\n")), "image/png");
/// ```
#[derive(Debug, Clone)]
pub struct Detector {
    database: Arc<RuleDatabase>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(database: Arc<RuleDatabase>) -> Self {
        Self::with_config(database, DetectorConfig::default())
    }

    pub fn with_config(database: Arc<RuleDatabase>, config: DetectorConfig) -> Self {
        Self { database, config }
    }

    /// A detector over the shared built-in rules.
    #[cfg(feature = "builtin")]
    pub fn with_builtin() -> Self {
        Self::new(RuleDatabase::builtin())
    }

    pub fn database(&self) -> &RuleDatabase {
        &self.database
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Bytes read from readers and files: enough for every magic rule and
    /// the text probe, capped by `max_read_bytes`.
    pub fn read_limit(&self) -> usize {
        self.database
            .max_extent()
            .max(self.config.text_probe_bytes)
            .min(self.config.max_read_bytes)
    }

    /// Classify `name` with optional content, reporting which signal decided.
    pub fn classify<'s>(&'s self, name: &str, content: Option<&[u8]>) -> Detection<'s> {
        let glob = GlobMatcher::new(&self.database).best(name);
        let magic = content.and_then(|data| MagicMatcher::new(&self.database).best(data));
        self.resolve(name, glob, magic, content)
    }

    fn resolve<'s>(
        &'s self,
        name: &str,
        glob: Option<GlobMatch<'s>>,
        magic: Option<MagicMatch<'s>>,
        content: Option<&[u8]>,
    ) -> Detection<'s> {
        let detection = Self::decide(glob, magic, content, self.config.text_probe_bytes);
        debug!(
            name,
            mime_type = detection.mime_type,
            source = %detection.source,
            content_len = content.map(<[u8]>::len),
            "classified"
        );
        detection
    }

    fn decide<'s>(
        glob: Option<GlobMatch<'s>>,
        magic: Option<MagicMatch<'s>>,
        content: Option<&[u8]>,
        probe_len: usize,
    ) -> Detection<'s> {
        if let Some(m) = magic {
            return Detection {
                mime_type: m.mime_type,
                source: DetectionSource::Magic,
            };
        }
        if let Some(g) = glob {
            return Detection {
                mime_type: g.mime_type,
                source: DetectionSource::Glob(g.class),
            };
        }
        let Some(data) = content else {
            return Detection {
                mime_type: OCTET_STREAM,
                source: DetectionSource::NameFallback,
            };
        };
        let mime_type = heuristic::classify_unmatched(data, probe_len);
        let source = if mime_type == heuristic::TEXT_PLAIN {
            DetectionSource::TextHeuristic
        } else {
            DetectionSource::BinaryFallback
        };
        Detection { mime_type, source }
    }

    /// Classify `name` with optional in-memory content.
    pub fn detect<'s>(&'s self, name: &str, content: Option<&[u8]>) -> &'s str {
        self.classify(name, content).mime_type
    }

    /// Glob rules only. `None` when no rule matches the name.
    pub fn detect_by_name<'s>(&'s self, name: &str) -> Option<&'s str> {
        GlobMatcher::new(&self.database)
            .best(name)
            .map(|m| m.mime_type)
    }

    /// Acquire content from `source`, then classify.
    pub fn detect_source<'s>(
        &'s self,
        name: &str,
        source: ContentSource<'_>,
    ) -> DetectResult<&'s str> {
        let data = source.acquire(name, self.read_limit())?;
        Ok(self.detect(name, Some(&data)))
    }

    /// Classify a bounded prefix read from `reader`.
    pub fn detect_reader<'s>(&'s self, name: &str, reader: impl Read) -> DetectResult<&'s str> {
        self.detect_source(name, ContentSource::from_reader(reader))
    }

    /// Open `path`, classify a bounded prefix of it, and close it again.
    ///
    /// Globs are matched against the final path component. Errors carry the
    /// full path. The file handle is dropped before this returns on every path.
    pub fn detect_path<'s>(&'s self, path: impl AsRef<Path>) -> DetectResult<&'s str> {
        let path = path.as_ref();
        let display = path.to_string_lossy();
        let file = File::open(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "open failed");
            ContentAcquisitionError::new(display.as_ref(), e)
        })?;
        let data = ContentSource::from_reader(file).acquire(&display, self.read_limit())?;
        let name = path
            .file_name()
            .map_or_else(|| display.clone(), |name| name.to_string_lossy());
        Ok(self.detect(&name, Some(&data)))
    }

    /// Classify bytes produced by `producer`, called once on this thread.
    pub fn detect_with<'s, F, E>(&'s self, name: &str, producer: F) -> DetectResult<&'s str>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: Into<BoxError>,
    {
        self.detect_source(name, ContentSource::from_callback(producer))
    }

    /// Classify bytes produced asynchronously.
    ///
    /// `supplier` is called exactly once, immediately. The returned future
    /// awaits its result without blocking and then runs the same logic as
    /// [`detect`](Self::detect). A failed supplier resolves to
    /// [`ContentAcquisitionError`] and no matching is done.
    pub fn detect_async<N, F, Fut, E>(
        &self,
        name: N,
        supplier: F,
    ) -> impl Future<Output = DetectResult<String>> + Send + 'static + use<N, F, Fut, E>
    where
        N: Into<String>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let pending = supplier();
        complete_detection(self.clone(), name.into(), pending)
    }

    /// Report every glob match and magic candidate alongside the decision.
    pub fn explain<'s>(&'s self, name: &str, content: Option<&[u8]>) -> Explanation<'s> {
        let glob_matches = GlobMatcher::new(&self.database).matches(name);
        let magic_candidates = content
            .map(|data| MagicMatcher::new(&self.database).candidates(data))
            .unwrap_or_default();
        let detection = self.resolve(
            name,
            glob_matches.first().copied(),
            magic_candidates.first().copied(),
            content,
        );
        Explanation {
            glob_matches,
            magic_candidates,
            detection,
        }
    }
}

async fn complete_detection<Fut, E>(
    detector: Detector,
    name: String,
    pending: Fut,
) -> DetectResult<String>
where
    Fut: Future<Output = Result<Vec<u8>, E>>,
    E: Into<BoxError>,
{
    match pending.await {
        Ok(bytes) => Ok(detector.detect(&name, Some(&bytes)).to_string()),
        Err(e) => {
            let cause: BoxError = e.into();
            debug!(name = %name, error = %cause, "async content supplier failed");
            Err(ContentAcquisitionError::new(name, cause))
        }
    }
}

#[cfg(feature = "builtin")]
impl Default for Detector {
    fn default() -> Self {
        Self::with_builtin()
    }
}
