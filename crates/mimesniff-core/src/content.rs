//! Ways of obtaining the bytes to classify.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

use tracing::debug;

use crate::error::{BoxError, ContentAcquisitionError};

/// Deferred byte producer invoked at most once.
pub type ByteCallback<'a> = Box<dyn FnOnce() -> Result<Vec<u8>, BoxError> + 'a>;

/// Where the content of a detection call comes from.
///
/// All variants reduce to "produce bytes or fail". Only the first
/// [`Detector::read_limit`](crate::Detector::read_limit) bytes of a reader
/// are consumed; buffers and callback results are used as given.
pub enum ContentSource<'a> {
    /// Bytes already in memory.
    Bytes(&'a [u8]),
    /// A stream to read a bounded prefix from.
    Reader(Box<dyn Read + 'a>),
    /// A producer called exactly once, on the calling thread.
    Callback(ByteCallback<'a>),
}

impl<'a> ContentSource<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        ContentSource::Bytes(bytes)
    }

    pub fn from_reader(reader: impl Read + 'a) -> Self {
        ContentSource::Reader(Box::new(reader))
    }

    pub fn from_callback<F, E>(callback: F) -> Self
    where
        F: FnOnce() -> Result<Vec<u8>, E> + 'a,
        E: Into<BoxError>,
    {
        ContentSource::Callback(Box::new(move || callback().map_err(Into::into)))
    }

    /// Obtain the bytes, consuming the source.
    ///
    /// Any failure is wrapped in a [`ContentAcquisitionError`] naming `name`.
    pub fn acquire(
        self,
        name: &str,
        limit: usize,
    ) -> Result<Cow<'a, [u8]>, ContentAcquisitionError> {
        let result = match self {
            ContentSource::Bytes(bytes) => return Ok(Cow::Borrowed(bytes)),
            ContentSource::Reader(reader) => read_prefix(reader, limit).map_err(BoxError::from),
            ContentSource::Callback(callback) => callback(),
        };
        result.map(Cow::Owned).map_err(|cause| {
            debug!(name, error = %cause, "content acquisition failed");
            ContentAcquisitionError::new(name, cause)
        })
    }
}

impl fmt::Debug for ContentSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ContentSource::Reader(_) => f.write_str("Reader(..)"),
            ContentSource::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl<'a> From<&'a [u8]> for ContentSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ContentSource::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ContentSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        ContentSource::Bytes(bytes)
    }
}

/// Read at most `limit` bytes from `reader`.
///
/// Short reads are retried until EOF or the limit; `Interrupted` is retried
/// by [`Read::read_to_end`].
pub fn read_prefix<R: Read>(reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit.min(8 * 1024));
    reader.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
