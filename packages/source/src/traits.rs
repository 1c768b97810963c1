//! Source traits: ByteSource, ByteSink.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// A readable stream handed out by a [`ByteSource`].
///
/// The stream is closed when dropped, so every exit path releases it.
pub type ByteStream = Box<dyn Read + Send>;

/// Resolve keys to byte streams.
///
/// Implementations must be usable from many threads at once.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn ByteSource>`.
pub trait ByteSource: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// The location this source would read for `key`, for diagnostics.
    fn effective_path(&self, key: &str) -> Result<String>;

    /// When the resource behind `key` was last modified, if known.
    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Open the resource behind `key`.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] - the resource does not exist.
    /// * [`Error::Read`] - the resource exists but could not be opened.
    fn open(&self, key: &str) -> Result<ByteStream>;

    /// Open the resource and read it to the end.
    fn read_bytes(&self, key: &str) -> Result<Bytes> {
        let mut stream = self.open(key)?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .map_err(|e| Error::read(self.effective_path(key).unwrap_or_default(), e))?;
        Ok(Bytes::from(buf))
    }
}

/// Write bytes under a key.
pub trait ByteSink: Send + Sync {
    /// Store `data` under `key`, replacing any previous content.
    fn write(&self, key: &str, data: &[u8]) -> Result<()>;
}

/// Combined read/write source.
pub trait ByteStore: ByteSource + ByteSink {}
impl<T: ByteSource + ByteSink> ByteStore for T {}

// Blanket implementations for shared and boxed sources

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.as_ref().effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.as_ref().last_modified(key)
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        self.as_ref().open(key)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.as_ref().effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.as_ref().last_modified(key)
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        self.as_ref().open(key)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Arc<T> {
    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        self.as_ref().write(key, data)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Box<T> {
    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        self.as_ref().write(key, data)
    }
}
