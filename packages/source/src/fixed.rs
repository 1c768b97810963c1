//! A source that serves one fixed text under one key.

use std::io::Cursor;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{check_key, Error, Result};
use crate::traits::{ByteSource, ByteStream};

/// Serves `text` for exactly one key; every other key is not found.
///
/// The resource never changes, so its last-modified time is the Unix epoch.
#[derive(Debug, Clone)]
pub struct FixedTextSource {
    name: String,
    key: String,
    text: Bytes,
}

impl FixedTextSource {
    /// Create a fixed source. `name` and `key` must not be empty.
    pub fn new(name: &str, key: &str, text: impl Into<String>) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::config("name is empty"));
        }
        if key.is_empty() {
            return Err(Error::config("resource key is empty"));
        }

        Ok(Self {
            name: name.to_string(),
            key: key.to_string(),
            text: Bytes::from(text.into()),
        })
    }

    /// The only key this source answers.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> &str {
        // Constructed from a String, so always valid UTF-8.
        std::str::from_utf8(&self.text).unwrap_or_default()
    }
}

impl ByteSource for FixedTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        check_key("resource key", key)?;
        Ok(key.to_string())
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        (key == self.key).then_some(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        check_key("resource key", key)?;
        if key != self.key {
            return Err(Error::not_found(
                key,
                format!("no resource available for '{}'", key),
            ));
        }
        Ok(Box::new(Cursor::new(self.text.clone())))
    }
}
