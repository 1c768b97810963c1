//! In-memory source and sink.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{check_key, Error, Result};
use crate::traits::{ByteSink, ByteSource, ByteStream};

/// A concurrent key → bytes map.
///
/// Every write records its modification time, so caches layered on top of a
/// `MemorySource` see changes the same way they would for files.
///
/// # Example
///
/// ```rust
/// use loadstone_source::{ByteSink, ByteSource, MemorySource};
///
/// let source = MemorySource::new("scratch");
/// source.write("notes/today", b"buy milk").unwrap();
/// assert_eq!(source.read_bytes("notes/today").unwrap().as_ref(), b"buy milk");
/// assert!(source.last_modified("notes/today").is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    name: String,
    entries: RwLock<HashMap<String, (Bytes, DateTime<Utc>)>>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store `data` under `key` with an explicit modification time.
    pub fn insert_at(&self, key: &str, data: impl Into<Bytes>, modified: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), (data.into(), modified));
    }

    /// Store `data` under `key`, stamped with the current time.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.insert_at(key, data, Utc::now());
    }

    /// Remove a key, returning its bytes if present.
    pub fn remove(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).map(|(data, _)| data)
    }

    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        check_key("resource key", key)?;
        Ok(format!("{}:{}", self.name, key))
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map(|(_, modified)| *modified)
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        check_key("resource key", key)?;
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((data, _)) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(Error::not_found(
                key,
                format!("'{}' not found in '{}'", key, self.name),
            )),
        }
    }
}

impl ByteSink for MemorySource {
    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        check_key("resource key", key)?;
        self.insert(key, Bytes::copy_from_slice(data));
        Ok(())
    }
}
