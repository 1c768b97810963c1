//! Resources embedded in the binary.
//!
//! A bundle is the compiled-in counterpart of a filesystem root: entries are
//! typically produced with `include_bytes!` and looked up by `/`-separated
//! names.

use std::collections::HashMap;
use std::io::Cursor;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{check_key, Error, Result};
use crate::path::compose;
use crate::traits::{ByteSource, ByteStream};

/// A named set of embedded resources.
///
/// Lookups compose `prefix + key + suffix` and drop a leading `/`, since
/// bundle names never start with a separator.
///
/// # Example
///
/// ```rust
/// use loadstone_source::{BundleSource, ByteSource};
///
/// let bundle = BundleSource::new("defaults")
///     .with_entry("conf/app.properties", b"mode=dev".as_slice())
///     .with_affixes("conf/", ".properties");
///
/// assert_eq!(bundle.read_bytes("/app").unwrap().as_ref(), b"mode=dev");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BundleSource {
    name: String,
    prefix: String,
    suffix: String,
    dev_mode: bool,
    entries: HashMap<String, Bytes>,
}

impl BundleSource {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() {
                "BundleSource".to_string()
            } else {
                name
            },
            ..Default::default()
        }
    }

    /// Build a bundle from a static table, e.g. one generated with `include_bytes!`.
    pub fn from_static(name: impl Into<String>, entries: &[(&'static str, &'static [u8])]) -> Self {
        let mut bundle = Self::new(name);
        for &(key, data) in entries {
            bundle
                .entries
                .insert(key.trim_start_matches('/').to_string(), Bytes::from_static(data));
        }
        bundle
    }

    pub fn with_entry(mut self, key: &str, data: impl Into<Bytes>) -> Self {
        self.insert(key, data);
        self
    }

    pub fn with_affixes(mut self, prefix: &str, suffix: &str) -> Self {
        self.set_prefix(prefix);
        self.set_suffix(suffix);
        self
    }

    pub fn insert(&mut self, key: &str, data: impl Into<Bytes>) {
        self.entries
            .insert(key.trim_start_matches('/').to_string(), data.into());
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.suffix = suffix.to_string();
    }

    /// Whether lookups are logged.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn set_dev_mode(&mut self, dev_mode: bool) {
        self.dev_mode = dev_mode;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn full_path(&self, key: &str) -> Result<String> {
        check_key("resource key", key)?;
        let composed = compose(&self.prefix, key, &self.suffix)?;
        Ok(match composed.strip_prefix('/') {
            Some(rest) => rest.to_string(),
            None => composed,
        })
    }
}

impl ByteSource for BundleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.full_path(key)
    }

    fn last_modified(&self, _key: &str) -> Option<DateTime<Utc>> {
        None
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        let path = self.full_path(key)?;
        if self.dev_mode {
            tracing::debug!(bundle = %self.name, path = %path, "bundle lookup");
        }

        match self.entries.get(&path) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(Error::not_found(
                key,
                format!("resource '{}' not found in bundle '{}'", path, self.name),
            )),
        }
    }
}
