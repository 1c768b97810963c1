//! SourceChain: try an ordered list of sources until one has the resource.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{check_key, Error, Result};
use crate::traits::{ByteSource, ByteStream};

/// An ordered fallback chain of sources.
///
/// `open` returns the first child that has the resource. A child reporting
/// not-found is skipped; any other child error stops the search. When every
/// child misses, the error lists each child's effective path.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_source::{ByteSource, FixedTextSource, MemorySource, SourceChain};
///
/// let overrides: Arc<dyn ByteSource> = Arc::new(MemorySource::new("overrides"));
/// let defaults: Arc<dyn ByteSource> =
///     Arc::new(FixedTextSource::new("defaults", "motd", "welcome").unwrap());
/// let chain = SourceChain::new("motd", vec![overrides, defaults]).unwrap();
///
/// assert_eq!(chain.read_bytes("motd").unwrap().as_ref(), b"welcome");
/// ```
pub struct SourceChain {
    name: String,
    children: Vec<Arc<dyn ByteSource>>,
}

impl SourceChain {
    /// Create a chain. At least one child is required.
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn ByteSource>>) -> Result<Self> {
        if children.is_empty() {
            return Err(Error::config("source chain has no children"));
        }

        let name = name.into();
        Ok(Self {
            name: if name.is_empty() {
                "SourceChain".to_string()
            } else {
                name
            },
            children,
        })
    }

    pub fn children(&self) -> &[Arc<dyn ByteSource>] {
        &self.children
    }

    /// Every child's effective path for `key`, in order.
    pub fn effective_paths(&self, key: &str) -> Result<Vec<String>> {
        check_key("resource key", key)?;
        self.children
            .iter()
            .map(|child| child.effective_path(key))
            .collect()
    }
}

impl std::fmt::Debug for SourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("name", &self.name)
            .field(
                "children",
                &self.children.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ByteSource for SourceChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        Ok(self.effective_paths(key)?.join(", "))
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.children
            .iter()
            .find_map(|child| child.last_modified(key))
    }

    fn open(&self, key: &str) -> Result<ByteStream> {
        check_key("resource key", key)?;

        for child in &self.children {
            match child.open(key) {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_not_found() => {
                    tracing::trace!(chain = %self.name, child = %child.name(), key, "miss");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::not_found(
            key,
            format!("tried: {}", self.effective_path(key)?),
        ))
    }
}
