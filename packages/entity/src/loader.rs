//! Entity loaders: resource keys in, decoded artifacts out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use loadstone_source::{check_key, Affixes, ByteSource, Result};

use crate::decoder::Decoder;

/// Loads named entities.
///
/// Implementations must be shareable across threads. `last_modified`
/// returning `None` means "unknown", which callers treat as possibly
/// changed.
pub trait EntityLoader: Send + Sync {
    type Entity;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// The path `key` resolves to, for diagnostics.
    fn effective_path(&self, key: &str) -> Result<String>;

    /// When the resource behind `key` last changed, if known.
    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>>;

    /// Load and decode the entity for `key`.
    fn load(&self, key: &str) -> Result<Self::Entity>;
}

impl<L: EntityLoader + ?Sized> EntityLoader for Arc<L> {
    type Entity = L::Entity;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        (**self).effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        (**self).last_modified(key)
    }

    fn load(&self, key: &str) -> Result<Self::Entity> {
        (**self).load(key)
    }
}

impl<L: EntityLoader + ?Sized> EntityLoader for Box<L> {
    type Entity = L::Entity;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        (**self).effective_path(key)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        (**self).last_modified(key)
    }

    fn load(&self, key: &str) -> Result<Self::Entity> {
        (**self).load(key)
    }
}

/// Reads a resource from a [`ByteSource`] and decodes it with `D`.
///
/// The key passes through this loader's [`Affixes`] first, so a loader
/// with suffix `.properties` maps `app` to `app.properties` on the
/// underlying source.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use loadstone_entity::{EntityLoader, PropertiesDecoder, SourceLoader};
/// use loadstone_source::BundleSource;
///
/// let bundle = BundleSource::new("defaults").with_entry("app.properties", b"port=80".as_slice());
/// let loader = SourceLoader::new(Arc::new(bundle), PropertiesDecoder).with_affixes("", ".properties");
///
/// let props = loader.load("app").unwrap();
/// assert_eq!(props.get("port"), Some("80"));
/// ```
pub struct SourceLoader<D> {
    name: String,
    source: Arc<dyn ByteSource>,
    affixes: Affixes,
    decoder: D,
}

impl<D: Decoder> SourceLoader<D> {
    pub fn new(source: Arc<dyn ByteSource>, decoder: D) -> Self {
        let name = format!("{}<{}>", source.name(), short_type_name::<D>());
        Self {
            name,
            source,
            affixes: Affixes::default(),
            decoder,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set both affixes; each is trimmed.
    pub fn with_affixes(mut self, prefix: &str, suffix: &str) -> Self {
        self.affixes = Affixes::new(prefix, suffix);
        self
    }

    pub fn affixes(&self) -> &Affixes {
        &self.affixes
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.affixes.set_prefix(prefix);
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.affixes.set_suffix(suffix);
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<D: Decoder> EntityLoader for SourceLoader<D> {
    type Entity = D::Output;

    fn name(&self) -> &str {
        &self.name
    }

    fn effective_path(&self, key: &str) -> Result<String> {
        self.source.effective_path(&self.affixes.apply(key)?)
    }

    fn last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let path = self.affixes.apply(key).ok()?;
        self.source.last_modified(&path)
    }

    fn load(&self, key: &str) -> Result<D::Output> {
        check_key("resource key", key)?;
        let path = self.affixes.apply(key)?;
        let effective = self.source.effective_path(&path)?;
        tracing::debug!(loader = %self.name, key, path = %effective, "loading");

        let mut stream = self.source.open(&path)?;
        self.decoder.decode(&effective, &mut stream)
    }
}

impl<D> std::fmt::Debug for SourceLoader<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLoader")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("affixes", &self.affixes)
            .finish()
    }
}

/// Last path segment of a type name, for default loader names.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
