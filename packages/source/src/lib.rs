//! loadstone sources: where resource bytes come from.
//!
//! This is the lowest layer of loadstone. It knows nothing about what the
//! bytes mean:
//! - [`compose`] / [`Affixes`]: turn a key into an effective path
//! - [`ByteSource`]: open a key as a byte stream, report its last-modified time
//! - [`ByteSink`]: write bytes under a key
//! - [`SourceChain`]: ordered fallback across several sources
//!
//! Higher layers (`loadstone-entity`) decode the bytes into typed entities
//! and cache them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use loadstone_source::{ByteSource, BundleSource, FileSystemSource, SourceChain};
//!
//! let local: Arc<dyn ByteSource> = Arc::new(FileSystemSource::new("/etc/myapp/", ".conf"));
//! let builtin: Arc<dyn ByteSource> = Arc::new(
//!     BundleSource::new("builtin").with_entry("app.conf", b"port=8080".as_slice()),
//! );
//! let chain = SourceChain::new("config", vec![local, builtin]).unwrap();
//!
//! // Falls back to the bundled default when the file is absent
//! let bytes = chain.read_bytes("app.conf");
//! # let _ = bytes;
//! ```

mod bundle;
mod chain;
mod error;
mod fixed;
mod fs;
mod memory;
mod path;
mod traits;

pub use bundle::BundleSource;
pub use chain::SourceChain;
pub use error::{check_key, BindStage, BoxError, Error, ErrorKind, Result};
pub use fixed::FixedTextSource;
pub use fs::FileSystemSource;
pub use memory::MemorySource;
pub use path::{compose, Affixes};
pub use traits::{ByteSink, ByteSource, ByteStore, ByteStream};

// Re-export for implementors
pub use bytes::Bytes;
