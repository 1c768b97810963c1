//! loadstone: load named resources, decode and cache them, and compile
//! script snippets into invokable units on demand.
//!
//! The work is split into layers, each its own crate:
//!
//! | layer | crate | what it does |
//! |---|---|---|
//! | [`source`] | `loadstone-source` | key composition and byte sources |
//! | [`entity`] | `loadstone-entity` | decoders, entity loaders, caching |
//! | [`script`] | `loadstone-script` | snippet wrapping, compiling, binding |
//! | [`template`] | `loadstone-template` | placeholder templates |
//!
//! The most used types are re-exported at the top level.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use loadstone::{CachingLoader, EntityLoader, MemorySource, PropertiesDecoder, SourceLoader};
//!
//! let source = Arc::new(MemorySource::new("config"));
//! source.insert("app.properties", "port = 8080");
//!
//! let loader = SourceLoader::new(source, PropertiesDecoder).with_affixes("", ".properties");
//! let cache = CachingLoader::new(30_000, loader);
//! assert_eq!(cache.load("app").unwrap().get("port"), Some("8080"));
//! ```

pub use loadstone_entity as entity;
pub use loadstone_script as script;
pub use loadstone_source as source;
pub use loadstone_template as template;

pub use loadstone_entity::{
    CacheConfig, CachingLoader, Clock, Decoder, EntityLoader, JsonDecoder, Properties,
    PropertiesDecoder, SourceLoader, SystemClock, TextDecoder, Value,
};
pub use loadstone_script::{
    CodeFragment, CompiledUnit, Compiler, ExecutorConfig, InstanceLoader, NativeCompiler, Scope,
    ScriptCell, ScriptConverter, ScriptExecutor, TextFragment, UnitConverter,
};
pub use loadstone_source::{
    Affixes, BundleSource, ByteSink, ByteSource, ByteStore, Error, ErrorKind, FileSystemSource,
    FixedTextSource, MemorySource, Result, SourceChain,
};
pub use loadstone_template::{Template, TemplateExec};
