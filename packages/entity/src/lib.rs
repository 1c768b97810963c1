//! loadstone entities: decoded artifacts and the cache that keeps them.
//!
//! - [`EntityLoader`]: key in, typed entity out
//! - [`SourceLoader`]: a [`ByteSource`](loadstone_source::ByteSource) plus a [`Decoder`]
//! - [`CachingLoader`]: lifetime- and freshness-based caching over any loader
//! - [`Value`]: the tree type used for JSON resources and execution contexts

mod cache;
mod clock;
mod decoder;
mod loader;
mod properties;
mod value;

pub use cache::{CacheConfig, CacheEntry, CacheStats, CachingLoader};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{BytesDecoder, Decoder, JsonDecoder, PropertiesDecoder, TextDecoder, ValueDecoder};
pub use loader::{EntityLoader, SourceLoader};
pub use properties::{Properties, PropertiesError};
pub use value::{from_value, to_value, Value, ValueError};

pub use loadstone_source::{Error, ErrorKind, Result};
