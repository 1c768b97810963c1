//! loadstone templates: `${path}` placeholder text merged with a context.
//!
//! - [`Template`]: parsed template text
//! - [`TemplateDecoder`]: plugs templates into any entity loader
//! - [`TemplateExec`]: id in, merged output out, with affixes and caching

mod decoder;
mod exec;
mod template;

pub use decoder::TemplateDecoder;
pub use exec::{TemplateCache, TemplateExec, TemplateLoader, DEFAULT_SUFFIX};
pub use template::{Template, TemplateError};
