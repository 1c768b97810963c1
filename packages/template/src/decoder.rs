use std::io::Read;

use loadstone_entity::{Decoder, TextDecoder};
use loadstone_source::{Error, Result};

use crate::template::Template;

/// Decodes UTF-8 template text into a [`Template`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDecoder;

impl Decoder for TemplateDecoder {
    type Output = Template;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Template> {
        let text = TextDecoder.decode(path, reader)?;
        Template::parse(&text).map_err(|e| Error::parse(path, e))
    }
}
