//! Decoders: turn an open byte stream into an entity.

use std::io::Read;
use std::marker::PhantomData;

use bytes::Bytes;
use loadstone_source::{Error, Result};
use serde::de::DeserializeOwned;

use crate::properties::Properties;
use crate::value::Value;

/// Decodes the bytes of one resource.
///
/// `path` is the effective path of the resource and is what decode errors
/// should name. The decoder only reads from `reader`; closing the stream is
/// the caller's job.
pub trait Decoder: Send + Sync {
    type Output;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Self::Output>;
}

impl<D: Decoder + ?Sized> Decoder for std::sync::Arc<D> {
    type Output = D::Output;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Self::Output> {
        (**self).decode(path, reader)
    }
}

fn read_all(path: &str, reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(|e| Error::read(path, e))?;
    Ok(buf)
}

/// Reads the whole resource as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    type Output = String;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<String> {
        String::from_utf8(read_all(path, reader)?).map_err(|e| Error::parse(path, e))
    }
}

/// Reads the whole resource as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl Decoder for BytesDecoder {
    type Output = Bytes;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Bytes> {
        Ok(Bytes::from(read_all(path, reader)?))
    }
}

/// Parses a `.properties` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesDecoder;

impl Decoder for PropertiesDecoder {
    type Output = Properties;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Properties> {
        let text = TextDecoder.decode(path, reader)?;
        Properties::parse(&text).map_err(|e| Error::parse(path, e))
    }
}

/// Deserializes a JSON resource into `T`.
///
/// # Example
///
/// ```rust
/// use loadstone_entity::{Decoder, JsonDecoder};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Limits { max: u32 }
///
/// let limits: Limits = JsonDecoder::new()
///     .decode("limits.json", &mut br#"{"max": 5}"#.as_slice())
///     .unwrap();
/// assert_eq!(limits.max, 5);
/// ```
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Decoder for JsonDecoder<T> {
    type Output = T;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<T> {
        let bytes = read_all(path, reader)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::parse(path, e))
    }
}

/// Parses a JSON resource into a [`Value`] tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueDecoder;

impl Decoder for ValueDecoder {
    type Output = Value;

    fn decode(&self, path: &str, reader: &mut dyn Read) -> Result<Value> {
        let json: serde_json::Value = JsonDecoder::new().decode(path, reader)?;
        Ok(Value::from_json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstone_source::ErrorKind;
    use std::io;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    #[test]
    fn text_decodes_utf8() {
        let text = TextDecoder.decode("a.txt", &mut "héllo".as_bytes()).unwrap();
        assert_eq!(text, "héllo");
    }

    #[test]
    fn text_rejects_invalid_utf8_as_parse_failure() {
        let err = TextDecoder
            .decode("bin.txt", &mut [0xffu8, 0xfe].as_slice())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("bin.txt"));
    }

    #[test]
    fn io_errors_are_read_failures() {
        let err = BytesDecoder.decode("x", &mut FailingReader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadFailure);
    }

    #[test]
    fn properties_decoder_wraps_errors() {
        let props = PropertiesDecoder
            .decode("app.properties", &mut "a=1".as_bytes())
            .unwrap();
        assert_eq!(props.get("a"), Some("1"));

        let err = PropertiesDecoder
            .decode("app.properties", &mut "a=\\uzzzz".as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("app.properties"));
    }

    #[test]
    fn json_decoder_reports_path() {
        let err = JsonDecoder::<Vec<i64>>::new()
            .decode("nums.json", &mut "[1, 2,".as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("nums.json"));
    }

    #[test]
    fn value_decoder_builds_tree() {
        let value = ValueDecoder
            .decode("ctx.json", &mut r#"{"user": {"name": "ada"}}"#.as_bytes())
            .unwrap();
        assert_eq!(value.get("user.name"), Some(&Value::from("ada")));
    }
}
