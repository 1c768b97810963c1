//! The Value type - a tree-shaped data structure.
//!
//! Values are what decoders produce for structured resources, and what
//! scripts and templates receive as their execution context.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while navigating or converting a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A path segment tried to descend into a scalar.
    #[error("cannot navigate through non-container at '{segment}'")]
    NotAContainer { segment: String },

    /// An array segment was not a valid index.
    #[error("invalid array index '{segment}'")]
    BadIndex { segment: String },

    /// serde conversion failed.
    #[error("conversion failed: {message}")]
    Convert { message: String },
}

/// A tree-shaped value.
///
/// # Design Notes
///
/// - Uses `BTreeMap` for deterministic ordering (stable output, comparison)
/// - Includes `Bytes` for binary data, which JSON encodes as base64
/// - Uses `i64` for integers
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    /// Create an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Create an empty array.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Look up a direct child by map key or array index.
    pub fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment),
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?),
            _ => None,
        }
    }

    /// Get a nested value by a dot-separated path (`"user.address.0"`).
    ///
    /// An empty path returns `self`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        segments(path).try_fold(self, |current, segment| current.child(segment))
    }

    /// Get a mutable reference to a nested value.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut current = self;
        for segment in segments(path) {
            current = match current {
                Value::Map(map) => map.get_mut(segment)?,
                Value::Array(arr) => {
                    let index: usize = segment.parse().ok()?;
                    arr.get_mut(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a dot-separated path, creating intermediate maps.
    ///
    /// A `Null` anywhere along the way is replaced by a map.
    ///
    /// # Errors
    ///
    /// Fails when the path runs through a scalar, or through an array with
    /// a non-numeric or out-of-range index.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ValueError> {
        let parts: Vec<&str> = segments(path).collect();
        if parts.is_empty() {
            *self = value;
            return Ok(());
        }

        let mut current = self;
        let last = parts.len() - 1;
        for (i, segment) in parts.into_iter().enumerate() {
            if current.is_null() {
                *current = Value::map();
            }

            if i == last {
                match current {
                    Value::Map(map) => {
                        map.insert(segment.to_string(), value);
                        return Ok(());
                    }
                    Value::Array(arr) => {
                        let index = parse_index(segment)?;
                        if index < arr.len() {
                            arr[index] = value;
                        } else if index == arr.len() {
                            arr.push(value);
                        } else {
                            return Err(ValueError::BadIndex {
                                segment: segment.to_string(),
                            });
                        }
                        return Ok(());
                    }
                    _ => {
                        return Err(ValueError::NotAContainer {
                            segment: segment.to_string(),
                        })
                    }
                }
            }

            current = match current {
                Value::Map(map) => map.entry(segment.to_string()).or_insert_with(Value::map),
                Value::Array(arr) => {
                    let index = parse_index(segment)?;
                    arr.get_mut(index).ok_or_else(|| ValueError::BadIndex {
                        segment: segment.to_string(),
                    })?
                }
                _ => {
                    return Err(ValueError::NotAContainer {
                        segment: segment.to_string(),
                    })
                }
            };
        }

        Ok(())
    }

    /// Remove a value at a path, returning it if it existed.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = segments(path).collect();
        let (last, parents) = parts.split_last()?;
        let parent = self.get_mut(&parents.join("."))?;

        match parent {
            Value::Map(map) => map.remove(*last),
            Value::Array(arr) => {
                let index: usize = last.parse().ok()?;
                (index < arr.len()).then(|| arr.remove(index))
            }
            _ => None,
        }
    }

    /// Convert from `serde_json::Value`.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    // Fallback for very large numbers
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                // JSON doesn't have bytes, so we base64 encode
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

fn parse_index(segment: &str) -> Result<usize, ValueError> {
    segment.parse().map_err(|_| ValueError::BadIndex {
        segment: segment.to_string(),
    })
}

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, ValueError> {
    serde_json::from_value(value.to_json()).map_err(|e| ValueError::Convert {
        message: e.to_string(),
    })
}

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, ValueError> {
    let json = serde_json::to_value(data).map_err(|e| ValueError::Convert {
        message: e.to_string(),
    })?;
    Ok(Value::from_json(json))
}

/// Text rendering: strings print raw, everything else as compact JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(v)
    }
}
