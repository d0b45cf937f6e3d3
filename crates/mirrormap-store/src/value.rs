//! Tagged attribute values and native field conversions.
//!
//! An [`AttributeMap`] is the wire form shared by the backing store and the
//! cache payload codec. Values carry one of four tags, mirroring what a
//! key-value store keeps: strings, numbers (as decimal text), booleans, and
//! binary blobs. Dates and identifiers ride on those tags: a date is its
//! epoch milliseconds as a number, an identifier is its canonical string.
//!
//! Native Rust field types opt into marshalling through [`AttributeField`].

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConversionError;

/// Attribute name → tagged value.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Semantic type declared by an attribute descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Date,
    Binary,
    Identifier,
}

impl AttributeType {
    /// Whether a generated identifier string can be stored in this type.
    pub fn is_string_like(self) -> bool {
        matches!(self, Self::String | Self::Identifier)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Identifier => "identifier",
        };
        f.write_str(name)
    }
}

/// A single tagged attribute value.
///
/// Serializes in the tagged record form used by the backing store, e.g.
/// `{"S":"hello"}`, `{"N":"42"}`, `{"BOOL":true}`, `{"B":"AAEC"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// UTF-8 string.
    #[serde(rename = "S")]
    S(String),
    /// Number kept as its decimal text so no precision is lost in transit.
    #[serde(rename = "N")]
    N(String),
    /// Boolean.
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Raw bytes (base64 in serialized form).
    #[serde(rename = "B", with = "base64_bytes")]
    B(Vec<u8>),
}

impl AttributeValue {
    /// Build a number value from anything that displays as a decimal.
    pub fn number(n: impl fmt::Display) -> Self {
        Self::N(n.to_string())
    }

    /// The string payload, if this is an `S` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value counts as "empty" for key purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::S(s) | Self::N(s) => s.is_empty(),
            Self::B(b) => b.is_empty(),
            Self::Bool(_) => false,
        }
    }

    /// Short description used in conversion errors.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::S(s) => format!("string {s:?}"),
            Self::N(n) => format!("number {n}"),
            Self::Bool(b) => format!("boolean {b}"),
            Self::B(b) => format!("binary ({} bytes)", b.len()),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// ── native conversions ───────────────────────────────────────────────

/// A native field type that can be marshalled into an attribute.
///
/// `to_attribute` returns `None` for values that count as absent (empty
/// strings, empty byte buffers, nil UUIDs, `None`); absent values are left
/// out of the attribute map and restore as the type's default.
pub trait AttributeField: Sized {
    /// Semantic type recorded in the descriptor.
    const TYPE: AttributeType;

    /// Convert the field into a tagged value.
    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError>;

    /// Rebuild the field from a tagged value.
    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError>;
}

impl AttributeField for String {
    const TYPE: AttributeType = AttributeType::String;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(Some(AttributeValue::S(self.clone())))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::S(s) => Ok(s.clone()),
            other => Err(ConversionError::new(Self::TYPE, other.describe())),
        }
    }
}

impl AttributeField for bool {
    const TYPE: AttributeType = AttributeType::Boolean;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        Ok(Some(AttributeValue::Bool(*self)))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::Bool(b) => Ok(*b),
            // Older records encode booleans as 0/1 numbers.
            AttributeValue::N(n) if n == "1" => Ok(true),
            AttributeValue::N(n) if n == "0" => Ok(false),
            other => Err(ConversionError::new(Self::TYPE, other.describe())),
        }
    }
}

macro_rules! integer_field {
    ($($ty:ty),* $(,)?) => {$(
        impl AttributeField for $ty {
            const TYPE: AttributeType = AttributeType::Number;

            fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
                Ok(Some(AttributeValue::number(self)))
            }

            fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
                match value {
                    AttributeValue::N(n) => n
                        .parse::<$ty>()
                        .map_err(|_| ConversionError::new(Self::TYPE, value.describe())),
                    other => Err(ConversionError::new(Self::TYPE, other.describe())),
                }
            }
        }
    )*};
}

integer_field!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! float_field {
    ($($ty:ty),* $(,)?) => {$(
        impl AttributeField for $ty {
            const TYPE: AttributeType = AttributeType::Number;

            fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
                if !self.is_finite() {
                    return Err(ConversionError::new(Self::TYPE, format!("non-finite {self}")));
                }
                Ok(Some(AttributeValue::number(self)))
            }

            fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
                match value {
                    AttributeValue::N(n) => n
                        .parse::<$ty>()
                        .map_err(|_| ConversionError::new(Self::TYPE, value.describe())),
                    other => Err(ConversionError::new(Self::TYPE, other.describe())),
                }
            }
        }
    )*};
}

float_field!(f32, f64);

/// Dates are stored as epoch milliseconds; sub-millisecond precision is dropped.
impl AttributeField for DateTime<Utc> {
    const TYPE: AttributeType = AttributeType::Date;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        Ok(Some(AttributeValue::number(self.timestamp_millis())))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        let AttributeValue::N(n) = value else {
            return Err(ConversionError::new(Self::TYPE, value.describe()));
        };
        n.parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| ConversionError::new(Self::TYPE, value.describe()))
    }
}

impl AttributeField for Vec<u8> {
    const TYPE: AttributeType = AttributeType::Binary;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(Some(AttributeValue::B(self.clone())))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::B(bytes) => Ok(bytes.clone()),
            // Cache payloads carry binary as base64 text.
            AttributeValue::S(encoded) => BASE64
                .decode(encoded)
                .map_err(|_| ConversionError::new(Self::TYPE, value.describe())),
            other => Err(ConversionError::new(Self::TYPE, other.describe())),
        }
    }
}

impl AttributeField for Uuid {
    const TYPE: AttributeType = AttributeType::Identifier;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        if self.is_nil() {
            return Ok(None);
        }
        Ok(Some(AttributeValue::S(self.to_string())))
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        match value {
            AttributeValue::S(s) => {
                Uuid::parse_str(s).map_err(|_| ConversionError::new(Self::TYPE, value.describe()))
            }
            other => Err(ConversionError::new(Self::TYPE, other.describe())),
        }
    }
}

impl<T: AttributeField> AttributeField for Option<T> {
    const TYPE: AttributeType = T::TYPE;

    fn to_attribute(&self) -> Result<Option<AttributeValue>, ConversionError> {
        match self {
            Some(inner) => inner.to_attribute(),
            None => Ok(None),
        }
    }

    fn from_attribute(value: &AttributeValue) -> Result<Self, ConversionError> {
        T::from_attribute(value).map(Some)
    }
}

// ── tests ────────────────────────────────────────────────────────────
