//! Characteristic value model.
//!
//! A [`Value`] is a closed tagged variant with one case per HAP format. Every access
//! site matches exhaustively, so a value can never be read under the wrong tag.
//!
//! Conversions never truncate silently: a number that does not fit the target
//! format (e.g. `300` into `uint8`, `2.5` into `int`) is rejected with
//! [`ValueError::Unrepresentable`].

mod cell;

pub use cell::*;


use std::cmp::Ordering;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;

use crate::convert::safe_kv;
use crate::convert::safe_vk;
use crate::ValueError;

/// HAP characteristic formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Bool,
    Int,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    String,
    Data,
    Tlv8,
}

impl Format {
    /// Format tag as rendered in attribute payloads
    pub fn tag(&self) -> &'static str {
        match self {
            Format::Bool => "bool",
            Format::Int => "int",
            Format::Uint8 => "uint8",
            Format::Uint16 => "uint16",
            Format::Uint32 => "uint32",
            Format::Uint64 => "uint64",
            Format::Float => "float",
            Format::String => "string",
            Format::Data => "data",
            Format::Tlv8 => "tlv8",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Format::String | Format::Data | Format::Tlv8)
    }

    /// Formats that may carry a valid-values list
    pub fn is_enumerable(&self) -> bool {
        matches!(
            self,
            Format::Int | Format::Uint8 | Format::Uint16 | Format::Uint32
        )
    }
}

/// One characteristic value, tagged with its format
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f64),
    String(String),
    Data(Vec<u8>),
    Tlv8(Vec<u8>),
}

/// Exact intermediate for numeric conversions. `i128` holds every integer format
/// (including `u64`) without loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn compare(
        self,
        other: Numeric,
    ) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }

    /// Integral view, if the number has no fractional part
    fn integral(self) -> Option<i128> {
        match self {
            Numeric::Int(i) => Some(i),
            Numeric::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.0e38 => {
                Some(f as i128)
            }
            Numeric::Float(_) => None,
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Numeric::Int(i) => write!(f, "{i}"),
            Numeric::Float(v) => write!(f, "{v}"),
        }
    }
}

impl Value {
    /// Zero value for a format; strings and binary formats start out empty.
    pub fn empty(format: Format) -> Value {
        match format {
            Format::Bool => Value::Bool(false),
            Format::Int => Value::Int(0),
            Format::Uint8 => Value::Uint8(0),
            Format::Uint16 => Value::Uint16(0),
            Format::Uint32 => Value::Uint32(0),
            Format::Uint64 => Value::Uint64(0),
            Format::Float => Value::Float(0.0),
            Format::String => Value::String(String::new()),
            Format::Data => Value::Data(Vec::new()),
            Format::Tlv8 => Value::Tlv8(Vec::new()),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Value::Bool(_) => Format::Bool,
            Value::Int(_) => Format::Int,
            Value::Uint8(_) => Format::Uint8,
            Value::Uint16(_) => Format::Uint16,
            Value::Uint32(_) => Format::Uint32,
            Value::Uint64(_) => Format::Uint64,
            Value::Float(_) => Format::Float,
            Value::String(_) => Format::String,
            Value::Data(_) => Format::Data,
            Value::Tlv8(_) => Format::Tlv8,
        }
    }

    pub(crate) fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Bool(b) => Some(Numeric::Int(*b as i128)),
            Value::Int(v) => Some(Numeric::Int(*v as i128)),
            Value::Uint8(v) => Some(Numeric::Int(*v as i128)),
            Value::Uint16(v) => Some(Numeric::Int(*v as i128)),
            Value::Uint32(v) => Some(Numeric::Int(*v as i128)),
            Value::Uint64(v) => Some(Numeric::Int(*v as i128)),
            Value::Float(v) => Some(Numeric::Float(*v)),
            Value::String(_) | Value::Data(_) | Value::Tlv8(_) => None,
        }
    }

    /// Converts the value into `format`.
    ///
    /// Numbers convert between numeric formats only when the target can hold them
    /// exactly. Strings stay strings; `data` and `tlv8` are interchangeable byte
    /// payloads. Anything else is a [`ValueError::FormatMismatch`].
    pub fn coerce(
        self,
        format: Format,
    ) -> Result<Value, ValueError> {
        if self.format() == format {
            return Ok(self);
        }
        if format.is_numeric() {
            return match self.numeric() {
                Some(n) => Self::cast(format, n),
                None => Err(ValueError::FormatMismatch {
                    expected: format,
                    found: self.format().tag(),
                }),
            };
        }
        match (format, self) {
            (Format::Data, Value::Data(b) | Value::Tlv8(b)) => Ok(Value::Data(b)),
            (Format::Tlv8, Value::Data(b) | Value::Tlv8(b)) => Ok(Value::Tlv8(b)),
            (_, other) => Err(ValueError::FormatMismatch {
                expected: format,
                found: other.format().tag(),
            }),
        }
    }

    pub(crate) fn cast(
        format: Format,
        n: Numeric,
    ) -> Result<Value, ValueError> {
        let unrepresentable = || ValueError::Unrepresentable {
            format,
            value: n.to_string(),
        };
        let integral = n.integral();
        let value = match format {
            Format::Bool => match integral {
                Some(0) => Value::Bool(false),
                Some(1) => Value::Bool(true),
                _ => return Err(unrepresentable()),
            },
            Format::Int => Value::Int(
                integral
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(unrepresentable)?,
            ),
            Format::Uint8 => Value::Uint8(
                integral
                    .and_then(|i| u8::try_from(i).ok())
                    .ok_or_else(unrepresentable)?,
            ),
            Format::Uint16 => Value::Uint16(
                integral
                    .and_then(|i| u16::try_from(i).ok())
                    .ok_or_else(unrepresentable)?,
            ),
            Format::Uint32 => Value::Uint32(
                integral
                    .and_then(|i| u32::try_from(i).ok())
                    .ok_or_else(unrepresentable)?,
            ),
            Format::Uint64 => Value::Uint64(
                integral
                    .and_then(|i| u64::try_from(i).ok())
                    .ok_or_else(unrepresentable)?,
            ),
            Format::Float => Value::Float(n.as_f64()),
            Format::String | Format::Data | Format::Tlv8 => {
                return Err(ValueError::FormatMismatch {
                    expected: format,
                    found: "number",
                })
            }
        };
        Ok(value)
    }

    /// `min <= self <= max` for numeric values. Non-numeric values are always
    /// within range; NaN never is.
    pub fn within(
        &self,
        min: &Value,
        max: &Value,
    ) -> bool {
        match (self.numeric(), min.numeric(), max.numeric()) {
            (Some(v), Some(lo), Some(hi)) => {
                matches!(v.compare(lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(v.compare(hi), Some(Ordering::Less | Ordering::Equal))
            }
            _ => true,
        }
    }

    /// Integer view used for valid-values membership
    pub fn as_u32(&self) -> Option<u32> {
        self.numeric()
            .and_then(Numeric::integral)
            .and_then(|i| u32::try_from(i).ok())
    }

    pub fn as_bool(&self) -> bool {
        match self.numeric() {
            Some(n) => n.as_f64() != 0.0,
            None => false,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.numeric()
            .and_then(Numeric::integral)
            .and_then(|i| i64::try_from(i).ok())
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.numeric()
            .and_then(Numeric::integral)
            .and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.numeric().map(Numeric::as_f64)
    }

    /// String contents; empty for every other format
    pub fn as_str(&self) -> &str {
        match self {
            Value::String(s) => s,
            _ => "",
        }
    }

    /// Binary contents (`data`, `tlv8`, or the UTF-8 bytes of a string)
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Data(b) | Value::Tlv8(b) => b,
            Value::String(s) => s.as_bytes(),
            _ => &[],
        }
    }

    /// Parses a value sent by a remote controller.
    pub fn from_json(
        format: Format,
        json: &serde_json::Value,
    ) -> Result<Value, ValueError> {
        use serde_json::Value as Json;

        let malformed = |reason: String| ValueError::InvalidEncoding { format, reason };
        match (format, json) {
            (f, Json::Bool(b)) if f.is_numeric() => Self::cast(f, Numeric::Int(*b as i128)),
            (f, Json::Number(n)) if f.is_numeric() => {
                let numeric = if let Some(i) = n.as_i64() {
                    Numeric::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Numeric::Int(u as i128)
                } else {
                    Numeric::Float(
                        n.as_f64()
                            .ok_or_else(|| malformed(format!("{n} is not a number")))?,
                    )
                };
                Self::cast(f, numeric)
            }
            (Format::Bool, Json::String(s)) => match s.as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(malformed(format!("{s:?} is not a boolean"))),
            },
            (Format::String, Json::String(s)) => Ok(Value::String(s.clone())),
            (Format::Data, Json::String(s)) => STANDARD
                .decode(s)
                .map(Value::Data)
                .map_err(|e| malformed(e.to_string())),
            (Format::Tlv8, Json::String(s)) => STANDARD
                .decode(s)
                .map(Value::Tlv8)
                .map_err(|e| malformed(e.to_string())),
            (_, other) => Err(ValueError::FormatMismatch {
                expected: format,
                found: json_kind(other),
            }),
        }
    }

    /// Renders the value for an attribute or event payload.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::Uint8(v) => Json::from(*v),
            Value::Uint16(v) => Json::from(*v),
            Value::Uint32(v) => Json::from(*v),
            Value::Uint64(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Data(b) | Value::Tlv8(b) => Json::String(STANDARD.encode(b)),
        }
    }

    /// Numeric formats widened to one 64-bit word
    fn widen(&self) -> Option<u64> {
        match self {
            Value::Bool(b) => Some(*b as u64),
            Value::Int(v) => Some(*v as i64 as u64),
            Value::Uint8(v) => Some(*v as u64),
            Value::Uint16(v) => Some(*v as u64),
            Value::Uint32(v) => Some(*v as u64),
            Value::Uint64(v) => Some(*v),
            Value::Float(v) => Some(v.to_bits()),
            Value::String(_) | Value::Data(_) | Value::Tlv8(_) => None,
        }
    }

    /// Storage encoding: numeric formats as one big-endian 64-bit word, strings as
    /// UTF-8, binary formats verbatim.
    pub fn to_raw(&self) -> Vec<u8> {
        match self.widen() {
            Some(word) => safe_kv(word).to_vec(),
            None => self.as_bytes().to_vec(),
        }
    }

    /// Decodes a stored value, reinterpreting the widened word for `format`.
    pub fn from_raw(
        format: Format,
        raw: &[u8],
    ) -> Result<Value, ValueError> {
        let malformed = |reason: String| ValueError::InvalidEncoding { format, reason };
        if !format.is_numeric() {
            return match format {
                Format::String => String::from_utf8(raw.to_vec())
                    .map(Value::String)
                    .map_err(|e| malformed(e.to_string())),
                Format::Tlv8 => Ok(Value::Tlv8(raw.to_vec())),
                _ => Ok(Value::Data(raw.to_vec())),
            };
        }

        let word = safe_vk(raw)
            .ok_or_else(|| malformed(format!("expected 8 bytes, found {}", raw.len())))?;
        let narrow = || malformed(format!("stored word {word:#x} out of range"));
        let value = match format {
            Format::Bool => match word {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                _ => return Err(narrow()),
            },
            Format::Int => Value::Int(i32::try_from(word as i64).map_err(|_| narrow())?),
            Format::Uint8 => Value::Uint8(u8::try_from(word).map_err(|_| narrow())?),
            Format::Uint16 => Value::Uint16(u16::try_from(word).map_err(|_| narrow())?),
            Format::Uint32 => Value::Uint32(u32::try_from(word).map_err(|_| narrow())?),
            Format::Uint64 => Value::Uint64(word),
            Format::Float => Value::Float(f64::from_bits(word)),
            Format::String | Format::Data | Format::Tlv8 => unreachable!("checked above"),
        };
        Ok(value)
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Data(b) | Value::Tlv8(b) => write!(f, "{}", STANDARD.encode(b)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Uint8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Uint16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Data(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Data(v.to_vec())
    }
}
