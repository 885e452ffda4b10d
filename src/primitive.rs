//! Primitive values that facts can hold.
//!
//! A [`Primitive`] is a kind tag plus the raw bytes of the value. The bytes
//! are exactly what goes on the wire, so a fact can be copied between
//! contexts or written to a snapshot without re-encoding:
//!
//! | Kind | Payload |
//! |------|---------|
//! | `Identifier` | UTF-8 entity id |
//! | `Number` | 8-byte little-endian IEEE-754 double |
//! | `Text` | UTF-8 |
//! | `Boolean` | 1 byte, non-zero is true |
//! | `Date` / `Time` / `DateTime` | UTF-8 [`PartialDateTime`] text |

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::codec::{self, LAST_FIXED_LENGTH_VERSION};
use crate::config::ContextConfig;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::time::PartialDateTime;

/// Kind tag of a [`Primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// Reference to another entity by id
    Identifier,
    Number,
    Text,
    Boolean,
    /// Date-only partial date/time
    Date,
    /// Time-only partial date/time
    Time,
    /// Partial date/time with both parts
    DateTime,
}

impl PrimitiveKind {
    /// Returns the wire code of this kind.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Identifier => 1,
            Self::Number => 2,
            Self::Text => 3,
            Self::Boolean => 4,
            Self::Date => 5,
            Self::Time => 6,
            Self::DateTime => 7,
        }
    }

    /// Decodes a wire code.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` for unknown codes.
    pub fn from_code(code: i16) -> KnowledgeResult<Self> {
        Ok(match code {
            1 => Self::Identifier,
            2 => Self::Number,
            3 => Self::Text,
            4 => Self::Boolean,
            5 => Self::Date,
            6 => Self::Time,
            7 => Self::DateTime,
            other => {
                return Err(KnowledgeError::invalid_data(format!(
                    "unknown primitive kind code {other}"
                )))
            }
        })
    }

    /// Returns a human-readable kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
        }
    }

    /// Returns true for the three partial date/time kinds.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged scalar value.
///
/// # Examples
///
/// ```
/// use knowledge_context::{Primitive, PrimitiveKind};
///
/// let name = Primitive::text("London");
/// assert_eq!(name.kind(), PrimitiveKind::Text);
/// assert_eq!(name.as_text().unwrap(), "London");
///
/// // Reading through the wrong kind fails loudly.
/// assert!(name.as_number().unwrap_err().is_type_mismatch());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Primitive {
    kind: PrimitiveKind,
    bytes: Vec<u8>,
}

impl Primitive {
    /// Creates a text primitive.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: PrimitiveKind::Text,
            bytes: value.into().into_bytes(),
        }
    }

    /// Creates an identifier primitive referencing an entity id.
    #[must_use]
    pub fn identifier(entity_id: impl Into<String>) -> Self {
        Self {
            kind: PrimitiveKind::Identifier,
            bytes: entity_id.into().into_bytes(),
        }
    }

    /// Creates a number primitive.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self {
            kind: PrimitiveKind::Number,
            bytes: value.to_le_bytes().to_vec(),
        }
    }

    /// Creates a boolean primitive.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            kind: PrimitiveKind::Boolean,
            bytes: vec![u8::from(value)],
        }
    }

    /// Creates a date, time or date-time primitive depending on which parts are set.
    #[must_use]
    pub fn date_time(value: &PartialDateTime) -> Self {
        let kind = match (value.has_date(), value.has_time()) {
            (true, true) => PrimitiveKind::DateTime,
            (false, true) => PrimitiveKind::Time,
            _ => PrimitiveKind::Date,
        };
        Self {
            kind,
            bytes: value.format().into_bytes(),
        }
    }

    pub(crate) const fn from_raw(kind: PrimitiveKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    #[must_use]
    pub const fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub const fn is_identifier(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Identifier)
    }

    pub const fn is_text(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Text)
    }

    pub const fn is_number(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Number)
    }

    pub const fn is_boolean(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Boolean)
    }

    pub const fn is_temporal(&self) -> bool {
        self.kind.is_temporal()
    }

    fn expect_kind(&self, expected: PrimitiveKind) -> KnowledgeResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(KnowledgeError::TypeMismatch {
                expected,
                actual: self.kind,
            })
        }
    }

    fn utf8(&self) -> KnowledgeResult<&str> {
        std::str::from_utf8(&self.bytes).map_err(|e| {
            KnowledgeError::invalid_data(format!("{} primitive is not valid UTF-8: {e}", self.kind))
        })
    }

    /// Reads a text value.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if this is not a text primitive.
    pub fn as_text(&self) -> KnowledgeResult<&str> {
        self.expect_kind(PrimitiveKind::Text)?;
        self.utf8()
    }

    /// Reads the referenced entity id.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if this is not an identifier primitive.
    pub fn as_identifier(&self) -> KnowledgeResult<&str> {
        self.expect_kind(PrimitiveKind::Identifier)?;
        self.utf8()
    }

    /// Reads a number value.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if this is not a number primitive, `InvalidData` if the
    /// payload is not 8 bytes.
    pub fn as_number(&self) -> KnowledgeResult<f64> {
        self.expect_kind(PrimitiveKind::Number)?;
        let raw: [u8; 8] = self.bytes.as_slice().try_into().map_err(|_| {
            KnowledgeError::invalid_data(format!(
                "number primitive has {} bytes, expected 8",
                self.bytes.len()
            ))
        })?;
        Ok(f64::from_le_bytes(raw))
    }

    /// Reads a boolean value.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if this is not a boolean primitive, `InvalidData` if the
    /// payload is not 1 byte.
    pub fn as_boolean(&self) -> KnowledgeResult<bool> {
        self.expect_kind(PrimitiveKind::Boolean)?;
        match self.bytes.as_slice() {
            [b] => Ok(*b != 0),
            other => Err(KnowledgeError::invalid_data(format!(
                "boolean primitive has {} bytes, expected 1",
                other.len()
            ))),
        }
    }

    /// Reads a partial date/time from any of the three temporal kinds.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if this is not a temporal primitive, `InvalidData` if
    /// the text does not parse.
    pub fn as_date_time(&self) -> KnowledgeResult<PartialDateTime> {
        if !self.kind.is_temporal() {
            return Err(KnowledgeError::TypeMismatch {
                expected: PrimitiveKind::DateTime,
                actual: self.kind,
            });
        }
        PartialDateTime::parse(self.utf8()?)
    }

    /// Renders the value for debug output. Undecodable payloads render as null.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self.kind {
            PrimitiveKind::Text | PrimitiveKind::Identifier => {
                self.utf8().map_or(Json::Null, |s| Json::String(s.to_string()))
            }
            PrimitiveKind::Number => self
                .as_number()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or(Json::Null, Json::Number),
            PrimitiveKind::Boolean => self.as_boolean().map_or(Json::Null, Json::Bool),
            PrimitiveKind::Date | PrimitiveKind::Time | PrimitiveKind::DateTime => self
                .as_date_time()
                .map_or(Json::Null, |t| Json::String(t.format())),
        }
    }

    /// Writes `[i16 kind][length][bytes]` using the length rule of `version`.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError::InvalidData` if the payload exceeds
    /// `max_primitive_bytes`, so that nothing is written that
    /// [`decode`](Self::decode) would reject.
    pub fn encode(
        &self,
        writer: &mut impl Write,
        version: u8,
        config: &ContextConfig,
    ) -> KnowledgeResult<()> {
        check_primitive_len(self.bytes.len(), config)?;
        writer.write_i16::<LittleEndian>(self.kind.code())?;
        if version <= LAST_FIXED_LENGTH_VERSION {
            let len = i32::try_from(self.bytes.len())
                .map_err(|_| KnowledgeError::invalid_data("primitive exceeds 2 GiB"))?;
            writer.write_i32::<LittleEndian>(len)?;
        } else {
            let len = u32::try_from(self.bytes.len())
                .map_err(|_| KnowledgeError::invalid_data("primitive exceeds 4 GiB"))?;
            codec::write_varint(writer, len)?;
        }
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    /// Reads a primitive written by [`encode`](Self::encode) with the same `version`.
    pub fn decode(
        reader: &mut impl Read,
        version: u8,
        config: &ContextConfig,
    ) -> KnowledgeResult<Self> {
        let code = reader.read_i16::<LittleEndian>().map_err(codec::read_err)?;
        let kind = PrimitiveKind::from_code(code)?;

        let len = if version <= LAST_FIXED_LENGTH_VERSION {
            let raw = reader.read_i32::<LittleEndian>().map_err(codec::read_err)?;
            usize::try_from(raw).map_err(|_| {
                KnowledgeError::invalid_data(format!("negative primitive length {raw}"))
            })?
        } else {
            codec::read_varint(reader)? as usize
        };

        check_primitive_len(len, config)?;

        Ok(Self::from_raw(kind, codec::read_bytes(reader, len)?))
    }
}

fn check_primitive_len(len: usize, config: &ContextConfig) -> KnowledgeResult<()> {
    if len > config.max_primitive_bytes {
        return Err(KnowledgeError::invalid_data(format!(
            "primitive length {len} exceeds maximum {}",
            config.max_primitive_bytes
        )));
    }
    Ok(())
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrimitiveKind::Text => match self.utf8() {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write!(f, "<invalid text>"),
            },
            PrimitiveKind::Identifier => match self.utf8() {
                Ok(s) => write!(f, "<{s}>"),
                Err(_) => write!(f, "<invalid identifier>"),
            },
            PrimitiveKind::Number => match self.as_number() {
                Ok(v) => write!(f, "{v}"),
                Err(_) => write!(f, "<invalid number>"),
            },
            PrimitiveKind::Boolean => match self.as_boolean() {
                Ok(v) => write!(f, "{v}"),
                Err(_) => write!(f, "<invalid boolean>"),
            },
            PrimitiveKind::Date | PrimitiveKind::Time | PrimitiveKind::DateTime => {
                match self.utf8() {
                    Ok(s) => f.write_str(s),
                    Err(_) => write!(f, "<invalid {}>", self.kind),
                }
            }
        }
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Self::boolean(v)
    }
}

impl From<i32> for Primitive {
    fn from(v: i32) -> Self {
        Self::number(f64::from(v))
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Self::number(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Self::text(v)
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Self::text(v)
    }
}

impl From<&PartialDateTime> for Primitive {
    fn from(v: &PartialDateTime) -> Self {
        Self::date_time(v)
    }
}

impl From<PartialDateTime> for Primitive {
    fn from(v: PartialDateTime) -> Self {
        Self::date_time(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_text() {
        let val = Primitive::text("hello");
        assert!(val.is_text());
        assert_eq!(val.as_text().unwrap(), "hello");
        assert_eq!(val.kind().name(), "text");
    }

    #[test]
    fn test_number_is_fixed_width() {
        let val = Primitive::number(60.0);
        assert!(val.is_number());
        assert_eq!(val.bytes().len(), 8);
        assert!((val.as_number().unwrap() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boolean_is_one_byte() {
        let val = Primitive::boolean(true);
        assert_eq!(val.bytes(), &[1]);
        assert!(val.as_boolean().unwrap());
        assert!(!Primitive::boolean(false).as_boolean().unwrap());
    }

    #[test]
    fn test_identifier() {
        let val = Primitive::identifier("mem://abc");
        assert!(val.is_identifier());
        assert_eq!(val.as_identifier().unwrap(), "mem://abc");
        assert_eq!(format!("{val}"), "<mem://abc>");
    }

    #[test]
    fn test_date_time_kind_follows_components() {
        let date = PartialDateTime::parse("2024-01-30").unwrap();
        let time = PartialDateTime::parse("T10:00:00").unwrap();
        let both = PartialDateTime::parse("2024-01-30T10:00:00").unwrap();
        assert_eq!(Primitive::date_time(&date).kind(), PrimitiveKind::Date);
        assert_eq!(Primitive::date_time(&time).kind(), PrimitiveKind::Time);
        assert_eq!(Primitive::date_time(&both).kind(), PrimitiveKind::DateTime);
        assert_eq!(Primitive::date_time(&both).as_date_time().unwrap(), both);
    }

    #[test]
    fn test_type_mismatch_is_loud() {
        let val = Primitive::boolean(true);
        let err = val.as_text().unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::TypeMismatch {
                expected: PrimitiveKind::Text,
                actual: PrimitiveKind::Boolean
            }
        ));
        assert!(val.as_number().is_err());
        assert!(val.as_identifier().is_err());
        assert!(val.as_date_time().is_err());
    }

    #[test]
    fn test_kind_codes_roundtrip() {
        for kind in [
            PrimitiveKind::Identifier,
            PrimitiveKind::Number,
            PrimitiveKind::Text,
            PrimitiveKind::Boolean,
            PrimitiveKind::Date,
            PrimitiveKind::Time,
            PrimitiveKind::DateTime,
        ] {
            assert_eq!(PrimitiveKind::from_code(kind.code()).unwrap(), kind);
        }
        assert!(PrimitiveKind::from_code(0).unwrap_err().is_invalid_data());
    }

    #[test]
    fn test_encode_v3_uses_varint_length() {
        let mut buf = Vec::new();
        Primitive::text("hi").encode(&mut buf, 3, &ContextConfig::default()).unwrap();
        assert_eq!(hex::encode(&buf), "0300026869");
    }

    #[test]
    fn test_encode_v2_uses_fixed_length() {
        let mut buf = Vec::new();
        Primitive::text("hi").encode(&mut buf, 2, &ContextConfig::default()).unwrap();
        assert_eq!(hex::encode(&buf), "0300020000006869");

        let decoded =
            Primitive::decode(&mut Cursor::new(buf), 2, &ContextConfig::default()).unwrap();
        assert_eq!(decoded.as_text().unwrap(), "hi");
    }

    #[test]
    fn test_decode_rejects_oversized_payload() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3i16.to_le_bytes());
        codec::write_varint(&mut buf, 1_000_000).unwrap();
        let cfg = ContextConfig {
            max_string_bytes: 1024,
            max_primitive_bytes: 1024,
            ..ContextConfig::default()
        };
        let err = Primitive::decode(&mut Cursor::new(buf), 3, &cfg).unwrap_err();
        assert!(format!("{err}").contains("exceeds maximum"));
    }

    #[test]
    fn test_to_json_value() {
        assert_eq!(Primitive::text("a").to_json_value(), serde_json::json!("a"));
        assert_eq!(Primitive::number(1.5).to_json_value(), serde_json::json!(1.5));
        assert_eq!(Primitive::boolean(true).to_json_value(), serde_json::json!(true));
        assert_eq!(Primitive::number(f64::NAN).to_json_value(), serde_json::Value::Null);
    }

    #[test]
    fn test_from_conversions() {
        assert!(Primitive::from(true).is_boolean());
        assert!(Primitive::from(3).is_number());
        assert!(Primitive::from(2.5).is_number());
        assert!(Primitive::from("x").is_text());
        assert!(Primitive::from(String::from("x")).is_text());
        assert!(Primitive::from(PartialDateTime::parse("XXXX-12-11").unwrap()).is_temporal());
    }
}
