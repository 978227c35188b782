//! Typed attribute values.
//!
//! Values are checked against the type an attribute was declared with; a
//! write never changes that type. `Null` is only accepted by attributes
//! declared nullable (e.g. `StartUpOnOff`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    Null,
    Bool,
    U8,
    U16,
    U32,
    I16,
    Enum8,
    Bitmap32,
    CharString,
    Struct(Vec<AttrType>),
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::I16 => write!(f, "i16"),
            Self::Enum8 => write!(f, "enum8"),
            Self::Bitmap32 => write!(f, "bitmap32"),
            Self::CharString => write!(f, "char_string"),
            Self::Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A runtime attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Null,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I16(i16),
    Enum8(u8),
    Bitmap32(u32),
    CharString(String),
    Struct(Vec<AttrValue>),
}

impl AttrValue {
    /// The type carried by this value.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Null => AttrType::Null,
            Self::Bool(_) => AttrType::Bool,
            Self::U8(_) => AttrType::U8,
            Self::U16(_) => AttrType::U16,
            Self::U32(_) => AttrType::U32,
            Self::I16(_) => AttrType::I16,
            Self::Enum8(_) => AttrType::Enum8,
            Self::Bitmap32(_) => AttrType::Bitmap32,
            Self::CharString(_) => AttrType::CharString,
            Self::Struct(fields) => AttrType::Struct(fields.iter().map(Self::attr_type).collect()),
        }
    }

    /// Whether this value may be stored in an attribute of `declared` type.
    pub fn conforms_to(&self, declared: &AttrType, nullable: bool) -> bool {
        match self {
            Self::Null => nullable,
            _ => self.attr_type() == *declared,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of integer-like values (u8, u16, u32, i16, enum8, bitmap32).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::U8(v) | Self::Enum8(v) => Some(i64::from(*v)),
            Self::U16(v) => Some(i64::from(*v)),
            Self::U32(v) | Self::Bitmap32(v) => Some(i64::from(*v)),
            Self::I16(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::CharString(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::U8(v) | Self::Enum8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::Bitmap32(v) => write!(f, "0x{:08X}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::CharString(s) => write!(f, "{:?}", s),
            Self::Struct(fields) => write!(f, "{:?}", fields),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        Self::U8(v)
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        Self::U16(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i16> for AttrValue {
    fn from(v: i16) -> Self {
        Self::I16(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::CharString(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_only_conforms_when_nullable() {
        assert!(AttrValue::Null.conforms_to(&AttrType::Bool, true));
        assert!(!AttrValue::Null.conforms_to(&AttrType::Bool, false));
    }

    #[test]
    fn test_integer_widths_are_distinct_types() {
        assert!(AttrValue::U8(5).conforms_to(&AttrType::U8, false));
        assert!(!AttrValue::U16(5).conforms_to(&AttrType::U8, false));
        assert!(!AttrValue::Enum8(5).conforms_to(&AttrType::U8, false));
    }

    #[test]
    fn test_struct_type_follows_fields() {
        let value = AttrValue::Struct(vec![AttrValue::U8(1), AttrValue::Bool(true)]);
        let declared = AttrType::Struct(vec![AttrType::U8, AttrType::Bool]);
        assert!(value.conforms_to(&declared, false));
        assert!(!value.conforms_to(&AttrType::Struct(vec![AttrType::U8]), false));
        assert_eq!(declared.to_string(), "struct{u8, bool}");
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(AttrValue::U16(300).as_i64(), Some(300));
        assert_eq!(AttrValue::I16(-4).as_i64(), Some(-4));
        assert_eq!(AttrValue::Bool(true).as_i64(), None);
    }
}
