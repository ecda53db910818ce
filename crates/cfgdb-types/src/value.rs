use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Date literal format for `date` attributes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp literal format for `time` attributes.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An attribute value.
///
/// The persisted form is plain JSON (untagged), so a value read back from a
/// file may come in a wider variant than the schema type asks for, e.g. an
/// `Int` for a `double` attribute. [`AttrType::coerce`] normalises it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Primitive attribute type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    Float,
    Double,
    String,
    /// String restricted to a fixed set of values (held by the attribute definition).
    Enum,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Timestamp, `YYYY-MM-DD HH:MM:SS`.
    Time,
    /// Name of a schema class.
    Class,
}

impl AttrType {
    /// Inclusive integer bounds for integral types.
    fn signed_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::S8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::S16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::S32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::S64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    fn unsigned_max(&self) -> Option<u64> {
        match self {
            Self::U8 => Some(u8::MAX.into()),
            Self::U16 => Some(u16::MAX.into()),
            Self::U32 => Some(u32::MAX.into()),
            Self::U64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Returns `true` for types whose values are held as strings.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Enum | Self::Date | Self::Time | Self::Class
        )
    }

    /// The value an attribute of this type holds when nothing else is known.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::S8 | Self::S16 | Self::S32 | Self::S64 => Value::Int(0),
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => Value::UInt(0),
            Self::Float | Self::Double => Value::Float(0.0),
            Self::String | Self::Enum | Self::Date | Self::Time | Self::Class => {
                Value::String(String::new())
            }
        }
    }

    /// Check a single (non-list) value against this type and return it in
    /// canonical form.
    ///
    /// Canonical variants: `Bool` for bool, `Int` for signed, `UInt` for
    /// unsigned, `Float` for float/double, `String` for string-like types.
    /// Empty strings are accepted for `date` and `time`; the not-null rule
    /// lives on the attribute definition.
    pub fn coerce(&self, value: &Value) -> Result<Value, TypeError> {
        let mismatch = || TypeError::TypeMismatch {
            expected: *self,
            found: value.variant_name().to_string(),
        };
        let out_of_range = || TypeError::OutOfRange {
            ty: *self,
            value: value.to_string(),
        };

        if let Value::List(_) = value {
            return Err(mismatch());
        }

        match self {
            Self::Bool => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
            Self::S8 | Self::S16 | Self::S32 | Self::S64 => {
                let (min, max) = self.signed_bounds().ok_or_else(mismatch)?;
                let v = match value {
                    Value::Int(v) => *v,
                    Value::UInt(v) => i64::try_from(*v).map_err(|_| out_of_range())?,
                    _ => return Err(mismatch()),
                };
                if v < min || v > max {
                    return Err(out_of_range());
                }
                Ok(Value::Int(v))
            }
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => {
                let max = self.unsigned_max().ok_or_else(mismatch)?;
                let v = match value {
                    Value::UInt(v) => *v,
                    Value::Int(v) => u64::try_from(*v).map_err(|_| out_of_range())?,
                    _ => return Err(mismatch()),
                };
                if v > max {
                    return Err(out_of_range());
                }
                Ok(Value::UInt(v))
            }
            Self::Float | Self::Double => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                if *self == Self::Float && v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range());
                }
                Ok(Value::Float(v))
            }
            Self::String | Self::Enum | Self::Class => {
                value.as_str().map(Value::from).ok_or_else(mismatch)
            }
            Self::Date => {
                let s = value.as_str().ok_or_else(mismatch)?;
                if !s.is_empty() && NaiveDate::parse_from_str(s, DATE_FORMAT).is_err() {
                    return Err(TypeError::InvalidLiteral {
                        ty: *self,
                        value: s.to_string(),
                    });
                }
                Ok(Value::from(s))
            }
            Self::Time => {
                let s = value.as_str().ok_or_else(mismatch)?;
                if !s.is_empty() && NaiveDateTime::parse_from_str(s, TIME_FORMAT).is_err() {
                    return Err(TypeError::InvalidLiteral {
                        ty: *self,
                        value: s.to_string(),
                    });
                }
                Ok(Value::from(s))
            }
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::S8 => "s8",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::U16 => "u16",
            Self::S32 => "s32",
            Self::U32 => "u32",
            Self::S64 => "s64",
            Self::U64 => "u64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Date => "date",
            Self::Time => "time",
            Self::Class => "class",
        };
        write!(f, "{name}")
    }
}
