use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::ColumnType;

/// A single column value as returned by the query executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl ScalarValue {
    /// The column type this value would be reported as.
    #[inline]
    pub fn column_type(&self) -> ColumnType {
        match self {
            ScalarValue::Null => ColumnType::Null,
            ScalarValue::Int64(_) => ColumnType::Int64,
            ScalarValue::UInt64(_) => ColumnType::UInt64,
            ScalarValue::Float64(_) => ColumnType::Float64,
            ScalarValue::String(_) => ColumnType::VarChar,
            ScalarValue::Bytes(_) => ColumnType::VarBinary,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Builds a value of the declared type from its textual form.
    ///
    /// Returns `None` if `text` does not parse as `ty`.
    pub fn parse_as(ty: ColumnType, text: &str) -> Option<Self> {
        match ty {
            ColumnType::Null => Some(ScalarValue::Null),
            ColumnType::Int64 => text.trim().parse().ok().map(ScalarValue::Int64),
            ColumnType::UInt64 => text.trim().parse().ok().map(ScalarValue::UInt64),
            ColumnType::Float64 => text.trim().parse().ok().map(ScalarValue::Float64),
            ColumnType::VarChar => Some(ScalarValue::String(text.to_string())),
            ColumnType::VarBinary => Some(ScalarValue::Bytes(text.as_bytes().to_vec())),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::UInt64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::String(v) => write!(f, "{v}"),
            ScalarValue::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

macro_rules! impl_from_for_variant {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for ScalarValue {
            #[inline]
            fn from(value: $ty) -> Self {
                ScalarValue::$variant(value)
            }
        }
    };
}

impl_from_for_variant!(i64, Int64);
impl_from_for_variant!(u64, UInt64);
impl_from_for_variant!(f64, Float64);
impl_from_for_variant!(String, String);
impl_from_for_variant!(Vec<u8>, Bytes);

impl From<&str> for ScalarValue {
    #[inline]
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    T: Into<ScalarValue>,
{
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_as() {
        assert_eq!(
            ScalarValue::parse_as(ColumnType::Int64, " 42"),
            Some(ScalarValue::Int64(42))
        );
        assert_eq!(ScalarValue::parse_as(ColumnType::Int64, "x"), None);
        assert_eq!(
            ScalarValue::parse_as(ColumnType::VarBinary, "dtid0"),
            Some(ScalarValue::Bytes(b"dtid0".to_vec()))
        );
    }

    #[test]
    fn test_from() {
        assert_eq!(ScalarValue::from(7i64), ScalarValue::Int64(7));
        assert_eq!(ScalarValue::from(None::<i64>), ScalarValue::Null);
        assert_eq!(ScalarValue::from("a").column_type(), ColumnType::VarChar);
    }
}
