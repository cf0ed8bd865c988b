use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::field::ColumnType;
use crate::result::QueryResult;
use crate::time::instant_from_micros;
use crate::value::ScalarValue;

#[derive(Debug)]
pub struct Rows<'a> {
    pub(crate) result: &'a QueryResult,
    pub(crate) iter: Range<usize>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = RowRef<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let row_index = self.iter.next()?;
        Some(RowRef {
            result: self.result,
            row_index,
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// A borrowed row of a [`QueryResult`], with typed decoders for its columns.
///
/// Decoders check the column's declared type first, then the value itself, so a schema that
/// declares the wrong type fails even when the stored value happens to parse.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    result: &'a QueryResult,
    row_index: usize,
}

impl<'a> RowRef<'a> {
    #[inline]
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a ScalarValue> {
        self.result.row(self.row_index)?.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.result.row(self.row_index).map_or(0, OwnedRow::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the column at `index`, or `#index` when the result carries no field metadata.
    pub fn column_name(&self, index: usize) -> String {
        self.result
            .fields()
            .get(index)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| format!("#{index}"))
    }

    #[inline]
    pub fn declared_type(&self, index: usize) -> Option<ColumnType> {
        self.result.fields().get(index).map(|f| f.ty())
    }

    fn value(&self, index: usize) -> DecodeResult<&'a ScalarValue> {
        self.get(index).ok_or_else(|| DecodeError::ColumnMissing {
            column: self.column_name(index),
            row: self.row_index,
        })
    }

    pub fn decode_string(&self, index: usize) -> DecodeResult<String> {
        if let Some(ty) = self.declared_type(index)
            && !ty.is_string_coercible()
        {
            return Err(DecodeError::type_mismatch(self.column_name(index), "string", ty));
        }
        match self.value(index)? {
            ScalarValue::String(s) => Ok(s.clone()),
            ScalarValue::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| {
                DecodeError::TypeMismatch {
                    column: self.column_name(index),
                    expected: "string",
                    found: "non-utf8 bytes".into(),
                }
            }),
            ScalarValue::Int64(v) => Ok(v.to_string()),
            ScalarValue::UInt64(v) => Ok(v.to_string()),
            other => Err(DecodeError::type_mismatch(
                self.column_name(index),
                "string",
                other.column_type(),
            )),
        }
    }

    pub fn decode_i64(&self, index: usize) -> DecodeResult<i64> {
        if let Some(ty) = self.declared_type(index)
            && !ty.is_integer_coercible()
        {
            return Err(DecodeError::type_mismatch(self.column_name(index), "integer", ty));
        }
        let invalid = |value: String| DecodeError::InvalidInteger {
            column: self.column_name(index),
            value,
        };
        match self.value(index)? {
            ScalarValue::Int64(v) => Ok(*v),
            ScalarValue::UInt64(v) => i64::try_from(*v).map_err(|_| invalid(v.to_string())),
            ScalarValue::String(s) => s.trim().parse().map_err(|_| invalid(s.clone())),
            ScalarValue::Bytes(b) => {
                let text = String::from_utf8_lossy(b);
                text.trim().parse().map_err(|_| invalid(text.into_owned()))
            }
            other => Err(DecodeError::type_mismatch(
                self.column_name(index),
                "integer",
                other.column_type(),
            )),
        }
    }

    /// Decodes an epoch-microsecond column into an instant.
    pub fn decode_timestamp(&self, index: usize) -> DecodeResult<DateTime<Utc>> {
        let micros = self.decode_i64(index)?;
        instant_from_micros(&self.column_name(index), micros)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedRow(Vec<ScalarValue>);

impl OwnedRow {
    #[inline]
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Self(values)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ScalarValue> {
        self.0.get(index)
    }

    #[inline]
    pub fn into_inner(self) -> Vec<ScalarValue> {
        self.0
    }
}

impl From<Vec<ScalarValue>> for OwnedRow {
    #[inline]
    fn from(values: Vec<ScalarValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<ScalarValue> for OwnedRow {
    fn from_iter<T: IntoIterator<Item = ScalarValue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::row;

    fn single_row(fields: Vec<Field>, values: Vec<ScalarValue>) -> QueryResult {
        QueryResult::new(fields, vec![OwnedRow::new(values)])
    }

    #[test]
    fn test_decode_without_fields() {
        let result = single_row(vec![], vec!["dtid0".into(), ScalarValue::Bytes(b"17".to_vec())]);
        let row = result.rows().next().unwrap();
        assert_eq!(row.decode_string(0).unwrap(), "dtid0");
        assert_eq!(row.decode_i64(1).unwrap(), 17);
        assert_eq!(row.column_name(1), "#1");
    }

    #[test]
    fn test_decode_integer_text() {
        let result = single_row(
            vec![Field::new("state", ColumnType::VarBinary)],
            vec![ScalarValue::Bytes(b"Failed".to_vec())],
        );
        let row = result.rows().next().unwrap();
        assert_eq!(
            row.decode_i64(0).unwrap_err(),
            DecodeError::InvalidInteger {
                column: "state".into(),
                value: "Failed".into()
            }
        );
        assert_eq!(row.decode_string(0).unwrap(), "Failed");
    }

    #[test]
    fn test_declared_type_mismatch() {
        let result = single_row(
            vec![Field::new("state", ColumnType::Float64)],
            vec![ScalarValue::Int64(1)],
        );
        let row = result.rows().next().unwrap();
        assert!(matches!(
            row.decode_i64(0),
            Err(DecodeError::TypeMismatch { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_null_and_missing() {
        let result = single_row(vec![], row![ScalarValue::Null].into_inner());
        let row = result.rows().next().unwrap();
        assert!(matches!(
            row.decode_string(0),
            Err(DecodeError::TypeMismatch { .. })
        ));
        assert_eq!(
            row.decode_i64(3).unwrap_err(),
            DecodeError::ColumnMissing {
                column: "#3".into(),
                row: 0
            }
        );
    }

    #[test]
    fn test_decode_timestamp() {
        let result = single_row(vec![], vec![ScalarValue::Int64(1_000_000)]);
        let row = result.rows().next().unwrap();
        assert_eq!(row.decode_timestamp(0).unwrap().timestamp(), 1);
    }

    #[test]
    fn test_unsigned_overflow() {
        let result = single_row(vec![], vec![ScalarValue::UInt64(u64::MAX)]);
        let row = result.rows().next().unwrap();
        assert!(matches!(
            row.decode_i64(0),
            Err(DecodeError::InvalidInteger { .. })
        ));
    }
}
