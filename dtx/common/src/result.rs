use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::field::{ColumnType, Field};
use crate::row::{OwnedRow, RowRef, Rows};
use crate::value::ScalarValue;

/// Ordered rows of typed column values, as produced by one query.
///
/// `fields` may be empty when the executor reports no column metadata (an empty result usually
/// has none); decoders then fall back to the values themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    fields: Vec<Field>,
    rows: Vec<OwnedRow>,
}

impl QueryResult {
    #[inline]
    pub fn new(fields: Vec<Field>, rows: Vec<OwnedRow>) -> Self {
        Self { fields, rows }
    }

    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<&OwnedRow> {
        self.rows.get(index)
    }

    #[inline]
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            result: self,
            iter: 0..self.rows.len(),
        }
    }

    #[inline]
    pub fn first_row(&self) -> Option<RowRef<'_>> {
        self.rows().next()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn push(&mut self, row: OwnedRow) {
        self.rows.push(row);
    }

    /// Builds a result from pipe-separated text.
    ///
    /// ```
    /// use dtx_common::result::QueryResult;
    ///
    /// let result = QueryResult::from_pipe_text(
    ///     "dtid|state|keyspace|shard",
    ///     "VARBINARY|INT64|VARCHAR|VARCHAR",
    ///     &["dtid0|1|ks01|shard01", "dtid0|1|ks01|shard02"],
    /// )
    /// .unwrap();
    /// assert_eq!(result.len(), 2);
    /// ```
    pub fn from_pipe_text(names: &str, types: &str, rows: &[&str]) -> DecodeResult<Self> {
        let names = names.split('|').collect_vec();
        let types = types
            .split('|')
            .enumerate()
            .map(|(i, t)| {
                ColumnType::from_str(t.trim()).map_err(|_| DecodeError::MalformedText {
                    line: 0,
                    message: format!("column {i} has unknown type {t:?}"),
                })
            })
            .collect::<DecodeResult<Vec<_>>>()?;
        if names.len() != types.len() {
            return Err(DecodeError::MalformedText {
                line: 0,
                message: format!("{} names but {} types", names.len(), types.len()),
            });
        }
        let fields = names
            .into_iter()
            .zip(types.iter())
            .map(|(name, ty)| Field::new(name.trim(), *ty))
            .collect_vec();

        let mut result = Self::new(fields, Vec::with_capacity(rows.len()));
        for (line, text) in rows.iter().enumerate() {
            let cells = text.split('|').collect_vec();
            if cells.len() != types.len() {
                return Err(DecodeError::MalformedText {
                    line: line + 1,
                    message: format!("expected {} cells, found {}", types.len(), cells.len()),
                });
            }
            let row = cells
                .into_iter()
                .zip(types.iter())
                .map(|(cell, ty)| {
                    ScalarValue::parse_as(*ty, cell).ok_or_else(|| DecodeError::MalformedText {
                        line: line + 1,
                        message: format!("{cell:?} is not a valid {ty}"),
                    })
                })
                .collect::<DecodeResult<OwnedRow>>()?;
            result.push(row);
        }
        Ok(result)
    }
}

/// Create an [`OwnedRow`] from values convertible into [`ScalarValue`].
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::row::OwnedRow::new(vec![$($crate::value::ScalarValue::from($value)),*])
    };
}

/// Create a [`QueryResult`] without field metadata from rows.
#[macro_export]
macro_rules! query_result {
    ($($row:expr),* $(,)?) => {
        $crate::result::QueryResult::new(Vec::new(), vec![$($row),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pipe_text() {
        let result = QueryResult::from_pipe_text(
            "dtid|state|keyspace|shard",
            "VARBINARY|INT64|VARCHAR|VARCHAR",
            &["dtid0|2|ks01|shard01", "dtid1|3|ks02|shard03"],
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.fields()[1], Field::new("state", ColumnType::Int64));
        let second = result.rows().nth(1).unwrap();
        assert_eq!(second.get(0), Some(&ScalarValue::Bytes(b"dtid1".to_vec())));
        assert_eq!(second.get(1), Some(&ScalarValue::Int64(3)));
        assert_eq!(second.get(3), Some(&ScalarValue::String("shard03".into())));
    }

    #[test]
    fn test_from_pipe_text_errors() {
        assert!(matches!(
            QueryResult::from_pipe_text("a|b", "INT64", &[]),
            Err(DecodeError::MalformedText { line: 0, .. })
        ));
        assert!(matches!(
            QueryResult::from_pipe_text("a", "INT64", &["x"]),
            Err(DecodeError::MalformedText { line: 1, .. })
        ));
        assert!(matches!(
            QueryResult::from_pipe_text("a|b", "INT64|INT64", &["1|2", "3"]),
            Err(DecodeError::MalformedText { line: 2, .. })
        ));
    }

    #[test]
    fn test_macros() {
        let result = query_result!(row!["dtid0", 1i64], row!["dtid1", None::<i64>]);
        assert!(result.fields().is_empty());
        assert_eq!(result.len(), 2);
        assert!(result.rows().nth(1).unwrap().get(1).unwrap().is_null());
    }
}
