use miette::Diagnostic;
use thiserror::Error;

use crate::field::ColumnType;

/// Failure to turn a stored column value into the value a reader expects.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DecodeError {
    #[error("row {row} has no column {column}")]
    ColumnMissing { column: String, row: usize },

    #[error("column {column}: expected {expected}, found {found}")]
    #[diagnostic(help("the stored schema may have drifted from the one recovery expects"))]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("column {column}: {value:?} is not a 64-bit integer")]
    InvalidInteger { column: String, value: String },

    #[error("column {column}: {micros}us since epoch is not a representable instant")]
    TimestampOutOfRange { column: String, micros: i64 },

    #[error("unknown redo state {value:?}")]
    #[diagnostic(help("known redo states are 0 (Failed) and 1 (Prepared)"))]
    UnknownRedoState { value: String },

    #[error("unknown transaction phase {value:?}")]
    #[diagnostic(help("known phases are 1 (PREPARE), 2 (COMMIT) and 3 (ROLLBACK)"))]
    UnknownPhase { value: String },

    #[error("empty transaction id")]
    EmptyDtid,

    #[error("line {line}: {message}")]
    MalformedText { line: usize, message: String },
}

impl DecodeError {
    #[inline]
    pub fn type_mismatch(column: impl Into<String>, expected: &'static str, found: ColumnType) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found: found.to_string(),
        }
    }
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
