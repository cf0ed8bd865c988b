use std::error::Error;
use std::fmt;

use dtx_common::error::DecodeError;
use miette::Diagnostic;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Why an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Canceled => write!(f, "context canceled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum RecoveryError {
    #[error("failed to decode row {row} of dtid {}", .dtid.as_deref().unwrap_or("<unknown>"))]
    Decode {
        dtid: Option<String>,
        row: usize,
        #[source]
        #[diagnostic_source]
        source: DecodeError,
    },

    #[error("rows of dtid {dtid} disagree on {field}")]
    #[diagnostic(help(
        "all rows of one transaction are written atomically; a mismatch points at corrupted storage"
    ))]
    Inconsistent { dtid: String, field: &'static str },

    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    #[error("query returned more than {limit} rows")]
    RowLimitExceeded { limit: usize },

    #[error("operation stopped: {0}")]
    Cancelled(CancelReason),
}

impl RecoveryError {
    #[inline]
    pub fn connection(error: impl Into<BoxError>) -> Self {
        Self::Connection(error.into())
    }

    #[inline]
    pub fn decode(dtid: Option<&str>, row: usize, source: DecodeError) -> Self {
        Self::Decode {
            dtid: dtid.map(str::to_string),
            row,
            source,
        }
    }

    /// Returns `true` if the caller aborted the operation, as opposed to storage failing.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

pub type RecoveryResult<T> = std::result::Result<T, RecoveryError>;
