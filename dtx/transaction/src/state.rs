//! Mapping between persisted state codes and the 2PC phase vocabulary.
//!
//! The storage schema records states as small integers, but older rows and hand-written
//! fixtures may carry the symbolic name instead. Both forms are accepted. Anything else is a
//! decode error: an unrecognized code means the schema has drifted, and recovery must not guess.

use dtx_common::error::{DecodeError, DecodeResult};
use dtx_common::row::RowRef;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A closed set of states persisted as a numeric code or its symbolic name.
pub trait PersistedCode: Sized {
    /// Maps a numeric code.
    fn from_code(code: i64) -> DecodeResult<Self>;

    /// Maps a symbolic name, ignoring ASCII case.
    fn from_name(name: &str) -> Option<Self>;

    /// The numeric code this state is stored as.
    fn code(&self) -> i64;

    /// The error reported for a value that is neither a known code nor a known name.
    fn unknown(value: String) -> DecodeError;

    /// Decodes the state stored in column `index` of `row`.
    fn decode(row: &RowRef<'_>, index: usize) -> DecodeResult<Self> {
        let text = row.decode_string(index)?;
        let text = text.trim();
        match text.parse::<i64>() {
            Ok(code) => Self::from_code(code),
            Err(_) => Self::from_name(text).ok_or_else(|| Self::unknown(text.to_string())),
        }
    }
}

/// Terminal state of a shard-local redo log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RedoState {
    /// Preparing the transaction failed; the statements must not be replayed.
    Failed,
    /// The transaction was prepared and its statements can be replayed.
    Prepared,
}

impl PersistedCode for RedoState {
    fn from_code(code: i64) -> DecodeResult<Self> {
        match code {
            0 => Ok(RedoState::Failed),
            1 => Ok(RedoState::Prepared),
            other => Err(Self::unknown(other.to_string())),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    fn code(&self) -> i64 {
        match self {
            RedoState::Failed => 0,
            RedoState::Prepared => 1,
        }
    }

    fn unknown(value: String) -> DecodeError {
        DecodeError::UnknownRedoState { value }
    }
}

/// The coordinator's 2PC phase for a distributed transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Phase {
    Prepare,
    Commit,
    Rollback,
}

impl PersistedCode for Phase {
    fn from_code(code: i64) -> DecodeResult<Self> {
        match code {
            1 => Ok(Phase::Prepare),
            2 => Ok(Phase::Commit),
            3 => Ok(Phase::Rollback),
            other => Err(Self::unknown(other.to_string())),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    fn code(&self) -> i64 {
        match self {
            Phase::Prepare => 1,
            Phase::Commit => 2,
            Phase::Rollback => 3,
        }
    }

    fn unknown(value: String) -> DecodeError {
        DecodeError::UnknownPhase { value }
    }
}

/// Protocol enum for a transaction's state, as reported to external resolvers.
///
/// The protocol numbering is not the storage numbering: `COMMIT` is stored as 2 but sent as 3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum TransactionState {
    #[default]
    Unknown = 0,
    Prepare = 1,
    Rollback = 2,
    Commit = 3,
}

impl TransactionState {
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<Phase> for TransactionState {
    #[inline]
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Prepare => TransactionState::Prepare,
            Phase::Commit => TransactionState::Commit,
            Phase::Rollback => TransactionState::Rollback,
        }
    }
}
