use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::Participant;
use crate::state::{Phase, TransactionState};

/// The coordinator's record of a distributed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedTx {
    pub dtid: String,
    pub state: Phase,
    pub created: DateTime<Utc>,
    pub participants: Vec<Participant>,
}

impl DistributedTx {
    #[inline]
    pub fn new(dtid: impl Into<String>, state: Phase, created: DateTime<Utc>) -> Self {
        Self {
            dtid: dtid.into(),
            state,
            created,
            participants: Vec::new(),
        }
    }

    #[inline]
    pub fn with_participants(mut self, participants: impl IntoIterator<Item = Participant>) -> Self {
        self.participants = participants.into_iter().collect();
        self
    }

    /// The wire form of this transaction, dropping the creation time.
    pub fn to_metadata(&self) -> TransactionMetadata {
        TransactionMetadata {
            dtid: self.dtid.clone(),
            state: self.state.into(),
            participants: self.participants.clone(),
        }
    }
}

/// Wire form of a distributed transaction reported to an external resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub dtid: String,
    pub state: TransactionState,
    pub participants: Vec<Participant>,
}

impl TransactionMetadata {
    #[inline]
    pub fn new(dtid: impl Into<String>, state: TransactionState) -> Self {
        Self {
            dtid: dtid.into(),
            state,
            participants: Vec::new(),
        }
    }

    #[inline]
    pub fn with_participants(mut self, participants: impl IntoIterator<Item = Participant>) -> Self {
        self.participants = participants.into_iter().collect();
        self
    }
}
