//! Domain model of two-phase-commit recovery.
//!
//! This crate holds the values the recovery layer rebuilds from storage and the lookup table
//! that turns persisted state codes into phases:
//! - [`PreparedTx`]: a shard-local redo log, the statements needed to replay a transaction.
//! - [`DistributedTx`]: the coordinator's record of a transaction, its phase and participants.
//! - [`TransactionMetadata`]: the wire form of a [`DistributedTx`] sent to resolvers.

pub mod distributed;
pub mod participant;
pub mod prepared;
pub mod state;

pub use distributed::{DistributedTx, TransactionMetadata};
pub use participant::Participant;
pub use prepared::PreparedTx;
pub use state::{PersistedCode, Phase, RedoState, TransactionState};
