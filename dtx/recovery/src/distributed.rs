//! Rebuilding distributed-transaction records from the coordinator tables.
//!
//! Both result shapes group participants under their dtid the same way; they differ in which
//! per-transaction values each row repeats. Those values are the group's header, taken from
//! the first row and checked against the rest.

use chrono::{DateTime, Utc};
use dtx_common::error::DecodeResult;
use dtx_common::result::QueryResult;
use dtx_common::row::RowRef;
use dtx_transaction::{DistributedTx, Participant, PersistedCode, Phase, TransactionMetadata};

use crate::config::RecoveryConfig;
use crate::context::Context;
use crate::error::{RecoveryError, RecoveryResult};
use crate::group::Grouper;
use crate::queries::{transaction_columns, unresolved_columns};
use crate::{CANCEL_CHECK_INTERVAL, decode_dtid};

/// Per-transaction values repeated on every participant row.
trait GroupHeader: Sized {
    fn decode(row: &RowRef<'_>) -> DecodeResult<Self>;

    /// Name of the first field on which `self` and `other` disagree.
    fn mismatch(&self, other: &Self) -> Option<&'static str>;
}

/// Header of a row from the full transaction query.
#[derive(Debug, Clone, Copy)]
struct FullHeader {
    phase: Phase,
    created: DateTime<Utc>,
}

impl GroupHeader for FullHeader {
    fn decode(row: &RowRef<'_>) -> DecodeResult<Self> {
        Ok(Self {
            phase: Phase::decode(row, transaction_columns::STATE)?,
            created: row.decode_timestamp(transaction_columns::TIME_CREATED)?,
        })
    }

    fn mismatch(&self, other: &Self) -> Option<&'static str> {
        if self.phase != other.phase {
            Some("state")
        } else if self.created != other.created {
            Some("time_created")
        } else {
            None
        }
    }
}

/// Header of a row from the unresolved-transaction query, which carries no creation time.
#[derive(Debug, Clone, Copy)]
struct PhaseHeader {
    phase: Phase,
}

impl GroupHeader for PhaseHeader {
    fn decode(row: &RowRef<'_>) -> DecodeResult<Self> {
        Ok(Self {
            phase: Phase::decode(row, unresolved_columns::STATE)?,
        })
    }

    fn mismatch(&self, other: &Self) -> Option<&'static str> {
        (self.phase != other.phase).then_some("state")
    }
}

#[derive(Debug, Clone, Copy)]
struct ParticipantColumns {
    dtid: usize,
    keyspace: usize,
    shard: usize,
}

const TRANSACTION_LAYOUT: ParticipantColumns = ParticipantColumns {
    dtid: transaction_columns::DTID,
    keyspace: transaction_columns::KEYSPACE,
    shard: transaction_columns::SHARD,
};

const UNRESOLVED_LAYOUT: ParticipantColumns = ParticipantColumns {
    dtid: unresolved_columns::DTID,
    keyspace: unresolved_columns::KEYSPACE,
    shard: unresolved_columns::SHARD,
};

#[derive(Debug)]
struct ParticipantGroup<H> {
    dtid: String,
    header: H,
    participants: Vec<Participant>,
}

fn decode_participant(row: &RowRef<'_>, columns: ParticipantColumns) -> DecodeResult<Participant> {
    Ok(Participant::new(
        row.decode_string(columns.keyspace)?,
        row.decode_string(columns.shard)?,
    ))
}

fn group_participants<H: GroupHeader>(
    ctx: &Context,
    result: &QueryResult,
    columns: ParticipantColumns,
    config: &RecoveryConfig,
) -> RecoveryResult<Vec<ParticipantGroup<H>>> {
    let mut grouper: Grouper<ParticipantGroup<H>> = Grouper::new(config.grouping);
    for row in result.rows() {
        if row.row_index() % CANCEL_CHECK_INTERVAL == 0 {
            ctx.check()?;
        }
        let dtid = decode_dtid(&row, columns.dtid)?;
        let (header, participant) = H::decode(&row)
            .and_then(|header| Ok((header, decode_participant(&row, columns)?)))
            .map_err(|e| RecoveryError::decode(Some(&dtid), row.row_index(), e))?;

        match grouper.get_mut(&dtid) {
            Some(group) => {
                if let Some(field) = group.header.mismatch(&header) {
                    crate::on_mismatch(config.consistency, &group.dtid, field)?;
                }
                group.participants.push(participant);
            }
            None => {
                let group = ParticipantGroup {
                    dtid: dtid.clone(),
                    header,
                    participants: vec![participant],
                };
                grouper.open(dtid, group);
            }
        }
    }
    tracing::debug!(
        rows = result.len(),
        groups = grouper.len(),
        "grouped participant rows"
    );
    Ok(grouper.into_groups().collect())
}

/// Groups the rows of the full transaction query into distributed transactions.
pub fn reconstruct_transactions(
    ctx: &Context,
    result: &QueryResult,
    config: &RecoveryConfig,
) -> RecoveryResult<Vec<DistributedTx>> {
    let groups = group_participants::<FullHeader>(ctx, result, TRANSACTION_LAYOUT, config)?;
    Ok(groups
        .into_iter()
        .map(|group| DistributedTx {
            dtid: group.dtid,
            state: group.header.phase,
            created: group.header.created,
            participants: group.participants,
        })
        .collect())
}

/// Groups the rows of the unresolved-transaction query into their wire form.
pub fn reconstruct_metadata(
    ctx: &Context,
    result: &QueryResult,
    config: &RecoveryConfig,
) -> RecoveryResult<Vec<TransactionMetadata>> {
    let groups = group_participants::<PhaseHeader>(ctx, result, UNRESOLVED_LAYOUT, config)?;
    Ok(groups
        .into_iter()
        .map(|group| TransactionMetadata {
            dtid: group.dtid,
            state: group.header.phase.into(),
            participants: group.participants,
        })
        .collect())
}
