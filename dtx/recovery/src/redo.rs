//! Rebuilding shard-local redo logs from the redo tables.

use chrono::{DateTime, Utc};
use dtx_common::error::DecodeResult;
use dtx_common::result::QueryResult;
use dtx_common::row::RowRef;
use dtx_transaction::{PersistedCode, PreparedTx, RedoState};
use serde::Serialize;

use crate::config::{Consistency, RecoveryConfig};
use crate::context::Context;
use crate::error::{RecoveryError, RecoveryResult};
use crate::group::Grouper;
use crate::queries::redo_columns;
use crate::{CANCEL_CHECK_INTERVAL, decode_dtid};

/// Redo logs split by terminal state, each list in the order its dtids were first read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedoLogs {
    pub prepared: Vec<PreparedTx>,
    pub failed: Vec<PreparedTx>,
}

impl RedoLogs {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prepared.is_empty() && self.failed.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prepared.len() + self.failed.len()
    }
}

#[derive(Debug)]
struct RedoGroup {
    dtid: String,
    state: RedoState,
    time: DateTime<Utc>,
    statements: Vec<(i64, String)>,
}

impl RedoGroup {
    fn into_prepared_tx(mut self) -> PreparedTx {
        // Stable, so statements sharing a sequence number keep their read order.
        self.statements.sort_by_key(|(sequence, _)| *sequence);
        PreparedTx {
            dtid: self.dtid,
            queries: self.statements.into_iter().map(|(_, s)| s).collect(),
            time: self.time,
        }
    }
}

struct RedoRow {
    state: RedoState,
    time: DateTime<Utc>,
    sequence: i64,
    statement: String,
}

impl RedoRow {
    fn decode(row: &RowRef<'_>) -> DecodeResult<Self> {
        Ok(Self {
            state: RedoState::decode(row, redo_columns::STATE)?,
            time: row.decode_timestamp(redo_columns::TIME_CREATED)?,
            sequence: row.decode_i64(redo_columns::SEQUENCE)?,
            statement: row.decode_string(redo_columns::STATEMENT)?,
        })
    }
}

/// Groups the rows of the redo query by dtid and splits the groups by state.
///
/// Fails without a partial result on the first row that cannot be decoded.
pub fn reconstruct_redo(
    ctx: &Context,
    result: &QueryResult,
    config: &RecoveryConfig,
) -> RecoveryResult<RedoLogs> {
    let mut grouper: Grouper<RedoGroup> = Grouper::new(config.grouping);
    for row in result.rows() {
        if row.row_index() % CANCEL_CHECK_INTERVAL == 0 {
            ctx.check()?;
        }
        let dtid = decode_dtid(&row, redo_columns::DTID)?;
        let decoded = RedoRow::decode(&row)
            .map_err(|e| RecoveryError::decode(Some(&dtid), row.row_index(), e))?;

        match grouper.get_mut(&dtid) {
            Some(group) => {
                check_redo_row(config.consistency, group, &decoded)?;
                group.statements.push((decoded.sequence, decoded.statement));
            }
            None => {
                let group = RedoGroup {
                    dtid: dtid.clone(),
                    state: decoded.state,
                    time: decoded.time,
                    statements: vec![(decoded.sequence, decoded.statement)],
                };
                grouper.open(dtid, group);
            }
        }
    }

    let groups = grouper.len();
    let mut logs = RedoLogs::default();
    for group in grouper.into_groups() {
        match group.state {
            RedoState::Prepared => logs.prepared.push(group.into_prepared_tx()),
            RedoState::Failed => logs.failed.push(group.into_prepared_tx()),
        }
    }
    tracing::debug!(rows = result.len(), groups, "grouped redo rows");
    Ok(logs)
}

fn check_redo_row(
    consistency: Consistency,
    group: &RedoGroup,
    row: &RedoRow,
) -> RecoveryResult<()> {
    if group.state != row.state {
        crate::on_mismatch(consistency, &group.dtid, "state")?;
    }
    if group.time != row.time {
        crate::on_mismatch(consistency, &group.dtid, "time_created")?;
    }
    Ok(())
}
