use std::sync::Arc;

use chrono::{DateTime, Utc};
use dtx_common::error::DecodeError;
use dtx_common::result::QueryResult;
use dtx_common::time::threshold_micros;
use dtx_transaction::{DistributedTx, TransactionMetadata};
use serde::Serialize;

use crate::config::RecoveryConfig;
use crate::context::Context;
use crate::distributed::{reconstruct_metadata, reconstruct_transactions};
use crate::error::{RecoveryError, RecoveryResult};
use crate::pool::{ConnectionPool, PooledConnection, Query};
use crate::queries::{DTID_BIND, Queries, TIME_CREATED_BIND};
use crate::redo::{RedoLogs, reconstruct_redo};

/// Everything a coordinator needs to resume after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoverySnapshot {
    pub redo: RedoLogs,
    pub transactions: Vec<DistributedTx>,
}

/// Read side of two-phase commit: rebuilds in-flight transactions from the 2PC tables.
///
/// Every operation borrows one connection from the pool for its query and returns it before
/// returning, whatever the outcome. Operations hold no state between calls and never cache, so
/// concurrent sweeps need no coordination.
pub struct TwoPc<P> {
    pool: Arc<P>,
    config: RecoveryConfig,
    queries: Queries,
}

impl<P: ConnectionPool> TwoPc<P> {
    pub fn new(pool: Arc<P>, config: RecoveryConfig) -> Self {
        let queries = Queries::new(&config.sidecar_db);
        Self {
            pool,
            config,
            queries,
        }
    }

    #[inline]
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    #[inline]
    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Reads every redo log, split into prepared and failed ones.
    pub fn read_all_redo(&self, ctx: &Context) -> RecoveryResult<RedoLogs> {
        let result = self.execute(ctx, &Query::new(&self.queries.read_all_redo))?;
        let logs = reconstruct_redo(ctx, &result, &self.config)?;
        tracing::info!(
            prepared = logs.prepared.len(),
            failed = logs.failed.len(),
            "read all redo logs"
        );
        Ok(logs)
    }

    /// Reads every distributed transaction with its participants.
    pub fn read_all_transactions(&self, ctx: &Context) -> RecoveryResult<Vec<DistributedTx>> {
        let result = self.execute(ctx, &Query::new(&self.queries.read_all_transactions))?;
        let txs = reconstruct_transactions(ctx, &result, &self.config)?;
        tracing::info!(transactions = txs.len(), "read all distributed transactions");
        Ok(txs)
    }

    /// Reads the distributed transactions created strictly before `abandon_before`.
    ///
    /// The threshold is supplied by the caller. Creation times are stored in whole
    /// microseconds, so a sub-microsecond remainder rounds the bound up.
    pub fn unresolved_transactions(
        &self,
        ctx: &Context,
        abandon_before: DateTime<Utc>,
    ) -> RecoveryResult<Vec<TransactionMetadata>> {
        let query = Query::new(&self.queries.read_unresolved_transactions)
            .bind(TIME_CREATED_BIND, threshold_micros(&abandon_before));
        let result = self.execute(ctx, &query)?;
        let meta = reconstruct_metadata(ctx, &result, &self.config)?;
        tracing::info!(
            transactions = meta.len(),
            abandon_before = %abandon_before,
            "read unresolved transactions"
        );
        Ok(meta)
    }

    /// Reads one distributed transaction, or `None` if no participant rows exist for `dtid`.
    pub fn read_transaction(
        &self,
        ctx: &Context,
        dtid: &str,
    ) -> RecoveryResult<Option<DistributedTx>> {
        let query = Query::new(&self.queries.read_transaction).bind(DTID_BIND, dtid);
        let result = self.execute(ctx, &query)?;
        let mut txs = reconstruct_transactions(ctx, &result, &self.config)?.into_iter();
        let tx = txs.next();
        if txs.next().is_some() {
            return Err(RecoveryError::Inconsistent {
                dtid: dtid.to_string(),
                field: "dtid",
            });
        }
        tracing::debug!(dtid, found = tx.is_some(), "read distributed transaction");
        Ok(tx)
    }

    /// Counts the prepared redo logs created strictly before `older_than`.
    pub fn count_unresolved_redo(
        &self,
        ctx: &Context,
        older_than: DateTime<Utc>,
    ) -> RecoveryResult<u64> {
        let query = Query::new(&self.queries.count_unresolved_redo)
            .bind(TIME_CREATED_BIND, threshold_micros(&older_than));
        let result = self.execute(ctx, &query)?;
        let Some(row) = result.first_row() else {
            return Ok(0);
        };
        let count = row
            .decode_i64(0)
            .map_err(|e| RecoveryError::decode(None, 0, e))?;
        u64::try_from(count).map_err(|_| {
            RecoveryError::decode(
                None,
                0,
                DecodeError::InvalidInteger {
                    column: row.column_name(0),
                    value: count.to_string(),
                },
            )
        })
    }

    /// Reads all redo logs and all distributed transactions.
    ///
    /// The two reads use separate connections and are not one snapshot of storage.
    pub fn snapshot(&self, ctx: &Context) -> RecoveryResult<RecoverySnapshot> {
        let redo = self.read_all_redo(ctx)?;
        let transactions = self.read_all_transactions(ctx)?;
        Ok(RecoverySnapshot { redo, transactions })
    }

    fn execute(&self, ctx: &Context, query: &Query) -> RecoveryResult<QueryResult> {
        let max_rows = self.config.max_rows;
        let result = {
            let mut conn = PooledConnection::acquire(self.pool.as_ref(), ctx)?;
            ctx.check()?;
            conn.execute(ctx, query, max_rows)?
        };
        ctx.check()?;
        if result.len() > max_rows {
            return Err(RecoveryError::RowLimitExceeded { limit: max_rows });
        }
        tracing::debug!(query = %query, rows = result.len(), "executed recovery query");
        Ok(result)
    }
}
