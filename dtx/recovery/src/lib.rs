//! Recovery reads of two-phase commit.
//!
//! After a crash or failover, a coordinator rebuilds its view of in-flight distributed
//! transactions from the durable 2PC tables through [`TwoPc`]:
//! - [`TwoPc::read_all_redo`]: shard-local redo logs, split into prepared and failed.
//! - [`TwoPc::read_all_transactions`]: the coordinator's transaction records.
//! - [`TwoPc::unresolved_transactions`]: records older than an abandonment threshold, in
//!   wire form.
//!
//! Rows of one transaction may be interleaved with rows of others; they are regrouped by dtid
//! in the order each dtid first appears. Every call either returns its complete result or an
//! error, never a partial one, and nothing is retried internally.

pub mod config;
pub mod context;
pub mod distributed;
pub mod error;
mod group;
pub mod pool;
pub mod queries;
pub mod redo;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod twopc;

use dtx_common::error::DecodeError;
use dtx_common::row::RowRef;

pub use crate::config::{Consistency, Grouping, RecoveryConfig};
pub use crate::context::Context;
pub use crate::error::{CancelReason, RecoveryError, RecoveryResult};
pub use crate::pool::{Connection, ConnectionPool, PooledConnection, Query};
pub use crate::redo::RedoLogs;
pub use crate::twopc::{RecoverySnapshot, TwoPc};

/// Rows scanned between two cancellation checks.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Decodes the dtid of `row`, which every grouped row must carry.
pub(crate) fn decode_dtid(row: &RowRef<'_>, index: usize) -> RecoveryResult<String> {
    let dtid = row
        .decode_string(index)
        .map_err(|e| RecoveryError::decode(None, row.row_index(), e))?;
    if dtid.is_empty() {
        return Err(RecoveryError::decode(
            None,
            row.row_index(),
            DecodeError::EmptyDtid,
        ));
    }
    Ok(dtid)
}

/// Applies the consistency policy to rows of `dtid` disagreeing on `field`.
pub(crate) fn on_mismatch(
    consistency: Consistency,
    dtid: &str,
    field: &'static str,
) -> RecoveryResult<()> {
    match consistency {
        Consistency::Strict => Err(RecoveryError::Inconsistent {
            dtid: dtid.to_string(),
            field,
        }),
        Consistency::Permissive => {
            tracing::warn!(dtid, field, "rows of one dtid disagree, keeping the first value");
            Ok(())
        }
    }
}
