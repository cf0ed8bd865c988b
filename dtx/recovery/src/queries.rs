//! Query text for the 2PC tables.
//!
//! Tables, all in the sidecar database:
//! - `redo_state(dtid, state, time_created)` and `redo_statement(dtid, id, statement)`: the
//!   shard-local redo logs.
//! - `dt_state(dtid, state, time_created)` and `dt_participant(dtid, id, keyspace, shard)`: the
//!   coordinator's distributed-transaction records.
//!
//! `time_created` is stored as microseconds since the Unix epoch.

use dtx_transaction::{PersistedCode, RedoState};

pub const TIME_CREATED_BIND: &str = "time_created";
pub const DTID_BIND: &str = "dtid";

/// Columns of [`Queries::read_all_redo`].
pub(crate) mod redo_columns {
    pub const DTID: usize = 0;
    pub const STATE: usize = 1;
    pub const TIME_CREATED: usize = 2;
    pub const SEQUENCE: usize = 3;
    pub const STATEMENT: usize = 4;
}

/// Columns of [`Queries::read_all_transactions`] and [`Queries::read_transaction`].
pub(crate) mod transaction_columns {
    pub const DTID: usize = 0;
    pub const STATE: usize = 1;
    pub const TIME_CREATED: usize = 2;
    pub const KEYSPACE: usize = 3;
    pub const SHARD: usize = 4;
}

/// Columns of [`Queries::read_unresolved_transactions`].
pub(crate) mod unresolved_columns {
    pub const DTID: usize = 0;
    pub const STATE: usize = 1;
    pub const KEYSPACE: usize = 2;
    pub const SHARD: usize = 3;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queries {
    pub read_all_redo: String,
    pub read_all_transactions: String,
    /// Bound by `:time_created`.
    pub read_unresolved_transactions: String,
    /// Bound by `:dtid`.
    pub read_transaction: String,
    /// Bound by `:time_created`.
    pub count_unresolved_redo: String,
}

impl Queries {
    pub fn new(sidecar_db: &str) -> Self {
        let db = sidecar_db;
        Self {
            read_all_redo: format!(
                "select t.dtid, t.state, t.time_created, s.id, s.statement \
                 from {db}.redo_state t join {db}.redo_statement s on t.dtid = s.dtid \
                 order by t.dtid, s.id"
            ),
            read_all_transactions: format!(
                "select t.dtid, t.state, t.time_created, p.keyspace, p.shard \
                 from {db}.dt_state t join {db}.dt_participant p on t.dtid = p.dtid \
                 order by t.dtid, p.id"
            ),
            read_unresolved_transactions: format!(
                "select t.dtid, t.state, p.keyspace, p.shard \
                 from {db}.dt_state t join {db}.dt_participant p on t.dtid = p.dtid \
                 where time_created < :{TIME_CREATED_BIND} \
                 order by t.dtid, p.id"
            ),
            read_transaction: format!(
                "select t.dtid, t.state, t.time_created, p.keyspace, p.shard \
                 from {db}.dt_state t join {db}.dt_participant p on t.dtid = p.dtid \
                 where t.dtid = :{DTID_BIND} \
                 order by p.id"
            ),
            count_unresolved_redo: format!(
                "select count(*) from {db}.redo_state \
                 where state = {} and time_created < :{TIME_CREATED_BIND}",
                RedoState::Prepared.code()
            ),
        }
    }
}
