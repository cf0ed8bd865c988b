#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dtx_common::result::QueryResult;
use dtx_recovery::testing::FakeDb;
use dtx_recovery::{RecoveryConfig, TwoPc};

pub const REDO_NAMES: &str = "dtid|state|time_created|id|statement";
pub const REDO_TYPES: &str = "VARBINARY|VARBINARY|INT64|INT64|VARBINARY";
pub const TRANSACTION_NAMES: &str = "dtid|state|time_created|keyspace|shard";
pub const TRANSACTION_TYPES: &str = "VARBINARY|INT64|INT64|VARBINARY|VARBINARY";
pub const UNRESOLVED_NAMES: &str = "dtid|state|keyspace|shard";
pub const UNRESOLVED_TYPES: &str = "VARBINARY|INT64|VARBINARY|VARBINARY";

pub fn create_twopc() -> (Arc<FakeDb>, TwoPc<FakeDb>) {
    create_twopc_with(RecoveryConfig::default())
}

pub fn create_twopc_with(config: RecoveryConfig) -> (Arc<FakeDb>, TwoPc<FakeDb>) {
    let db = Arc::new(FakeDb::new());
    let twopc = TwoPc::new(db.clone(), config);
    (db, twopc)
}

pub fn redo_result(rows: &[&str]) -> QueryResult {
    QueryResult::from_pipe_text(REDO_NAMES, REDO_TYPES, rows).unwrap()
}

pub fn transaction_result(rows: &[&str]) -> QueryResult {
    QueryResult::from_pipe_text(TRANSACTION_NAMES, TRANSACTION_TYPES, rows).unwrap()
}

pub fn unresolved_result(rows: &[&str]) -> QueryResult {
    QueryResult::from_pipe_text(UNRESOLVED_NAMES, UNRESOLVED_TYPES, rows).unwrap()
}

/// The instant stored as `micros` since the epoch.
pub fn at(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap()
}
