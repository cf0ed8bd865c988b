//! An in-memory stand-in for the sidecar database, loaded from CSV exports.
//!
//! It answers exactly the recovery queries, evaluating their filters and ordering over the
//! loaded rows the way the database would.

use std::path::Path;
use std::sync::Arc;

use dtx_common::field::{ColumnType, Field};
use dtx_common::result::QueryResult;
use dtx_common::row::OwnedRow;
use dtx_common::value::ScalarValue;
use dtx_recovery::queries::{DTID_BIND, Queries, TIME_CREATED_BIND};
use dtx_recovery::{Connection, ConnectionPool, Context, Query, RecoveryError, RecoveryResult};
use dtx_transaction::{PersistedCode, RedoState};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{CliError, CliResult};

/// A row of the joined `redo_state`/`redo_statement` export.
#[derive(Debug, Clone, Deserialize)]
pub struct RedoRecord {
    pub dtid: String,
    pub state: String,
    pub time_created: i64,
    pub id: i64,
    pub statement: String,
}

/// A row of the joined `dt_state`/`dt_participant` export. Participants keep file order.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    pub dtid: String,
    pub state: String,
    pub time_created: i64,
    pub keyspace: String,
    pub shard: String,
}

impl RedoRecord {
    fn is_prepared(&self) -> bool {
        let state = self.state.trim();
        let decoded = match state.parse::<i64>() {
            Ok(code) => RedoState::from_code(code).ok(),
            Err(_) => RedoState::from_name(state),
        };
        decoded == Some(RedoState::Prepared)
    }
}

#[derive(Debug, Default)]
struct Tables {
    redo: Option<Vec<RedoRecord>>,
    transactions: Option<Vec<TransactionRecord>>,
}

fn load_csv<T: DeserializeOwned>(path: &Path) -> CliResult<Vec<T>> {
    let error = |source| CliError::Snapshot {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(error)
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    tables: Arc<Tables>,
    queries: Queries,
}

impl SnapshotStore {
    /// Loads the given exports; a table without an export cannot be queried.
    pub fn load(
        redo: Option<&Path>,
        transactions: Option<&Path>,
        queries: Queries,
    ) -> CliResult<Self> {
        let tables = Tables {
            redo: redo.map(load_csv::<RedoRecord>).transpose()?,
            transactions: transactions.map(load_csv::<TransactionRecord>).transpose()?,
        };
        tracing::debug!(
            redo = tables.redo.as_ref().map(Vec::len),
            transactions = tables.transactions.as_ref().map(Vec::len),
            "loaded snapshot"
        );
        Ok(Self {
            tables: Arc::new(tables),
            queries,
        })
    }

    #[inline]
    pub fn has_redo(&self) -> bool {
        self.tables.redo.is_some()
    }

    #[inline]
    pub fn has_transactions(&self) -> bool {
        self.tables.transactions.is_some()
    }
}

#[derive(Debug)]
pub struct SnapshotConn {
    tables: Arc<Tables>,
    queries: Queries,
}

impl ConnectionPool for SnapshotStore {
    type Conn = SnapshotConn;

    fn acquire(&self, ctx: &Context) -> RecoveryResult<SnapshotConn> {
        ctx.check()?;
        Ok(SnapshotConn {
            tables: self.tables.clone(),
            queries: self.queries.clone(),
        })
    }

    fn release(&self, _conn: SnapshotConn) {}
}

impl Connection for SnapshotConn {
    fn execute(
        &mut self,
        ctx: &Context,
        query: &Query,
        max_rows: usize,
    ) -> RecoveryResult<QueryResult> {
        ctx.check()?;
        let sql = query.sql();
        let result = if sql == self.queries.read_all_redo {
            self.redo_statements()?
        } else if sql == self.queries.read_all_transactions {
            self.participants(|_| true)?
        } else if sql == self.queries.read_unresolved_transactions {
            let threshold = int_bind(query, TIME_CREATED_BIND)?;
            self.unresolved(threshold)?
        } else if sql == self.queries.read_transaction {
            let dtid = string_bind(query, DTID_BIND)?;
            self.participants(|record| record.dtid == dtid)?
        } else if sql == self.queries.count_unresolved_redo {
            let threshold = int_bind(query, TIME_CREATED_BIND)?;
            self.count_prepared(threshold)?
        } else {
            return Err(RecoveryError::connection(format!(
                "snapshot store cannot answer {sql:?}"
            )));
        };
        if result.len() > max_rows {
            return Err(RecoveryError::RowLimitExceeded { limit: max_rows });
        }
        Ok(result)
    }
}

impl SnapshotConn {
    fn redo(&self) -> RecoveryResult<&[RedoRecord]> {
        self.tables
            .redo
            .as_deref()
            .ok_or_else(|| RecoveryError::connection("no redo snapshot loaded"))
    }

    fn transactions(&self) -> RecoveryResult<&[TransactionRecord]> {
        self.tables
            .transactions
            .as_deref()
            .ok_or_else(|| RecoveryError::connection("no transaction snapshot loaded"))
    }

    /// `order by t.dtid, s.id`
    fn redo_statements(&self) -> RecoveryResult<QueryResult> {
        let fields = vec![
            Field::new("dtid", ColumnType::VarBinary),
            Field::new("state", ColumnType::VarChar),
            Field::new("time_created", ColumnType::Int64),
            Field::new("id", ColumnType::Int64),
            Field::new("statement", ColumnType::VarBinary),
        ];
        let rows = self
            .redo()?
            .iter()
            .sorted_by(|a, b| a.dtid.cmp(&b.dtid).then(a.id.cmp(&b.id)))
            .map(|r| {
                OwnedRow::new(vec![
                    ScalarValue::Bytes(r.dtid.clone().into_bytes()),
                    r.state.clone().into(),
                    r.time_created.into(),
                    r.id.into(),
                    ScalarValue::Bytes(r.statement.clone().into_bytes()),
                ])
            })
            .collect();
        Ok(QueryResult::new(fields, rows))
    }

    /// `order by t.dtid, p.id`, where a participant's id is its position in the export.
    fn participants(
        &self,
        filter: impl Fn(&TransactionRecord) -> bool,
    ) -> RecoveryResult<QueryResult> {
        let fields = vec![
            Field::new("dtid", ColumnType::VarBinary),
            Field::new("state", ColumnType::VarChar),
            Field::new("time_created", ColumnType::Int64),
            Field::new("keyspace", ColumnType::VarChar),
            Field::new("shard", ColumnType::VarChar),
        ];
        let rows = self
            .transactions()?
            .iter()
            .filter(|r| filter(r))
            .sorted_by(|a, b| a.dtid.cmp(&b.dtid))
            .map(|r| {
                OwnedRow::new(vec![
                    ScalarValue::Bytes(r.dtid.clone().into_bytes()),
                    r.state.clone().into(),
                    r.time_created.into(),
                    r.keyspace.clone().into(),
                    r.shard.clone().into(),
                ])
            })
            .collect();
        Ok(QueryResult::new(fields, rows))
    }

    fn unresolved(&self, threshold: i64) -> RecoveryResult<QueryResult> {
        let fields = vec![
            Field::new("dtid", ColumnType::VarBinary),
            Field::new("state", ColumnType::VarChar),
            Field::new("keyspace", ColumnType::VarChar),
            Field::new("shard", ColumnType::VarChar),
        ];
        let rows = self
            .transactions()?
            .iter()
            .filter(|r| r.time_created < threshold)
            .sorted_by(|a, b| a.dtid.cmp(&b.dtid))
            .map(|r| {
                OwnedRow::new(vec![
                    ScalarValue::Bytes(r.dtid.clone().into_bytes()),
                    r.state.clone().into(),
                    r.keyspace.clone().into(),
                    r.shard.clone().into(),
                ])
            })
            .collect();
        Ok(QueryResult::new(fields, rows))
    }

    /// Counts `redo_state` rows, one per dtid in the joined export.
    fn count_prepared(&self, threshold: i64) -> RecoveryResult<QueryResult> {
        let count = self
            .redo()?
            .iter()
            .filter(|r| r.is_prepared() && r.time_created < threshold)
            .map(|r| r.dtid.as_str())
            .sorted()
            .dedup()
            .count();
        let count = i64::try_from(count)
            .map_err(|_| RecoveryError::connection("prepared redo count overflows"))?;
        Ok(QueryResult::new(
            vec![Field::new("count(*)", ColumnType::Int64)],
            vec![OwnedRow::new(vec![count.into()])],
        ))
    }
}

fn bind<'q>(query: &'q Query, name: &str) -> RecoveryResult<&'q ScalarValue> {
    query
        .bind_vars()
        .get(name)
        .ok_or_else(|| RecoveryError::connection(format!("missing bind variable :{name}")))
}

fn int_bind(query: &Query, name: &str) -> RecoveryResult<i64> {
    match bind(query, name)? {
        ScalarValue::Int64(v) => Ok(*v),
        other => Err(RecoveryError::connection(format!(
            "bind variable :{name} is {other}, not an integer"
        ))),
    }
}

fn string_bind(query: &Query, name: &str) -> RecoveryResult<String> {
    match bind(query, name)? {
        ScalarValue::String(v) => Ok(v.clone()),
        other => Err(RecoveryError::connection(format!(
            "bind variable :{name} is {other}, not a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use dtx_recovery::{RecoveryConfig, TwoPc};
    use tempfile::NamedTempFile;

    use super::*;

    fn csv_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    fn twopc(redo: &str, transactions: &str) -> TwoPc<SnapshotStore> {
        let redo = csv_file(redo);
        let transactions = csv_file(transactions);
        let config = RecoveryConfig::default();
        let store = SnapshotStore::load(
            Some(redo.path()),
            Some(transactions.path()),
            Queries::new(&config.sidecar_db),
        )
        .unwrap();
        TwoPc::new(Arc::new(store), config)
    }

    #[test]
    fn test_redo_sorted_like_storage() {
        let twopc = twopc(
            "dtid,state,time_created,id,statement\n\
             dtid1,Failed,1,1,stmt11\n\
             dtid0,1,1,2,stmt02\n\
             dtid0,1,1,1,stmt01\n",
            "dtid,state,time_created,keyspace,shard\n",
        );
        let logs = twopc.read_all_redo(&Context::background()).unwrap();
        assert_eq!(logs.prepared[0].queries, vec!["stmt01", "stmt02"]);
        assert_eq!(logs.failed[0].dtid, "dtid1");
    }

    #[test]
    fn test_filters() {
        let twopc = twopc(
            "dtid,state,time_created,id,statement\n\
             dtid0,1,1,1,stmt01\n\
             dtid0,1,1,2,stmt02\n\
             dtid1,0,1,1,stmt11\n\
             dtid2,1,9,1,stmt21\n",
            "dtid,state,time_created,keyspace,shard\n\
             dtid0,2,1,ks01,shard01\n\
             dtid1,3,9,ks02,shard02\n",
        );
        let ctx = Context::background();
        let threshold = chrono::DateTime::from_timestamp_micros(5).unwrap();
        assert_eq!(twopc.count_unresolved_redo(&ctx, threshold).unwrap(), 1);

        let meta = twopc.unresolved_transactions(&ctx, threshold).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].dtid, "dtid0");

        let tx = twopc.read_transaction(&ctx, "dtid1").unwrap().unwrap();
        assert_eq!(tx.participants[0].shard, "shard02");
        assert!(twopc.read_transaction(&ctx, "dtid7").unwrap().is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let twopc = twopc(
            "dtid,state,time_created,id,statement\n\
             dtid0,1,4,1,stmt01\n\
             dtid1,1,5,1,stmt11\n",
            "dtid,state,time_created,keyspace,shard\n\
             dtid0,2,4,ks01,shard01\n\
             dtid1,2,5,ks02,shard02\n",
        );
        let ctx = Context::background();
        let threshold = chrono::DateTime::from_timestamp_micros(5).unwrap();
        assert_eq!(twopc.count_unresolved_redo(&ctx, threshold).unwrap(), 1);
        let meta = twopc.unresolved_transactions(&ctx, threshold).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].dtid, "dtid0");
    }

    #[test]
    fn test_sub_micro_threshold_keeps_older_rows() {
        let twopc = twopc(
            "dtid,state,time_created,id,statement\n\
             dtid0,1,7,1,stmt01\n",
            "dtid,state,time_created,keyspace,shard\n\
             dtid0,2,7,ks01,shard01\n",
        );
        let ctx = Context::background();
        let threshold = chrono::DateTime::from_timestamp_nanos(7_999);
        assert_eq!(twopc.count_unresolved_redo(&ctx, threshold).unwrap(), 1);
        let meta = twopc.unresolved_transactions(&ctx, threshold).unwrap();
        assert_eq!(meta.len(), 1);

        let threshold = chrono::DateTime::from_timestamp_nanos(7_000);
        assert_eq!(twopc.count_unresolved_redo(&ctx, threshold).unwrap(), 0);
        assert!(twopc.unresolved_transactions(&ctx, threshold).unwrap().is_empty());
    }

    #[test]
    fn test_custom_sidecar_db() {
        let redo = csv_file("dtid,state,time_created,id,statement\ndtid0,1,1,1,stmt01\n");
        let config = RecoveryConfig::default().with_sidecar_db("sidecar");
        let store =
            SnapshotStore::load(Some(redo.path()), None, Queries::new(&config.sidecar_db)).unwrap();
        assert!(store.has_redo());
        assert!(!store.has_transactions());
        let twopc = TwoPc::new(Arc::new(store), config);
        let logs = twopc.read_all_redo(&Context::background()).unwrap();
        assert_eq!(logs.prepared.len(), 1);
    }

    #[test]
    fn test_missing_table() {
        let store = SnapshotStore::load(None, None, Queries::new("_vt")).unwrap();
        assert!(!store.has_redo());
        let twopc = TwoPc::new(Arc::new(store), RecoveryConfig::default());
        let err = twopc.read_all_redo(&Context::background()).unwrap_err();
        assert!(matches!(err, RecoveryError::Connection(_)));
    }
}
