//! A canned-result database for exercising recovery without storage.
//!
//! Results are registered by exact query text, or by a substring of it, and matched against
//! the query with its bind variables substituted.

use std::collections::HashMap;
use std::sync::Arc;

use dtx_common::result::QueryResult;
use parking_lot::Mutex;

use crate::context::Context;
use crate::error::{RecoveryError, RecoveryResult};
use crate::pool::{Connection, ConnectionPool, Query};

#[derive(Debug, Default)]
struct FakeState {
    exact: HashMap<String, QueryResult>,
    patterns: Vec<(String, QueryResult)>,
    failing: Vec<(String, String)>,
    acquire_error: Option<String>,
    cancel_on_query: bool,
    executed: Vec<String>,
    acquired: usize,
    released: usize,
}

impl FakeState {
    fn lookup(&self, sql: &str) -> Option<&QueryResult> {
        self.exact.get(sql).or_else(|| {
            self.patterns
                .iter()
                .find(|(pattern, _)| sql.contains(pattern.as_str()))
                .map(|(_, result)| result)
        })
    }
}

/// A fake pool whose connections answer from registered results.
///
/// Clones share the registered results and the counters.
#[derive(Debug, Clone, Default)]
pub struct FakeDb {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `sql`, matched exactly after bind substitution, with `result`.
    pub fn add_query(&self, sql: impl Into<String>, result: QueryResult) {
        self.state.lock().exact.insert(sql.into(), result);
    }

    /// Answers every query containing `pattern` with `result`.
    ///
    /// Exact registrations win; among patterns the first registered wins.
    pub fn add_query_pattern(&self, pattern: impl Into<String>, result: QueryResult) {
        self.state.lock().patterns.push((pattern.into(), result));
    }

    /// Makes every later acquire fail with `message`.
    pub fn fail_acquire(&self, message: impl Into<String>) {
        self.state.lock().acquire_error = Some(message.into());
    }

    /// Makes every query containing `pattern` fail with `message`.
    pub fn fail_query(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.state
            .lock()
            .failing
            .push((pattern.into(), message.into()));
    }

    /// Cancels the caller's context while the next queries run, as a caller aborting midway.
    pub fn cancel_during_query(&self) {
        self.state.lock().cancel_on_query = true;
    }

    /// Rendered text of every query executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().acquired
    }

    pub fn released(&self) -> usize {
        self.state.lock().released
    }

    /// Connections acquired and not yet released.
    pub fn in_use(&self) -> usize {
        let state = self.state.lock();
        state.acquired - state.released
    }
}

#[derive(Debug)]
pub struct FakeConn {
    state: Arc<Mutex<FakeState>>,
}

impl Connection for FakeConn {
    fn execute(
        &mut self,
        ctx: &Context,
        query: &Query,
        max_rows: usize,
    ) -> RecoveryResult<QueryResult> {
        let sql = query.render();
        let mut state = self.state.lock();
        state.executed.push(sql.clone());
        if state.cancel_on_query {
            ctx.cancel();
        }
        ctx.check()?;
        if let Some((_, message)) = state
            .failing
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Err(RecoveryError::connection(message.clone()));
        }
        let result = state
            .lookup(&sql)
            .cloned()
            .ok_or_else(|| RecoveryError::connection(format!("query {sql:?} is not registered")))?;
        if result.len() > max_rows {
            return Err(RecoveryError::RowLimitExceeded { limit: max_rows });
        }
        Ok(result)
    }
}

impl ConnectionPool for FakeDb {
    type Conn = FakeConn;

    fn acquire(&self, ctx: &Context) -> RecoveryResult<FakeConn> {
        ctx.check()?;
        let mut state = self.state.lock();
        if let Some(message) = &state.acquire_error {
            return Err(RecoveryError::connection(message.clone()));
        }
        state.acquired += 1;
        Ok(FakeConn {
            state: self.state.clone(),
        })
    }

    fn release(&self, _conn: FakeConn) {
        self.state.lock().released += 1;
    }
}

#[cfg(test)]
mod tests {
    use dtx_common::{query_result, row};

    use super::*;
    use crate::pool::PooledConnection;

    #[test]
    fn test_exact_before_pattern() {
        let db = FakeDb::new();
        db.add_query_pattern("from t", query_result!(row![1i64]));
        db.add_query("select a from t where a < 5", query_result!(row![2i64]));

        let ctx = Context::background();
        let mut conn = PooledConnection::acquire(&db, &ctx).unwrap();
        let exact = conn
            .execute(&ctx, &Query::new("select a from t where a < :a").bind("a", 5i64), 10)
            .unwrap();
        assert_eq!(exact, query_result!(row![2i64]));
        let pattern = conn.execute(&ctx, &Query::new("select b from t"), 10).unwrap();
        assert_eq!(pattern, query_result!(row![1i64]));
        drop(conn);

        assert_eq!(db.acquired(), 1);
        assert_eq!(db.released(), 1);
        assert_eq!(
            db.executed(),
            vec!["select a from t where a < 5", "select b from t"]
        );
    }

    #[test]
    fn test_unregistered_query() {
        let db = FakeDb::new();
        let ctx = Context::background();
        let mut conn = db.acquire(&ctx).unwrap();
        let err = conn.execute(&ctx, &Query::new("select 1"), 10).unwrap_err();
        assert!(matches!(err, RecoveryError::Connection(_)));
        db.release(conn);
        assert_eq!(db.in_use(), 0);
    }

    #[test]
    fn test_row_limit() {
        let db = FakeDb::new();
        db.add_query("select 1", query_result!(row![1i64], row![2i64]));
        let ctx = Context::background();
        let mut conn = db.acquire(&ctx).unwrap();
        let err = conn.execute(&ctx, &Query::new("select 1"), 1).unwrap_err();
        assert!(matches!(err, RecoveryError::RowLimitExceeded { limit: 1 }));
    }
}
