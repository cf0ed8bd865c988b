//! Seams to the database layer the recovery reads go through.
//!
//! The pool and the connections behind it belong to the embedding service. Recovery only
//! borrows one connection per call, and [`PooledConnection`] hands it back on drop, so it is
//! released on every exit path, errors and cancellation included.

use std::collections::BTreeMap;
use std::fmt;

use dtx_common::result::QueryResult;
use dtx_common::value::ScalarValue;
use itertools::Itertools;

use crate::context::Context;
use crate::error::{RecoveryError, RecoveryResult};

/// A query string and its bind variables, written as `:name` in the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    bind_vars: BTreeMap<String, ScalarValue>,
}

impl Query {
    #[inline]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bind_vars: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.bind_vars.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[inline]
    pub fn bind_vars(&self) -> &BTreeMap<String, ScalarValue> {
        &self.bind_vars
    }

    /// The query text with every bind variable substituted by its literal.
    pub fn render(&self) -> String {
        // Longest names first, so `:a` never clobbers the prefix of `:ab`.
        self.bind_vars
            .iter()
            .sorted_by_key(|(name, _)| std::cmp::Reverse(name.len()))
            .fold(self.sql.clone(), |sql, (name, value)| {
                sql.replace(&format!(":{name}"), &literal(value))
            })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

fn literal(value: &ScalarValue) -> String {
    match value {
        ScalarValue::String(_) | ScalarValue::Bytes(_) => {
            format!("'{}'", value.to_string().replace('\'', "''"))
        }
        other => other.to_string(),
    }
}

/// A database connection able to run one query at a time.
pub trait Connection: Send {
    /// Runs `query` and returns at most `max_rows` rows.
    ///
    /// Implementations should fail with [`RecoveryError::RowLimitExceeded`] rather than truncate,
    /// and with [`RecoveryError::Cancelled`] if `ctx` is done before the result is complete.
    fn execute(
        &mut self,
        ctx: &Context,
        query: &Query,
        max_rows: usize,
    ) -> RecoveryResult<QueryResult>;
}

/// A pool of connections owned by the embedding service.
pub trait ConnectionPool: Send + Sync {
    type Conn: Connection;

    /// Takes a connection out of the pool, waiting no longer than `ctx` allows.
    fn acquire(&self, ctx: &Context) -> RecoveryResult<Self::Conn>;

    /// Returns a connection taken by [`ConnectionPool::acquire`].
    fn release(&self, conn: Self::Conn);
}

/// A connection borrowed from a [`ConnectionPool`], released when dropped.
pub struct PooledConnection<'p, P: ConnectionPool> {
    pool: &'p P,
    conn: Option<P::Conn>,
}

impl<'p, P: ConnectionPool> PooledConnection<'p, P> {
    pub fn acquire(pool: &'p P, ctx: &Context) -> RecoveryResult<Self> {
        ctx.check()?;
        let conn = pool.acquire(ctx)?;
        Ok(Self {
            pool,
            conn: Some(conn),
        })
    }

    pub fn execute(
        &mut self,
        ctx: &Context,
        query: &Query,
        max_rows: usize,
    ) -> RecoveryResult<QueryResult> {
        match self.conn.as_mut() {
            Some(conn) => conn.execute(ctx, query, max_rows),
            None => Err(RecoveryError::connection("connection already released")),
        }
    }
}

impl<P: ConnectionPool> Drop for PooledConnection<'_, P> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let query = Query::new("select * from t where a < :a and ab = :ab and s = :s")
            .bind("a", 10i64)
            .bind("ab", 3i64)
            .bind("s", "it's");
        assert_eq!(
            query.render(),
            "select * from t where a < 10 and ab = 3 and s = 'it''s'"
        );
    }

    #[test]
    fn test_render_without_binds() {
        let query = Query::new("select 1");
        assert_eq!(query.to_string(), "select 1");
        assert!(query.bind_vars().is_empty());
    }
}
