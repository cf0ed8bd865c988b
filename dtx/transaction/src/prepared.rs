use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shard-local redo log rebuilt from storage: the statements to replay for one dtid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTx {
    pub dtid: String,
    /// Statements in ascending sequence order.
    pub queries: Vec<String>,
    /// When the redo log was created.
    pub time: DateTime<Utc>,
}

impl PreparedTx {
    #[inline]
    pub fn new(dtid: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            dtid: dtid.into(),
            queries: Vec::new(),
            time,
        }
    }

    #[inline]
    pub fn with_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queries = queries.into_iter().map(Into::into).collect();
        self
    }
}
