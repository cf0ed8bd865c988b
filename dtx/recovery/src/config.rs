use serde::{Deserialize, Serialize};

pub const DEFAULT_SIDECAR_DB: &str = "_vt";
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// How rows are gathered into per-dtid groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// One pass; a group stays open only while consecutive rows share its dtid. A dtid that
    /// reappears after another one opens a second group. Storage returns rows ordered by dtid,
    /// so this only happens on out-of-order reads.
    #[default]
    Consecutive,
    /// Every row of a dtid joins the group opened by its first row, wherever it appears.
    Merged,
}

/// What to do when rows of one dtid disagree on a value that should be shared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Fail the call.
    #[default]
    Strict,
    /// Keep the first row's value and log a warning.
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Database holding the 2PC tables.
    pub sidecar_db: String,
    /// Largest result a single recovery query may return.
    pub max_rows: usize,
    pub grouping: Grouping,
    pub consistency: Consistency,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            sidecar_db: DEFAULT_SIDECAR_DB.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
            grouping: Grouping::default(),
            consistency: Consistency::default(),
        }
    }
}

impl RecoveryConfig {
    #[inline]
    pub fn with_sidecar_db(mut self, sidecar_db: impl Into<String>) -> Self {
        self.sidecar_db = sidecar_db.into();
        self
    }

    #[inline]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    #[inline]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    #[inline]
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }
}
