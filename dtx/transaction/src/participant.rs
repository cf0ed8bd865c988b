use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One shard taking part in a distributed transaction.
///
/// Participants are kept in the order they were read and are never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub keyspace: SmolStr,
    pub shard: SmolStr,
}

impl Participant {
    #[inline]
    pub fn new(keyspace: impl Into<SmolStr>, shard: impl Into<SmolStr>) -> Self {
        Self {
            keyspace: keyspace.into(),
            shard: shard.into(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.keyspace, self.shard)
    }
}
