//! Stable block identity
//!
//! Blocks live in an arena keyed by id; ordering comes from the body and
//! cell index vectors, never from the id itself. Ids are random UUIDs so
//! merged documents cannot collide, and they order deterministically so
//! they can key sorted collections. On the wire an id is its UUID string,
//! which keeps it usable as a JSON object key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Arena key for a block. Stable across edits and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(Uuid);

impl BlockId {
    /// Mint a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BlockId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for BlockId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BlockId> for Uuid {
    fn from(id: BlockId) -> Self {
        id.0
    }
}
