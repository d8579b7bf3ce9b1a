#![forbid(unsafe_code)]

//! Shared identifier types and the crate error enum.

use std::fmt;

/// Identifier of one page in the index file. Child pointers stored inside
/// internal entries are 32-bit page indices; sibling pointers are 64-bit with
/// `-1` meaning "no sibling".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to one stored record: the value side of every leaf entry.
///
/// Equality is exact; removal matches a record id verbatim. The pair encodes
/// to a fixed 10 bytes on the page (`cluster_id:i16` + `cluster_position:i64`).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RecordId {
    /// Cluster (segment) the record lives in.
    pub cluster_id: i16,
    /// Position of the record inside its cluster.
    pub cluster_position: i64,
}

impl RecordId {
    /// Creates a record id from its cluster and position parts.
    pub const fn new(cluster_id: i16, cluster_position: i64) -> Self {
        Self {
            cluster_id,
            cluster_position,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster_id, self.cluster_position)
    }
}

/// Errors surfaced by this crate.
///
/// Capacity exhaustion is never an error: insertion primitives return `false`
/// and the caller splits the bucket. Contract violations (wrong node kind,
/// index out of range) are assertion failures, not `Err` values.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Stored bytes do not decode to a valid value.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// An argument violates a documented precondition.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
