//! Vote records and the intake pool.
//!
//! A `Vote` is the only transaction payload the ledger carries. Votes never
//! stand alone on the chain; they are batched into block proposals by the
//! primary node.

pub mod pool;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub use pool::VotePool;

/// A single cast vote. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub voter_id: String,
    pub candidate_id: String,
    /// Milliseconds since the Unix epoch, stamped at intake.
    pub timestamp: u64,
}

impl Vote {
    pub fn new(voter_id: impl Into<String>, candidate_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            candidate_id: candidate_id.into(),
            timestamp: unix_millis(),
        }
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
