use thiserror::Error;

use crate::consensus::ConsensusError;
use crate::ledger::LedgerError;
use crate::voting::pool::VotePoolError;

/// Top-level error for node wiring and the RPC boundary.
///
/// The consensus core never escalates past its own status values; this type
/// exists so the outer layers can carry module errors through one surface.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("vote intake error: {0}")]
    Intake(#[from] VotePoolError),
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, NodeError>;
