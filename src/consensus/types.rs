use serde::{Deserialize, Serialize};

use crate::ledger::{Block, BlockHash};

/// Stable identifier of a node within the fixed cluster.
pub type NodeId = u64;

/// Round/epoch counter naming the acting primary. Not rotated in this
/// design; carried on every message for forward compatibility.
pub type View = u64;

/// One message of the three-phase protocol.
///
/// PRE-PREPARE carries the full proposed block; PREPARE and COMMIT carry
/// only the block hash being endorsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PhaseMessage {
    PrePrepare {
        view: View,
        block: Block,
        sender: NodeId,
    },
    Prepare {
        view: View,
        block_hash: BlockHash,
        sender: NodeId,
    },
    Commit {
        view: View,
        block_hash: BlockHash,
        sender: NodeId,
    },
}

impl PhaseMessage {
    pub fn sender(&self) -> NodeId {
        match self {
            PhaseMessage::PrePrepare { sender, .. }
            | PhaseMessage::Prepare { sender, .. }
            | PhaseMessage::Commit { sender, .. } => *sender,
        }
    }
}

/// Outcome a handler reports to its caller. Handlers never raise past the
/// engine boundary for well-typed input; problems surface as statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandlerStatus {
    /// PRE-PREPARE adopted; a PREPARE broadcast was issued.
    PrepareBroadcasted,
    /// PRE-PREPARE refused: the block's claimed hash does not match its
    /// contents.
    Rejected,
    /// Endorsement recorded, prepare quorum not yet reached.
    AwaitingPrepares,
    /// Prepare quorum crossed; a COMMIT broadcast was issued.
    CommitBroadcasted,
    /// Endorsement recorded, commit quorum not yet reached (or reached for
    /// a hash with no matching pending block).
    AwaitingCommits,
    /// Commit quorum crossed; the block was appended to the ledger.
    BlockCommitted,
}
