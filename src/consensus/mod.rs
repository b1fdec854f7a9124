//! Consensus module: the per-node three-phase state machine.
//!
//! Public surface:
//! - `ConsensusEngine`: drives one round at a time through
//!   PRE-PREPARE -> PREPARE -> COMMIT and appends the agreed block
//! - `QuorumTracker`: distinct-endorser counting per phase and block hash
//! - `types`: phase messages and handler statuses
//!
//! The engine is an explicitly owned instance injected wherever it is
//! needed, so any number of engines can coexist in one process (the cluster
//! tests run four).

pub mod quorum;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::ledger::{Block, BlockHash, Ledger, LedgerError};
use crate::utils::metrics::{counters, METRICS};
use crate::voting::{unix_millis, Vote};

pub use quorum::{Phase, QuorumTracker};
pub use types::{HandlerStatus, NodeId, PhaseMessage, View};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    /// Empty blocks are forbidden so that every committed block is
    /// attributable to real input.
    #[error("cannot build a proposal from an empty vote batch")]
    EmptyBatch,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Outbound side of the transport collaborator.
///
/// `broadcast` must deliver best-effort to every peer other than self and
/// must not block: the engine never awaits peer acknowledgment, and quorum
/// math already tolerates up to f silent peers.
pub trait PhaseBroadcaster: Send + Sync + 'static {
    fn broadcast(&self, msg: PhaseMessage);
}

/// Mutable state of the round in flight. Everything lives behind one lock so
/// that a quorum-threshold crossing and its single resulting broadcast are
/// atomic even under concurrent message delivery.
struct RoundState {
    /// The block currently undergoing consensus, at most one at a time.
    pending_block: Option<Block>,
    tracker: QuorumTracker,
    /// Hashes whose COMMIT broadcast already fired; later PREPAREs for the
    /// same hash are recorded but never re-broadcast.
    commit_fired: HashSet<BlockHash>,
}

/// The per-node consensus state machine.
pub struct ConsensusEngine<N: PhaseBroadcaster> {
    node_id: NodeId,
    view: View,
    state: Mutex<RoundState>,
    ledger: Arc<Mutex<Ledger>>,
    net: Arc<N>,
}

impl<N: PhaseBroadcaster> ConsensusEngine<N> {
    /// `cluster_size` is the total node count n (self included), from which
    /// the fault bound f = (n - 1) / 3 is derived.
    pub fn new(node_id: NodeId, cluster_size: usize, ledger: Arc<Mutex<Ledger>>, net: Arc<N>) -> Self {
        Self {
            node_id,
            view: 0,
            state: Mutex::new(RoundState {
                pending_block: None,
                tracker: QuorumTracker::new(cluster_size),
                commit_fired: HashSet::new(),
            }),
            ledger,
            net,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Whether a round is currently in flight. Intake logic uses this to
    /// defer proposing while a block is still being agreed on.
    pub async fn is_round_active(&self) -> bool {
        self.state.lock().await.pending_block.is_some()
    }

    /// Hash of the block currently pending, if any.
    pub async fn pending_hash(&self) -> Option<BlockHash> {
        self.state
            .lock()
            .await
            .pending_block
            .as_ref()
            .map(|b| b.hash.clone())
    }

    /// Build a candidate block extending the current chain tip from a
    /// non-empty batch of votes, in submission order.
    pub async fn build_proposal(&self, votes: Vec<Vote>) -> Result<Block, ConsensusError> {
        if votes.is_empty() {
            return Err(ConsensusError::EmptyBatch);
        }
        let ledger = self.ledger.lock().await;
        let tip = ledger.last_block()?;
        Ok(Block::new(
            tip.index + 1,
            votes,
            unix_millis(),
            tip.hash.clone(),
        ))
    }

    /// Primary path: build a proposal, broadcast PRE-PREPARE to the peers,
    /// and adopt it locally (which issues this node's own PREPARE).
    pub async fn propose(&self, votes: Vec<Vote>) -> Result<Block, ConsensusError> {
        let block = self.build_proposal(votes).await?;
        info!(
            "node {}: proposing block {} ({} votes, hash {})",
            self.node_id,
            block.index,
            block.transactions.len(),
            short(&block.hash),
        );
        self.net.broadcast(PhaseMessage::PrePrepare {
            view: self.view,
            block: block.clone(),
            sender: self.node_id,
        });
        self.handle_pre_prepare(self.view, block.clone(), self.node_id)
            .await;
        Ok(block)
    }

    /// Dispatch an inbound phase message to its handler.
    pub async fn handle_message(&self, msg: PhaseMessage) -> HandlerStatus {
        match msg {
            PhaseMessage::PrePrepare { view, block, sender } => {
                self.handle_pre_prepare(view, block, sender).await
            }
            PhaseMessage::Prepare {
                view,
                block_hash,
                sender,
            } => self.handle_prepare(view, block_hash, sender).await,
            PhaseMessage::Commit {
                view,
                block_hash,
                sender,
            } => self.handle_commit(view, block_hash, sender).await,
        }
    }

    /// IDLE -> PRE_PREPARED: adopt the proposed block and broadcast PREPARE.
    ///
    /// The block's hash is re-derived from its contents before adoption; a
    /// mismatch means corruption or forgery and the proposal is refused.
    pub async fn handle_pre_prepare(
        &self,
        view: View,
        block: Block,
        sender: NodeId,
    ) -> HandlerStatus {
        METRICS.inc(counters::PRE_PREPARES_RECEIVED);
        self.check_view(view);
        if block.hash != block.content_hash() {
            warn!(
                "node {}: refusing PRE-PREPARE from {}: claimed hash {} does not match contents",
                self.node_id,
                sender,
                short(&block.hash),
            );
            return HandlerStatus::Rejected;
        }

        let mut st = self.state.lock().await;
        if let Some(prev) = &st.pending_block {
            if prev.hash != block.hash {
                warn!(
                    "node {}: replacing pending block {} with new proposal {}",
                    self.node_id,
                    short(&prev.hash),
                    short(&block.hash),
                );
            }
        }
        debug!(
            "node {}: adopted PRE-PREPARE from {} for block {} (hash {})",
            self.node_id,
            sender,
            block.index,
            short(&block.hash),
        );
        let block_hash = block.hash.clone();
        st.pending_block = Some(block);
        // broadcast under the lock: adoption and the PREPARE must be atomic
        self.net.broadcast(PhaseMessage::Prepare {
            view: self.view,
            block_hash,
            sender: self.node_id,
        });
        HandlerStatus::PrepareBroadcasted
    }

    /// PRE_PREPARED -> PREPARED: record the endorsement; the first time the
    /// 2f threshold is crossed for a hash, broadcast COMMIT exactly once.
    ///
    /// When peer COMMITs arrived ahead of the proposal, this node's own
    /// commit endorsement can be the one that completes the 2f + 1 commit
    /// quorum; the block is then appended immediately and the status is
    /// `BlockCommitted` rather than `CommitBroadcasted`.
    pub async fn handle_prepare(
        &self,
        view: View,
        block_hash: BlockHash,
        sender: NodeId,
    ) -> HandlerStatus {
        METRICS.inc(counters::PREPARES_RECEIVED);
        self.check_view(view);

        let mut st = self.state.lock().await;
        let count = st.tracker.record(Phase::Prepare, &block_hash, sender);
        debug!(
            "node {}: PREPARE from {} for {} ({}/{})",
            self.node_id,
            sender,
            short(&block_hash),
            count,
            st.tracker.threshold(Phase::Prepare),
        );

        if st.tracker.has_quorum(Phase::Prepare, &block_hash)
            && st.commit_fired.insert(block_hash.clone())
        {
            info!(
                "node {}: prepared on {} -> broadcasting COMMIT",
                self.node_id,
                short(&block_hash),
            );
            self.net.broadcast(PhaseMessage::Commit {
                view: self.view,
                block_hash: block_hash.clone(),
                sender: self.node_id,
            });
            // our own COMMIT is never delivered back to us; count it here
            st.tracker.record(Phase::Commit, &block_hash, self.node_id);
            if let Some(status) = self.try_commit(&mut st, &block_hash).await {
                return status;
            }
            return HandlerStatus::CommitBroadcasted;
        }
        HandlerStatus::AwaitingPrepares
    }

    /// PREPARED -> COMMITTED: record the endorsement; once 2f + 1 distinct
    /// nodes have committed to the pending block's hash, append it to the
    /// ledger and reset the round.
    pub async fn handle_commit(
        &self,
        view: View,
        block_hash: BlockHash,
        sender: NodeId,
    ) -> HandlerStatus {
        METRICS.inc(counters::COMMITS_RECEIVED);
        self.check_view(view);

        let mut st = self.state.lock().await;
        let count = st.tracker.record(Phase::Commit, &block_hash, sender);
        debug!(
            "node {}: COMMIT from {} for {} ({}/{})",
            self.node_id,
            sender,
            short(&block_hash),
            count,
            st.tracker.threshold(Phase::Commit),
        );

        match self.try_commit(&mut st, &block_hash).await {
            Some(status) => status,
            None => HandlerStatus::AwaitingCommits,
        }
    }

    /// Append the pending block if commit quorum holds for `block_hash` and
    /// it matches the block in flight, then clear round state. A quorum for
    /// a hash with no matching pending block is a stale no-op.
    async fn try_commit(
        &self,
        st: &mut RoundState,
        block_hash: &BlockHash,
    ) -> Option<HandlerStatus> {
        if !st.tracker.has_quorum(Phase::Commit, block_hash) {
            return None;
        }
        match &st.pending_block {
            Some(pending) if pending.hash == *block_hash => {}
            _ => {
                warn!(
                    "node {}: commit quorum for {} with no matching pending block, skipping",
                    self.node_id,
                    short(block_hash),
                );
                METRICS.inc(counters::STALE_ENDORSEMENTS);
                return None;
            }
        }

        let block = st.pending_block.take().expect("pending block checked above");
        let index = block.index;
        let appended = self.ledger.lock().await.append(block).map(|_| ());
        st.tracker.clear(block_hash);
        st.commit_fired.remove(block_hash);

        match appended {
            Ok(()) => {
                METRICS.inc(counters::BLOCKS_COMMITTED);
                info!(
                    "node {}: committed block {} (hash {}), round reset",
                    self.node_id,
                    index,
                    short(block_hash),
                );
                Some(HandlerStatus::BlockCommitted)
            }
            Err(e) => {
                // the chain is untouched on rejection; the round is still
                // over for this hash
                error!("node {}: ledger refused committed block: {}", self.node_id, e);
                None
            }
        }
    }

    fn check_view(&self, view: View) {
        if view != self.view {
            debug!(
                "node {}: message view {} differs from local view {} (no view change in this protocol)",
                self.node_id, view, self.view,
            );
        }
    }
}

/// Log label for a hash. Hashes normally arrive as lowercase hex, but the
/// wire accepts any UTF-8 string, so truncation must respect char
/// boundaries.
fn short(hash: &str) -> &str {
    let mut end = hash.len().min(8);
    while !hash.is_char_boundary(end) {
        end -= 1;
    }
    &hash[..end]
}
