//! QuorumTracker: per-phase, per-hash sets of distinct endorsing nodes.

use std::collections::{HashMap, HashSet};

use crate::consensus::types::NodeId;
use crate::ledger::BlockHash;

/// The two quorum-counted phases. PRE-PREPARE is not counted; it is a
/// single adoption step driven by the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Commit,
}

/// Counts distinct endorsers per (phase, block hash) and answers quorum
/// queries against the cluster's fault bound.
///
/// Thresholds: `2f` for PREPARE and `2f + 1` for COMMIT, with
/// `f = (n - 1) / 3`. 2f+1 is the smallest size at which any two quorums
/// intersect in at least one honest node when at most f nodes are faulty.
#[derive(Debug)]
pub struct QuorumTracker {
    prepare: HashMap<BlockHash, HashSet<NodeId>>,
    commit: HashMap<BlockHash, HashSet<NodeId>>,
    fault_bound: usize,
}

impl QuorumTracker {
    /// `cluster_size` is the total node count n, self included.
    pub fn new(cluster_size: usize) -> Self {
        Self {
            prepare: HashMap::new(),
            commit: HashMap::new(),
            fault_bound: cluster_size.saturating_sub(1) / 3,
        }
    }

    /// Maximum tolerated faulty nodes, f.
    pub fn fault_bound(&self) -> usize {
        self.fault_bound
    }

    pub fn threshold(&self, phase: Phase) -> usize {
        match phase {
            Phase::Prepare => 2 * self.fault_bound,
            Phase::Commit => 2 * self.fault_bound + 1,
        }
    }

    /// Record `sender`'s endorsement for (phase, hash). Duplicate senders
    /// are absorbed by set semantics. Returns the updated distinct count.
    pub fn record(&mut self, phase: Phase, hash: &BlockHash, sender: NodeId) -> usize {
        let endorsers = self
            .sets_mut(phase)
            .entry(hash.clone())
            .or_insert_with(HashSet::new);
        endorsers.insert(sender);
        endorsers.len()
    }

    pub fn count(&self, phase: Phase, hash: &BlockHash) -> usize {
        self.sets(phase).get(hash).map_or(0, HashSet::len)
    }

    pub fn has_quorum(&self, phase: Phase, hash: &BlockHash) -> bool {
        self.count(phase, hash) >= self.threshold(phase)
    }

    /// Drop both phase sets for a hash once its round commits. Bounds memory
    /// and keeps a finished round from leaking into a later one.
    pub fn clear(&mut self, hash: &BlockHash) {
        self.prepare.remove(hash);
        self.commit.remove(hash);
    }

    fn sets(&self, phase: Phase) -> &HashMap<BlockHash, HashSet<NodeId>> {
        match phase {
            Phase::Prepare => &self.prepare,
            Phase::Commit => &self.commit,
        }
    }

    fn sets_mut(&mut self, phase: Phase) -> &mut HashMap<BlockHash, HashSet<NodeId>> {
        match phase {
            Phase::Prepare => &mut self.prepare,
            Phase::Commit => &mut self.commit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: &str = "deadbeef";

    #[test]
    fn fault_bound_derivation() {
        assert_eq!(QuorumTracker::new(4).fault_bound(), 1);
        assert_eq!(QuorumTracker::new(7).fault_bound(), 2);
        assert_eq!(QuorumTracker::new(10).fault_bound(), 3);
        assert_eq!(QuorumTracker::new(1).fault_bound(), 0);
    }

    #[test]
    fn prepare_quorum_at_exactly_2f() {
        // n = 4 -> f = 1 -> prepare threshold 2
        let mut tracker = QuorumTracker::new(4);
        let hash = H.to_string();
        tracker.record(Phase::Prepare, &hash, 1);
        assert!(!tracker.has_quorum(Phase::Prepare, &hash));
        tracker.record(Phase::Prepare, &hash, 2);
        assert!(tracker.has_quorum(Phase::Prepare, &hash));
    }

    #[test]
    fn commit_quorum_at_exactly_2f_plus_1() {
        // n = 4 -> commit threshold 3
        let mut tracker = QuorumTracker::new(4);
        let hash = H.to_string();
        tracker.record(Phase::Commit, &hash, 1);
        tracker.record(Phase::Commit, &hash, 2);
        assert!(!tracker.has_quorum(Phase::Commit, &hash));
        tracker.record(Phase::Commit, &hash, 3);
        assert!(tracker.has_quorum(Phase::Commit, &hash));
    }

    #[test]
    fn duplicate_endorsements_are_idempotent() {
        let mut tracker = QuorumTracker::new(4);
        let hash = H.to_string();
        assert_eq!(tracker.record(Phase::Prepare, &hash, 1), 1);
        assert_eq!(tracker.record(Phase::Prepare, &hash, 1), 1);
        assert_eq!(tracker.record(Phase::Prepare, &hash, 1), 1);
        assert!(!tracker.has_quorum(Phase::Prepare, &hash));
    }

    #[test]
    fn phases_are_tracked_independently() {
        let mut tracker = QuorumTracker::new(4);
        let hash = H.to_string();
        tracker.record(Phase::Prepare, &hash, 1);
        tracker.record(Phase::Prepare, &hash, 2);
        assert_eq!(tracker.count(Phase::Commit, &hash), 0);
    }

    #[test]
    fn clear_discards_both_phases() {
        let mut tracker = QuorumTracker::new(4);
        let hash = H.to_string();
        tracker.record(Phase::Prepare, &hash, 1);
        tracker.record(Phase::Commit, &hash, 2);
        tracker.clear(&hash);
        assert_eq!(tracker.count(Phase::Prepare, &hash), 0);
        assert_eq!(tracker.count(Phase::Commit, &hash), 0);
    }
}
