//! Ledger: the append-only, hash-linked chain of committed blocks.
//!
//! Each node owns exactly one `Ledger`; replicas converge only by applying
//! the same committed blocks independently, never by sharing state.

pub mod block;

use thiserror::Error;
use tracing::warn;

pub use block::{Block, BlockHash, GENESIS_PREVIOUS_HASH};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The candidate's `previous_hash` does not match the chain tip.
    #[error("chain link mismatch: tip hash is {expected}, candidate links to {got}")]
    ChainLinkMismatch { expected: BlockHash, got: BlockHash },

    /// Queried before `initialize()` created the genesis block.
    #[error("ledger has no blocks; initialize() was never called")]
    EmptyChain,
}

/// Append-only block chain. Index 0 is always the genesis block.
#[derive(Debug, Default)]
pub struct Ledger {
    chain: Vec<Block>,
}

impl Ledger {
    /// Create an empty, uninitialized ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store the genesis block. Called exactly once per node
    /// lifetime; a repeat call is ignored.
    pub fn initialize(&mut self) {
        if !self.chain.is_empty() {
            warn!("ledger already initialized, ignoring repeat initialize()");
            return;
        }
        self.chain.push(Block::genesis());
    }

    /// Append `candidate` iff it links to the current tip.
    ///
    /// This is the sole admission check: transaction content and the hash
    /// itself must have been validated by the caller before committing.
    pub fn append(&mut self, candidate: Block) -> Result<&Block, LedgerError> {
        let tip = self.last_block()?;
        if candidate.previous_hash != tip.hash {
            return Err(LedgerError::ChainLinkMismatch {
                expected: tip.hash.clone(),
                got: candidate.previous_hash,
            });
        }
        self.chain.push(candidate);
        Ok(self.chain.last().expect("chain non-empty after push"))
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    /// Number of blocks on the chain, genesis included.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    /// Full ordered clone of the chain, for external consistency checks.
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.clone()
    }

    /// Walk the whole chain and verify index and hash linkage, plus each
    /// block's own content hash.
    pub fn is_consistent(&self) -> bool {
        for pair in self.chain.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.index != prev.index + 1 || next.previous_hash != prev.hash {
                return false;
            }
        }
        self.chain.iter().all(|b| b.hash == b.content_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::Vote;

    fn next_block(ledger: &Ledger, votes: Vec<Vote>) -> Block {
        let tip = ledger.last_block().unwrap();
        Block::new(tip.index + 1, votes, 1000, tip.hash.clone())
    }

    #[test]
    fn last_block_before_initialize_is_empty_chain() {
        let ledger = Ledger::new();
        assert_eq!(ledger.last_block().unwrap_err(), LedgerError::EmptyChain);
    }

    #[test]
    fn initialize_creates_genesis_once() {
        let mut ledger = Ledger::new();
        ledger.initialize();
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.last_block().unwrap().index, 0);
        ledger.initialize();
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn append_links_blocks() {
        let mut ledger = Ledger::new();
        ledger.initialize();
        let b1 = next_block(&ledger, vec![Vote::new("V1", "A")]);
        ledger.append(b1).unwrap();
        let b2 = next_block(&ledger, vec![Vote::new("V2", "B")]);
        ledger.append(b2).unwrap();

        let chain = ledger.snapshot();
        assert_eq!(chain.len(), 3);
        for i in 1..chain.len() {
            assert_eq!(chain[i].previous_hash, chain[i - 1].hash);
            assert_eq!(chain[i].index, chain[i - 1].index + 1);
        }
        assert!(ledger.is_consistent());
    }

    #[test]
    fn append_rejects_broken_link() {
        let mut ledger = Ledger::new();
        ledger.initialize();
        let stray = Block::new(1, vec![], 1000, "not-the-tip".into());
        let err = ledger.append(stray).unwrap_err();
        assert!(matches!(err, LedgerError::ChainLinkMismatch { .. }));
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn duplicate_append_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.initialize();
        let b1 = next_block(&ledger, vec![Vote::new("V1", "A")]);
        ledger.append(b1.clone()).unwrap();
        // same block again no longer links to the (new) tip
        let err = ledger.append(b1).unwrap_err();
        assert!(matches!(err, LedgerError::ChainLinkMismatch { .. }));
        assert_eq!(ledger.height(), 2);
    }
}
