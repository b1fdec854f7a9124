//! Block: an immutable batch of votes bound into the hash chain.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::voting::Vote;

/// Hex-encoded SHA-256 digest identifying a block by content.
pub type BlockHash = String;

/// Sentinel `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A committed or proposed block.
///
/// `hash` is computed once at construction over every other field and never
/// recomputed afterward; [`Block::content_hash`] re-derives it for integrity
/// checks against a received block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Vote>,
    /// Milliseconds since the Unix epoch. Fixed to 0 for genesis so every
    /// node derives an identical genesis hash.
    pub timestamp: u64,
    pub previous_hash: BlockHash,
    pub nonce: u64,
    pub hash: BlockHash,
}

/// The hashed portion of a block. Field order here is the canonical
/// serialization order; changing it changes every block hash.
#[derive(Serialize)]
struct BlockContents<'a> {
    index: u64,
    transactions: &'a [Vote],
    timestamp: u64,
    previous_hash: &'a str,
    nonce: u64,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Vote>,
        timestamp: u64,
        previous_hash: BlockHash,
    ) -> Self {
        let nonce = 0;
        let hash = compute_hash(index, &transactions, timestamp, &previous_hash, nonce);
        Self {
            index,
            transactions,
            timestamp,
            previous_hash,
            nonce,
            hash,
        }
    }

    /// The first block of every chain. Identical on all nodes.
    pub fn genesis() -> Self {
        Self::new(0, vec![], 0, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Re-derive the hash from the block's current contents.
    ///
    /// A well-formed block satisfies `self.hash == self.content_hash()`;
    /// a received block that does not was corrupted or forged in transit.
    pub fn content_hash(&self) -> BlockHash {
        compute_hash(
            self.index,
            &self.transactions,
            self.timestamp,
            &self.previous_hash,
            self.nonce,
        )
    }
}

/// Deterministic digest over the canonical JSON form of the block contents.
///
/// Serialization of a fixed struct keeps field order stable, so identical
/// field values hash identically across process, run, and platform.
fn compute_hash(
    index: u64,
    transactions: &[Vote],
    timestamp: u64,
    previous_hash: &str,
    nonce: u64,
) -> BlockHash {
    let contents = BlockContents {
        index,
        transactions,
        timestamp,
        previous_hash,
        nonce,
    };
    let canonical = serde_json::to_vec(&contents).expect("block contents serialize");
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}
