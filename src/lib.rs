//! ballotchain: a Byzantine fault tolerant vote ledger.
//!
//! A fixed cluster of n nodes replicates an append-only, hash-linked chain of
//! vote blocks, tolerating f = (n - 1) / 3 crashed or arbitrarily misbehaving
//! nodes. Each node drives a proposed block through the PRE-PREPARE, PREPARE
//! and COMMIT phases using quorum-counted peer endorsements, then appends the
//! block to its local chain.
//!
//! Module map:
//! - `ledger`: block construction and the hash-linked chain
//! - `consensus`: the per-node phase state machine and quorum tracker
//! - `voting`: vote records and the intake pool
//! - `network`: peer-to-peer phase message transport
//! - `rpc`: client-facing HTTP API (vote intake, chain inspection)
//! - `crypto`: ed25519 key and signature primitives
//! - `node`: configuration, CLI, and service wiring

pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod network;
pub mod node;
pub mod rpc;
pub mod utils;
pub mod voting;
