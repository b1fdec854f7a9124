//! Crypto module: node identity keys and ed25519 signatures.
//!
//! These primitives authenticate peers at the wire level (the transport
//! handshake). Consensus messages are deliberately NOT signature-checked in
//! this protocol revision; the consensus core trusts the sender-claimed node
//! id once a connection is established.

pub mod keys;
pub mod sign;

pub use keys::NodeKeypair;
pub use sign::{verify_detached, SignatureBytes};
