use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::consensus::{NodeId, PhaseMessage};
use crate::crypto::{verify_detached, NodeKeypair, SignatureBytes};

/// Envelope for everything carried between cluster peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    /// First frame on every outbound connection: identifies the dialing
    /// node and proves possession of its identity key.
    Hello(HelloMsg),
    Consensus(PhaseMessage),
}

/// Wire-level identification. The signature covers (node_id || nonce) and
/// binds the claimed id to the presented key for this connection only;
/// consensus messages themselves are not signed in this protocol revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMsg {
    pub node_id: NodeId,
    /// hex-encoded ed25519 public key
    pub public_key: String,
    pub nonce: Vec<u8>,
    pub signature: SignatureBytes,
}

impl HelloMsg {
    pub fn signed(keypair: &NodeKeypair, node_id: NodeId) -> Self {
        let mut nonce = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let signature = keypair.sign(&payload(node_id, &nonce));
        Self {
            node_id,
            public_key: keypair.public_hex(),
            nonce,
            signature,
        }
    }

    pub fn verify(&self) -> Result<()> {
        verify_detached(
            &self.public_key,
            &payload(self.node_id, &self.nonce),
            &self.signature,
        )
    }
}

fn payload(node_id: NodeId, nonce: &[u8]) -> Vec<u8> {
    let mut buf = node_id.to_be_bytes().to_vec();
    buf.extend_from_slice(nonce);
    buf
}
