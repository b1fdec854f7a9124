use anyhow::{anyhow, Result};
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};

use crate::crypto::keys::NodeKeypair;

/// Raw 64-byte ed25519 signature as carried on the wire.
pub type SignatureBytes = Vec<u8>;

impl NodeKeypair {
    /// Sign an arbitrary message with this node's identity key.
    pub fn sign(&self, msg: &[u8]) -> SignatureBytes {
        self.signing_key().sign(msg).to_bytes().to_vec()
    }
}

/// Verify `sig` over `msg` against a hex-encoded ed25519 public key.
pub fn verify_detached(public_hex: &str, msg: &[u8], sig: &[u8]) -> Result<()> {
    let key_bytes: [u8; 32] = hex::decode(public_hex)?
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("public key must be 32 bytes"))?;
    let key = VerifyingKey::from_bytes(&key_bytes)?;
    let sig_bytes: [u8; 64] = sig
        .try_into()
        .map_err(|_| anyhow!("signature must be 64 bytes"))?;
    key.verify(msg, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| anyhow!("signature verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = NodeKeypair::generate();
        let msg = b"hello cluster";
        let sig = kp.sign(msg);
        assert!(verify_detached(&kp.public_hex(), msg, &sig).is_ok());
    }

    #[test]
    fn verification_fails_for_tampered_message() {
        let kp = NodeKeypair::generate();
        let sig = kp.sign(b"original");
        assert!(verify_detached(&kp.public_hex(), b"tampered", &sig).is_err());
    }

    #[test]
    fn verification_fails_for_wrong_key() {
        let kp = NodeKeypair::generate();
        let other = NodeKeypair::generate();
        let sig = kp.sign(b"message");
        assert!(verify_detached(&other.public_hex(), b"message", &sig).is_err());
    }
}
