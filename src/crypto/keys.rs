use anyhow::{Context, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::OsRng;
use std::fs;
use std::path::Path;

/// A node's ed25519 identity keypair.
pub struct NodeKeypair {
    signing: SigningKey,
}

impl NodeKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Load the secret seed from `path`, hex encoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let hex_seed = fs::read_to_string(&path)
            .with_context(|| format!("reading key file {}", path.as_ref().display()))?;
        let bytes = hex::decode(hex_seed.trim()).context("key file is not valid hex")?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("key file must hold exactly 32 bytes"))?;
        Ok(Self::from_seed(&seed))
    }

    /// Write the secret seed to `path`, hex encoded.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(&path, hex::encode(self.signing.to_bytes()))
            .with_context(|| format!("writing key file {}", path.as_ref().display()))
    }

    /// Load the keypair at `path`, generating and saving a new one if the
    /// file does not exist yet.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let kp = Self::generate();
            kp.save(path)?;
            Ok(kp)
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Hex form of the public key, used as the wire-level identity label.
    pub fn public_hex(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}
