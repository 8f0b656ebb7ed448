use crate::{Identity, KeyHash};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Signature by one verification key
#[derive(Clone, PartialEq, Eq)]
pub struct VkeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

impl VkeyWitness {
    pub fn key_hash(&self) -> KeyHash {
        KeyHash::of_vkey(&self.vkey)
    }

    /// Check the signature over `payload`
    pub fn verify(&self, payload: &[u8]) -> bool {
        let Ok(vkey) = VerifyingKey::from_bytes(&self.vkey) else {
            return false;
        };
        let signature = Signature::from_bytes(&self.signature);
        vkey.verify(payload, &signature).is_ok()
    }
}

impl std::fmt::Debug for VkeyWitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkeyWitness")
            .field("key_hash", &self.key_hash())
            .finish()
    }
}

/// Anything that can sign for one spending credential
///
/// Signing is partial: each provider produces its own witness without seeing
/// any other signer's key material.
pub trait KeyProvider: Send + Sync {
    /// Payment address controlled by this key
    fn identity(&self) -> &Identity;

    fn key_hash(&self) -> KeyHash;

    fn sign(&self, payload: &[u8]) -> VkeyWitness;
}
