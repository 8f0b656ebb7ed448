use super::{NativeScript, ScriptError};
use crate::address::Address;
use crate::{Identity, KeyHash, Network, Policy, ScriptHash};
use std::collections::HashSet;
use tracing::debug;

/// A threshold script with everything needed to fund and spend it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedScript {
    pub script: NativeScript,
    pub hash: ScriptHash,
    /// Address that locks funds behind the script
    pub address: Identity,
    /// Canonical CBOR, as attached to spending transactions
    pub cbor: Vec<u8>,
}

impl EncodedScript {
    /// Rebuild from stored CBOR
    pub fn from_cbor(cbor: &[u8], network: Network) -> Result<Self, ScriptError> {
        let script = NativeScript::from_cbor(cbor)?;
        let hash = script.hash()?;
        let address = Address::from_script_hash(network, hash).to_identity()?;
        Ok(Self {
            script,
            hash,
            address,
            cbor: cbor.to_vec(),
        })
    }

    pub fn cbor_hex(&self) -> String {
        hex::encode(&self.cbor)
    }
}

/// Produces the on-chain form of an M-of-N policy
pub trait ThresholdScriptEncoder: Send + Sync {
    /// Deterministic: equal inputs always give byte-identical output
    fn encode(&self, policy: &Policy, key_hashes: &[KeyHash]) -> Result<EncodedScript, ScriptError>;
}

/// Encodes `atLeast` scripts behind Shelley enterprise script addresses
#[derive(Debug, Clone, Copy)]
pub struct CardanoScriptEncoder {
    network: Network,
}

impl CardanoScriptEncoder {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

impl ThresholdScriptEncoder for CardanoScriptEncoder {
    fn encode(&self, policy: &Policy, key_hashes: &[KeyHash]) -> Result<EncodedScript, ScriptError> {
        if key_hashes.len() != policy.total() {
            return Err(ScriptError::KeyCountMismatch {
                expected: policy.total(),
                actual: key_hashes.len(),
            });
        }
        let mut seen = HashSet::new();
        for key_hash in key_hashes {
            if !seen.insert(key_hash) {
                return Err(ScriptError::DuplicateKey(*key_hash));
            }
        }

        let required = u32::try_from(policy.required())
            .map_err(|_| ScriptError::Malformed(format!("threshold {} too large", policy.required())))?;
        let script = NativeScript::threshold(required, key_hashes);
        let cbor = script.to_cbor()?;
        let hash = script.hash()?;
        let address = Address::from_script_hash(self.network, hash).to_identity()?;

        debug!("Encoded {} script {} at {}", policy, hash, address);
        Ok(EncodedScript {
            script,
            hash,
            address,
            cbor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Credential;

    fn keys() -> Vec<KeyHash> {
        (1..=5).map(|i| KeyHash::from_bytes([i; 28])).collect()
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = CardanoScriptEncoder::new(Network::Testnet);
        let a = encoder.encode(&Policy::default(), &keys()).unwrap();
        let b = encoder.encode(&Policy::default(), &keys()).unwrap();

        assert_eq!(a, b);
        assert!(a.address.as_str().starts_with("addr_test1"));
    }

    #[test]
    fn test_address_commits_to_script_hash() {
        let encoder = CardanoScriptEncoder::new(Network::Testnet);
        let encoded = encoder.encode(&Policy::default(), &keys()).unwrap();

        let address = Address::parse(encoded.address.as_str()).unwrap();
        assert_eq!(address.payment(), Credential::Script(encoded.hash));
    }

    #[test]
    fn test_rejects_wrong_key_count() {
        let encoder = CardanoScriptEncoder::new(Network::Testnet);
        let err = encoder.encode(&Policy::default(), &keys()[..4]).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::KeyCountMismatch { expected: 5, actual: 4 }
        ));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let encoder = CardanoScriptEncoder::new(Network::Testnet);
        let mut keys = keys();
        keys[4] = keys[0];
        assert!(matches!(
            encoder.encode(&Policy::default(), &keys),
            Err(ScriptError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_rebuild_from_cbor() {
        let encoder = CardanoScriptEncoder::new(Network::Testnet);
        let encoded = encoder.encode(&Policy::default(), &keys()).unwrap();

        let rebuilt = EncodedScript::from_cbor(&encoded.cbor, Network::Testnet).unwrap();
        assert_eq!(rebuilt, encoded);
    }
}
