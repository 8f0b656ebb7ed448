//! Mnemonic-backed wallet
//!
//! By default keys follow CIP-1852 (see `derivation`) and the wallet pays to
//! a base address, the same one a standard Cardano wallet shows for the words.
//! `KeyDerivation::SeedPrefix` keeps the simpler scheme: the first 32 bytes of
//! the BIP-39 seed as the Ed25519 secret, paying to an enterprise address.

use super::derivation::{account_keys, icarus_root, public_key, KeyDerivation};
use super::{KeyProvider, VkeyWitness};
use crate::address::{Address, AddressError};
use crate::{Identity, KeyHash, Network};
use bip39::Mnemonic;
use ed25519_bip32::XPrv;
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use tracing::debug;

/// Number of mnemonic words produced by `SeedWallet::generate`
pub const GENERATED_WORDS: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    Mnemonic(#[from] bip39::Error),
    #[error("seed is not a JSON array of words: {0}")]
    SeedFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Address(#[from] AddressError),
}

enum SecretKey {
    Extended(XPrv),
    Plain(SigningKey),
}

impl SecretKey {
    fn vkey(&self) -> [u8; 32] {
        match self {
            SecretKey::Extended(xprv) => public_key(xprv),
            SecretKey::Plain(key) => key.verifying_key().to_bytes(),
        }
    }

    fn sign(&self, payload: &[u8]) -> [u8; 64] {
        match self {
            SecretKey::Extended(xprv) => *xprv.sign::<Vec<u8>>(payload).to_bytes(),
            SecretKey::Plain(key) => key.sign(payload).to_bytes(),
        }
    }
}

pub struct SeedWallet {
    secret: SecretKey,
    vkey: [u8; 32],
    key_hash: KeyHash,
    address: Identity,
    network: Network,
    derivation: KeyDerivation,
}

impl SeedWallet {
    /// Restore a wallet from mnemonic words with CIP-1852 keys
    pub fn from_words<S: AsRef<str>>(words: &[S], network: Network) -> Result<Self, WalletError> {
        Self::from_words_with(words, network, KeyDerivation::default())
    }

    pub fn from_words_with<S: AsRef<str>>(
        words: &[S],
        network: Network,
        derivation: KeyDerivation,
    ) -> Result<Self, WalletError> {
        let phrase = words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let mnemonic = Mnemonic::parse_normalized(&phrase)?;
        Self::from_mnemonic(&mnemonic, network, derivation)
    }

    /// Restore a wallet from a JSON word array such as `["abandon", ...]`
    pub fn from_json(seed_json: &str, network: Network) -> Result<Self, WalletError> {
        Self::from_json_with(seed_json, network, KeyDerivation::default())
    }

    pub fn from_json_with(
        seed_json: &str,
        network: Network,
        derivation: KeyDerivation,
    ) -> Result<Self, WalletError> {
        let words: Vec<String> = serde_json::from_str(seed_json)?;
        Self::from_words_with(&words, network, derivation)
    }

    /// Create a wallet from fresh entropy, returning it with its words
    pub fn generate(network: Network) -> Result<(Self, Vec<String>), WalletError> {
        Self::generate_with(network, KeyDerivation::default())
    }

    pub fn generate_with(
        network: Network,
        derivation: KeyDerivation,
    ) -> Result<(Self, Vec<String>), WalletError> {
        let mut entropy = [0u8; GENERATED_WORDS / 3 * 4];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)?;
        let words = mnemonic
            .to_string()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let wallet = Self::from_mnemonic(&mnemonic, network, derivation)?;
        Ok((wallet, words))
    }

    fn from_mnemonic(
        mnemonic: &Mnemonic,
        network: Network,
        derivation: KeyDerivation,
    ) -> Result<Self, WalletError> {
        let (secret, address) = match derivation {
            KeyDerivation::Cip1852 => {
                let keys = account_keys(&icarus_root(&mnemonic.to_entropy(), ""), 0);
                let payment = KeyHash::of_vkey(&public_key(&keys.payment));
                let stake = KeyHash::of_vkey(&public_key(&keys.stake));
                (
                    SecretKey::Extended(keys.payment),
                    Address::base(network, payment, stake),
                )
            }
            KeyDerivation::SeedPrefix => {
                let seed = mnemonic.to_seed_normalized("");
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&seed[..32]);
                let key = SigningKey::from_bytes(&bytes);
                let key_hash = KeyHash::of_vkey(key.verifying_key().as_bytes());
                (
                    SecretKey::Plain(key),
                    Address::from_key_hash(network, key_hash),
                )
            }
        };

        let vkey = secret.vkey();
        let address = address.to_identity()?;
        debug!("Loaded {:?} wallet {}", derivation, address);

        Ok(Self {
            secret,
            vkey,
            key_hash: KeyHash::of_vkey(&vkey),
            address,
            network,
            derivation,
        })
    }

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn derivation(&self) -> KeyDerivation {
        self.derivation
    }
}

impl KeyProvider for SeedWallet {
    fn identity(&self) -> &Identity {
        &self.address
    }

    fn key_hash(&self) -> KeyHash {
        self.key_hash
    }

    fn sign(&self, payload: &[u8]) -> VkeyWitness {
        VkeyWitness {
            vkey: self.vkey,
            signature: self.secret.sign(payload),
        }
    }
}

impl std::fmt::Debug for SeedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedWallet")
            .field("address", &self.address)
            .field("network", &self.network)
            .field("derivation", &self.derivation)
            .finish_non_exhaustive()
    }
}
