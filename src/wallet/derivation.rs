//! Key derivation from BIP-39 mnemonics
//!
//! Standard Cardano wallets derive keys the Icarus way: the root extended key
//! is PBKDF2-HMAC-SHA512 over the mnemonic entropy (4096 rounds, 96 bytes),
//! clamped, then walked down the CIP-1852 path with BIP32-Ed25519 (V2).
//!
//! # Paths
//! - payment key: `m/1852'/1815'/0'/0/0`
//! - stake key:   `m/1852'/1815'/0'/2/0`

use ed25519_bip32::{DerivationScheme, XPrv, XPRV_SIZE};
use serde::Deserialize;
use sha2::Sha512;

/// CIP-1852 purpose
pub const PURPOSE: u32 = 1852;
/// SLIP-0044 coin type for ADA
pub const COIN_TYPE: u32 = 1815;

const HARDENED: u32 = 0x8000_0000;
const PBKDF2_ROUNDS: u32 = 4096;

/// Role of the external (receiving) chain
const ROLE_EXTERNAL: u32 = 0;
/// Role of the staking chain
const ROLE_STAKE: u32 = 2;

/// How a mnemonic becomes signing keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyDerivation {
    /// Icarus root + CIP-1852 path; pays to a base address. Matches
    /// standard Cardano wallets restored from the same words.
    #[default]
    Cip1852,
    /// First 32 bytes of the BIP-39 seed as a plain Ed25519 secret; pays to
    /// an enterprise address. Only interoperates with itself.
    SeedPrefix,
}

impl std::str::FromStr for KeyDerivation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cip1852" => Ok(KeyDerivation::Cip1852),
            "seed-prefix" => Ok(KeyDerivation::SeedPrefix),
            other => Err(format!("unknown key derivation {}", other)),
        }
    }
}

/// Payment and stake keys of account 0, address index 0
#[derive(Clone)]
pub struct AccountKeys {
    pub payment: XPrv,
    pub stake: XPrv,
}

/// Icarus root key for `entropy` with an optional passphrase
pub fn icarus_root(entropy: &[u8], passphrase: &str) -> XPrv {
    let mut bytes = [0u8; XPRV_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), entropy, PBKDF2_ROUNDS, &mut bytes);
    XPrv::normalize_bytes_force3rd(bytes)
}

/// Walk `m/1852'/1815'/account'` then the payment and stake chains
pub fn account_keys(root: &XPrv, account: u32) -> AccountKeys {
    let account = [HARDENED | PURPOSE, HARDENED | COIN_TYPE, HARDENED | account]
        .into_iter()
        .fold(root.clone(), |key, index| key.derive(DerivationScheme::V2, index));

    let leaf = |role: u32| {
        account
            .derive(DerivationScheme::V2, role)
            .derive(DerivationScheme::V2, 0)
    };

    AccountKeys {
        payment: leaf(ROLE_EXTERNAL),
        stake: leaf(ROLE_STAKE),
    }
}

/// 32-byte Ed25519 verification key of an extended private key
pub fn public_key(key: &XPrv) -> [u8; 32] {
    let xpub = key.public();
    let bytes: &[u8] = xpub.as_ref();
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes[..32]);
    out
}
