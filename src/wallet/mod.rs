//! Wallet Module
//!
//! This module provides signing identities for the multisig exercise:
//! - `KeyProvider`: the seam every signer implements
//! - `SeedWallet`: an Ed25519 wallet restored from a BIP-39 mnemonic
//! - `KeyDerivation`: CIP-1852 (standard wallets) or the plain seed-prefix scheme
//! - `VkeyWitness`: one signature over a transaction id

pub mod derivation;
mod provider;
mod seed;

pub use derivation::KeyDerivation;
pub use provider::{KeyProvider, VkeyWitness};
pub use seed::{SeedWallet, WalletError};
