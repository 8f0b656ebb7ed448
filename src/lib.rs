//! This crate implements M-of-N multisignature authorization for Cardano-style
//! ledgers. It includes modules for identity and policy types, the signer-set
//! validator, key derivation, native threshold scripts, transaction assembly,
//! ledger access, a lock registry, the exercise pipeline, and configuration.

pub mod types; // Identities, hashes, outputs, policies and validation results.
pub mod address; // Shelley address decoding and bech32 encoding.
pub mod validation; // The pure M-of-N signer-set validator.
pub mod wallet; // Seed-phrase wallets and the key provider seam.
pub mod script; // Native threshold scripts and their encoder.
pub mod tx; // Transaction bodies, witnesses and the builder.
pub mod ledger; // Ledger clients: Blockfrost and an in-memory UTXO set.
pub mod registry; // SQLite record of funded script outputs.
pub mod pipeline; // Wallet generation, locking, scenarios and spending.
pub mod config; // Defines and loads system configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use validation::Validator;
pub use wallet::SeedWallet;
