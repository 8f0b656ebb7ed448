//! Configuration Module
//!
//! This module defines all configuration structures for the multisig toolkit.
//! Configuration is loaded from a TOML file and parsed using serde, then
//! secrets and per-run values are overlaid from the environment.
//!
//! # Environment Keys
//! - `BLOCKFROST_APIKEY`: ledger API project key
//! - `NETWORK_ID`: `0` for testnet, `1` for mainnet
//! - `WALLET_SEEDS`: funding wallet mnemonic as a JSON word array
//! - `WALLET_SEEDS_1` .. `WALLET_SEEDS_5`: authorized signer mnemonics
//! - `WALLET_DERIVATION`: `cip1852` (default) or `seed-prefix`
//! - `MULTISIG_UTXO_HASH` / `MULTISIG_UTXO_INDEX`: the locked output to spend

use crate::wallet::KeyDerivation;
use crate::{Network, OutRef, Policy, PolicyError, TxHash};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration key {0} is not set")]
    MissingKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("invalid multisig policy: {0}")]
    Policy(#[from] PolicyError),
}

/// Main configuration structure
///
/// # Example TOML
/// ```toml
/// [network]
/// network_id = 0
///
/// [multisig]
/// required = 3
/// total = 5
/// exact_count = true
///
/// [spend]
/// lock_lovelace = 100000000
/// fee_reserve_lovelace = 2000000
///
/// [database]
/// url = "sqlite://multisig.db"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub multisig: MultisigConfig,
    pub wallets: WalletsConfig,
    pub spend: SpendConfig,
    pub tx: TxConfig,
    pub database: DatabaseConfig,
}

/// Ledger connection settings
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub network_id: u8,
    pub blockfrost_api_key: String,
    /// Overrides the API endpoint otherwise derived from the key prefix
    pub base_url: Option<String>,
}

/// M-of-N policy settings
///
/// `exact_count = false` accepts any signing set of at least `required`
/// signers instead of exactly `required`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MultisigConfig {
    pub required: usize,
    pub total: usize,
    pub exact_count: bool,
}

impl Default for MultisigConfig {
    fn default() -> Self {
        Self {
            required: 3,
            total: 5,
            exact_count: true,
        }
    }
}

/// Seed material, one JSON word array per wallet
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WalletsConfig {
    pub funding_seed: Option<String>,
    pub signer_seeds: Vec<String>,
    /// 1-based signer slots that sign the spend
    pub signing_slots: Vec<usize>,
    /// `cip1852` (standard wallets) or `seed-prefix`
    pub derivation: KeyDerivation,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            funding_seed: None,
            signer_seeds: Vec::new(),
            signing_slots: vec![1, 2, 3],
            derivation: KeyDerivation::default(),
        }
    }
}

/// Amounts used when locking and distributing funds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpendConfig {
    pub lock_lovelace: u64,
    /// Held back from the distribution to cover the spend fee
    pub fee_reserve_lovelace: u64,
    pub utxo_hash: Option<String>,
    pub utxo_index: u32,
}

impl Default for SpendConfig {
    fn default() -> Self {
        Self {
            lock_lovelace: 100_000_000,
            fee_reserve_lovelace: 2_000_000,
            utxo_hash: None,
            utxo_index: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    pub fee_lovelace: u64,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self { fee_lovelace: 200_000 }
    }
}

/// Lock registry database settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://multisig.db".to_string(),
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("network_id", &self.network_id)
            .field("blockfrost_api_key", &redacted(!self.blockfrost_api_key.is_empty()))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for WalletsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletsConfig")
            .field("funding_seed", &redacted(self.funding_seed.is_some()))
            .field("signer_seeds", &self.signer_seeds.len())
            .field("signing_slots", &self.signing_slots)
            .field("derivation", &self.derivation)
            .finish()
    }
}

fn redacted(set: bool) -> &'static str {
    if set { "<set>" } else { "<unset>" }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides
    ///
    /// A missing file is not an error: defaults are used and the environment
    /// must supply the secrets.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay values from an environment-style lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("BLOCKFROST_APIKEY") {
            self.network.blockfrost_api_key = key;
        }
        if let Some(id) = lookup("NETWORK_ID") {
            self.network.network_id = parse_value("NETWORK_ID", &id)?;
        }
        if let Some(derivation) = lookup("WALLET_DERIVATION") {
            self.wallets.derivation = parse_value("WALLET_DERIVATION", &derivation)?;
        }
        if let Some(seed) = lookup("WALLET_SEEDS") {
            self.wallets.funding_seed = Some(seed);
        }
        for slot in 1..=self.multisig.total {
            if let Some(seed) = lookup(&format!("WALLET_SEEDS_{}", slot)) {
                if self.wallets.signer_seeds.len() < slot {
                    self.wallets.signer_seeds.resize(slot, String::new());
                }
                self.wallets.signer_seeds[slot - 1] = seed;
            }
        }
        if let Some(hash) = lookup("MULTISIG_UTXO_HASH") {
            self.spend.utxo_hash = Some(hash);
        }
        if let Some(index) = lookup("MULTISIG_UTXO_INDEX") {
            self.spend.utxo_index = parse_value("MULTISIG_UTXO_INDEX", &index)?;
        }
        Ok(())
    }

    pub fn network(&self) -> Result<Network, ConfigError> {
        Network::from_id(self.network.network_id).ok_or_else(|| ConfigError::InvalidValue {
            key: "NETWORK_ID".to_string(),
            value: self.network.network_id.to_string(),
        })
    }

    pub fn policy(&self) -> Result<Policy, ConfigError> {
        Ok(Policy::new(self.multisig.required, self.multisig.total)?)
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.network.blockfrost_api_key.is_empty() {
            return Err(ConfigError::MissingKey("BLOCKFROST_APIKEY".to_string()));
        }
        Ok(&self.network.blockfrost_api_key)
    }

    pub fn require_funding_seed(&self) -> Result<&str, ConfigError> {
        self.wallets
            .funding_seed
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingKey("WALLET_SEEDS".to_string()))
    }

    /// Seeds for every signer slot, failing on the first missing slot
    pub fn require_signer_seeds(&self) -> Result<&[String], ConfigError> {
        for slot in 1..=self.multisig.total {
            match self.wallets.signer_seeds.get(slot - 1) {
                Some(seed) if !seed.is_empty() => {}
                _ => return Err(ConfigError::MissingKey(format!("WALLET_SEEDS_{}", slot))),
            }
        }
        Ok(&self.wallets.signer_seeds[..self.multisig.total])
    }

    /// The locked output to spend, when one is configured
    pub fn utxo_ref(&self) -> Result<Option<OutRef>, ConfigError> {
        let Some(hash) = self.spend.utxo_hash.as_deref() else {
            return Ok(None);
        };
        let tx_hash = TxHash::from_hex(hash).map_err(|_| ConfigError::InvalidValue {
            key: "MULTISIG_UTXO_HASH".to_string(),
            value: hash.to_string(),
        })?;
        Ok(Some(OutRef {
            tx_hash,
            index: self.spend.utxo_index,
        }))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.policy().unwrap(), Policy::default());
        assert!(config.multisig.exact_count);
        assert_eq!(config.network().unwrap(), Network::Testnet);
        assert_eq!(config.spend.lock_lovelace, 100_000_000);
        assert_eq!(config.spend.fee_reserve_lovelace, 2_000_000);
        assert_eq!(config.wallets.signing_slots, vec![1, 2, 3]);
        assert_eq!(config.tx.fee_lovelace, 200_000);
        assert_eq!(config.wallets.derivation, KeyDerivation::Cip1852);
    }

    #[test]
    fn test_derivation_from_toml_and_env() {
        let mut config = Config::from_toml(
            r#"
            [wallets]
            derivation = "seed-prefix"
            "#,
        )
        .unwrap();
        assert_eq!(config.wallets.derivation, KeyDerivation::SeedPrefix);

        config
            .apply_env(env(&[("WALLET_DERIVATION", "cip1852")]))
            .unwrap();
        assert_eq!(config.wallets.derivation, KeyDerivation::Cip1852);
        assert!(matches!(
            config.apply_env(env(&[("WALLET_DERIVATION", "bip44")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_toml_sections() {
        let config = Config::from_toml(
            r#"
            [network]
            network_id = 1
            base_url = "http://localhost:3000"

            [multisig]
            required = 2
            total = 3
            exact_count = false

            [wallets]
            signing_slots = [1, 3]
            "#,
        )
        .unwrap();

        assert_eq!(config.network().unwrap(), Network::Mainnet);
        assert_eq!(config.policy().unwrap(), Policy::new(2, 3).unwrap());
        assert!(!config.multisig.exact_count);
        assert_eq!(config.wallets.signing_slots, vec![1, 3]);
        assert_eq!(config.network.base_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("BLOCKFROST_APIKEY", "preprodKey"),
                ("NETWORK_ID", "0"),
                ("WALLET_SEEDS", "[\"a\"]"),
                ("WALLET_SEEDS_2", "[\"b\"]"),
                ("MULTISIG_UTXO_INDEX", "1"),
            ]))
            .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "preprodKey");
        assert_eq!(config.require_funding_seed().unwrap(), "[\"a\"]");
        assert_eq!(config.wallets.signer_seeds, vec![String::new(), "[\"b\"]".to_string()]);
        assert_eq!(config.spend.utxo_index, 1);
    }

    #[test]
    fn test_missing_keys_are_reported() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingKey(k)) if k == "BLOCKFROST_APIKEY"
        ));
        assert!(matches!(
            config.require_funding_seed(),
            Err(ConfigError::MissingKey(k)) if k == "WALLET_SEEDS"
        ));

        config
            .apply_env(env(&[
                ("WALLET_SEEDS_1", "s1"),
                ("WALLET_SEEDS_2", "s2"),
                ("WALLET_SEEDS_3", "s3"),
                ("WALLET_SEEDS_5", "s5"),
            ]))
            .unwrap();
        assert!(matches!(
            config.require_signer_seeds(),
            Err(ConfigError::MissingKey(k)) if k == "WALLET_SEEDS_4"
        ));

        config.apply_env(env(&[("WALLET_SEEDS_4", "s4")])).unwrap();
        assert_eq!(config.require_signer_seeds().unwrap().len(), 5);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_env(env(&[("NETWORK_ID", "mainnet")])),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.network.network_id = 7;
        assert!(config.network().is_err());

        config.multisig.required = 6;
        assert!(matches!(config.policy(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn test_utxo_ref() {
        let mut config = Config::default();
        assert_eq!(config.utxo_ref().unwrap(), None);

        config.spend.utxo_hash = Some("00".repeat(32));
        config.spend.utxo_index = 2;
        let out_ref = config.utxo_ref().unwrap().unwrap();
        assert_eq!(out_ref.index, 2);

        config.spend.utxo_hash = Some("nothex".to_string());
        assert!(config.utxo_ref().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut config = Config::default();
        config.network.blockfrost_api_key = "preprodSecret".to_string();
        config.wallets.funding_seed = Some("[\"secret\"]".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("preprodSecret"));
        assert!(!debug.contains("secret\""));
    }
}
