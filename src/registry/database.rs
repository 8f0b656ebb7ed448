//! Lock Registry Module
//!
//! This module records every output locked behind a multisig script, so the
//! spend step can find it again without copying hashes between runs.
//!
//! # Storage
//! One SQLite row per locked output:
//! - Transaction hash and output index
//! - Script address and script CBOR (hex)
//! - Locked amount and creation time

use crate::{Identity, OutRef, TxHash};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt registry row: {0}")]
    Corrupt(String),
}

/// A funded script output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockRecord {
    pub out_ref: OutRef,
    pub script_address: Identity,
    pub script_cbor: String,
    pub lovelace: u64,
    pub created_at: DateTime<Utc>,
}

type LockRow = (String, i64, String, String, i64, String);

/// Lock registry
///
/// Stores lock records in SQLite for lookup by later runs.
pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    /// Opens (creating if needed) the registry database at `url`
    ///
    /// # Arguments
    /// * `url` - SQLite URL, e.g. `sqlite://multisig.db` or `sqlite::memory:`
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // A single connection keeps in-memory databases coherent
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let registry = Self { pool };
        registry.migrate().await?;
        debug!("Lock registry ready at {}", url);
        Ok(registry)
    }

    pub async fn in_memory() -> Result<Self, RegistryError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), RegistryError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS script_locks (
                tx_hash TEXT NOT NULL,
                output_index INTEGER NOT NULL,
                script_address TEXT NOT NULL,
                script_cbor TEXT NOT NULL,
                lovelace INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (tx_hash, output_index)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a lock record, replacing any record for the same output
    pub async fn store(&self, record: &LockRecord) -> Result<(), RegistryError> {
        let lovelace = i64::try_from(record.lovelace)
            .map_err(|_| RegistryError::Corrupt(format!("lovelace {} out of range", record.lovelace)))?;

        sqlx::query(
            "INSERT OR REPLACE INTO script_locks
                (tx_hash, output_index, script_address, script_cbor, lovelace, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.out_ref.tx_hash.to_hex())
        .bind(i64::from(record.out_ref.index))
        .bind(record.script_address.as_str())
        .bind(record.script_cbor.as_str())
        .bind(lovelace)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("Registered lock {} at {}", record.out_ref, record.script_address);
        Ok(())
    }

    pub async fn get(&self, out_ref: &OutRef) -> Result<Option<LockRecord>, RegistryError> {
        let row: Option<LockRow> = sqlx::query_as(
            "SELECT tx_hash, output_index, script_address, script_cbor, lovelace, created_at
             FROM script_locks WHERE tx_hash = ? AND output_index = ?",
        )
        .bind(out_ref.tx_hash.to_hex())
        .bind(i64::from(out_ref.index))
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    /// Most recently stored record
    pub async fn latest(&self) -> Result<Option<LockRecord>, RegistryError> {
        let row: Option<LockRow> = sqlx::query_as(
            "SELECT tx_hash, output_index, script_address, script_cbor, lovelace, created_at
             FROM script_locks ORDER BY rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }
}

fn record_from_row(row: LockRow) -> Result<LockRecord, RegistryError> {
    let (tx_hash, index, script_address, script_cbor, lovelace, created_at) = row;

    let tx_hash = TxHash::from_hex(&tx_hash)
        .map_err(|e| RegistryError::Corrupt(format!("tx_hash {}: {}", tx_hash, e)))?;
    let index = u32::try_from(index)
        .map_err(|_| RegistryError::Corrupt(format!("output_index {}", index)))?;
    let lovelace = u64::try_from(lovelace)
        .map_err(|_| RegistryError::Corrupt(format!("lovelace {}", lovelace)))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| RegistryError::Corrupt(format!("created_at {}: {}", created_at, e)))?
        .with_timezone(&Utc);

    Ok(LockRecord {
        out_ref: OutRef { tx_hash, index },
        script_address: Identity::from(script_address),
        script_cbor,
        lovelace,
        created_at,
    })
}
