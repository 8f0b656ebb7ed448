use super::{LedgerClient, LedgerError};
use crate::tx::Transaction;
use crate::{Identity, OutRef, TxHash, Utxo};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

const MAINNET_URL: &str = "https://cardano-mainnet.blockfrost.io/api/v0";
const PREPROD_URL: &str = "https://cardano-preprod.blockfrost.io/api/v0";
const PREVIEW_URL: &str = "https://cardano-preview.blockfrost.io/api/v0";

/// Blockfrost returns at most this many UTXOs per page
const PAGE_SIZE: usize = 100;

/// Ledger client backed by the Blockfrost HTTP API
pub struct BlockfrostClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct RawUtxo {
    tx_hash: String,
    output_index: u32,
    amount: Vec<RawAmount>,
}

impl BlockfrostClient {
    /// Creates a client for the given project key
    ///
    /// Without an explicit `base_url`, the network is taken from the key
    /// prefix (`mainnet...`, `preview...`, otherwise preprod).
    pub fn new(project_id: impl Into<String>, base_url: Option<String>) -> Self {
        let project_id = project_id.into();
        let base_url = base_url.unwrap_or_else(|| Self::base_url_for(&project_id).to_string());
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
        }
    }

    pub fn base_url_for(project_id: &str) -> &'static str {
        if project_id.starts_with("mainnet") {
            MAINNET_URL
        } else if project_id.starts_with("preview") {
            PREVIEW_URL
        } else {
            PREPROD_URL
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn api_error(response: reqwest::Response) -> LedgerError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        LedgerError::Api { status, message }
    }
}

fn parse_utxo(raw: RawUtxo, address: &Identity) -> Result<Utxo, LedgerError> {
    let tx_hash = TxHash::from_hex(&raw.tx_hash)
        .map_err(|e| LedgerError::InvalidResponse(format!("tx_hash {}: {}", raw.tx_hash, e)))?;

    // Native assets are ignored; only the ADA amount matters here
    let lovelace = match raw.amount.iter().find(|a| a.unit == "lovelace") {
        Some(amount) => amount.quantity.parse::<u64>().map_err(|e| {
            LedgerError::InvalidResponse(format!("lovelace quantity {}: {}", amount.quantity, e))
        })?,
        None => 0,
    };

    Ok(Utxo {
        out_ref: OutRef {
            tx_hash,
            index: raw.output_index,
        },
        address: address.clone(),
        lovelace,
    })
}

#[async_trait]
impl LedgerClient for BlockfrostClient {
    async fn utxos(&self, address: &Identity) -> Result<Vec<Utxo>, LedgerError> {
        let mut utxos = Vec::new();
        let mut page = 1;

        loop {
            let url = format!("{}/addresses/{}/utxos?page={}", self.base_url, address, page);
            debug!("GET {}", url);
            let response = self
                .http
                .get(&url)
                .header("project_id", &self.project_id)
                .send()
                .await?;

            // An address that never received funds is unknown to the indexer
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }
            if !response.status().is_success() {
                return Err(Self::api_error(response).await);
            }

            let raw: Vec<RawUtxo> = response.json().await?;
            let count = raw.len();
            for entry in raw {
                utxos.push(parse_utxo(entry, address)?);
            }
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!("Found {} UTXOs at {}", utxos.len(), address);
        Ok(utxos)
    }

    async fn submit(&self, tx: &Transaction) -> Result<TxHash, LedgerError> {
        let body = tx.to_cbor()?;
        let url = format!("{}/tx/submit", self.base_url);
        info!("Submitting transaction ({} bytes)", body.len());

        let response = self
            .http
            .post(&url)
            .header("project_id", &self.project_id)
            .header(CONTENT_TYPE, "application/cbor")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let hash: String = response.json().await?;
        TxHash::from_hex(&hash)
            .map_err(|e| LedgerError::InvalidResponse(format!("submitted tx hash {}: {}", hash, e)))
    }
}
