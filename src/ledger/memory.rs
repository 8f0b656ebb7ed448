use super::{LedgerClient, LedgerError};
use crate::address::{Address, Credential};
use crate::tx::Transaction;
use crate::{Identity, OutRef, TxHash, Utxo};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct LedgerState {
    utxos: HashMap<OutRef, Utxo>,
    submitted: Vec<TxHash>,
    minted: u64,
}

/// In-memory UTXO ledger
///
/// Cheap to clone; clones share the same UTXO set.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh UTXO at `address` out of thin air
    pub async fn fund(&self, address: &Identity, lovelace: u64) -> Utxo {
        let mut state = self.state.write().await;
        state.minted += 1;
        let seed = format!("genesis/{}/{}", state.minted, address);
        let utxo = Utxo {
            out_ref: OutRef {
                tx_hash: TxHash::of_body(seed.as_bytes()),
                index: 0,
            },
            address: address.clone(),
            lovelace,
        };
        state.utxos.insert(utxo.out_ref, utxo.clone());
        debug!("Funded {} with {} lovelace", address, lovelace);
        utxo
    }

    /// Ids of accepted transactions, in submission order
    pub async fn submitted(&self) -> Vec<TxHash> {
        self.state.read().await.submitted.clone()
    }

    pub async fn balance(&self, address: &Identity) -> u64 {
        let state = self.state.read().await;
        state
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .fold(0u64, |acc, u| acc.saturating_add(u.lovelace))
    }

    /// Check that each input is unspent and properly witnessed
    fn authorize_inputs(
        state: &LedgerState,
        tx: &Transaction,
    ) -> Result<u64, LedgerError> {
        let signers = tx.signer_key_hashes();
        let mut seen = HashSet::new();
        let mut consumed: u64 = 0;

        for input in &tx.body.inputs {
            if !seen.insert(*input) {
                return Err(LedgerError::DuplicateInput(*input));
            }
            let utxo = state
                .utxos
                .get(input)
                .ok_or(LedgerError::MissingInput(*input))?;

            match Address::try_from(&utxo.address)?.payment() {
                Credential::Key(key_hash) => {
                    if !signers.contains(&key_hash) {
                        return Err(LedgerError::MissingSignature(utxo.address.clone()));
                    }
                }
                Credential::Script(script_hash) => {
                    let script = tx
                        .native_scripts
                        .iter()
                        .find(|s| s.hash().map(|h| h == script_hash).unwrap_or(false))
                        .ok_or(LedgerError::MissingScript(script_hash))?;
                    if !script.is_satisfied_by(&signers) {
                        return Err(LedgerError::ScriptNotSatisfied(script_hash));
                    }
                }
            }

            consumed = consumed
                .checked_add(utxo.lovelace)
                .ok_or_else(|| LedgerError::InvalidResponse("input value overflow".to_string()))?;
        }

        Ok(consumed)
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn utxos(&self, address: &Identity) -> Result<Vec<Utxo>, LedgerError> {
        let state = self.state.read().await;
        let mut utxos: Vec<Utxo> = state
            .utxos
            .values()
            .filter(|u| &u.address == address)
            .cloned()
            .collect();
        utxos.sort_by(|a, b| {
            (a.out_ref.tx_hash, a.out_ref.index).cmp(&(b.out_ref.tx_hash, b.out_ref.index))
        });
        Ok(utxos)
    }

    async fn submit(&self, tx: &Transaction) -> Result<TxHash, LedgerError> {
        tx.verify_witnesses()?;
        let id = tx.id()?;

        let mut state = self.state.write().await;
        let consumed = match Self::authorize_inputs(&state, tx) {
            Ok(consumed) => consumed,
            Err(e) => {
                warn!("Rejected transaction {}: {}", id, e);
                return Err(e);
            }
        };

        let Some(produced) = tx
            .body
            .total_output()
            .and_then(|total| total.checked_add(tx.body.fee))
        else {
            warn!("Rejected transaction {}: output value overflows", id);
            return Err(LedgerError::ValueOverflow);
        };
        if consumed != produced {
            warn!("Rejected transaction {}: value not preserved", id);
            return Err(LedgerError::ValueMismatch { consumed, produced });
        }

        for input in &tx.body.inputs {
            state.utxos.remove(input);
        }
        for (index, output) in tx.body.outputs.iter().enumerate() {
            let out_ref = OutRef {
                tx_hash: id,
                index: index as u32,
            };
            state.utxos.insert(
                out_ref,
                Utxo {
                    out_ref,
                    address: output.address.clone(),
                    lovelace: output.lovelace,
                },
            );
        }
        state.submitted.push(id);

        info!("Accepted transaction {}", id);
        Ok(id)
    }
}
