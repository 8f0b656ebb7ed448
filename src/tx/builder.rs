use super::{Transaction, TxBody, TxError, TxOutput};
use crate::address::Address;
use crate::script::NativeScript;
use crate::{Identity, Utxo};
use tracing::debug;

/// Fluent transaction builder
///
/// Declared outputs are paid first, then the fixed fee; whatever the selected
/// inputs hold beyond that goes back to the change address.
///
/// # Coin Selection
/// Largest-first over the UTXOs offered through `select_utxos_from`, stopping
/// as soon as outputs plus fee are covered.
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    outputs: Vec<TxOutput>,
    change_address: Option<Identity>,
    available: Vec<Utxo>,
    native_scripts: Vec<NativeScript>,
    fee: u64,
}

impl TxBuilder {
    pub fn new(fee: u64) -> Self {
        Self {
            fee,
            ..Self::default()
        }
    }

    pub fn tx_out(mut self, address: Identity, lovelace: u64) -> Self {
        self.outputs.push(TxOutput { address, lovelace });
        self
    }

    pub fn change_address(mut self, address: Identity) -> Self {
        self.change_address = Some(address);
        self
    }

    pub fn select_utxos_from(mut self, utxos: impl IntoIterator<Item = Utxo>) -> Self {
        self.available.extend(utxos);
        self
    }

    /// Attach a native script witness for spending script-locked inputs
    pub fn native_script(mut self, script: NativeScript) -> Self {
        self.native_scripts.push(script);
        self
    }

    pub fn complete(self) -> Result<Transaction, TxError> {
        if self.outputs.is_empty() {
            return Err(TxError::NoOutputs);
        }
        let change_address = self.change_address.ok_or(TxError::MissingChangeAddress)?;

        // Reject malformed addresses before any selection work
        Address::try_from(&change_address)?;
        for output in &self.outputs {
            Address::try_from(&output.address)?;
        }

        let required = self
            .outputs
            .iter()
            .try_fold(self.fee, |acc, o| acc.checked_add(o.lovelace))
            .ok_or(TxError::Overflow)?;

        let mut candidates = self.available;
        candidates.sort_by(|a, b| b.lovelace.cmp(&a.lovelace));

        let mut selected = Vec::new();
        let mut gathered: u64 = 0;
        for utxo in candidates {
            if gathered >= required {
                break;
            }
            gathered = gathered.checked_add(utxo.lovelace).ok_or(TxError::Overflow)?;
            selected.push(utxo);
        }

        if gathered < required {
            return Err(TxError::InsufficientFunds {
                required,
                available: gathered,
            });
        }

        let mut outputs = self.outputs;
        let change = gathered - required;
        if change > 0 {
            outputs.push(TxOutput {
                address: change_address,
                lovelace: change,
            });
        }

        debug!(
            "Built transaction: {} inputs, {} outputs, fee {}, change {}",
            selected.len(),
            outputs.len(),
            self.fee,
            change
        );

        let mut tx = Transaction::new(TxBody {
            inputs: selected.into_iter().map(|u| u.out_ref).collect(),
            outputs,
            fee: self.fee,
        });
        tx.native_scripts = self.native_scripts;
        Ok(tx)
    }
}
