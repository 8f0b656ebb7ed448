use crate::address::{Address, AddressError};
use crate::script::NativeScript;
use crate::wallet::{KeyProvider, VkeyWitness};
use crate::{Identity, KeyHash, OutRef, TxHash};
use serde_cbor::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),
    #[error("cbor error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("insufficient funds: required {required} lovelace, available {available}")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("no change address set")]
    MissingChangeAddress,
    #[error("lovelace amount overflow")]
    Overflow,
    #[error("invalid signature from key {0}")]
    InvalidWitness(KeyHash),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Identity,
    pub lovelace: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<OutRef>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
}

impl TxBody {
    /// Body map with keys 0 (inputs), 1 (outputs) and 2 (fee)
    pub fn to_cbor_value(&self) -> Result<Value, TxError> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                Value::Array(vec![
                    Value::Bytes(input.tx_hash.as_bytes().to_vec()),
                    Value::Integer(i128::from(input.index)),
                ])
            })
            .collect();

        let outputs = self
            .outputs
            .iter()
            .map(|output| {
                let address = Address::try_from(&output.address)?;
                Ok(Value::Array(vec![
                    Value::Bytes(address.as_bytes().to_vec()),
                    Value::Integer(i128::from(output.lovelace)),
                ]))
            })
            .collect::<Result<Vec<_>, TxError>>()?;

        let mut body = BTreeMap::new();
        body.insert(Value::Integer(0), Value::Array(inputs));
        body.insert(Value::Integer(1), Value::Array(outputs));
        body.insert(Value::Integer(2), Value::Integer(i128::from(self.fee)));
        Ok(Value::Map(body))
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, TxError> {
        Ok(serde_cbor::to_vec(&self.to_cbor_value()?)?)
    }

    /// Sum of all output amounts, `None` on overflow
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.lovelace))
    }
}

/// Transaction with its witness set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TxBody,
    pub vkey_witnesses: Vec<VkeyWitness>,
    pub native_scripts: Vec<NativeScript>,
}

impl Transaction {
    pub fn new(body: TxBody) -> Self {
        Self {
            body,
            vkey_witnesses: Vec::new(),
            native_scripts: Vec::new(),
        }
    }

    /// Transaction id: Blake2b-256 of the body CBOR
    pub fn id(&self) -> Result<TxHash, TxError> {
        Ok(TxHash::of_body(&self.body.to_cbor()?))
    }

    /// Add one signer's witness, keeping any witnesses already present
    ///
    /// Signing twice with the same key replaces that key's earlier witness.
    pub fn sign_partial(&mut self, signer: &dyn KeyProvider) -> Result<(), TxError> {
        let id = self.id()?;
        let witness = signer.sign(id.as_bytes());
        debug!("Adding witness from {} to {}", signer.identity(), id);

        match self.vkey_witnesses.iter_mut().find(|w| w.vkey == witness.vkey) {
            Some(existing) => *existing = witness,
            None => self.vkey_witnesses.push(witness),
        }
        Ok(())
    }

    /// Key hashes of every witness attached so far
    pub fn signer_key_hashes(&self) -> HashSet<KeyHash> {
        self.vkey_witnesses.iter().map(VkeyWitness::key_hash).collect()
    }

    /// Check that every witness signs this transaction's id
    pub fn verify_witnesses(&self) -> Result<(), TxError> {
        let id = self.id()?;
        for witness in &self.vkey_witnesses {
            if !witness.verify(id.as_bytes()) {
                return Err(TxError::InvalidWitness(witness.key_hash()));
            }
        }
        Ok(())
    }

    fn witness_set_value(&self) -> Value {
        let mut set = BTreeMap::new();
        if !self.vkey_witnesses.is_empty() {
            let witnesses = self
                .vkey_witnesses
                .iter()
                .map(|w| {
                    Value::Array(vec![
                        Value::Bytes(w.vkey.to_vec()),
                        Value::Bytes(w.signature.to_vec()),
                    ])
                })
                .collect();
            set.insert(Value::Integer(0), Value::Array(witnesses));
        }
        if !self.native_scripts.is_empty() {
            let scripts = self.native_scripts.iter().map(NativeScript::to_cbor_value).collect();
            set.insert(Value::Integer(1), Value::Array(scripts));
        }
        Value::Map(set)
    }

    /// Full transaction: `[body, witness_set, true, null]`
    pub fn to_cbor(&self) -> Result<Vec<u8>, TxError> {
        let tx = Value::Array(vec![
            self.body.to_cbor_value()?,
            self.witness_set_value(),
            Value::Bool(true),
            Value::Null,
        ]);
        Ok(serde_cbor::to_vec(&tx)?)
    }
}
