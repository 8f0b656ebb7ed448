use crate::address::AddressError;
use crate::tx::{Transaction, TxError};
use crate::{Identity, OutRef, ScriptHash, TxHash, Utxo};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ledger api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("input {0} is not an unspent output")]
    MissingInput(OutRef),
    #[error("input {0} is spent twice")]
    DuplicateInput(OutRef),
    #[error("input at {0} lacks its owner's signature")]
    MissingSignature(Identity),
    #[error("no native script with hash {0} attached")]
    MissingScript(ScriptHash),
    #[error("native script {0} not satisfied by the attached signatures")]
    ScriptNotSatisfied(ScriptHash),
    #[error("value not preserved: consumed {consumed}, produced {produced}")]
    ValueMismatch { consumed: u64, produced: u64 },
    #[error("outputs plus fee exceed the lovelace range")]
    ValueOverflow,
}

/// Remote ledger capabilities used by the exercise pipeline
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Unspent outputs currently held at `address`
    async fn utxos(&self, address: &Identity) -> Result<Vec<Utxo>, LedgerError>;

    /// Submit a signed transaction, returning its id on acceptance
    async fn submit(&self, tx: &Transaction) -> Result<TxHash, LedgerError>;
}
