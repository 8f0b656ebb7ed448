use super::{plan_distribution, Distribution, ScenarioReport};
use crate::ledger::{LedgerClient, LedgerError};
use crate::registry::{LockRecord, RegistryError};
use crate::script::{CardanoScriptEncoder, EncodedScript, ScriptError, ThresholdScriptEncoder};
use crate::tx::{TxBuilder, TxError};
use crate::validation::Validator;
use crate::wallet::{KeyDerivation, KeyProvider, WalletError};
use crate::{Identity, KeyHash, Network, OutRef, SeedWallet, TxHash, Utxo, ValidationFailure};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("multisig validation failed: {0}")]
    Authorization(ValidationFailure),
    #[error("expected {expected} signer wallets, loaded {actual}")]
    SignerSetSize { expected: usize, actual: usize },
    #[error("signer slot {slot} is outside 1..={total}")]
    InvalidSlot { slot: usize, total: usize },
    #[error("UTXO {0} not found at the script address")]
    UtxoNotFound(OutRef),
    #[error("wrong amount at {out_ref}: expected {expected} lovelace, found {found}")]
    AmountMismatch {
        out_ref: OutRef,
        expected: u64,
        found: u64,
    },
    #[error("cannot distribute {total} lovelace with a {fee_reserve} fee reserve among {recipients} recipients")]
    NothingToDistribute {
        total: u64,
        fee_reserve: u64,
        recipients: usize,
    },
}

/// A freshly generated signer wallet, ready to be stored in the environment
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    pub slot: usize,
    pub address: Identity,
    pub seed_json: String,
}

impl GeneratedWallet {
    /// `WALLET_SEEDS_<slot>='[...]'`
    pub fn env_line(&self) -> String {
        format!("WALLET_SEEDS_{}='{}'", self.slot, self.seed_json)
    }
}

/// Stage 1: brew `count` signer wallets
pub fn generate_wallets(
    network: Network,
    derivation: KeyDerivation,
    count: usize,
) -> Result<Vec<GeneratedWallet>, PipelineError> {
    (1..=count)
        .map(|slot| -> Result<GeneratedWallet, PipelineError> {
            let (wallet, words) = SeedWallet::generate_with(network, derivation)?;
            let seed_json = serde_json::to_string(&words).map_err(WalletError::from)?;
            info!("Generated wallet {} at {}", slot, wallet.address());
            Ok(GeneratedWallet {
                slot,
                address: wallet.address().clone(),
                seed_json,
            })
        })
        .collect()
}

/// The N authorized wallets, in slot order
#[derive(Debug)]
pub struct SignerSet {
    wallets: Vec<SeedWallet>,
}

impl SignerSet {
    pub fn identities(&self) -> Vec<Identity> {
        self.wallets.iter().map(|w| w.address().clone()).collect()
    }

    pub fn key_hashes(&self) -> Vec<KeyHash> {
        self.wallets.iter().map(|w| w.key_hash()).collect()
    }

    /// Wallet in 1-based `slot`
    pub fn get(&self, slot: usize) -> Option<&SeedWallet> {
        slot.checked_sub(1).and_then(|i| self.wallets.get(i))
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

/// Outcome of locking funds at a script address
#[derive(Debug, Clone, Serialize)]
pub struct LockReceipt {
    pub out_ref: OutRef,
    pub script_address: Identity,
    pub script_cbor: String,
    pub lovelace: u64,
}

impl LockReceipt {
    pub fn to_record(&self) -> LockRecord {
        LockRecord {
            out_ref: self.out_ref,
            script_address: self.script_address.clone(),
            script_cbor: self.script_cbor.clone(),
            lovelace: self.lovelace,
            created_at: Utc::now(),
        }
    }

    /// Environment lines that point a later spend at this output
    pub fn env_lines(&self) -> Vec<String> {
        vec![
            format!("MULTISIG_UTXO_HASH=\"{}\"", self.out_ref.tx_hash),
            format!("MULTISIG_UTXO_INDEX=\"{}\"", self.out_ref.index),
            format!("MULTISIG_SCRIPT_ADDRESS=\"{}\"", self.script_address),
            format!("MULTISIG_SCRIPT_CBOR=\"{}\"", self.script_cbor),
        ]
    }
}

/// Which locked output to spend and how
#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub out_ref: OutRef,
    pub expected_lovelace: u64,
    pub fee_reserve: u64,
    /// 1-based signer slots
    pub slots: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendReceipt {
    pub tx_hash: TxHash,
    pub signers: Vec<Identity>,
    pub distribution: Distribution,
}

/// Multisig exercise pipeline
///
/// All collaborators are injected; nothing is read from global state.
pub struct MultisigPipeline {
    ledger: Arc<dyn LedgerClient>,
    encoder: Arc<dyn ThresholdScriptEncoder>,
    validator: Validator,
    network: Network,
    derivation: KeyDerivation,
    /// Fixed fee charged on every transaction the pipeline builds
    fee: u64,
}

impl MultisigPipeline {
    pub fn new(ledger: Arc<dyn LedgerClient>, validator: Validator, network: Network, fee: u64) -> Self {
        Self {
            ledger,
            encoder: Arc::new(CardanoScriptEncoder::new(network)),
            validator,
            network,
            derivation: KeyDerivation::default(),
            fee,
        }
    }

    /// How seed phrases become keys; CIP-1852 unless told otherwise
    pub fn with_derivation(mut self, derivation: KeyDerivation) -> Self {
        self.derivation = derivation;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ThresholdScriptEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn load_wallet(&self, seed_json: &str) -> Result<SeedWallet, PipelineError> {
        Ok(SeedWallet::from_json_with(seed_json, self.network, self.derivation)?)
    }

    /// Stage 2: load one wallet per authorized slot
    pub fn load_signers(&self, seeds: &[String]) -> Result<SignerSet, PipelineError> {
        let expected = self.validator.policy().total();
        if seeds.len() != expected {
            return Err(PipelineError::SignerSetSize {
                expected,
                actual: seeds.len(),
            });
        }

        let wallets = seeds
            .iter()
            .map(|seed| self.load_wallet(seed))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, wallet) in wallets.iter().enumerate() {
            debug!("Authorized wallet {}: {}", i + 1, wallet.address());
        }
        info!("Loaded {} authorized wallets", wallets.len());

        Ok(SignerSet { wallets })
    }

    /// Stage 3: the M-of-N native script over the signers' key hashes
    pub fn build_script(&self, signers: &SignerSet) -> Result<EncodedScript, PipelineError> {
        let script = self
            .encoder
            .encode(&self.validator.policy(), &signers.key_hashes())?;
        info!(
            "Native script {} ready at {}",
            self.validator.policy(),
            script.address
        );
        Ok(script)
    }

    /// Single-signer payment of `lovelace` from `from` to `to`
    ///
    /// The payment is always output 0; change returns to the sender.
    pub async fn transfer(
        &self,
        from: &SeedWallet,
        to: &Identity,
        lovelace: u64,
    ) -> Result<TxHash, PipelineError> {
        let utxos = self.ledger.utxos(from.address()).await?;
        debug!("Sender {} holds {} UTXOs", from.address(), utxos.len());

        let mut tx = TxBuilder::new(self.fee)
            .tx_out(to.clone(), lovelace)
            .change_address(from.address().clone())
            .select_utxos_from(utxos)
            .complete()?;
        tx.sign_partial(from)?;

        let tx_hash = self.ledger.submit(&tx).await?;
        info!("Sent {} lovelace to {} in {}", lovelace, to, tx_hash);
        Ok(tx_hash)
    }

    /// Stage 4: send `lovelace` from the funding wallet to the script address
    pub async fn lock_funds(
        &self,
        funding: &SeedWallet,
        script: &EncodedScript,
        lovelace: u64,
    ) -> Result<LockReceipt, PipelineError> {
        let tx_hash = self.transfer(funding, &script.address, lovelace).await?;
        info!("Locked {} lovelace at {}", lovelace, script.address);

        Ok(LockReceipt {
            out_ref: OutRef { tx_hash, index: 0 },
            script_address: script.address.clone(),
            script_cbor: script.cbor_hex(),
            lovelace,
        })
    }

    /// Stage 5: the standard validator scenarios over the loaded wallets
    pub fn run_scenarios(&self, signers: &SignerSet) -> ScenarioReport {
        ScenarioReport::run(&self.validator, &signers.identities())
    }

    /// Pick the wallets in `slots` and check them against the policy
    pub fn authorize<'a>(
        &self,
        signers: &'a SignerSet,
        slots: &[usize],
    ) -> Result<Vec<&'a SeedWallet>, PipelineError> {
        let selected = slots
            .iter()
            .map(|&slot| {
                signers.get(slot).ok_or(PipelineError::InvalidSlot {
                    slot,
                    total: signers.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let signing: Vec<Identity> = selected.iter().map(|w| w.address().clone()).collect();
        match self
            .validator
            .validate(&signers.identities(), &signing)
            .into_result()
        {
            Ok(message) => {
                info!("{}", message);
                Ok(selected)
            }
            Err(failure) => {
                warn!("Refusing to spend: {}", failure);
                Err(PipelineError::Authorization(failure))
            }
        }
    }

    /// Find `out_ref` at `address` and check that it holds `expected` lovelace
    pub async fn locate_utxo(
        &self,
        address: &Identity,
        out_ref: OutRef,
        expected: u64,
    ) -> Result<Utxo, PipelineError> {
        let utxos = self.ledger.utxos(address).await?;
        debug!("Searching {} UTXOs for {}", utxos.len(), out_ref);

        let utxo = utxos
            .into_iter()
            .find(|u| u.out_ref == out_ref)
            .ok_or(PipelineError::UtxoNotFound(out_ref))?;

        if utxo.lovelace != expected {
            return Err(PipelineError::AmountMismatch {
                out_ref,
                expected,
                found: utxo.lovelace,
            });
        }
        Ok(utxo)
    }

    /// Stage 6: distribute a locked output among the selected signers
    ///
    /// Each selected signer receives an equal share of the amount minus the
    /// fee reserve, the first also receives the remainder and the change. The
    /// transaction carries the native script and one witness per signer.
    pub async fn spend(
        &self,
        signers: &SignerSet,
        script: &EncodedScript,
        request: &SpendRequest,
    ) -> Result<SpendReceipt, PipelineError> {
        let selected = self.authorize(signers, &request.slots)?;
        let utxo = self
            .locate_utxo(&script.address, request.out_ref, request.expected_lovelace)
            .await?;
        info!("Target UTXO {} verified", utxo.out_ref);

        let recipients: Vec<Identity> = selected.iter().map(|w| w.address().clone()).collect();
        let distribution = plan_distribution(utxo.lovelace, request.fee_reserve, &recipients)?;

        let mut builder = TxBuilder::new(self.fee);
        for (recipient, amount) in &distribution.payouts {
            debug!("Output: {} lovelace to {}", amount, recipient);
            builder = builder.tx_out(recipient.clone(), *amount);
        }
        let mut tx = builder
            .change_address(recipients[0].clone())
            .select_utxos_from([utxo])
            .native_script(script.script.clone())
            .complete()?;

        for (i, wallet) in selected.iter().enumerate() {
            debug!("Signing with signer {}", i + 1);
            tx.sign_partial(*wallet)?;
        }
        info!("{} signatures applied", selected.len());

        let tx_hash = self.ledger.submit(&tx).await?;
        info!("Distributed funds with {} multisig in {}", self.validator.policy(), tx_hash);

        Ok(SpendReceipt {
            tx_hash,
            signers: recipients,
            distribution,
        })
    }
}
