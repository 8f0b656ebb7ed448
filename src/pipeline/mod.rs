//! Multisig Exercise Pipeline Module
//!
//! This module runs the exercise end to end as an explicit sequence of stages,
//! each with typed inputs and outputs. Any failing stage stops the run.
//!
//! # Stages
//! 1. Generate signer wallets (seed lines for the environment)
//! 2. Load the N authorized wallets
//! 3. Build the M-of-N native script and its address
//! 4. Lock funds at the script address
//! 5. Exercise the validator against the standard scenarios
//! 6. Authorize the chosen signers, locate the locked output, distribute it
//!    among the signers, collect partial signatures and submit

mod distribution;
mod scenarios;
mod stages;

#[cfg(test)]
mod tests;

pub use distribution::{plan_distribution, Distribution};
pub use scenarios::{Scenario, ScenarioReport, UNAUTHORIZED_SIGNER};
pub use stages::{
    generate_wallets, GeneratedWallet, LockReceipt, MultisigPipeline, PipelineError, SignerSet,
    SpendReceipt, SpendRequest,
};
