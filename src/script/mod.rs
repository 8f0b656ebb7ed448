//! Native Script Module
//!
//! This module models the threshold predicates the ledger enforces on-chain:
//! - `NativeScript`: signature, all, any and at-least combinators
//! - `ThresholdScriptEncoder`: turns an M-of-N policy into a script and its address
//! - `CardanoScriptEncoder`: the encoder for Shelley enterprise script addresses

mod encoder;
mod native;

pub use encoder::{CardanoScriptEncoder, EncodedScript, ThresholdScriptEncoder};
pub use native::{NativeScript, ScriptError};
