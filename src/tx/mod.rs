//! Transaction Module
//!
//! This module assembles ADA-only transactions:
//! - `Transaction`: body, verification-key witnesses and attached native scripts
//! - `TxBuilder`: output declaration, coin selection and change
//!
//! Witnesses sign the transaction id (Blake2b-256 of the body CBOR), so signers
//! can be added one at a time without invalidating each other.

mod builder;
mod transaction;

pub use builder::TxBuilder;
pub use transaction::{Transaction, TxBody, TxError, TxOutput};
