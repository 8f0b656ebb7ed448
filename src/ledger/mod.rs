//! Ledger Integration Module
//!
//! This module handles every interaction with the UTXO ledger:
//! - Queries unspent outputs held at an address
//! - Submits fully signed transactions and returns their id
//!
//! `BlockfrostClient` talks to a hosted chain indexer over HTTP.
//! `InMemoryLedger` keeps UTXOs in memory and enforces key and native-script
//! witnesses the way the network does, for local runs and tests.

mod blockfrost;
mod client;
mod memory;

pub use blockfrost::BlockfrostClient;
pub use client::{LedgerClient, LedgerError};
pub use memory::InMemoryLedger;
