//! Lock Registry Module
//!
//! This module provides a database registry for outputs locked behind
//! multisig scripts.

mod database;
pub use database::{LockRecord, Registry, RegistryError};
