//! Multisig Authorization Module
//!
//! This module decides whether a proposed set of signers satisfies an M-of-N
//! policy over a fixed set of authorized wallets. It runs before any spend is
//! assembled and never touches the network.

mod validator;


pub use validator::{validate, Validator};
