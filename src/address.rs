//! Address Module
//!
//! Shelley-style payment addresses: one header byte followed by one or two
//! 28-byte credentials, rendered as bech32 (`addr_test1...` / `addr1...`).
//!
//! # Supported Header Types
//! - `0..=3`: base addresses (payment + stake credential)
//! - `6`: enterprise address with a key credential
//! - `7`: enterprise address with a script credential

use crate::{Identity, KeyHash, Network, ScriptHash};
use bech32::{Bech32, Hrp};

const CREDENTIAL_LEN: usize = 28;
const BASE_KEY_KEY: u8 = 0b0000;
const ENTERPRISE_KEY: u8 = 0b0110;
const ENTERPRISE_SCRIPT: u8 = 0b0111;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("bech32 error: {0}")]
    Bech32(String),
    #[error("unexpected address prefix {0}")]
    UnexpectedHrp(String),
    #[error("unsupported address type {0}")]
    UnsupportedType(u8),
    #[error("unknown network id {0}")]
    UnknownNetwork(u8),
    #[error("invalid address length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Payment credential carried by an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    Key(KeyHash),
    Script(ScriptHash),
}

/// Decoded payment address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    network: Network,
    payment: Credential,
    bytes: Vec<u8>,
}

impl Address {
    /// Enterprise address paying to a single key
    pub fn from_key_hash(network: Network, key_hash: KeyHash) -> Self {
        let mut bytes = Vec::with_capacity(1 + CREDENTIAL_LEN);
        bytes.push((ENTERPRISE_KEY << 4) | network.id());
        bytes.extend_from_slice(key_hash.as_bytes());
        Self {
            network,
            payment: Credential::Key(key_hash),
            bytes,
        }
    }

    /// Base address: payment key plus stake key, as HD wallets hand out
    pub fn base(network: Network, payment: KeyHash, stake: KeyHash) -> Self {
        let mut bytes = Vec::with_capacity(1 + 2 * CREDENTIAL_LEN);
        bytes.push((BASE_KEY_KEY << 4) | network.id());
        bytes.extend_from_slice(payment.as_bytes());
        bytes.extend_from_slice(stake.as_bytes());
        Self {
            network,
            payment: Credential::Key(payment),
            bytes,
        }
    }

    /// Enterprise address locked by a script
    pub fn from_script_hash(network: Network, script_hash: ScriptHash) -> Self {
        let mut bytes = Vec::with_capacity(1 + CREDENTIAL_LEN);
        bytes.push((ENTERPRISE_SCRIPT << 4) | network.id());
        bytes.extend_from_slice(script_hash.as_bytes());
        Self {
            network,
            payment: Credential::Script(script_hash),
            bytes,
        }
    }

    /// Decode raw address bytes (header byte first)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let header = *bytes.first().ok_or(AddressError::InvalidLength {
            expected: 1 + CREDENTIAL_LEN,
            actual: 0,
        })?;
        let kind = header >> 4;
        let network =
            Network::from_id(header & 0x0f).ok_or(AddressError::UnknownNetwork(header & 0x0f))?;

        let expected = match kind {
            0..=3 => 1 + 2 * CREDENTIAL_LEN,
            ENTERPRISE_KEY | ENTERPRISE_SCRIPT => 1 + CREDENTIAL_LEN,
            other => return Err(AddressError::UnsupportedType(other)),
        };
        if bytes.len() != expected {
            return Err(AddressError::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }

        // Bit 0 of the type nibble marks a script payment credential
        let payment_bytes = &bytes[1..1 + CREDENTIAL_LEN];
        let payment = if kind & 1 == 1 {
            Credential::Script(
                ScriptHash::from_slice(payment_bytes).map_err(|_| length_error(payment_bytes))?,
            )
        } else {
            Credential::Key(KeyHash::from_slice(payment_bytes).map_err(|_| length_error(payment_bytes))?)
        };

        Ok(Self {
            network,
            payment,
            bytes: bytes.to_vec(),
        })
    }

    /// Parse a bech32 address, checking the prefix against its network
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;
        let address = Self::from_bytes(&data)?;
        if hrp.as_str() != address.network.address_hrp() {
            return Err(AddressError::UnexpectedHrp(hrp.to_string()));
        }
        Ok(address)
    }

    pub fn to_bech32(&self) -> Result<String, AddressError> {
        let hrp = Hrp::parse(self.network.address_hrp())
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.bytes).map_err(|e| AddressError::Bech32(e.to_string()))
    }

    pub fn to_identity(&self) -> Result<Identity, AddressError> {
        self.to_bech32().map(Identity::from)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn payment(&self) -> Credential {
        self.payment
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&Identity> for Address {
    type Error = AddressError;

    fn try_from(identity: &Identity) -> Result<Self, Self::Error> {
        Self::parse(identity.as_str())
    }
}

fn length_error(bytes: &[u8]) -> AddressError {
    AddressError::InvalidLength {
        expected: CREDENTIAL_LEN,
        actual: bytes.len(),
    }
}
