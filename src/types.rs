use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Spending credential used as a signer or authorization token
///
/// Usually a wallet's bech32 address or a hex public-key hash. Two identities
/// are equal only when their string values match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Target network, encoded in the low nibble of every address header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn id(self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Network::Testnet),
            1 => Some(Network::Mainnet),
            _ => None,
        }
    }

    /// Human-readable part used for bech32 payment addresses
    pub fn address_hrp(self) -> &'static str {
        match self {
            Network::Testnet => "addr_test",
            Network::Mainnet => "addr",
        }
    }
}

/// Error parsing a fixed-size hash from hex
#[derive(Debug, thiserror::Error)]
pub enum ParseHashError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

macro_rules! hash_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseHashError> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| ParseHashError::Length {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(array))
            }

            pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
                Self::from_slice(&hex::decode(s)?)
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hash_type!(
    /// Blake2b-224 hash of an Ed25519 verification key
    KeyHash,
    28
);

hash_type!(
    /// Blake2b-224 hash of a tagged native script
    ScriptHash,
    28
);

hash_type!(
    /// Blake2b-256 hash of a transaction body
    TxHash,
    32
);

impl KeyHash {
    pub fn of_vkey(vkey: &[u8]) -> Self {
        let digest = Blake2b224::digest(vkey);
        let mut out = [0u8; 28];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// The key hash as an Identity, for on-chain key-hash based policies
    pub fn to_identity(&self) -> Identity {
        Identity(self.to_hex())
    }
}

impl ScriptHash {
    /// Hash of `tag || script_bytes`; native scripts use tag 0
    pub fn of_tagged(tag: u8, script_bytes: &[u8]) -> Self {
        let mut hasher = Blake2b224::new();
        hasher.update([tag]);
        hasher.update(script_bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 28];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

impl TxHash {
    pub fn of_body(body_bytes: &[u8]) -> Self {
        let digest = Blake2b256::digest(body_bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }
}

/// Reference to a transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutRef {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl fmt::Display for OutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// Unspent transaction output holding ADA only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub out_ref: OutRef,
    pub address: Identity,
    pub lovelace: u64,
}

/// M-of-N signature policy
///
/// The invariant `0 < required <= total` is enforced at construction, so a
/// `Policy` value in hand is always well formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    required: usize,
    total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("policy requires at least one signature")]
    ZeroRequired,
    #[error("policy requires {required} signatures but only {total} wallets are authorized")]
    RequiredExceedsTotal { required: usize, total: usize },
}

impl Policy {
    pub fn new(required: usize, total: usize) -> Result<Self, PolicyError> {
        if required == 0 {
            return Err(PolicyError::ZeroRequired);
        }
        if required > total {
            return Err(PolicyError::RequiredExceedsTotal { required, total });
        }
        Ok(Self { required, total })
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl Default for Policy {
    /// 3-of-5
    fn default() -> Self {
        Self {
            required: 3,
            total: 5,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-of-{}", self.required, self.total)
    }
}

/// How the signer count is compared against the required count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CountBound {
    Exactly,
    AtLeast,
}

impl fmt::Display for CountBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountBound::Exactly => f.write_str("exactly"),
            CountBound::AtLeast => f.write_str("at least"),
        }
    }
}

/// Reason a signing set was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationFailure {
    #[error("expected {expected} authorized wallets, found {actual}")]
    AuthorizedSetSizeMismatch { expected: usize, actual: usize },
    #[error("multisig {required}-of-{total} requires {bound} {required} signatures, {actual} provided")]
    SignerCountMismatch {
        required: usize,
        total: usize,
        actual: usize,
        bound: CountBound,
    },
    #[error("duplicate signers detected, each wallet may sign only once")]
    DuplicateSigner,
    #[error("unauthorized signers detected: {unauthorized} of {signers}")]
    UnauthorizedSigner { unauthorized: usize, signers: usize },
}

/// Terminal verdict on a signing set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    message: String,
    failure: Option<ValidationFailure>,
}

impl ValidationResult {
    pub(crate) fn accepted(message: String) -> Self {
        Self {
            is_valid: true,
            message,
            failure: None,
        }
    }

    pub(crate) fn rejected(failure: ValidationFailure) -> Self {
        Self {
            is_valid: false,
            message: failure.to_string(),
            failure: Some(failure),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failure(&self) -> Option<&ValidationFailure> {
        self.failure.as_ref()
    }

    /// Converts the verdict into a `Result`, yielding the success message
    pub fn into_result(self) -> Result<String, ValidationFailure> {
        match self.failure {
            None => Ok(self.message),
            Some(failure) => Err(failure),
        }
    }
}
