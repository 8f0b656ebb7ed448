use crate::address::AddressError;
use crate::{KeyHash, ScriptHash};
use serde::{Deserialize, Serialize};
use serde_cbor::Value;
use std::collections::HashSet;

/// Hash tag prepended to native scripts before hashing
pub const NATIVE_SCRIPT_TAG: u8 = 0;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("cbor error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("malformed native script: {0}")]
    Malformed(String),
    #[error("policy covers {expected} keys but {actual} key hashes were given")]
    KeyCountMismatch { expected: usize, actual: usize },
    #[error("key hash {0} appears more than once")]
    DuplicateKey(KeyHash),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Boolean predicate over transaction signers
///
/// The JSON form mirrors the usual wallet tooling layout, e.g.
/// `{"type": "atLeast", "required": 3, "scripts": [{"type": "sig", "keyHash": "..."}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NativeScript {
    Sig {
        #[serde(rename = "keyHash")]
        key_hash: KeyHash,
    },
    All {
        scripts: Vec<NativeScript>,
    },
    Any {
        scripts: Vec<NativeScript>,
    },
    AtLeast {
        required: u32,
        scripts: Vec<NativeScript>,
    },
}

impl NativeScript {
    /// `required` of the given keys must sign
    pub fn threshold(required: u32, key_hashes: &[KeyHash]) -> Self {
        NativeScript::AtLeast {
            required,
            scripts: key_hashes
                .iter()
                .map(|key_hash| NativeScript::Sig { key_hash: *key_hash })
                .collect(),
        }
    }

    /// Evaluate the predicate against the set of keys that signed
    pub fn is_satisfied_by(&self, signers: &HashSet<KeyHash>) -> bool {
        match self {
            NativeScript::Sig { key_hash } => signers.contains(key_hash),
            NativeScript::All { scripts } => scripts.iter().all(|s| s.is_satisfied_by(signers)),
            NativeScript::Any { scripts } => scripts.iter().any(|s| s.is_satisfied_by(signers)),
            NativeScript::AtLeast { required, scripts } => {
                let satisfied = scripts.iter().filter(|s| s.is_satisfied_by(signers)).count();
                satisfied >= *required as usize
            }
        }
    }

    /// Every key hash referenced anywhere in the script, in order
    pub fn key_hashes(&self) -> Vec<KeyHash> {
        let mut out = Vec::new();
        self.collect_key_hashes(&mut out);
        out
    }

    fn collect_key_hashes(&self, out: &mut Vec<KeyHash>) {
        match self {
            NativeScript::Sig { key_hash } => out.push(*key_hash),
            NativeScript::All { scripts }
            | NativeScript::Any { scripts }
            | NativeScript::AtLeast { scripts, .. } => {
                for script in scripts {
                    script.collect_key_hashes(out);
                }
            }
        }
    }

    pub fn to_cbor_value(&self) -> Value {
        match self {
            NativeScript::Sig { key_hash } => Value::Array(vec![
                Value::Integer(0),
                Value::Bytes(key_hash.as_bytes().to_vec()),
            ]),
            NativeScript::All { scripts } => {
                Value::Array(vec![Value::Integer(1), list_value(scripts)])
            }
            NativeScript::Any { scripts } => {
                Value::Array(vec![Value::Integer(2), list_value(scripts)])
            }
            NativeScript::AtLeast { required, scripts } => Value::Array(vec![
                Value::Integer(3),
                Value::Integer(i128::from(*required)),
                list_value(scripts),
            ]),
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, ScriptError> {
        Ok(serde_cbor::to_vec(&self.to_cbor_value())?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ScriptError> {
        let value: Value = serde_cbor::from_slice(bytes)?;
        Self::from_cbor_value(&value)
    }

    pub fn from_cbor_value(value: &Value) -> Result<Self, ScriptError> {
        let Value::Array(items) = value else {
            return Err(malformed("script is not an array"));
        };
        let Some(Value::Integer(tag)) = items.first() else {
            return Err(malformed("missing script tag"));
        };

        match (*tag, items.as_slice()) {
            (0, [_, Value::Bytes(hash)]) => Ok(NativeScript::Sig {
                key_hash: KeyHash::from_slice(hash).map_err(|e| malformed(e.to_string()))?,
            }),
            (1, [_, Value::Array(scripts)]) => Ok(NativeScript::All {
                scripts: parse_list(scripts)?,
            }),
            (2, [_, Value::Array(scripts)]) => Ok(NativeScript::Any {
                scripts: parse_list(scripts)?,
            }),
            (3, [_, Value::Integer(required), Value::Array(scripts)]) => Ok(NativeScript::AtLeast {
                required: u32::try_from(*required)
                    .map_err(|_| malformed(format!("invalid threshold {}", required)))?,
                scripts: parse_list(scripts)?,
            }),
            (tag, _) => Err(malformed(format!("unsupported script tag {} or shape", tag))),
        }
    }

    pub fn hash(&self) -> Result<ScriptHash, ScriptError> {
        Ok(ScriptHash::of_tagged(NATIVE_SCRIPT_TAG, &self.to_cbor()?))
    }
}

fn list_value(scripts: &[NativeScript]) -> Value {
    Value::Array(scripts.iter().map(NativeScript::to_cbor_value).collect())
}

fn parse_list(values: &[Value]) -> Result<Vec<NativeScript>, ScriptError> {
    values.iter().map(NativeScript::from_cbor_value).collect()
}

fn malformed(reason: impl Into<String>) -> ScriptError {
    ScriptError::Malformed(reason.into())
}
