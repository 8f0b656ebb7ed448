use crate::{CountBound, Identity, Policy, ValidationFailure, ValidationResult};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Validates signing sets against a fixed policy
///
/// Holds no mutable state, so a single instance can be shared freely across
/// tasks and threads.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    policy: Policy,
    /// Require the signer count to equal `required` instead of reaching it
    exact_count: bool,
}

impl Validator {
    /// Creates a validator that demands exactly `policy.required()` signers
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            exact_count: true,
        }
    }

    /// Accept any signing set of at least `required` signers when `false`
    pub fn with_exact_count(mut self, exact_count: bool) -> Self {
        self.exact_count = exact_count;
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn exact_count(&self) -> bool {
        self.exact_count
    }

    /// Validate a signing set against the authorized set
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. authorized set size equals the policy total
    /// 2. signer count matches the required count
    /// 3. no signer appears twice
    /// 4. every signer is authorized
    pub fn validate(&self, authorized: &[Identity], signing: &[Identity]) -> ValidationResult {
        debug!(
            "Validating {} signers against {} authorized wallets ({})",
            signing.len(),
            authorized.len(),
            self.policy
        );

        match self.check(authorized, signing) {
            Ok(()) => {
                debug!("Multisig validation successful");
                ValidationResult::accepted(format!(
                    "validation succeeded: {} unique authorized signers out of {} possible",
                    signing.len(),
                    self.policy.total()
                ))
            }
            Err(failure) => {
                warn!("Multisig validation failed: {}", failure);
                ValidationResult::rejected(failure)
            }
        }
    }

    fn check(&self, authorized: &[Identity], signing: &[Identity]) -> Result<(), ValidationFailure> {
        self.check_authorized_size(authorized)?;
        self.check_signer_count(signing)?;
        check_duplicates(signing)?;
        check_membership(authorized, signing)?;
        Ok(())
    }

    fn check_authorized_size(&self, authorized: &[Identity]) -> Result<(), ValidationFailure> {
        if authorized.len() != self.policy.total() {
            return Err(ValidationFailure::AuthorizedSetSizeMismatch {
                expected: self.policy.total(),
                actual: authorized.len(),
            });
        }
        Ok(())
    }

    fn check_signer_count(&self, signing: &[Identity]) -> Result<(), ValidationFailure> {
        let required = self.policy.required();
        let (ok, bound) = if self.exact_count {
            (signing.len() == required, CountBound::Exactly)
        } else {
            (signing.len() >= required, CountBound::AtLeast)
        };

        if !ok {
            return Err(ValidationFailure::SignerCountMismatch {
                required,
                total: self.policy.total(),
                actual: signing.len(),
                bound,
            });
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

fn check_duplicates(signing: &[Identity]) -> Result<(), ValidationFailure> {
    let unique: HashSet<&Identity> = signing.iter().collect();
    if unique.len() != signing.len() {
        return Err(ValidationFailure::DuplicateSigner);
    }
    Ok(())
}

fn check_membership(authorized: &[Identity], signing: &[Identity]) -> Result<(), ValidationFailure> {
    let authorized: HashSet<&Identity> = authorized.iter().collect();
    let unauthorized = signing
        .iter()
        .filter(|signer| !authorized.contains(signer))
        .count();

    if unauthorized > 0 {
        return Err(ValidationFailure::UnauthorizedSigner {
            unauthorized,
            signers: signing.len(),
        });
    }
    Ok(())
}

/// Validate with an exact-count policy
///
/// Shorthand for `Validator::new(policy).validate(authorized, signing)`.
/// Pass `Policy::default()` for the standard 3-of-5 policy.
pub fn validate(authorized: &[Identity], signing: &[Identity], policy: Policy) -> ValidationResult {
    Validator::new(policy).validate(authorized, signing)
}
