use crate::validation::Validator;
use crate::{Identity, ValidationResult};
use serde::Serialize;
use tracing::info;

/// Address that belongs to none of the authorized wallets
pub const UNAUTHORIZED_SIGNER: &str =
    "addr_test1qpunauthorized_fake_address_that_is_not_in_authorized_list";

/// One signing set run through the validator
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub name: &'static str,
    pub signers: Vec<Identity>,
    pub expected_valid: bool,
    pub result: ValidationResult,
}

impl Scenario {
    pub fn as_expected(&self) -> bool {
        self.result.is_valid() == self.expected_valid
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioReport {
    /// Run the standard scenarios against `authorized`
    ///
    /// With the default 3-of-5 exact policy this yields one valid and four
    /// invalid verdicts: valid set, too few, too many, duplicate, stranger.
    pub fn run(validator: &Validator, authorized: &[Identity]) -> Self {
        let policy = validator.policy();
        let required = policy.required();
        let head = |n: usize| authorized.iter().take(n).cloned().collect::<Vec<_>>();

        let mut cases: Vec<(&'static str, Vec<Identity>, bool)> = vec![
            ("valid configuration", head(required), true),
            ("insufficient signatures", head(required - 1), false),
            (
                "excessive signatures",
                authorized.iter().cycle().take(required + 1).cloned().collect(),
                !validator.exact_count() && required < authorized.len(),
            ),
        ];

        // A single-signer policy has no room for a duplicate
        if let (true, Some(first)) = (required >= 2, authorized.first()) {
            let mut duplicate = head(required - 1);
            duplicate.push(first.clone());
            cases.push(("duplicate signers", duplicate, false));
        }

        let mut stranger = head(required - 1);
        stranger.push(Identity::from(UNAUTHORIZED_SIGNER));
        cases.push(("unauthorized signer", stranger, false));

        let scenarios = cases
            .into_iter()
            .map(|(name, signers, expected_valid)| {
                let result = validator.validate(authorized, &signers);
                info!(
                    "Scenario '{}': {} {}",
                    name,
                    if result.is_valid() { "valid" } else { "invalid" },
                    result.message()
                );
                Scenario {
                    name,
                    signers,
                    expected_valid,
                    result,
                }
            })
            .collect();

        Self { scenarios }
    }

    pub fn valid_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.result.is_valid()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.scenarios.len() - self.valid_count()
    }

    /// Every scenario produced the verdict it was designed to produce
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(Scenario::as_expected)
    }
}
