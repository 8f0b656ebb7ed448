use super::PipelineError;
use crate::Identity;
use serde::Serialize;

/// How a locked amount is split among recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub payouts: Vec<(Identity, u64)>,
    pub per_recipient: u64,
    /// Leftover lovelace added to the first recipient
    pub remainder: u64,
}

impl Distribution {
    pub fn total(&self) -> u64 {
        self.payouts.iter().map(|(_, amount)| amount).sum()
    }
}

/// Split `total - fee_reserve` evenly, giving the remainder to the first recipient
pub fn plan_distribution(
    total: u64,
    fee_reserve: u64,
    recipients: &[Identity],
) -> Result<Distribution, PipelineError> {
    let nothing = || PipelineError::NothingToDistribute {
        total,
        fee_reserve,
        recipients: recipients.len(),
    };

    let distributable = total.checked_sub(fee_reserve).ok_or_else(nothing)?;
    if recipients.is_empty() {
        return Err(nothing());
    }
    let per_recipient = distributable / recipients.len() as u64;
    if per_recipient == 0 {
        return Err(nothing());
    }
    let remainder = distributable % recipients.len() as u64;

    let payouts = recipients
        .iter()
        .enumerate()
        .map(|(i, recipient)| {
            let amount = if i == 0 { per_recipient + remainder } else { per_recipient };
            (recipient.clone(), amount)
        })
        .collect();

    Ok(Distribution {
        payouts,
        per_recipient,
        remainder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients(n: usize) -> Vec<Identity> {
        (0..n).map(|i| Identity::from(format!("r{}", i))).collect()
    }

    #[test]
    fn test_hundred_ada_among_three() {
        let plan = plan_distribution(100_000_000, 2_000_000, &recipients(3)).unwrap();

        assert_eq!(plan.per_recipient, 32_666_666);
        assert_eq!(plan.remainder, 2);
        assert_eq!(plan.payouts[0].1, 32_666_668);
        assert_eq!(plan.payouts[1].1, 32_666_666);
        assert_eq!(plan.payouts[2].1, 32_666_666);
        assert_eq!(plan.total(), 98_000_000);
    }

    #[test]
    fn test_even_split_has_no_remainder() {
        let plan = plan_distribution(9_000_000, 0, &recipients(3)).unwrap();
        assert_eq!(plan.remainder, 0);
        assert!(plan.payouts.iter().all(|(_, amount)| *amount == 3_000_000));
    }

    #[test]
    fn test_reserve_larger_than_total() {
        assert!(matches!(
            plan_distribution(1_000_000, 2_000_000, &recipients(3)),
            Err(PipelineError::NothingToDistribute { .. })
        ));
    }

    #[test]
    fn test_no_recipients_or_dust() {
        assert!(plan_distribution(10, 0, &[]).is_err());
        assert!(plan_distribution(2, 0, &recipients(3)).is_err());
    }
}
