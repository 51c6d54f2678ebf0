//! Weight Policies
//!
//! The scoring formula belongs to the consensus layer. Validation only
//! guarantees the inputs: validated amounts and their heights.

use crate::proof::stake::Amount;

/// One validated stake as seen by a weight policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeWeight {
    /// Confirmed amount.
    pub amount: Amount,
    /// Confirmed creation height.
    pub height: u32,
}

/// Inputs to a weight policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightInput {
    /// Sum of validated stake amounts.
    pub total_amount: Amount,
    /// Validated stakes in proof order.
    pub stakes: Vec<StakeWeight>,
}

/// Maps validated stakes to a weight.
///
/// Implementations should be monotonic in the staked amounts.
pub trait WeightPolicy: Send + Sync {
    /// Compute the weight of a validated proof.
    fn weight(&self, input: &WeightInput) -> u64;
}

impl<F> WeightPolicy for F
where
    F: Fn(&WeightInput) -> u64 + Send + Sync,
{
    fn weight(&self, input: &WeightInput) -> u64 {
        self(input)
    }
}

/// Weight proportional to the total amount, in multiples of `unit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountWeight {
    /// Amount worth one weight point.
    pub unit: Amount,
}

impl Default for AmountWeight {
    fn default() -> Self {
        Self { unit: 1 }
    }
}

impl WeightPolicy for AmountWeight {
    fn weight(&self, input: &WeightInput) -> u64 {
        (input.total_amount.max(0) / self.unit.max(1)) as u64
    }
}

/// Amount weight discounted linearly until a stake is `maturity` blocks deep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaturityWeight {
    /// Current chain tip.
    pub tip_height: u32,
    /// Confirmations needed for full weight.
    pub maturity: u32,
}

impl WeightPolicy for MaturityWeight {
    fn weight(&self, input: &WeightInput) -> u64 {
        let maturity = self.maturity.max(1) as u128;
        let total: u128 = input
            .stakes
            .iter()
            .map(|s| {
                let depth = self.tip_height.saturating_sub(s.height).saturating_add(1) as u128;
                s.amount.max(0) as u128 * depth.min(maturity) / maturity
            })
            .sum();
        total.min(u64::MAX as u128) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(stakes: &[(Amount, u32)]) -> WeightInput {
        WeightInput {
            total_amount: stakes.iter().map(|(a, _)| a).sum(),
            stakes: stakes.iter().map(|&(amount, height)| StakeWeight { amount, height }).collect(),
        }
    }

    #[test]
    fn test_amount_weight() {
        assert_eq!(AmountWeight::default().weight(&input(&[(100, 1), (50, 2)])), 150);
        assert_eq!(AmountWeight { unit: 100 }.weight(&input(&[(250, 1)])), 2);
    }

    #[test]
    fn test_maturity_weight() {
        let policy = MaturityWeight { tip_height: 100, maturity: 10 };

        // 10 confirmations deep: full weight
        assert_eq!(policy.weight(&input(&[(1_000, 91)])), 1_000);
        // 1 confirmation: a tenth
        assert_eq!(policy.weight(&input(&[(1_000, 100)])), 100);
        // Above the tip still counts one confirmation
        assert_eq!(policy.weight(&input(&[(1_000, 150)])), 100);
    }

    #[test]
    fn test_closure_policy() {
        let policy = |i: &WeightInput| i.stakes.len() as u64;
        assert_eq!(policy.weight(&input(&[(1, 1), (2, 2)])), 2);
    }
}
