//! Bond Requirement Oracle
//!
//! The minimum operator bond required to keep a given number of validators
//! active. A pure function of protocol-wide configuration: this crate ships
//! a schedule-backed implementation, hosts may inject their own.

use serde::{Deserialize, Serialize};

use crate::{Gwei, GWEI_PER_ETH};

/// Base bond for the operator's first validator (4 ETH)
pub const BASE_BOND_GWEI: Gwei = 4 * GWEI_PER_ETH;

/// Marginal bond for each additional validator (1.5 ETH)
pub const MARGINAL_BOND_GWEI: Gwei = 3 * GWEI_PER_ETH / 2;

/// Minimum total operator bond required for a given active validator count.
///
/// Pure, no side effects. The per-validator average must be monotonically
/// non-increasing in the count: more active validators never raise the
/// requirement per validator.
pub trait BondRequirementOracle {
    /// Total bond required to keep `active` validators active
    fn bond_requirement(&self, active: u64) -> Gwei;
}

/// Schedule-backed oracle: a base bond for the first validator plus a
/// reduced marginal bond for each additional one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondSchedule {
    /// Bond required for the first validator
    pub base_bond_gwei: Gwei,
    /// Bond required for each validator after the first
    pub marginal_bond_gwei: Gwei,
}

impl Default for BondSchedule {
    fn default() -> Self {
        Self {
            base_bond_gwei: BASE_BOND_GWEI,         // 4 ETH
            marginal_bond_gwei: MARGINAL_BOND_GWEI, // 1.5 ETH
        }
    }
}

impl BondRequirementOracle for BondSchedule {
    fn bond_requirement(&self, active: u64) -> Gwei {
        if active == 0 {
            return 0;
        }
        self.base_bond_gwei + (active - 1) * self.marginal_bond_gwei
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_validators_require_no_bond() {
        assert_eq!(BondSchedule::default().bond_requirement(0), 0);
    }

    #[test]
    fn schedule_matches_base_plus_marginal() {
        let schedule = BondSchedule::default();
        assert_eq!(schedule.bond_requirement(1), 4 * GWEI_PER_ETH);
        assert_eq!(schedule.bond_requirement(2), 5_500_000_000);
        assert_eq!(schedule.bond_requirement(4), 8_500_000_000);
    }

    #[test]
    fn per_validator_requirement_never_increases() {
        let schedule = BondSchedule::default();
        let mut last = u64::MAX;
        for active in 1..=64u64 {
            // Average in gwei, scaled to keep the comparison integral
            let avg = schedule.bond_requirement(active) * 1000 / active;
            assert!(avg <= last, "requirement rose at count {active}");
            last = avg;
        }
    }
}
