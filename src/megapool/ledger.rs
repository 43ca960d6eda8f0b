//! Capital Ledger and the shared rebalance arithmetic
//!
//! Holds the per-pool balances and the single audited routine that both
//! the dissolution engine and final-balance settlement use to reassign a
//! departing stake unit between operator bond and user capital.
//!
//! The conservation rule is structural: whatever portion of the unit the
//! operator does not keep as withdrawable bond is assigned to user capital,
//! so `Δnode_bond + Δuser_capital == -stake_unit` holds by construction.

use serde::{Deserialize, Serialize};

use super::bond::BondRequirementOracle;
use super::MegapoolError;
use crate::{Gwei, SHORTFALL_DEBT_GWEI};

/// Which lifecycle event is driving the rebalance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceKind {
    /// Unwinding a validator that failed to activate; penalties apply
    Dissolve,
    /// Settling an exited validator's final balance; no penalties
    Settlement,
}

/// Balance deltas produced by one rebalance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceDeltas {
    /// Change to the operator's active bond (zero or negative)
    pub node_bond_delta: i64,
    /// Change to active user capital (zero or negative)
    pub user_capital_delta: i64,
    /// Debt accrued against the operator
    pub debt_delta: Gwei,
}

impl RebalanceDeltas {
    /// Deltas for a settlement that moves no capital
    pub fn zero() -> Self {
        Self { node_bond_delta: 0, user_capital_delta: 0, debt_delta: 0 }
    }

    /// Whether the full stake unit leaves the pool exactly once
    pub fn conserves_unit(&self, stake_unit: Gwei) -> bool {
        self.node_bond_delta as i128 + self.user_capital_delta as i128 == -(stake_unit as i128)
    }
}

/// Reassign one departing stake unit between operator bond and user capital.
///
/// `active_after_removal` is the active validator count with the departing
/// validator already excluded; the bond requirement is queried at that
/// count (zero when no validators remain active).
///
/// When the operator's effective bond (active + queued) is at or under the
/// new requirement, the whole unit goes to user capital and, on dissolve,
/// the operator accrues the dissolve penalty plus one stake-subunit of
/// debt. Otherwise the operator's bond is reduced toward the requirement,
/// clamped to the unit size and to the operator's *active* bond (queued
/// bond is not withdrawable yet); any residual is absorbed by user capital,
/// never converted to debt.
pub fn rebalance(
    node_bond: Gwei,
    node_queued_bond: Gwei,
    active_after_removal: u64,
    kind: RebalanceKind,
    dissolve_penalty: Gwei,
    stake_unit: Gwei,
    oracle: &dyn BondRequirementOracle,
) -> RebalanceDeltas {
    let requirement = if active_after_removal > 0 {
        oracle.bond_requirement(active_after_removal)
    } else {
        0
    };
    let effective_bond = node_bond + node_queued_bond;
    let dissolving = kind == RebalanceKind::Dissolve;

    let (node_bond_delta, debt_delta) = if effective_bond <= requirement {
        // Underbonded: the whole unit is reassigned to user capital and a
        // dissolving operator is penalized one stake-subunit on top.
        let debt = if dissolving { dissolve_penalty + SHORTFALL_DEBT_GWEI } else { 0 };
        (0i128, debt)
    } else {
        let mut delta = requirement as i128 - effective_bond as i128;
        delta = delta.max(-(stake_unit as i128));
        delta = delta.max(-(node_bond as i128));
        let debt = if dissolving { dissolve_penalty } else { 0 };
        (delta, debt)
    };

    let user_capital_delta = -(stake_unit as i128) - node_bond_delta;

    RebalanceDeltas {
        node_bond_delta: node_bond_delta as i64,
        user_capital_delta: user_capital_delta as i64,
        debt_delta,
    }
}

/// Per-pool capital balances.
///
/// `pending_rewards` and `refund_value` are auxiliary balances never moved
/// by capital rebalancing; settlement routing credits `refund_value` when
/// the operator share cannot be paid out directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalLedger {
    /// Operator bond backing active validators
    pub node_bond: Gwei,
    /// Operator bond queued behind not-yet-active validators
    pub node_queued_bond: Gwei,
    /// Pooled user capital backing active validators
    pub user_capital: Gwei,
    /// Pooled user capital queued behind not-yet-active validators
    pub user_queued_capital: Gwei,
    /// Operator liability accrued from shortfalls; never decreases here
    pub debt: Gwei,
    /// Accrued but undistributed rewards
    pub pending_rewards: Gwei,
    /// Value held by the pool pending operator withdrawal
    pub refund_value: Gwei,
}

impl CapitalLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a rebalance atomically.
    ///
    /// Every new balance is computed with checked arithmetic first; any
    /// out-of-bounds delta fails with `ArithmeticBoundViolation` and the
    /// ledger is left untouched. Reaching that error means a rebalance
    /// clamp was bypassed, which a correct configuration never does.
    pub fn apply(&mut self, deltas: &RebalanceDeltas) -> Result<(), MegapoolError> {
        let node_bond = self
            .node_bond
            .checked_add_signed(deltas.node_bond_delta)
            .ok_or(MegapoolError::ArithmeticBoundViolation("node bond delta exceeds balance"))?;
        let user_capital = self
            .user_capital
            .checked_add_signed(deltas.user_capital_delta)
            .ok_or(MegapoolError::ArithmeticBoundViolation("user capital delta exceeds balance"))?;
        let debt = self
            .debt
            .checked_add(deltas.debt_delta)
            .ok_or(MegapoolError::ArithmeticBoundViolation("debt overflow"))?;

        self.node_bond = node_bond;
        self.user_capital = user_capital;
        self.debt = debt;
        Ok(())
    }

    /// Operator bond including the queued portion
    pub fn effective_node_bond(&self) -> Gwei {
        self.node_bond + self.node_queued_bond
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::megapool::bond::BondSchedule;
    use crate::{GWEI_PER_ETH, STAKE_UNIT_GWEI};

    const PENALTY: Gwei = GWEI_PER_ETH / 10; // 0.1 ETH

    fn run(node_bond: Gwei, queued: Gwei, active_after: u64, kind: RebalanceKind) -> RebalanceDeltas {
        rebalance(
            node_bond,
            queued,
            active_after,
            kind,
            PENALTY,
            STAKE_UNIT_GWEI,
            &BondSchedule::default(),
        )
    }

    #[test]
    fn underbonded_dissolve_routes_unit_to_users_and_accrues_debt() {
        // One validator stays active: requirement 4 ETH, operator holds 4 ETH
        let deltas = run(4 * GWEI_PER_ETH, 0, 1, RebalanceKind::Dissolve);

        assert_eq!(deltas.node_bond_delta, 0);
        assert_eq!(deltas.user_capital_delta, -(STAKE_UNIT_GWEI as i64));
        assert_eq!(deltas.debt_delta, PENALTY + GWEI_PER_ETH);
        assert!(deltas.conserves_unit(STAKE_UNIT_GWEI));
    }

    #[test]
    fn overbonded_dissolve_clamps_at_stake_unit() {
        // No validators remain: requirement 0, 40 ETH bond would shed it all
        let deltas = run(40 * GWEI_PER_ETH, 0, 0, RebalanceKind::Dissolve);

        assert_eq!(deltas.node_bond_delta, -(STAKE_UNIT_GWEI as i64));
        assert_eq!(deltas.user_capital_delta, 0);
        assert_eq!(deltas.debt_delta, PENALTY);
        assert!(deltas.conserves_unit(STAKE_UNIT_GWEI));
    }

    #[test]
    fn reduction_clamps_at_active_bond_when_rest_is_queued() {
        // Effective bond 10 ETH but only 2 ETH is active and withdrawable;
        // requirement 4 ETH would shed 6 ETH, clamped to the active 2 ETH.
        let deltas = run(2 * GWEI_PER_ETH, 8 * GWEI_PER_ETH, 1, RebalanceKind::Dissolve);

        assert_eq!(deltas.node_bond_delta, -(2 * GWEI_PER_ETH as i64));
        assert_eq!(deltas.user_capital_delta, -(30 * GWEI_PER_ETH as i64));
        assert_eq!(deltas.debt_delta, PENALTY);
        assert!(deltas.conserves_unit(STAKE_UNIT_GWEI));
    }

    #[test]
    fn settlement_never_accrues_debt() {
        let under = run(4 * GWEI_PER_ETH, 0, 1, RebalanceKind::Settlement);
        assert_eq!(under.debt_delta, 0);
        assert_eq!(under.node_bond_delta, 0);

        let over = run(40 * GWEI_PER_ETH, 0, 0, RebalanceKind::Settlement);
        assert_eq!(over.debt_delta, 0);
        assert_eq!(over.node_bond_delta, -(STAKE_UNIT_GWEI as i64));
    }

    #[test]
    fn partial_reduction_lands_on_new_requirement() {
        // Two validators stay active: requirement 5.5 ETH against 8 ETH bond
        let deltas = run(8 * GWEI_PER_ETH, 0, 2, RebalanceKind::Settlement);

        assert_eq!(deltas.node_bond_delta, -2_500_000_000);
        assert_eq!(deltas.user_capital_delta, -29_500_000_000);
        assert!(deltas.conserves_unit(STAKE_UNIT_GWEI));
    }

    #[test]
    fn conservation_holds_across_bond_range() {
        for bond_eth in 0..=40u64 {
            for queued_eth in [0u64, 1, 4, 12] {
                for active_after in [0u64, 1, 3, 16] {
                    let deltas = run(
                        bond_eth * GWEI_PER_ETH,
                        queued_eth * GWEI_PER_ETH,
                        active_after,
                        RebalanceKind::Dissolve,
                    );
                    assert!(
                        deltas.conserves_unit(STAKE_UNIT_GWEI),
                        "conservation broken at bond={bond_eth} queued={queued_eth} active={active_after}"
                    );
                }
            }
        }
    }

    #[test]
    fn apply_is_atomic_on_out_of_bounds_delta() {
        let mut ledger = CapitalLedger {
            node_bond: GWEI_PER_ETH,
            user_capital: 10 * GWEI_PER_ETH,
            ..Default::default()
        };
        let before = ledger.clone();

        // Would drive user capital negative
        let deltas = RebalanceDeltas {
            node_bond_delta: 0,
            user_capital_delta: -(STAKE_UNIT_GWEI as i64),
            debt_delta: 0,
        };

        assert!(matches!(
            ledger.apply(&deltas),
            Err(MegapoolError::ArithmeticBoundViolation(_))
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn apply_commits_all_three_balances() {
        let mut ledger = CapitalLedger {
            node_bond: 8 * GWEI_PER_ETH,
            user_capital: 28 * GWEI_PER_ETH,
            debt: GWEI_PER_ETH,
            ..Default::default()
        };

        let deltas = RebalanceDeltas {
            node_bond_delta: -(4 * GWEI_PER_ETH as i64),
            user_capital_delta: -(28 * GWEI_PER_ETH as i64),
            debt_delta: PENALTY,
        };
        ledger.apply(&deltas).unwrap();

        assert_eq!(ledger.node_bond, 4 * GWEI_PER_ETH);
        assert_eq!(ledger.user_capital, 0);
        assert_eq!(ledger.debt, GWEI_PER_ETH + PENALTY);
    }
}
