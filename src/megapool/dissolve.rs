//! Dissolution Engine
//!
//! Unwinds a validator that never became active: the stake unit it was
//! funded with is returned to the pool, split between operator bond and
//! user capital by the shared rebalance arithmetic, with the dissolve
//! penalty (and the shortfall subunit, when underbonded) accrued as debt.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::bond::BondRequirementOracle;
use super::ledger::{rebalance, RebalanceDeltas, RebalanceKind};
use super::pool::{Megapool, MegapoolConfig};
use super::validator::ValidatorState;
use super::MegapoolError;
use crate::beacon::{ProofError, ProofVerifier, SlotProof, ValidatorProof};
use crate::staking::NodeStakingLedger;
use crate::FAR_FUTURE_EPOCH;

/// Result of a successful dissolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissolveOutcome {
    /// Validator that was dissolved
    pub index: u32,
    /// Capital movement committed to the ledger
    pub deltas: RebalanceDeltas,
}

/// Unwinds non-activated validators
pub struct DissolutionEngine<O, V> {
    config: MegapoolConfig,
    oracle: O,
    verifier: V,
}

impl<O: BondRequirementOracle, V: ProofVerifier> DissolutionEngine<O, V> {
    /// Create a dissolution engine
    pub fn new(config: MegapoolConfig, oracle: O, verifier: V) -> Self {
        Self { config, oracle, verifier }
    }

    /// Dissolve a queued validator.
    ///
    /// Fails with `NotDissolvable` unless the validator is still `Queued`.
    /// The dissolving validator was never counted as active, so the bond
    /// requirement is queried at the current active count.
    pub fn dissolve(
        &self,
        pool: &mut Megapool,
        staking: &mut NodeStakingLedger,
        index: u32,
    ) -> Result<DissolveOutcome, MegapoolError> {
        let validator = pool.registry.get(index)?;
        if validator.state != ValidatorState::Queued {
            return Err(MegapoolError::NotDissolvable(index));
        }

        let deltas = rebalance(
            pool.ledger.node_bond,
            pool.ledger.node_queued_bond,
            pool.registry.active_count(),
            RebalanceKind::Dissolve,
            self.config.dissolve_penalty_gwei,
            self.config.stake_unit_gwei,
            &self.oracle,
        );

        // Commit order: ledger balances are staged on a copy so a bound
        // violation in either ledger leaves everything unchanged.
        let mut ledger = pool.ledger.clone();
        ledger.apply(&deltas)?;
        staking.apply(*pool.node(), &deltas)?;
        pool.ledger = ledger;

        pool.registry.transition(index, ValidatorState::Dissolved)?;
        pool.registry.get_mut(index)?.dissolved = true;

        info!(
            "dissolved validator {} (node bond {:+}, debt {:+})",
            index, deltas.node_bond_delta, deltas.debt_delta
        );

        Ok(DissolveOutcome { index, deltas })
    }

    /// Dissolve on behalf of a third party, gated by an attestation that
    /// the validator never activated on the beacon chain.
    ///
    /// A proof showing activation fails with `NotDissolvable`; an
    /// unverifiable proof aborts before any mutation.
    pub fn dissolve_with_proof(
        &self,
        pool: &mut Megapool,
        staking: &mut NodeStakingLedger,
        index: u32,
        validator_proof: &ValidatorProof,
        slot_proof: &SlotProof,
    ) -> Result<DissolveOutcome, MegapoolError> {
        self.verifier.verify_slot(slot_proof)?;
        let attested = self.verifier.verify_validator(validator_proof)?;

        let validator = pool.registry.get(index)?;
        if attested.pubkey != validator.pubkey {
            return Err(ProofError::TargetMismatch.into());
        }
        if attested.activation_epoch != FAR_FUTURE_EPOCH {
            // Proven to have activated; dissolution no longer applies
            return Err(MegapoolError::NotDissolvable(index));
        }

        self.dissolve(pool, staking, index)
    }
}
