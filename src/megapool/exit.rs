//! Exit Engine
//!
//! Two-phase validator exits. Phase A marks an active validator as exiting
//! on the strength of a beacon attestation; no capital moves. Phase B
//! settles the validator's final beacon balance: the departing stake unit
//! is reassigned by the shared rebalance arithmetic (no penalties), the
//! balance itself is routed to the vault, the operator, and the pool's
//! refund balance, and the validator becomes `Exited`.
//!
//! A validator dissolved earlier can still reach settlement; its capital
//! was already reallocated at dissolution, so settlement records the final
//! balance and moves no capital at all.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bond::BondRequirementOracle;
use super::ledger::{rebalance, RebalanceDeltas, RebalanceKind};
use super::pool::{Megapool, MegapoolConfig};
use super::validator::ValidatorState;
use super::MegapoolError;
use crate::beacon::{ProofError, ProofVerifier, SlotProof, ValidatorProof, WithdrawalProof};
use crate::staking::{NodeStakingLedger, SettlementSink};
use crate::{Gwei, FAR_FUTURE_EPOCH};

/// Result of a final-balance settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Validator that was settled
    pub index: u32,
    /// Final beacon-chain balance that was distributed
    pub final_balance_gwei: Gwei,
    /// Capital movement committed to the ledger (all zero for a validator
    /// that was already dissolved)
    pub deltas: RebalanceDeltas,
    /// Amount credited to the pooled-capital vault
    pub vault_credit: Gwei,
    /// Amount credited directly to the operator
    pub operator_credit: Gwei,
    /// Amount accrued to the pool's refund balance
    pub refund_credit: Gwei,
}

/// Marks validators as exiting and settles their final balances
pub struct ExitEngine<O, V> {
    config: MegapoolConfig,
    oracle: O,
    verifier: V,
}

impl<O: BondRequirementOracle, V: ProofVerifier> ExitEngine<O, V> {
    /// Create an exit engine
    pub fn new(config: MegapoolConfig, oracle: O, verifier: V) -> Self {
        Self { config, oracle, verifier }
    }

    /// Phase A: mark an active validator as exiting.
    ///
    /// The attestation must target this validator and carry a scheduled
    /// withdrawable epoch. Registry transition only; capital is resolved
    /// at settlement.
    pub fn notify_exit(
        &self,
        pool: &mut Megapool,
        index: u32,
        validator_proof: &ValidatorProof,
        slot_proof: &SlotProof,
    ) -> Result<(), MegapoolError> {
        self.verifier.verify_slot(slot_proof)?;
        let attested = self.verifier.verify_validator(validator_proof)?;

        let validator = pool.registry.get(index)?;
        if attested.pubkey != validator.pubkey {
            return Err(ProofError::TargetMismatch.into());
        }
        if attested.withdrawable_epoch == FAR_FUTURE_EPOCH {
            return Err(ProofError::NoScheduledExit.into());
        }

        pool.registry.transition(index, ValidatorState::Exiting)?;
        debug!(
            "validator {} exiting (withdrawable epoch {})",
            index, attested.withdrawable_epoch
        );
        Ok(())
    }

    /// Phase B: settle an exited validator's final beacon balance.
    ///
    /// Requires state `Exiting`, or `Dissolved` for the skip-capital
    /// branch. Records the exit balance once, rebalances capital at the
    /// post-notification active count, and routes the balance: the user
    /// share (up to the released user capital) to the vault, the operator
    /// share to the operator when they are the caller, otherwise to the
    /// pool's refund balance. `pending_rewards` never moves here.
    #[allow(clippy::too_many_arguments)]
    pub fn notify_final_balance(
        &self,
        pool: &mut Megapool,
        staking: &mut NodeStakingLedger,
        sink: &mut dyn SettlementSink,
        index: u32,
        node_calling: bool,
        withdrawal_proof: &WithdrawalProof,
        validator_proof: &ValidatorProof,
        slot_proof: &SlotProof,
    ) -> Result<SettlementOutcome, MegapoolError> {
        self.verifier.verify_slot(slot_proof)?;
        let attested_validator = self.verifier.verify_validator(validator_proof)?;
        let attested_withdrawal = self.verifier.verify_withdrawal(withdrawal_proof)?;

        let validator = pool.registry.get(index)?;
        if attested_validator.pubkey != validator.pubkey {
            return Err(ProofError::TargetMismatch.into());
        }
        if &attested_withdrawal.withdrawal_credentials != pool.withdrawal_credentials() {
            return Err(ProofError::TargetMismatch.into());
        }

        let final_balance = attested_withdrawal.amount_gwei;
        let deltas = match validator.state {
            // Capital was already reallocated at dissolution; settlement
            // only records the balance.
            ValidatorState::Dissolved => RebalanceDeltas::zero(),
            ValidatorState::Exiting => {
                // Phase A already removed this validator from the active
                // count, so the requirement is queried at the current one.
                let deltas = rebalance(
                    pool.ledger.node_bond,
                    pool.ledger.node_queued_bond,
                    pool.registry.active_count(),
                    RebalanceKind::Settlement,
                    self.config.dissolve_penalty_gwei,
                    self.config.stake_unit_gwei,
                    &self.oracle,
                );

                let mut ledger = pool.ledger.clone();
                ledger.apply(&deltas)?;
                staking.apply(*pool.node(), &deltas)?;
                pool.ledger = ledger;
                deltas
            }
            from => {
                return Err(MegapoolError::InvalidTransition {
                    index,
                    from,
                    to: ValidatorState::Exited,
                })
            }
        };

        pool.registry.transition(index, ValidatorState::Exited)?;
        pool.registry.get_mut(index)?.exit_balance_gwei = Some(final_balance);

        // Route the final balance. Released user capital has priority up
        // to the amount that actually arrived; the rest is the operator's.
        let released_user_capital = deltas.user_capital_delta.unsigned_abs();
        let vault_credit = final_balance.min(released_user_capital);
        let node_share = final_balance - vault_credit;

        sink.credit_vault(vault_credit);
        let (operator_credit, refund_credit) = if node_calling {
            sink.credit_operator(*pool.node(), node_share);
            (node_share, 0)
        } else {
            pool.ledger.refund_value += node_share;
            (0, node_share)
        };

        info!(
            "settled validator {} (final balance {} gwei, node bond {:+})",
            index, final_balance, deltas.node_bond_delta
        );

        Ok(SettlementOutcome {
            index,
            final_balance_gwei: final_balance,
            deltas,
            vault_credit,
            operator_credit,
            refund_credit,
        })
    }
}
