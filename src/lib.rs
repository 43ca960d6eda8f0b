//! # Megapool Accounting Core
//!
//! Bonding, capital, and debt ledger for collective validator staking.
//! A megapool is a per-operator pool in which the node operator and pooled
//! depositors co-fund fixed 32 ETH stake units, one per validator.
//!
//! ## Core Responsibilities
//! - Exact conservation of the stake unit across every lifecycle event
//! - Dynamic bond requirement as the active validator count changes
//! - Deterministic shortfall routing: pool capital vs. operator debt
//! - Two-phase exits: exit notification, then final-balance settlement
//! - Dissolution of validators that never activated on the beacon chain
//!
//! ## What This Crate Does Not Do
//! Beacon proof witness verification, vault/liquid-token accounting and
//! transaction submission are external collaborators, consumed through the
//! traits in [`beacon`] and [`staking`].

pub mod beacon;
pub mod megapool;
pub mod staking;

// Re-exports
pub use beacon::{
    BeaconValidator, PassthroughVerifier, ProofError, ProofVerifier,
    SlotProof, ValidatorProof, Withdrawal, WithdrawalProof,
};
pub use megapool::{
    BondRequirementOracle, BondSchedule, CapitalLedger, DissolutionEngine,
    DissolveOutcome, ExitEngine, Megapool, MegapoolConfig, MegapoolError,
    RebalanceDeltas, RebalanceKind, SettlementOutcome, SharedMegapool,
    Validator, ValidatorPubkey, ValidatorRegistry, ValidatorState,
};
pub use staking::{NodeId, NodeStakingLedger, SettlementBook, SettlementSink};

/// Gwei amount (1 ETH = 10^9 gwei)
pub type Gwei = u64;

/// Epoch ordinal on the beacon chain
pub type Epoch = u64;

// =============================================================================
// PROTOCOL CONSTANTS
// =============================================================================

/// Gwei per ETH
pub const GWEI_PER_ETH: Gwei = 1_000_000_000;

/// Size of one stake unit: the fixed total (operator bond + user capital)
/// required to fund a single validator
pub const STAKE_UNIT_GWEI: Gwei = 32 * GWEI_PER_ETH;

/// Debt accrued on top of the dissolve penalty when an underbonded
/// operator dissolves a validator (one stake-subunit)
pub const SHORTFALL_DEBT_GWEI: Gwei = GWEI_PER_ETH;

/// Sentinel epoch for "not scheduled" beacon fields
pub const FAR_FUTURE_EPOCH: Epoch = u64::MAX;
