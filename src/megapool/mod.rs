//! Megapool Ledger Core
//!
//! Per-operator accounting for collectively funded validators:
//! - [`ValidatorRegistry`]: append-only validator table with the lifecycle
//!   state machine and population counters
//! - [`CapitalLedger`]: bond/capital/debt balances and the shared
//!   rebalance arithmetic used by both engines
//! - [`DissolutionEngine`]: unwinds validators that never activated
//! - [`ExitEngine`]: exit notification and final-balance settlement
//!
//! Every entry point performs all of its fallible checks before the first
//! write, so a failed call leaves the pool byte-for-byte unchanged.

pub mod bond;
pub mod dissolve;
pub mod exit;
pub mod ledger;
pub mod pool;
pub mod registry;
pub mod validator;

pub use bond::{BondRequirementOracle, BondSchedule};
pub use dissolve::{DissolutionEngine, DissolveOutcome};
pub use exit::{ExitEngine, SettlementOutcome};
pub use ledger::{rebalance, CapitalLedger, RebalanceDeltas, RebalanceKind};
pub use pool::{Megapool, MegapoolConfig, SharedMegapool};
pub use registry::ValidatorRegistry;
pub use validator::{Validator, ValidatorPubkey, ValidatorState};

use crate::beacon::ProofError;

/// Errors raised by the megapool accounting core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MegapoolError {
    /// Requested lifecycle move is not permitted from the current state
    #[error("validator {index}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        index: u32,
        from: ValidatorState,
        to: ValidatorState,
    },

    /// No validator registered at this index
    #[error("unknown validator index {0}")]
    UnknownValidator(u32),

    /// Dissolve attempted on a validator that is not in a dissolvable state
    /// or is proven to have activated
    #[error("validator {0} is not dissolvable")]
    NotDissolvable(u32),

    /// External attestation malformed or unverifiable
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(#[from] ProofError),

    /// A rebalance clamp was bypassed; indicates an invariant breach and is
    /// unreachable in a correct configuration
    #[error("arithmetic bound violation: {0}")]
    ArithmeticBoundViolation(&'static str),
}
