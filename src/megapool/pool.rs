//! Megapool aggregate
//!
//! One megapool per node operator: the capital ledger plus the validator
//! registry, addressed by the operator's node identity. Engines mutate the
//! pool through its public parts; the hosting environment serializes calls
//! (see [`SharedMegapool`]).

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::ledger::CapitalLedger;
use super::registry::ValidatorRegistry;
use crate::staking::NodeId;
use crate::{Gwei, GWEI_PER_ETH, STAKE_UNIT_GWEI};

/// Default penalty charged on every dissolution (0.1 ETH)
pub const DEFAULT_DISSOLVE_PENALTY_GWEI: Gwei = GWEI_PER_ETH / 10;

/// Protocol parameters for the accounting core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MegapoolConfig {
    /// Fixed size of one stake unit
    pub stake_unit_gwei: Gwei,
    /// Flat penalty accrued as debt on every dissolution
    pub dissolve_penalty_gwei: Gwei,
}

impl Default for MegapoolConfig {
    fn default() -> Self {
        Self {
            stake_unit_gwei: STAKE_UNIT_GWEI,                    // 32 ETH
            dissolve_penalty_gwei: DEFAULT_DISSOLVE_PENALTY_GWEI, // 0.1 ETH
        }
    }
}

/// Per-operator pool: capital ledger + validator registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Megapool {
    /// Operator this pool belongs to
    node: NodeId,
    /// Withdrawal credentials all of this pool's validators deposit with
    withdrawal_credentials: [u8; 32],
    /// Bond/capital/debt balances
    pub ledger: CapitalLedger,
    /// Validator records and population counters
    pub registry: ValidatorRegistry,
}

impl Megapool {
    /// Create an empty pool for `node`
    pub fn new(node: NodeId, withdrawal_credentials: [u8; 32]) -> Self {
        Self {
            node,
            withdrawal_credentials,
            ledger: CapitalLedger::new(),
            registry: ValidatorRegistry::new(),
        }
    }

    /// Operator identity
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Credentials withdrawals must target to settle against this pool
    pub fn withdrawal_credentials(&self) -> &[u8; 32] {
        &self.withdrawal_credentials
    }
}

/// Shared handle for hosts that need interior mutability.
///
/// The hosting environment guarantees transitions against one pool never
/// interleave; a write lock spans each whole transition.
pub type SharedMegapool = Arc<RwLock<Megapool>>;
