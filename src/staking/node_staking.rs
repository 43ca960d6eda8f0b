//! Per-node staking aggregates
//!
//! Tracks each operator's total bonded (operator) and borrowed (pooled)
//! amounts across all of their megapools. The engines push the same deltas
//! here that they commit to a pool's capital ledger, and the totals are
//! read back to cross-check ledger consistency.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::megapool::{CapitalLedger, MegapoolError, RebalanceDeltas};
use crate::Gwei;

/// Node operator identity (20-byte execution-layer address)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 20]);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Aggregate totals for one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct NodeTotals {
    /// Operator-contributed stake across all megapools
    bonded: Gwei,
    /// Pool-contributed stake across all megapools
    borrowed: Gwei,
}

/// Per-node bonded/borrowed totals across megapools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStakingLedger {
    totals: HashMap<NodeId, NodeTotals>,
}

impl NodeStakingLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record newly contributed stake (deposit-time bookkeeping)
    pub fn add_stake(&mut self, node: NodeId, bonded: Gwei, borrowed: Gwei) {
        let totals = self.totals.entry(node).or_default();
        totals.bonded += bonded;
        totals.borrowed += borrowed;
    }

    /// Apply the bond/capital deltas of one pool transition.
    ///
    /// Checked like the capital ledger: both new totals are computed before
    /// either is written, so a failed call changes nothing.
    pub fn apply(&mut self, node: NodeId, deltas: &RebalanceDeltas) -> Result<(), MegapoolError> {
        let totals = self.totals.entry(node).or_default();
        let bonded = totals
            .bonded
            .checked_add_signed(deltas.node_bond_delta)
            .ok_or(MegapoolError::ArithmeticBoundViolation("bonded total underflow"))?;
        let borrowed = totals
            .borrowed
            .checked_add_signed(deltas.user_capital_delta)
            .ok_or(MegapoolError::ArithmeticBoundViolation("borrowed total underflow"))?;

        totals.bonded = bonded;
        totals.borrowed = borrowed;
        Ok(())
    }

    /// Total operator-bonded amount for `node`
    pub fn eth_bonded(&self, node: &NodeId) -> Gwei {
        self.totals.get(node).map(|t| t.bonded).unwrap_or(0)
    }

    /// Total pool-borrowed amount for `node`
    pub fn eth_borrowed(&self, node: &NodeId) -> Gwei {
        self.totals.get(node).map(|t| t.borrowed).unwrap_or(0)
    }

    /// Cross-ledger consistency check: the pool's bond and capital balances
    /// must sum to the node's aggregates
    pub fn matches_pool(&self, node: &NodeId, ledger: &CapitalLedger) -> bool {
        self.eth_bonded(node) == ledger.node_bond + ledger.node_queued_bond
            && self.eth_borrowed(node) == ledger.user_capital + ledger.user_queued_capital
    }
}
