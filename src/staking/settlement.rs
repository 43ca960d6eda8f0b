//! Settlement destinations
//!
//! Where a settled final balance goes: the pooled-capital vault receives
//! the user share, the operator receives their share directly when they
//! are the caller, and anything not directly payable accrues to the pool's
//! refund balance. The vault and operator balances are external
//! collaborators; this module carries their write interface and an
//! in-memory implementation for tests and single-process hosts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::node_staking::NodeId;
use crate::Gwei;

/// Write interface for settlement destinations
pub trait SettlementSink {
    /// Credit the pooled-capital vault
    fn credit_vault(&mut self, amount: Gwei);

    /// Credit the operator's withdrawal balance
    fn credit_operator(&mut self, node: NodeId, amount: Gwei);
}

/// In-memory settlement book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementBook {
    /// Pooled-capital vault balance
    vault: Gwei,
    /// Operator withdrawal balances
    operators: HashMap<NodeId, Gwei>,
}

impl SettlementBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Current vault balance
    pub fn vault_balance(&self) -> Gwei {
        self.vault
    }

    /// Current withdrawal balance for `node`
    pub fn operator_balance(&self, node: &NodeId) -> Gwei {
        self.operators.get(node).copied().unwrap_or(0)
    }
}

impl SettlementSink for SettlementBook {
    fn credit_vault(&mut self, amount: Gwei) {
        self.vault += amount;
    }

    fn credit_operator(&mut self, node: NodeId, amount: Gwei) {
        *self.operators.entry(node).or_default() += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_accumulate_per_destination() {
        let node = NodeId([0x22; 20]);
        let mut book = SettlementBook::new();

        book.credit_vault(5);
        book.credit_vault(7);
        book.credit_operator(node, 3);
        book.credit_operator(node, 4);

        assert_eq!(book.vault_balance(), 12);
        assert_eq!(book.operator_balance(&node), 7);
        assert_eq!(book.operator_balance(&NodeId([0x33; 20])), 0);
    }
}
