//! Node Staking Aggregates and Settlement Destinations
//!
//! External collaborators of the accounting core, carried at their
//! interface: per-node bonded/borrowed totals (read back after every
//! mutation for the cross-ledger consistency checks) and the destinations
//! a settled final balance is routed to.

pub mod node_staking;
pub mod settlement;

pub use node_staking::{NodeId, NodeStakingLedger};
pub use settlement::{SettlementBook, SettlementSink};
