//! Beacon Chain Attestations
//!
//! Proof shapes consumed by the megapool engines and the verification
//! capability they are checked through. The accounting core never touches
//! witness cryptography itself: a [`ProofVerifier`] either attests a fact
//! or fails the whole call before any ledger mutation.

pub mod proofs;

pub use proofs::{
    AttestedSlot, AttestedValidator, AttestedWithdrawal, BeaconValidator,
    PassthroughVerifier, ProofError, ProofVerifier, SlotProof,
    ValidatorProof, Withdrawal, WithdrawalProof,
};
