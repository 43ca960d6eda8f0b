//! Beacon proof structures and the verification capability
//!
//! Three proof shapes are consumed by the engines:
//! - slot proof: attests to a point in beacon-chain time
//! - validator proof: attests to a validator's recorded withdrawable epoch
//!   and withdrawal credentials
//! - withdrawal proof: attests to an on-chain withdrawal of a given gwei
//!   amount to given credentials
//!
//! Witness verification lives behind [`ProofVerifier`]. A verifier either
//! returns the attested fact or an error; the caller aborts atomically on
//! error, so malformed proofs can never reach a ledger write.

use serde::{Deserialize, Serialize};

use crate::megapool::ValidatorPubkey;
use crate::{Epoch, Gwei, FAR_FUTURE_EPOCH};

/// Merkle witness node
pub type Witness = [u8; 32];

/// Proof attesting to a beacon slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotProof {
    /// Beacon slot being attested
    pub slot: u64,
    /// Merkle witnesses up to the trusted root
    pub witnesses: Vec<Witness>,
}

/// Beacon-chain validator record as carried inside a validator proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconValidator {
    /// BLS public key
    pub pubkey: ValidatorPubkey,
    /// Withdrawal credentials
    pub withdrawal_credentials: [u8; 32],
    /// Effective balance in gwei
    pub effective_balance: Gwei,
    /// Whether the validator has been slashed
    pub slashed: bool,
    /// Epoch when eligible for activation
    pub activation_eligibility_epoch: Epoch,
    /// Epoch of activation (`FAR_FUTURE_EPOCH` if never activated)
    pub activation_epoch: Epoch,
    /// Epoch of voluntary exit
    pub exit_epoch: Epoch,
    /// Epoch the balance becomes withdrawable (`FAR_FUTURE_EPOCH` if none)
    pub withdrawable_epoch: Epoch,
}

/// Proof attesting to a validator's beacon record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorProof {
    /// Index of the validator on the beacon chain
    pub validator_index: u64,
    /// The attested validator record
    pub validator: BeaconValidator,
    /// Merkle witnesses up to the trusted root
    pub witnesses: Vec<Witness>,
}

/// A single execution-layer withdrawal record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Withdrawal index
    pub index: u64,
    /// Index of the validator on the beacon chain
    pub validator_index: u64,
    /// Credentials the amount was withdrawn to
    pub withdrawal_credentials: [u8; 32],
    /// Withdrawn amount in gwei
    pub amount_gwei: Gwei,
}

/// Proof attesting to an on-chain withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalProof {
    /// Slot containing the withdrawal
    pub withdrawal_slot: u64,
    /// Position of the withdrawal within the slot
    pub withdrawal_num: u64,
    /// The attested withdrawal record
    pub withdrawal: Withdrawal,
    /// Merkle witnesses up to the trusted root
    pub witnesses: Vec<Witness>,
}

/// Slot fact extracted from a verified slot proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestedSlot {
    /// The attested slot
    pub slot: u64,
}

/// Validator fact extracted from a verified validator proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedValidator {
    /// BLS public key of the attested validator
    pub pubkey: ValidatorPubkey,
    /// Withdrawal credentials of the attested validator
    pub withdrawal_credentials: [u8; 32],
    /// Activation epoch (`FAR_FUTURE_EPOCH` if never activated)
    pub activation_epoch: Epoch,
    /// Withdrawable epoch (`FAR_FUTURE_EPOCH` if no exit scheduled)
    pub withdrawable_epoch: Epoch,
}

/// Withdrawal fact extracted from a verified withdrawal proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedWithdrawal {
    /// Credentials the amount was withdrawn to
    pub withdrawal_credentials: [u8; 32],
    /// Withdrawn amount in gwei
    pub amount_gwei: Gwei,
    /// Slot containing the withdrawal
    pub slot: u64,
}

/// Proof verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("malformed proof: {0}")]
    Malformed(&'static str),

    #[error("witness verification failed")]
    WitnessMismatch,

    #[error("attested slot is stale")]
    StaleSlot,

    #[error("attested record does not match the target validator")]
    TargetMismatch,

    #[error("attested validator has no scheduled withdrawal")]
    NoScheduledExit,
}

/// Capability for turning proofs into attested facts.
///
/// Implementations own all cryptographic concerns. The engines treat
/// verification as a synchronous precondition: any error aborts the whole
/// transition with no ledger mutation.
pub trait ProofVerifier {
    /// Verify a slot proof
    fn verify_slot(&self, proof: &SlotProof) -> Result<AttestedSlot, ProofError>;

    /// Verify a validator proof
    fn verify_validator(&self, proof: &ValidatorProof) -> Result<AttestedValidator, ProofError>;

    /// Verify a withdrawal proof
    fn verify_withdrawal(&self, proof: &WithdrawalProof) -> Result<AttestedWithdrawal, ProofError>;
}

/// Verifier that trusts proof bodies without checking witnesses.
///
/// For hosts that verify witnesses upstream, and for tests. Structurally
/// malformed proofs are still rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughVerifier;

impl ProofVerifier for PassthroughVerifier {
    fn verify_slot(&self, proof: &SlotProof) -> Result<AttestedSlot, ProofError> {
        if proof.slot == 0 {
            return Err(ProofError::Malformed("slot proof for genesis slot"));
        }
        Ok(AttestedSlot { slot: proof.slot })
    }

    fn verify_validator(&self, proof: &ValidatorProof) -> Result<AttestedValidator, ProofError> {
        let v = &proof.validator;
        if v.pubkey.is_zero() {
            return Err(ProofError::Malformed("validator proof with zero pubkey"));
        }
        if v.exit_epoch != FAR_FUTURE_EPOCH && v.withdrawable_epoch < v.exit_epoch {
            return Err(ProofError::Malformed("withdrawable epoch precedes exit epoch"));
        }
        Ok(AttestedValidator {
            pubkey: v.pubkey,
            withdrawal_credentials: v.withdrawal_credentials,
            activation_epoch: v.activation_epoch,
            withdrawable_epoch: v.withdrawable_epoch,
        })
    }

    fn verify_withdrawal(&self, proof: &WithdrawalProof) -> Result<AttestedWithdrawal, ProofError> {
        if proof.withdrawal.amount_gwei == 0 {
            return Err(ProofError::Malformed("withdrawal proof for zero amount"));
        }
        Ok(AttestedWithdrawal {
            withdrawal_credentials: proof.withdrawal.withdrawal_credentials,
            amount_gwei: proof.withdrawal.amount_gwei,
            slot: proof.withdrawal_slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon_validator() -> BeaconValidator {
        BeaconValidator {
            pubkey: ValidatorPubkey::new([7u8; 48]),
            withdrawal_credentials: [1u8; 32],
            effective_balance: 32_000_000_000,
            slashed: false,
            activation_eligibility_epoch: 0,
            activation_epoch: 100,
            exit_epoch: 200,
            withdrawable_epoch: 456,
        }
    }

    #[test]
    fn passthrough_attests_validator_fact() {
        let proof = ValidatorProof {
            validator_index: 9,
            validator: beacon_validator(),
            witnesses: vec![],
        };

        let fact = PassthroughVerifier.verify_validator(&proof).unwrap();
        assert_eq!(fact.withdrawable_epoch, 456);
        assert_eq!(fact.activation_epoch, 100);
        assert_eq!(fact.withdrawal_credentials, [1u8; 32]);
    }

    #[test]
    fn passthrough_rejects_zero_pubkey() {
        let mut validator = beacon_validator();
        validator.pubkey = ValidatorPubkey::new([0u8; 48]);
        let proof = ValidatorProof { validator_index: 9, validator, witnesses: vec![] };

        let err = PassthroughVerifier.verify_validator(&proof).unwrap_err();
        assert!(matches!(err, ProofError::Malformed(_)));
    }

    #[test]
    fn passthrough_rejects_zero_withdrawal() {
        let proof = WithdrawalProof {
            withdrawal_slot: 1000,
            withdrawal_num: 0,
            withdrawal: Withdrawal {
                index: 0,
                validator_index: 2,
                withdrawal_credentials: [1u8; 32],
                amount_gwei: 0,
            },
            witnesses: vec![],
        };

        assert!(PassthroughVerifier.verify_withdrawal(&proof).is_err());
    }
}
