//! Validator Registry
//!
//! Append-only arena of validator records with the arena index as stable
//! identity. State transitions are in-place field updates guarded by the
//! lifecycle state machine; the cached population counters always match
//! the live tally.

use serde::{Deserialize, Serialize};

use super::validator::{Validator, ValidatorPubkey, ValidatorState};
use super::MegapoolError;

/// Per-pool validator table with population counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorRegistry {
    /// Validator records, indexed by ordinal; never shrinks
    validators: Vec<Validator>,
    /// Count of validators in `Active`
    active_count: u64,
    /// Count of validators in `Exiting`
    exiting_count: u64,
}

impl ValidatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new validator in `Queued`, returning its index
    pub fn register(
        &mut self,
        pubkey: ValidatorPubkey,
        withdrawal_credentials: [u8; 32],
    ) -> u32 {
        let index = self.validators.len() as u32;
        self.validators
            .push(Validator::new(index, pubkey, withdrawal_credentials));
        index
    }

    /// Move a validator to `target`, updating the population counters.
    ///
    /// Fails with `InvalidTransition` unless the move is permitted by the
    /// lifecycle state machine; the registry is unchanged on failure.
    pub fn transition(&mut self, index: u32, target: ValidatorState) -> Result<(), MegapoolError> {
        let validator = self
            .validators
            .get_mut(index as usize)
            .ok_or(MegapoolError::UnknownValidator(index))?;

        let from = validator.state;
        if !from.can_transition_to(target) {
            return Err(MegapoolError::InvalidTransition { index, from, to: target });
        }

        validator.state = target;

        if from == ValidatorState::Active {
            self.active_count -= 1;
        }
        if from == ValidatorState::Exiting {
            self.exiting_count -= 1;
        }
        if target == ValidatorState::Active {
            self.active_count += 1;
        }
        if target == ValidatorState::Exiting {
            self.exiting_count += 1;
        }

        Ok(())
    }

    /// Get a validator by index
    pub fn get(&self, index: u32) -> Result<&Validator, MegapoolError> {
        self.validators
            .get(index as usize)
            .ok_or(MegapoolError::UnknownValidator(index))
    }

    /// Get a validator by index, mutably
    pub(crate) fn get_mut(&mut self, index: u32) -> Result<&mut Validator, MegapoolError> {
        self.validators
            .get_mut(index as usize)
            .ok_or(MegapoolError::UnknownValidator(index))
    }

    /// Count validators currently in `state` by walking the table
    pub fn count_by_state(&self, state: ValidatorState) -> usize {
        self.validators.iter().filter(|v| v.state == state).count()
    }

    /// Cached count of `Active` validators
    pub fn active_count(&self) -> u64 {
        self.active_count
    }

    /// Cached count of `Exiting` validators
    pub fn exiting_count(&self) -> u64 {
        self.exiting_count
    }

    /// Total number of registered validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no validators have been registered
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Iterate all records (audit/history view)
    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }

    /// Whether the cached counters match the live tally
    pub fn counters_consistent(&self) -> bool {
        self.count_by_state(ValidatorState::Active) as u64 == self.active_count
            && self.count_by_state(ValidatorState::Exiting) as u64 == self.exiting_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubkey(seed: u8) -> ValidatorPubkey {
        ValidatorPubkey::new([seed; 48])
    }

    fn registry_with(n: u8) -> ValidatorRegistry {
        let mut registry = ValidatorRegistry::new();
        for i in 0..n {
            registry.register(pubkey(i + 1), [0u8; 32]);
        }
        registry
    }

    #[test]
    fn register_assigns_sequential_indices() {
        let registry = registry_with(3);
        assert_eq!(registry.len(), 3);
        for (i, v) in registry.iter().enumerate() {
            assert_eq!(v.index as usize, i);
            assert_eq!(v.state, ValidatorState::Queued);
        }
    }

    #[test]
    fn full_lifecycle_updates_counters() {
        let mut registry = registry_with(1);

        registry.transition(0, ValidatorState::Active).unwrap();
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.exiting_count(), 0);

        registry.transition(0, ValidatorState::Exiting).unwrap();
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.exiting_count(), 1);

        registry.transition(0, ValidatorState::Exited).unwrap();
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.exiting_count(), 0);

        assert!(registry.counters_consistent());
    }

    #[test]
    fn dissolving_queued_leaves_counters_untouched() {
        let mut registry = registry_with(2);
        registry.transition(0, ValidatorState::Active).unwrap();

        registry.transition(1, ValidatorState::Dissolved).unwrap();
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.exiting_count(), 0);
        assert!(registry.counters_consistent());
    }

    #[test]
    fn illegal_moves_fail_without_mutation() {
        let mut registry = registry_with(1);
        registry.transition(0, ValidatorState::Active).unwrap();

        // Dissolving an already-active validator is not permitted
        let err = registry.transition(0, ValidatorState::Dissolved).unwrap_err();
        assert_eq!(
            err,
            MegapoolError::InvalidTransition {
                index: 0,
                from: ValidatorState::Active,
                to: ValidatorState::Dissolved,
            }
        );
        assert_eq!(registry.get(0).unwrap().state, ValidatorState::Active);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn terminal_states_reject_replay() {
        let mut registry = registry_with(2);

        registry.transition(0, ValidatorState::Dissolved).unwrap();
        assert!(registry.transition(0, ValidatorState::Active).is_err());
        assert!(registry.transition(0, ValidatorState::Dissolved).is_err());
        // Settlement of a dissolved validator is the one permitted exit
        registry.transition(0, ValidatorState::Exited).unwrap();
        assert!(registry.transition(0, ValidatorState::Exited).is_err());

        registry.transition(1, ValidatorState::Active).unwrap();
        registry.transition(1, ValidatorState::Exiting).unwrap();
        registry.transition(1, ValidatorState::Exited).unwrap();
        assert!(registry.transition(1, ValidatorState::Exiting).is_err());
    }

    #[test]
    fn unknown_index_is_reported() {
        let mut registry = registry_with(1);
        assert_eq!(
            registry.transition(7, ValidatorState::Active).unwrap_err(),
            MegapoolError::UnknownValidator(7)
        );
        assert!(registry.get(7).is_err());
    }
}
