//! Validator record and lifecycle state machine

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Gwei;

/// 48-byte BLS public key identifying a validator.
///
/// Opaque to the accounting core; only compared and displayed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorPubkey([u8; 48]);

impl ValidatorPubkey {
    /// Wrap raw key bytes
    pub fn new(bytes: [u8; 48]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        let bytes: [u8; 48] = bytes.try_into().map_err(|_| "expected 48 bytes")?;
        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    /// All-zero key, never valid on the beacon chain
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 48]
    }
}

impl fmt::Debug for ValidatorPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPubkey({}...)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ValidatorPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for ValidatorPubkey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for ValidatorPubkey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PubkeyVisitor;

        impl<'de> serde::de::Visitor<'de> for PubkeyVisitor {
            type Value = ValidatorPubkey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("48 bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<ValidatorPubkey, E>
            where
                E: serde::de::Error,
            {
                ValidatorPubkey::from_bytes(v).map_err(E::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<ValidatorPubkey, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(48);
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                ValidatorPubkey::from_bytes(&bytes).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(PubkeyVisitor)
    }
}

/// Validator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorState {
    /// Registered but not yet active on the beacon chain
    Queued,
    /// Active on the beacon chain
    Active,
    /// Unwound after failing to activate (terminal apart from settlement)
    Dissolved,
    /// Marked as exiting by attestation; capital not yet resolved
    Exiting,
    /// Settled; final balance recorded (terminal)
    Exited,
}

impl ValidatorState {
    /// Whether the lifecycle move `self -> target` is permitted.
    ///
    /// `Dissolved -> Exited` is the one lawful exit from a terminal-looking
    /// state: a dissolved validator can still report a final balance, with
    /// capital movement skipped at settlement.
    pub fn can_transition_to(self, target: ValidatorState) -> bool {
        use ValidatorState::*;
        matches!(
            (self, target),
            (Queued, Active)
                | (Queued, Dissolved)
                | (Active, Exiting)
                | (Exiting, Exited)
                | (Dissolved, Exited)
        )
    }
}

/// One validator slot within a megapool.
///
/// Created in `Queued`, never deleted; terminal records are retained for
/// audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validator {
    /// Stable ordinal within the pool (arena index)
    pub index: u32,
    /// BLS public key
    pub pubkey: ValidatorPubkey,
    /// Withdrawal credentials the stake was deposited with
    pub withdrawal_credentials: [u8; 32],
    /// Current lifecycle state
    pub state: ValidatorState,
    /// Set once by the dissolution engine; survives later settlement
    pub dissolved: bool,
    /// Final settlement balance, set once at settlement
    pub exit_balance_gwei: Option<Gwei>,
}

impl Validator {
    /// Create a new queued validator
    pub fn new(index: u32, pubkey: ValidatorPubkey, withdrawal_credentials: [u8; 32]) -> Self {
        Self {
            index,
            pubkey,
            withdrawal_credentials,
            state: ValidatorState::Queued,
            dissolved: false,
            exit_balance_gwei: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_permits_only_specified_moves() {
        use ValidatorState::*;

        assert!(Queued.can_transition_to(Active));
        assert!(Queued.can_transition_to(Dissolved));
        assert!(Active.can_transition_to(Exiting));
        assert!(Exiting.can_transition_to(Exited));
        assert!(Dissolved.can_transition_to(Exited));

        // An active validator can no longer be dissolved
        assert!(!Active.can_transition_to(Dissolved));
        // Exited is terminal
        assert!(!Exited.can_transition_to(Exiting));
        assert!(!Exited.can_transition_to(Active));
        // No skipping the exit notification
        assert!(!Active.can_transition_to(Exited));
        assert!(!Queued.can_transition_to(Exiting));
    }

    #[test]
    fn pubkey_roundtrip_and_display() {
        let key = ValidatorPubkey::new([0xab; 48]);
        assert_eq!(ValidatorPubkey::from_bytes(key.as_bytes()).unwrap(), key);
        assert!(key.to_string().starts_with("abab"));
        assert!(!key.is_zero());
        assert!(ValidatorPubkey::new([0u8; 48]).is_zero());
    }
}
