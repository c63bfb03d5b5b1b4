//! Contract storage entries.

use core::fmt;
use cosmovm_primitives::{HashSet, StorageKey, StorageValue};

/// One storage entry of a contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct State {
    /// Slot key.
    pub key: StorageKey,
    /// Slot value.
    pub value: StorageValue,
}

impl State {
    /// Creates a storage entry.
    pub fn new(key: StorageKey, value: StorageValue) -> Self {
        Self { key, value }
    }
}

/// Ordered collection of storage entries.
pub type Storage = Vec<State>;

/// Validates a storage collection for genesis import: keys must be unique and
/// values non-zero.
pub fn validate_storage(storage: &[State]) -> Result<(), StorageError> {
    let mut seen: HashSet<StorageKey> = HashSet::default();
    for state in storage {
        if !seen.insert(state.key) {
            return Err(StorageError::DuplicateKey(state.key));
        }
        if state.value.is_zero() {
            return Err(StorageError::ZeroValue(state.key));
        }
    }
    Ok(())
}

/// Error returned when a storage collection is malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// The same key appears more than once.
    DuplicateKey(StorageKey),
    /// A zero value is stored explicitly; zero means absent.
    ZeroValue(StorageKey),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "duplicate storage key {key}"),
            Self::ZeroValue(key) => write!(f, "zero value stored under key {key}"),
        }
    }
}

impl core::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmovm_primitives::B256;

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let storage = vec![
            State::new(hash(1), hash(2)),
            State::new(hash(1), hash(3)),
        ];
        assert_eq!(
            validate_storage(&storage),
            Err(StorageError::DuplicateKey(hash(1)))
        );
    }

    #[test]
    fn zero_values_are_rejected() {
        let storage = vec![State::new(hash(1), B256::ZERO)];
        assert_eq!(
            validate_storage(&storage),
            Err(StorageError::ZeroValue(hash(1)))
        );
    }

    #[test]
    fn well_formed_storage_validates() {
        let storage = vec![
            State::new(hash(1), hash(2)),
            State::new(hash(2), hash(3)),
        ];
        assert_eq!(validate_storage(&storage), Ok(()));
    }
}
