//! Errors surfaced while reconciling the overlay with the external store.

use cosmovm_primitives::{Address, Coin, B256};
use cosmovm_store::StoreErrorMarker;
use thiserror::Error;

/// Errors observed while reading from or writing to the host's stores.
///
/// Read-side errors are memoised into the overlay and surfaced through
/// [`StateDB::error`](crate::StateDB::error); write-side errors fail the
/// current `commit`/`finalise` call.
#[derive(Debug, Error)]
pub enum StateError<E: StoreErrorMarker> {
    /// No account exists at the address in the external account store.
    #[error("no account found for address: {0}")]
    NoAccount(Address),
    /// Code for a non-empty code hash is missing from the store.
    #[error("failed to get code of hash {0}")]
    NoCode(B256),
    /// The computed coin is malformed and cannot be written back.
    #[error("invalid balance {0}")]
    InvalidBalance(Coin),
    /// The destination account is barred by the bank module.
    #[error("address {0} in blacklist is not allowed")]
    Blacklisted(Address),
    /// The backing store failed.
    #[error(transparent)]
    Store(E),
}
