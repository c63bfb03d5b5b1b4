//! Byte-oriented KV store interface.

use crate::StoreErrorMarker;
use auto_impl::auto_impl;

/// A byte-keyed, byte-valued store with prefix iteration.
///
/// The host chain is expected to hand the overlay a cache-wrapped store so
/// that writes become visible to the commitment pipeline in key order.
///
/// # Dyn Compatibility
///
/// `iterate_prefix` takes `&mut dyn FnMut` so the trait stays usable on trait
/// objects.
#[auto_impl(&mut, Box)]
pub trait KvStore {
    /// The store error type.
    type Error: StoreErrorMarker;

    /// Gets the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Deletes the value stored under `key`, if any.
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error>;

    /// Visits every `(key, value)` pair whose key starts with `prefix`, in
    /// ascending key order, until the callback returns `true`. Keys are
    /// passed in full, prefix included.
    fn iterate_prefix(
        &self,
        prefix: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<(), Self::Error>;
}
