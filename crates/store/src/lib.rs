//! Host-chain interfaces consumed by the state overlay.
//!
//! The overlay talks to its host through four collaborators: an account
//! keeper, a bank keeper (blacklist checks only), a byte-oriented KV store
//! and a parameter space. [`KeeperBackend`] bridges the four into the single
//! [`Backend`] seam the overlay is generic over; the `Mem*` types provide
//! in-memory implementations for tests and tooling.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod backend;
mod keeper;
mod kv;
mod mem;

pub use backend::{Backend, KeeperBackend};
pub use keeper::{AccountKeeper, BankKeeper, ParamSpace};
pub use kv::KvStore;
pub use mem::{MemAccountKeeper, MemBackend, MemBank, MemKvStore, MemParams};

use core::convert::Infallible;

/// Marker for store error types, needed to bound the overlay's error type.
pub trait StoreErrorMarker: core::error::Error + Send + Sync + 'static {}

/// Implement marker for `Infallible` so purely in-memory stores need no error
/// type of their own.
impl StoreErrorMarker for Infallible {}
