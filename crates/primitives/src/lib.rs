//! # cosmovm-primitives
//!
//! Primitive types shared by the cosmovm state overlay.
//!
//! This crate provides:
//! - Re-exports of alloy primitive types for convenience
//! - The key layout of the module's KV store
//! - Fixed-precision decimals and denominated coins used to mirror EVM
//!   balances into host-chain accounts
//! - Module parameters and transaction log records
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod coin;
pub mod dec;
pub mod keys;
pub mod log;
pub mod params;

pub use coin::{Coin, Coins};
pub use dec::Dec;
pub use log::Log;
pub use params::{Params, ParamsError};

// Reexport alloy primitives.
pub use alloy_primitives::map::{self, hash_map, hash_set, HashMap, HashSet};
pub use alloy_primitives::{
    self, address, b256, bytes, hex, keccak256, Address, Bytes, FixedBytes, B256, U256,
};

/// Key of a slot inside a contract's storage store.
pub type StorageKey = B256;

/// Value held by a contract storage slot.
pub type StorageValue = B256;

/// Keccak-256 hash of the empty byte string. Accounts without code carry this
/// code hash.
pub const KECCAK_EMPTY: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_empty_matches_hash_of_empty_input() {
        assert_eq!(keccak256([]), KECCAK_EMPTY);
    }
}
