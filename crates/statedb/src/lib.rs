//! # cosmovm-statedb
//!
//! Transactional state overlay for an EVM embedded in a Cosmos-SDK-style
//! chain. The [`StateDB`] collects every account and contract-storage
//! mutation produced while a transaction executes, supports arbitrarily
//! nested rollback through [`StateDB::snapshot`] and
//! [`StateDB::revert_to_snapshot`], and finalises survivors into the host's
//! account store at transaction end.
//!
//! Instead of a trie and database, persistence goes through the host's
//! keepers and KV stores behind the [`Backend`](cosmovm_store::Backend) seam;
//! the merkle commitment happens in the host's own commit pipeline, so
//! [`StateDB::commit`] returns a zero root.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod access_list;
mod errors;
mod journal;
mod statedb;

pub use access_list::AccessList;
pub use errors::StateError;
pub use journal::{Journal, JournalEntry};
pub use statedb::StateDB;

pub use cosmovm_primitives as primitives;
pub use cosmovm_state as state;
pub use cosmovm_store as store;
