//! Account records and per-account state objects.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod account;
mod object;
mod storage;

pub use account::Account;
pub use object::{ObjectStatus, StateObject};
pub use storage::{validate_storage, State, Storage, StorageError};
