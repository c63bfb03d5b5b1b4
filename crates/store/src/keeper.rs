//! Keeper interfaces of the host chain.

use auto_impl::auto_impl;
use cosmovm_primitives::{Address, Params};
use cosmovm_state::Account;

/// Access to the host chain's account records.
#[auto_impl(&mut, Box)]
pub trait AccountKeeper {
    /// Fetches the account stored at `address`.
    fn account(&self, address: Address) -> Option<Account>;

    /// Mints a fresh account record at `address`. The record is not persisted
    /// until [`AccountKeeper::set_account`] is called with it.
    fn new_account_with_address(&mut self, address: Address) -> Account;

    /// Persists an account record.
    fn set_account(&mut self, account: &Account);

    /// Removes an account record from the store.
    fn remove_account(&mut self, account: &Account);
}

/// Bank-module checks consulted before account writes.
#[auto_impl(&, &mut, Box)]
pub trait BankKeeper {
    /// Whether `address` is barred from receiving funds.
    fn blacklisted_addr(&self, address: Address) -> bool;
}

/// Typed parameter persistence keyed by string.
#[auto_impl(&mut, Box)]
pub trait ParamSpace {
    /// Loads the parameter set, falling back to defaults for unset keys.
    fn get_param_set(&self) -> Params;

    /// Persists the parameter set.
    fn set_param_set(&mut self, params: &Params);
}
