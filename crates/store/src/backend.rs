//! The overlay's seam onto the host chain.

use crate::{AccountKeeper, BankKeeper, KvStore, ParamSpace, StoreErrorMarker};
use auto_impl::auto_impl;
use cosmovm_primitives::{
    keys, Address, Bytes, Params, StorageKey, StorageValue, B256,
};
use cosmovm_state::Account;

/// Everything the overlay needs from its host: account records, contract code
/// and storage, height-indexed header hashes, parameters and the bank
/// blacklist.
///
/// Code, storage and height hashes are fallible because they go through the
/// host's KV store; keeper and parameter access follows the host SDK's
/// infallible surface.
#[auto_impl(&mut, Box)]
pub trait Backend {
    /// The store error type.
    type Error: StoreErrorMarker;

    /// Fetches the account stored at `address`.
    fn account(&self, address: Address) -> Option<Account>;

    /// Mints a fresh, unpersisted account record at `address`.
    fn new_account_with_address(&mut self, address: Address) -> Account;

    /// Persists an account record.
    fn set_account(&mut self, account: &Account);

    /// Removes an account record from the store.
    fn remove_account(&mut self, account: &Account);

    /// Whether `address` is barred from receiving funds.
    fn blacklisted_addr(&self, address: Address) -> bool;

    /// Contract code stored under `code_hash`; empty when absent.
    fn code(&self, code_hash: B256) -> Result<Bytes, Self::Error>;

    /// Stores contract code under `code_hash`.
    fn set_code(&mut self, code_hash: B256, code: &[u8]) -> Result<(), Self::Error>;

    /// Committed value of one storage slot; zero when absent.
    fn committed_state(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, Self::Error>;

    /// Writes one storage slot. A zero value deletes the underlying record.
    fn set_committed_state(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), Self::Error>;

    /// Visits the committed storage of `address` in ascending key order until
    /// the callback returns `true`.
    fn for_each_committed_state(
        &self,
        address: Address,
        f: &mut dyn FnMut(StorageKey, StorageValue) -> bool,
    ) -> Result<(), Self::Error>;

    /// Header hash recorded at `height`; zero when absent.
    fn height_hash(&self, height: u64) -> Result<B256, Self::Error>;

    /// Records the header hash for `height`.
    fn set_height_hash(&mut self, height: u64, hash: B256) -> Result<(), Self::Error>;

    /// Loads the parameter set.
    fn params(&self) -> Params;

    /// Persists the parameter set.
    fn set_params(&mut self, params: &Params);
}

/// Thin bridge composing the four host collaborators into a [`Backend`].
///
/// Key layout is fixed by [`cosmovm_primitives::keys`]; the adapter owns no
/// state of its own.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeeperBackend<AK, BK, KV, PS> {
    /// The host's account keeper.
    pub account_keeper: AK,
    /// The host's bank keeper.
    pub bank_keeper: BK,
    /// The module's KV store.
    pub store: KV,
    /// The module's parameter space.
    pub param_space: PS,
}

impl<AK, BK, KV, PS> KeeperBackend<AK, BK, KV, PS> {
    /// Wires the four collaborators together.
    pub fn new(account_keeper: AK, bank_keeper: BK, store: KV, param_space: PS) -> Self {
        Self {
            account_keeper,
            bank_keeper,
            store,
            param_space,
        }
    }
}

impl<AK, BK, KV, PS> Backend for KeeperBackend<AK, BK, KV, PS>
where
    AK: AccountKeeper,
    BK: BankKeeper,
    KV: KvStore,
    PS: ParamSpace,
{
    type Error = KV::Error;

    fn account(&self, address: Address) -> Option<Account> {
        self.account_keeper.account(address)
    }

    fn new_account_with_address(&mut self, address: Address) -> Account {
        self.account_keeper.new_account_with_address(address)
    }

    fn set_account(&mut self, account: &Account) {
        self.account_keeper.set_account(account);
    }

    fn remove_account(&mut self, account: &Account) {
        self.account_keeper.remove_account(account);
    }

    fn blacklisted_addr(&self, address: Address) -> bool {
        self.bank_keeper.blacklisted_addr(address)
    }

    fn code(&self, code_hash: B256) -> Result<Bytes, Self::Error> {
        Ok(self
            .store
            .get(&keys::code_key(code_hash))?
            .map(Bytes::from)
            .unwrap_or_default())
    }

    fn set_code(&mut self, code_hash: B256, code: &[u8]) -> Result<(), Self::Error> {
        self.store.set(&keys::code_key(code_hash), code)
    }

    fn committed_state(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, Self::Error> {
        Ok(self
            .store
            .get(&keys::state_key(address, key))?
            .map(|value| B256::left_padding_from(&value))
            .unwrap_or_default())
    }

    fn set_committed_state(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), Self::Error> {
        let store_key = keys::state_key(address, key);
        if value.is_zero() {
            self.store.delete(&store_key)
        } else {
            self.store.set(&store_key, value.as_slice())
        }
    }

    fn for_each_committed_state(
        &self,
        address: Address,
        f: &mut dyn FnMut(StorageKey, StorageValue) -> bool,
    ) -> Result<(), Self::Error> {
        let prefix = keys::address_storage_prefix(address);
        self.store.iterate_prefix(&prefix, &mut |key, value| {
            f(
                B256::left_padding_from(&key[prefix.len()..]),
                B256::left_padding_from(value),
            )
        })
    }

    fn height_hash(&self, height: u64) -> Result<B256, Self::Error> {
        Ok(self
            .store
            .get(&keys::height_hash_key(height))?
            .map(|hash| B256::left_padding_from(&hash))
            .unwrap_or_default())
    }

    fn set_height_hash(&mut self, height: u64, hash: B256) -> Result<(), Self::Error> {
        self.store.set(&keys::height_hash_key(height), hash.as_slice())
    }

    fn params(&self) -> Params {
        self.param_space.get_param_set()
    }

    fn set_params(&mut self, params: &Params) {
        self.param_space.set_param_set(params);
    }
}
