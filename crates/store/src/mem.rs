//! In-memory implementations of the host interfaces.
//!
//! These back the test suites and genesis tooling; a real deployment wires
//! the traits to the host SDK's keepers instead.

use crate::{AccountKeeper, BankKeeper, KeeperBackend, KvStore, ParamSpace};
use core::convert::Infallible;
use cosmovm_primitives::{
    params::{PARAM_KEY_ENABLE_CALL, PARAM_KEY_ENABLE_CREATE, PARAM_KEY_EVM_DENOM},
    Address, HashMap, HashSet, Params,
};
use cosmovm_state::Account;
use std::collections::BTreeMap;

/// A [`Backend`](crate::Backend) built entirely from in-memory parts.
pub type MemBackend = KeeperBackend<MemAccountKeeper, MemBank, MemKvStore, MemParams>;

/// In-memory account keeper.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemAccountKeeper {
    accounts: HashMap<Address, Account>,
}

impl AccountKeeper for MemAccountKeeper {
    fn account(&self, address: Address) -> Option<Account> {
        self.accounts.get(&address).cloned()
    }

    fn new_account_with_address(&mut self, address: Address) -> Account {
        Account::new(address)
    }

    fn set_account(&mut self, account: &Account) {
        self.accounts.insert(account.address, account.clone());
    }

    fn remove_account(&mut self, account: &Account) {
        self.accounts.remove(&account.address);
    }
}

/// In-memory bank keeper holding a blacklist of addresses.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemBank {
    blacklist: HashSet<Address>,
}

impl MemBank {
    /// Bars `address` from receiving funds.
    pub fn blacklist(&mut self, address: Address) {
        self.blacklist.insert(address);
    }
}

impl BankKeeper for MemBank {
    fn blacklisted_addr(&self, address: Address) -> bool {
        self.blacklist.contains(&address)
    }
}

/// In-memory KV store ordered by key, matching the iteration order the host
/// chain's stores guarantee.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemKvStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl KvStore for MemKvStore {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
        self.data.remove(key);
        Ok(())
    }

    fn iterate_prefix(
        &self,
        prefix: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<(), Self::Error> {
        for (key, value) in self.data.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if f(key, value) {
                break;
            }
        }
        Ok(())
    }
}

/// In-memory parameter space storing each parameter under its string key.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemParams {
    values: HashMap<String, String>,
}

impl ParamSpace for MemParams {
    fn get_param_set(&self) -> Params {
        let defaults = Params::default();
        Params {
            evm_denom: self
                .values
                .get(PARAM_KEY_EVM_DENOM)
                .cloned()
                .unwrap_or(defaults.evm_denom),
            enable_create: self
                .values
                .get(PARAM_KEY_ENABLE_CREATE)
                .map(|v| v == "true")
                .unwrap_or(defaults.enable_create),
            enable_call: self
                .values
                .get(PARAM_KEY_ENABLE_CALL)
                .map(|v| v == "true")
                .unwrap_or(defaults.enable_call),
        }
    }

    fn set_param_set(&mut self, params: &Params) {
        self.values
            .insert(PARAM_KEY_EVM_DENOM.to_string(), params.evm_denom.clone());
        self.values.insert(
            PARAM_KEY_ENABLE_CREATE.to_string(),
            params.enable_create.to_string(),
        );
        self.values.insert(
            PARAM_KEY_ENABLE_CALL.to_string(),
            params.enable_call.to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;
    use cosmovm_primitives::{address, b256, B256, U256};

    #[test]
    fn kv_prefix_iteration_is_ordered_and_scoped() {
        let mut store = MemKvStore::default();
        store.set(b"a/2", b"v2").unwrap();
        store.set(b"a/1", b"v1").unwrap();
        store.set(b"b/1", b"other").unwrap();

        let mut seen = Vec::new();
        store
            .iterate_prefix(b"a/", &mut |key, value| {
                seen.push((key.to_vec(), value.to_vec()));
                false
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (b"a/1".to_vec(), b"v1".to_vec()),
                (b"a/2".to_vec(), b"v2".to_vec()),
            ]
        );
    }

    #[test]
    fn kv_prefix_iteration_stops_early() {
        let mut store = MemKvStore::default();
        store.set(b"a/1", b"v1").unwrap();
        store.set(b"a/2", b"v2").unwrap();

        let mut count = 0;
        store
            .iterate_prefix(b"a/", &mut |_, _| {
                count += 1;
                true
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn params_round_trip_through_string_keys() {
        let mut space = MemParams::default();
        assert_eq!(space.get_param_set(), Params::default());

        let params = Params::new("ara", true, false);
        space.set_param_set(&params);
        assert_eq!(space.get_param_set(), params);
    }

    #[test]
    fn backend_storage_round_trip_with_zero_deletion() {
        let mut backend = MemBackend::default();
        let address = address!("0x756f45e3fa69347a9a973a725e3c98bc4db0b4c1");
        let key = b256!("0x0000000000000000000000000000000000000000000000000000000000000001");
        let value = b256!("0x00000000000000000000000000000000000000000000000000000000000000ff");

        backend.set_committed_state(address, key, value).unwrap();
        assert_eq!(backend.committed_state(address, key).unwrap(), value);

        backend.set_committed_state(address, key, B256::ZERO).unwrap();
        assert_eq!(backend.committed_state(address, key).unwrap(), B256::ZERO);
        assert!(backend.store.data.is_empty());
    }

    #[test]
    fn backend_accounts_and_blacklist() {
        let mut backend = MemBackend::default();
        let address = address!("0x756f45e3fa69347a9a973a725e3c98bc4db0b4c1");

        assert!(backend.account(address).is_none());
        let mut account = backend.new_account_with_address(address);
        account.set_balance("aphoton", U256::from(5u64));
        backend.set_account(&account);
        assert_eq!(backend.account(address), Some(account.clone()));

        assert!(!backend.blacklisted_addr(address));
        backend.bank_keeper.blacklist(address);
        assert!(backend.blacklisted_addr(address));

        backend.remove_account(&account);
        assert!(backend.account(address).is_none());
    }

    #[test]
    fn backend_height_hash_defaults_to_zero() {
        let mut backend = MemBackend::default();
        assert_eq!(backend.height_hash(7).unwrap(), B256::ZERO);

        let hash = B256::repeat_byte(0xab);
        backend.set_height_hash(7, hash).unwrap();
        assert_eq!(backend.height_hash(7).unwrap(), hash);
    }
}
