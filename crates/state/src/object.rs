//! The cached per-account state object.

use crate::{Account, State};
use bitflags::bitflags;
use cosmovm_primitives::{
    Address, Bytes, HashMap, StorageKey, StorageValue, B256, KECCAK_EMPTY, U256,
};

bitflags! {
    /// Lifecycle flags of a state object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ObjectStatus: u8 {
        /// The account is scheduled for deletion at finalise time.
        const Suicided = 0b001;
        /// The account was removed from the backing store. Terminal: reads
        /// through the overlay treat the object as absent.
        const Deleted = 0b010;
        /// Code was set this transaction and must be written on commit.
        const DirtyCode = 0b100;
    }
}

impl Default for ObjectStatus {
    fn default() -> Self {
        ObjectStatus::empty()
    }
}

/// Cached view of one account while transactions execute.
///
/// The overlay owns every state object in an arena. The object itself holds
/// no handle to the backing store: read-through and flushing are driven by
/// the overlay, which passes values in and out of the caches kept here.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateObject {
    /// Mirror of the external account record.
    account: Account,
    /// Contract code, lazily populated.
    code: Option<Bytes>,
    /// Committed slot values observed from the backing store this transaction.
    origin_storage: HashMap<StorageKey, StorageValue>,
    /// Slot writes made this transaction, in write order.
    dirty_storage: Vec<State>,
    /// Index into `dirty_storage` by key; at most one entry per key.
    key_to_dirty_index: HashMap<StorageKey, usize>,
    status: ObjectStatus,
}

impl StateObject {
    /// Wraps a freshly loaded account record.
    pub fn new(account: Account) -> Self {
        Self {
            account,
            code: None,
            origin_storage: HashMap::default(),
            dirty_storage: Vec::new(),
            key_to_dirty_index: HashMap::default(),
            status: ObjectStatus::empty(),
        }
    }

    /// Address of the account.
    pub fn address(&self) -> Address {
        self.account.address
    }

    /// The mirrored account record.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Replaces the mirrored account record. Used when the external store
    /// changed behind the overlay's back.
    pub fn replace_account(&mut self, account: Account) {
        self.account = account;
    }

    /// Keccak-256 hash of the account's code.
    pub fn code_hash(&self) -> B256 {
        self.account.code_hash
    }

    /// The account nonce.
    pub fn nonce(&self) -> u64 {
        self.account.sequence
    }

    /// EVM balance in the given denomination.
    pub fn balance(&self, denom: &str) -> U256 {
        self.account.balance(denom)
    }

    /// Replaces the balance. Amounts are non-negative by construction.
    pub fn set_balance(&mut self, denom: &str, amount: U256) {
        self.account.set_balance(denom, amount);
    }

    /// Replaces the nonce.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.account.sequence = nonce;
    }

    // -- storage ------------------------------------------------------------

    /// Value written to `key` this transaction, if any.
    pub fn dirty_state(&self, key: StorageKey) -> Option<StorageValue> {
        self.key_to_dirty_index
            .get(&key)
            .map(|&idx| self.dirty_storage[idx].value)
    }

    /// Committed value of `key` already observed this transaction, if cached.
    pub fn cached_committed_state(&self, key: StorageKey) -> Option<StorageValue> {
        self.origin_storage.get(&key).copied()
    }

    /// Caches a committed value read from the backing store.
    pub fn cache_committed_state(&mut self, key: StorageKey, value: StorageValue) {
        self.origin_storage.insert(key, value);
    }

    /// Records a slot write, replacing any earlier write to the same key so
    /// that each key has at most one dirty entry.
    pub fn write_state(&mut self, key: StorageKey, value: StorageValue) {
        if let Some(&idx) = self.key_to_dirty_index.get(&key) {
            self.dirty_storage[idx].value = value;
        } else {
            self.key_to_dirty_index.insert(key, self.dirty_storage.len());
            self.dirty_storage.push(State::new(key, value));
        }
    }

    /// Removes the dirty entry for `key`. Journal revert path: the entry being
    /// removed is the most recently appended one, later appends having been
    /// reverted already.
    pub fn remove_dirty_state(&mut self, key: StorageKey) {
        let Some(idx) = self.key_to_dirty_index.remove(&key) else {
            return;
        };
        self.dirty_storage.remove(idx);
        for (i, entry) in self.dirty_storage.iter().enumerate().skip(idx) {
            self.key_to_dirty_index.insert(entry.key, i);
        }
    }

    /// Slot writes made this transaction, in write order.
    pub fn dirty_storage(&self) -> &[State] {
        &self.dirty_storage
    }

    /// Folds the dirty writes into the committed cache and clears them.
    /// Called after the overlay flushed the entries to the backing store.
    pub fn finalise_dirty_storage(&mut self) {
        for entry in self.dirty_storage.drain(..) {
            self.origin_storage.insert(entry.key, entry.value);
        }
        self.key_to_dirty_index.clear();
    }

    // -- code ---------------------------------------------------------------

    /// Cached contract code, if loaded.
    pub fn code(&self) -> Option<&Bytes> {
        self.code.as_ref()
    }

    /// Caches code loaded from the backing store without dirtying the object.
    pub fn cache_code(&mut self, code: Bytes) {
        self.code = Some(code);
    }

    /// Installs new code and its hash and marks the code dirty.
    ///
    /// `code_hash` must be the Keccak-256 hash of `code`; empty code hashes
    /// to [`KECCAK_EMPTY`].
    pub fn set_code(&mut self, code_hash: B256, code: Bytes) {
        self.account.code_hash = code_hash;
        self.code = Some(code);
        self.status.insert(ObjectStatus::DirtyCode);
    }

    /// Reinstates previous code, hash and dirty flag. Journal revert path.
    pub fn restore_code(&mut self, code: Bytes, code_hash: B256, dirty: bool) {
        self.account.code_hash = code_hash;
        self.code = Some(code);
        self.set_dirty_code(dirty);
    }

    /// Whether code must be written on commit.
    pub fn is_dirty_code(&self) -> bool {
        self.status.contains(ObjectStatus::DirtyCode)
    }

    /// Sets or clears the dirty-code flag.
    pub fn set_dirty_code(&mut self, dirty: bool) {
        self.status.set(ObjectStatus::DirtyCode, dirty);
    }

    // -- lifecycle ----------------------------------------------------------

    /// Whether the account is scheduled for deletion.
    pub fn is_suicided(&self) -> bool {
        self.status.contains(ObjectStatus::Suicided)
    }

    /// Schedules the account for deletion at finalise time. Idempotent.
    pub fn mark_suicided(&mut self) {
        self.status.insert(ObjectStatus::Suicided);
    }

    /// Sets or clears the suicided flag. Journal revert path.
    pub fn set_suicided(&mut self, suicided: bool) {
        self.status.set(ObjectStatus::Suicided, suicided);
    }

    /// Whether the account was removed from the backing store.
    pub fn is_deleted(&self) -> bool {
        self.status.contains(ObjectStatus::Deleted)
    }

    /// Marks the account as removed from the backing store.
    pub fn mark_deleted(&mut self) {
        self.status.insert(ObjectStatus::Deleted);
    }

    /// Whether the account is empty: zero nonce, zero balance and no code.
    pub fn empty(&self, denom: &str) -> bool {
        self.account.sequence == 0
            && self.account.balance(denom).is_zero()
            && self.account.code_hash == KECCAK_EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmovm_primitives::keccak256;

    fn object() -> StateObject {
        StateObject::new(Account::new(Address::ZERO))
    }

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn fresh_object_is_empty() {
        let so = object();
        assert!(so.empty("aphoton"));
        assert!(!so.is_suicided());
        assert!(!so.is_deleted());
        assert!(!so.is_dirty_code());
    }

    #[test]
    fn balance_and_nonce_break_emptiness() {
        let mut so = object();
        so.set_balance("aphoton", U256::from(1u64));
        assert!(!so.empty("aphoton"));

        so.set_balance("aphoton", U256::ZERO);
        so.set_nonce(1);
        assert!(!so.empty("aphoton"));
    }

    #[test]
    fn dirty_storage_keeps_one_entry_per_key() {
        let mut so = object();
        so.write_state(hash(1), hash(10));
        so.write_state(hash(2), hash(20));
        so.write_state(hash(1), hash(11));

        assert_eq!(so.dirty_storage().len(), 2);
        assert_eq!(so.dirty_state(hash(1)), Some(hash(11)));
        assert_eq!(so.dirty_state(hash(2)), Some(hash(20)));
        // write order is preserved
        assert_eq!(so.dirty_storage()[0].key, hash(1));
        assert_eq!(so.dirty_storage()[1].key, hash(2));
    }

    #[test]
    fn remove_dirty_state_reindexes_survivors() {
        let mut so = object();
        so.write_state(hash(1), hash(10));
        so.write_state(hash(2), hash(20));
        so.remove_dirty_state(hash(1));

        assert_eq!(so.dirty_state(hash(1)), None);
        assert_eq!(so.dirty_state(hash(2)), Some(hash(20)));

        so.write_state(hash(2), hash(21));
        assert_eq!(so.dirty_storage().len(), 1);
        assert_eq!(so.dirty_state(hash(2)), Some(hash(21)));
    }

    #[test]
    fn finalise_folds_dirty_into_committed() {
        let mut so = object();
        so.write_state(hash(1), hash(10));
        so.finalise_dirty_storage();

        assert!(so.dirty_storage().is_empty());
        assert_eq!(so.dirty_state(hash(1)), None);
        assert_eq!(so.cached_committed_state(hash(1)), Some(hash(10)));
    }

    #[test]
    fn set_code_marks_dirty_and_updates_hash() {
        let mut so = object();
        let code = Bytes::from_static(b"code");
        so.set_code(keccak256(&code), code.clone());

        assert!(so.is_dirty_code());
        assert_eq!(so.code(), Some(&code));
        assert_eq!(so.code_hash(), keccak256(&code));
        assert!(!so.empty("aphoton"));
    }

    #[test]
    fn restore_code_reinstates_previous_state() {
        let mut so = object();
        let code = Bytes::from_static(b"code");
        so.set_code(keccak256(&code), code);

        so.restore_code(Bytes::new(), KECCAK_EMPTY, false);
        assert!(!so.is_dirty_code());
        assert_eq!(so.code_hash(), KECCAK_EMPTY);
        assert!(so.empty("aphoton"));
    }

    #[test]
    fn suicide_flags_are_idempotent() {
        let mut so = object();
        so.mark_suicided();
        so.mark_suicided();
        assert!(so.is_suicided());

        so.set_suicided(false);
        assert!(!so.is_suicided());
    }
}
