//! The transactional state overlay.

use crate::{AccessList, Journal, JournalEntry, StateError};
use cosmovm_primitives::{
    keccak256, Address, Bytes, Coin, Dec, HashMap, HashSet, Log, Params, StorageKey, StorageValue,
    B256, KECCAK_EMPTY, U256,
};
use cosmovm_state::StateObject;
use cosmovm_store::Backend;
use tracing::{debug, trace};

/// A snapshot of the overlay, identified by a monotonically increasing id and
/// the journal length at which it was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Revision {
    id: usize,
    journal_index: usize,
}

/// One slot of the live-object arena.
#[derive(Clone, Debug)]
pub(crate) struct StateEntry {
    pub(crate) address: Address,
    pub(crate) object: StateObject,
}

#[derive(Clone, Debug)]
pub(crate) struct PreimageEntry {
    hash: B256,
    preimage: Bytes,
}

/// In-memory staging area for account and storage mutations while EVM
/// transactions execute.
///
/// Objects enter the live arena on first access and leave it only through
/// [`StateDB::clear_state_objects`] or [`StateDB::reset`]; insertion order is
/// preserved and determines the order of writes to the external store on
/// [`StateDB::commit`]. Every mutation pushes a [`JournalEntry`] so that
/// [`StateDB::revert_to_snapshot`] can restore any earlier state of the
/// current transaction.
///
/// The overlay is single-owner: `&mut self` receivers enforce the
/// one-transaction-at-a-time discipline the host's execution pipeline
/// guarantees.
#[derive(Debug)]
pub struct StateDB<B: Backend> {
    backend: B,

    /// Live objects, modified while processing a state transition.
    pub(crate) state_objects: Vec<StateEntry>,
    pub(crate) address_to_object_index: HashMap<Address, usize>,
    state_objects_dirty: HashSet<Address>,

    /// The gas refund counter, also used by state transitioning.
    pub(crate) refund: u64,

    tx_hash: B256,
    block_hash: B256,
    tx_index: u64,
    pub(crate) log_size: u64,
    pub(crate) logs: Vec<Log>,

    pub(crate) preimages: Vec<PreimageEntry>,
    pub(crate) hash_to_preimage_index: HashMap<B256, usize>,

    /// First error observed while reading from the external store. The VM
    /// cannot deal with store-level failures, so reads memoise the error here
    /// and it is eventually surfaced by [`StateDB::error`].
    db_err: Option<StateError<B::Error>>,

    /// Journal of state modifications, the backbone of snapshot and revert.
    pub(crate) journal: Journal,
    valid_revisions: Vec<Revision>,
    next_revision_id: usize,

    pub(crate) access_list: AccessList,

    params: Option<Params>,
}

impl<B: Backend> StateDB<B> {
    /// Creates an overlay over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state_objects: Vec::new(),
            address_to_object_index: HashMap::default(),
            state_objects_dirty: HashSet::default(),
            refund: 0,
            tx_hash: B256::ZERO,
            block_hash: B256::ZERO,
            tx_index: 0,
            log_size: 0,
            logs: Vec::new(),
            preimages: Vec::new(),
            hash_to_preimage_index: HashMap::default(),
            db_err: None,
            journal: Journal::new(),
            valid_revisions: Vec::new(),
            next_revision_id: 0,
            access_list: AccessList::new(),
            params: None,
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // ------------------------------------------------------------------------
    // Parameters and height hashes
    // ------------------------------------------------------------------------

    /// Persists the parameter set and refreshes the cache.
    pub fn set_params(&mut self, params: Params) {
        self.backend.set_params(&params);
        self.params = Some(params);
    }

    /// The parameter set, cached after the first load.
    pub fn get_params(&mut self) -> Params {
        if let Some(params) = &self.params {
            return params.clone();
        }
        let params = self.backend.params();
        self.params = Some(params.clone());
        params
    }

    pub(crate) fn evm_denom(&mut self) -> String {
        self.get_params().evm_denom
    }

    /// Records the block header hash for `height`. Height hashes bypass the
    /// overlay's dirty tracking: they are immutable once written.
    pub fn set_height_hash(&mut self, height: u64, hash: B256) {
        if let Err(err) = self.backend.set_height_hash(height, hash) {
            self.set_error(StateError::Store(err));
        }
    }

    /// The block header hash recorded at `height`, zero when absent.
    pub fn get_height_hash(&mut self, height: u64) -> B256 {
        match self.backend.height_hash(height) {
            Ok(hash) => hash,
            Err(err) => {
                self.set_error(StateError::Store(err));
                B256::ZERO
            }
        }
    }

    // ------------------------------------------------------------------------
    // Balance, nonce, code and storage
    // ------------------------------------------------------------------------

    /// Replaces the balance of the account at `address`.
    pub fn set_balance(&mut self, address: Address, amount: U256) {
        let denom = self.evm_denom();
        let idx = self.get_or_new_state_object(address);
        let prev = self.state_objects[idx].object.balance(&denom);
        self.journal.append(JournalEntry::BalanceChange {
            address,
            prev_balance: prev,
        });
        self.state_objects[idx].object.set_balance(&denom, amount);
    }

    /// Adds `amount` to the balance of the account at `address`.
    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let denom = self.evm_denom();
        let idx = self.get_or_new_state_object(address);
        let prev = self.state_objects[idx].object.balance(&denom);
        let Some(new) = prev.checked_add(amount) else {
            panic!("balance overflow: cannot add {amount} to {prev}");
        };
        self.journal.append(JournalEntry::BalanceChange {
            address,
            prev_balance: prev,
        });
        self.state_objects[idx].object.set_balance(&denom, new);
    }

    /// Subtracts `amount` from the balance of the account at `address`.
    ///
    /// # Panics
    ///
    /// Panics when the balance would go negative. The host EVM gas-gates
    /// transfers; an underflow here is a caller bug, not a recoverable state.
    pub fn sub_balance(&mut self, address: Address, amount: U256) {
        let denom = self.evm_denom();
        let idx = self.get_or_new_state_object(address);
        let prev = self.state_objects[idx].object.balance(&denom);
        let Some(new) = prev.checked_sub(amount) else {
            panic!("balance underflow: cannot subtract {amount} from {prev}");
        };
        self.journal.append(JournalEntry::BalanceChange {
            address,
            prev_balance: prev,
        });
        self.state_objects[idx].object.set_balance(&denom, new);
    }

    /// Balance of the account at `address`, zero when absent.
    pub fn get_balance(&mut self, address: Address) -> U256 {
        let denom = self.evm_denom();
        match self.get_state_object(address) {
            Some(idx) => self.state_objects[idx].object.balance(&denom),
            None => U256::ZERO,
        }
    }

    /// Replaces the nonce (sequence number) of the account at `address`.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        let idx = self.get_or_new_state_object(address);
        let prev = self.state_objects[idx].object.nonce();
        self.journal.append(JournalEntry::NonceChange {
            address,
            prev_nonce: prev,
        });
        self.state_objects[idx].object.set_nonce(nonce);
    }

    /// Nonce of the account at `address`, zero when absent.
    pub fn get_nonce(&mut self, address: Address) -> u64 {
        match self.get_state_object(address) {
            Some(idx) => self.state_objects[idx].object.nonce(),
            None => 0,
        }
    }

    /// Installs contract code at `address`.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let idx = self.get_or_new_state_object(address);
        let prev_code = self.load_object_code(idx);
        let so = &self.state_objects[idx].object;
        self.journal.append(JournalEntry::CodeChange {
            address,
            prev_code,
            prev_code_hash: so.code_hash(),
            prev_dirty_code: so.is_dirty_code(),
        });
        let code_hash = keccak256(&code);
        self.state_objects[idx].object.set_code(code_hash, code);
    }

    /// Contract code of the account at `address`, empty when absent.
    pub fn get_code(&mut self, address: Address) -> Bytes {
        match self.get_state_object(address) {
            Some(idx) => self.load_object_code(idx),
            None => Bytes::new(),
        }
    }

    /// Size of the contract code at `address`.
    pub fn get_code_size(&mut self, address: Address) -> usize {
        self.get_code(address).len()
    }

    /// Hash of the contract code at `address`, zero when the account is
    /// absent.
    pub fn get_code_hash(&mut self, address: Address) -> B256 {
        match self.get_state_object(address) {
            Some(idx) => self.state_objects[idx].object.code_hash(),
            None => B256::ZERO,
        }
    }

    /// Writes a storage slot. Writing the value already visible through
    /// [`StateDB::get_state`] is a no-op.
    pub fn set_state(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let idx = self.get_or_new_state_object(address);
        let current = self.object_state(idx, key);
        if current == value {
            return;
        }
        let prev = self.state_objects[idx].object.dirty_state(key);
        self.journal.append(JournalEntry::StorageChange {
            address,
            key,
            prev_value: prev,
        });
        self.state_objects[idx].object.write_state(key, value);
    }

    /// Current value of a storage slot, dirty writes included. Zero when the
    /// account or the slot is absent.
    pub fn get_state(&mut self, address: Address, key: StorageKey) -> StorageValue {
        match self.get_state_object(address) {
            Some(idx) => self.object_state(idx, key),
            None => B256::ZERO,
        }
    }

    /// Committed (pre-transaction) value of a storage slot, ignoring dirty
    /// writes.
    pub fn get_committed_state(&mut self, address: Address, key: StorageKey) -> StorageValue {
        match self.get_state_object(address) {
            Some(idx) => self.object_committed_state(idx, key),
            None => B256::ZERO,
        }
    }

    /// Iterates the committed storage of `address` in key order, dirty writes
    /// shadowing committed values, until the callback returns `true`.
    pub fn for_each_storage(
        &mut self,
        address: Address,
        mut f: impl FnMut(StorageKey, StorageValue) -> bool,
    ) -> Result<(), StateError<B::Error>> {
        let Some(idx) = self.get_state_object(address) else {
            return Ok(());
        };
        let so = &self.state_objects[idx].object;
        self.backend
            .for_each_committed_state(address, &mut |key, value| {
                if let Some(dirty) = so.dirty_state(key) {
                    return f(key, dirty);
                }
                f(key, value)
            })
            .map_err(StateError::Store)
    }

    // ------------------------------------------------------------------------
    // Transaction logs
    // ------------------------------------------------------------------------

    /// Sets the transaction hash, block hash and transaction index used to
    /// stamp logs emitted by the EVM.
    pub fn prepare(&mut self, tx_hash: B256, block_hash: B256, tx_index: u64) {
        self.tx_hash = tx_hash;
        self.block_hash = block_hash;
        self.tx_index = tx_index;
    }

    /// Index of the transaction being executed, set by [`StateDB::prepare`].
    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    /// Hash of the block being executed, set by [`StateDB::prepare`].
    pub fn block_hash(&self) -> B256 {
        self.block_hash
    }

    /// Overrides the block hash.
    pub fn set_block_hash(&mut self, hash: B256) {
        self.block_hash = hash;
    }

    /// Stamps the log with the current transaction metadata and appends it.
    pub fn add_log(&mut self, mut log: Log) {
        self.journal.append(JournalEntry::AddLog {
            tx_hash: self.tx_hash,
        });

        log.tx_hash = self.tx_hash;
        log.block_hash = self.block_hash;
        log.tx_index = self.tx_index;
        log.index = self.log_size;

        self.log_size += 1;
        self.logs.push(log);
    }

    /// Logs of the transaction currently being executed.
    ///
    /// Log storage is per-transaction: the overlay only ever holds the
    /// current transaction's logs, so they are returned for any requested
    /// hash. Archival across transactions is the embedder's job.
    pub fn get_logs(&self, _tx_hash: B256) -> &[Log] {
        &self.logs
    }

    /// Replaces the current transaction's logs.
    pub fn set_logs(&mut self, _tx_hash: B256, logs: Vec<Log>) {
        self.logs = logs;
    }

    /// Drops the current transaction's logs.
    pub fn delete_logs(&mut self, _tx_hash: B256) {
        self.logs.clear();
    }

    /// Running log index of the current transaction.
    pub fn log_size(&self) -> u64 {
        self.log_size
    }

    /// Overrides the running log index.
    pub fn set_log_size(&mut self, log_size: u64) {
        self.log_size = log_size;
    }

    // ------------------------------------------------------------------------
    // Preimages and refunds
    // ------------------------------------------------------------------------

    /// Records a SHA3 preimage seen by the VM. The first preimage recorded
    /// for a hash wins.
    pub fn add_preimage(&mut self, hash: B256, preimage: &[u8]) {
        if self.hash_to_preimage_index.contains_key(&hash) {
            return;
        }
        self.journal.append(JournalEntry::AddPreimage { hash });
        self.hash_to_preimage_index
            .insert(hash, self.preimages.len());
        self.preimages.push(PreimageEntry {
            hash,
            preimage: Bytes::copy_from_slice(preimage),
        });
    }

    /// The preimages recorded so far, keyed by hash.
    pub fn preimages(&self) -> HashMap<B256, Bytes> {
        self.preimages
            .iter()
            .map(|entry| (entry.hash, entry.preimage.clone()))
            .collect()
    }

    /// Adds gas to the refund counter.
    pub fn add_refund(&mut self, gas: u64) {
        self.journal
            .append(JournalEntry::RefundChange { prev: self.refund });
        self.refund += gas;
    }

    /// Removes gas from the refund counter.
    ///
    /// # Panics
    ///
    /// Panics when the counter would go below zero; the host EVM must never
    /// refund more than it accumulated.
    pub fn sub_refund(&mut self, gas: u64) {
        self.journal
            .append(JournalEntry::RefundChange { prev: self.refund });
        if gas > self.refund {
            panic!("refund counter below zero");
        }
        self.refund -= gas;
    }

    /// Current value of the refund counter.
    pub fn get_refund(&self) -> u64 {
        self.refund
    }

    // ------------------------------------------------------------------------
    // Access list
    // ------------------------------------------------------------------------

    /// Adds `address` to the per-transaction access list.
    pub fn add_address_to_access_list(&mut self, address: Address) {
        if self.access_list.add_address(address) {
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
    }

    /// Adds the `(address, slot)` pair to the per-transaction access list.
    pub fn add_slot_to_access_list(&mut self, address: Address, slot: B256) {
        let (address_added, slot_added) = self.access_list.add_slot(address, slot);
        if address_added {
            // In practice the address is warm before any of its slots is
            // touched, since entering its scope warms it. Handle the stray
            // case anyway.
            self.journal
                .append(JournalEntry::AccessListAddAccount { address });
        }
        if slot_added {
            self.journal
                .append(JournalEntry::AccessListAddSlot { address, slot });
        }
    }

    /// Whether `address` is in the access list.
    pub fn address_in_access_list(&self, address: Address) -> bool {
        self.access_list.contains_address(address)
    }

    /// Returns `(address_present, slot_present)` for the pair.
    pub fn slot_in_access_list(&self, address: Address, slot: B256) -> (bool, bool) {
        self.access_list.contains(address, slot)
    }

    // ------------------------------------------------------------------------
    // Snapshotting
    // ------------------------------------------------------------------------

    /// Records a revision of the current state and returns its id.
    pub fn snapshot(&mut self) -> usize {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        self.valid_revisions.push(Revision {
            id,
            journal_index: self.journal.length(),
        });
        id
    }

    /// Undoes every state change made since the revision `id` was taken.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not name a live revision: reverting a committed,
    /// already-reverted or foreign snapshot is a host-EVM bug.
    pub fn revert_to_snapshot(&mut self, id: usize) {
        let idx = self
            .valid_revisions
            .partition_point(|revision| revision.id < id);
        if idx == self.valid_revisions.len() || self.valid_revisions[idx].id != id {
            panic!("revision id {id} cannot be reverted");
        }
        let snapshot = self.valid_revisions[idx].journal_index;
        trace!(
            revision = id,
            entries = self.journal.length() - snapshot,
            "reverting to snapshot"
        );

        // Replay the journal backwards and drop the invalidated revisions.
        while self.journal.length() > snapshot {
            let entry = self
                .journal
                .pop()
                .expect("journal is longer than the snapshot");
            entry.revert(self);
        }
        self.valid_revisions.truncate(idx);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Flushes dirty objects' storage and account records to the external
    /// store, deleting suicided (and, when `delete_empty` is set, empty)
    /// accounts, then clears the journal, the refund counter and the current
    /// transaction's logs.
    ///
    /// Objects are visited in journal order, first touch first.
    pub fn finalise(&mut self, delete_empty: bool) -> Result<(), StateError<B::Error>> {
        let denom = self.evm_denom();
        let dirty: Vec<Address> = self.journal.dirty_addresses().collect();
        debug!(dirty = dirty.len(), delete_empty, "finalising overlay");

        for address in dirty {
            let Some(&idx) = self.address_to_object_index.get(&address) else {
                // The RIPEMD-160 precompile was touched by a call that ran out
                // of gas at mainnet block 1714175; the touch outlives the
                // revert, so a dirty address may have no live object.
                continue;
            };

            let so = &self.state_objects[idx].object;
            if so.is_suicided() || (delete_empty && so.empty(&denom)) {
                self.delete_state_object(idx);
            } else {
                self.commit_object_state(idx)?;
                self.update_state_object(idx)?;
            }

            self.state_objects_dirty.insert(address);
        }

        // Reverting across transactions is not allowed; drop the journal.
        self.clear_journal_and_refund();
        let tx_hash = self.tx_hash;
        self.delete_logs(tx_hash);
        Ok(())
    }

    /// Writes the state of every dirty object to the external store: dirty
    /// code first, then the account record. Suicided and dirty-empty objects
    /// are removed instead. Always returns the zero hash: the host chain
    /// computes the real root in its own commit pipeline.
    pub fn commit(&mut self, delete_empty: bool) -> Result<B256, StateError<B::Error>> {
        let result = self.commit_objects(delete_empty);
        self.clear_journal_and_refund();
        result.map(|()| B256::ZERO)
    }

    fn commit_objects(&mut self, delete_empty: bool) -> Result<(), StateError<B::Error>> {
        // Fold pending journal dirties into the dirty set.
        let dirty: Vec<Address> = self.journal.dirty_addresses().collect();
        self.state_objects_dirty.extend(dirty);

        let denom = self.evm_denom();
        debug!(
            objects = self.state_objects.len(),
            dirty = self.state_objects_dirty.len(),
            delete_empty,
            "committing overlay"
        );

        for idx in 0..self.state_objects.len() {
            let address = self.state_objects[idx].address;
            let is_dirty = self.state_objects_dirty.contains(&address);

            let so = &self.state_objects[idx].object;
            if so.is_suicided() || (is_dirty && delete_empty && so.empty(&denom)) {
                self.delete_state_object(idx);
            } else if is_dirty {
                if self.state_objects[idx].object.code().is_some()
                    && self.state_objects[idx].object.is_dirty_code()
                {
                    self.commit_object_code(idx)?;
                }
                self.update_state_object(idx)?;
            }

            self.state_objects_dirty.remove(&address);
        }
        Ok(())
    }

    /// Equivalent to [`StateDB::finalise`] followed by returning the zero
    /// hash; the host chain has no intermediate merkle root to offer.
    pub fn intermediate_root(&mut self, delete_empty: bool) -> Result<B256, StateError<B::Error>> {
        self.finalise(delete_empty)?;
        Ok(B256::ZERO)
    }

    /// Flushes the object's dirty storage into the external store in write
    /// order; zero values delete the underlying record.
    fn commit_object_state(&mut self, idx: usize) -> Result<(), StateError<B::Error>> {
        let address = self.state_objects[idx].address;
        for entry in self.state_objects[idx].object.dirty_storage() {
            self.backend
                .set_committed_state(address, entry.key, entry.value)
                .map_err(StateError::Store)?;
        }
        self.state_objects[idx].object.finalise_dirty_storage();
        Ok(())
    }

    /// Writes the object's code blob under its hash and clears the dirty
    /// flag.
    fn commit_object_code(&mut self, idx: usize) -> Result<(), StateError<B::Error>> {
        let (code_hash, code) = {
            let so = &self.state_objects[idx].object;
            (so.code_hash(), so.code().cloned().unwrap_or_default())
        };
        self.backend
            .set_code(code_hash, &code)
            .map_err(StateError::Store)?;
        self.state_objects[idx].object.set_dirty_code(false);
        Ok(())
    }

    /// Writes the object's account record through the account keeper after
    /// validating the mirrored coin and the bank blacklist.
    fn update_state_object(&mut self, idx: usize) -> Result<(), StateError<B::Error>> {
        let params = self.get_params();
        let address = self.state_objects[idx].address;
        let so = &self.state_objects[idx].object;

        let balance = Coin::new(
            params.evm_denom.clone(),
            Dec::from_scaled(so.balance(&params.evm_denom)),
        );
        if !balance.is_valid() {
            return Err(StateError::InvalidBalance(balance));
        }
        if self.backend.blacklisted_addr(address) {
            return Err(StateError::Blacklisted(address));
        }

        self.backend.set_account(self.state_objects[idx].object.account());
        Ok(())
    }

    /// Removes the object's account from the external store and marks the
    /// object terminally deleted.
    fn delete_state_object(&mut self, idx: usize) {
        self.state_objects[idx].object.mark_deleted();
        let account = self.state_objects[idx].object.account().clone();
        debug!(address = %account.address, "removing account from store");
        self.backend.remove_account(&account);
    }

    fn clear_journal_and_refund(&mut self) {
        self.journal = Journal::new();
        self.valid_revisions.clear();
        self.refund = 0;
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Whether an account exists at `address`. Suicided accounts still exist
    /// until the state is committed.
    pub fn exist(&mut self, address: Address) -> bool {
        self.get_state_object(address).is_some()
    }

    /// Whether the account at `address` is absent or empty (zero balance,
    /// zero nonce, no code).
    pub fn empty(&mut self, address: Address) -> bool {
        let denom = self.evm_denom();
        match self.get_state_object(address) {
            Some(idx) => self.state_objects[idx].object.empty(&denom),
            None => true,
        }
    }

    /// First store error observed by the overlay, if any.
    pub fn error(&self) -> Option<&StateError<B::Error>> {
        self.db_err.as_ref()
    }

    /// Whether the account at `address` was suicided this transaction.
    pub fn has_suicided(&mut self, address: Address) -> bool {
        match self.get_state_object(address) {
            Some(idx) => self.state_objects[idx].object.is_suicided(),
            None => false,
        }
    }

    /// Marks the account at `address` as suicided and clears its balance.
    /// Returns `false` when no state object exists for the address.
    ///
    /// The object stays in the live arena until the state is committed;
    /// reads keep resolving it in the meantime.
    pub fn suicide(&mut self, address: Address) -> bool {
        let denom = self.evm_denom();
        let Some(idx) = self.get_state_object(address) else {
            return false;
        };

        let so = &self.state_objects[idx].object;
        self.journal.append(JournalEntry::Suicide {
            address,
            prev_suicided: so.is_suicided(),
            prev_balance: so.balance(&denom),
        });

        let so = &mut self.state_objects[idx].object;
        so.mark_suicided();
        so.set_balance(&denom, U256::ZERO);
        true
    }

    /// Explicitly creates a state object at `address`, carrying over the
    /// balance of any object it replaces.
    ///
    /// Called for the EVM CREATE operation. A contract may send funds to
    /// `sha(account ++ (nonce + 1))` and then create a contract at the same
    /// address; carrying the balance over keeps the funds from vanishing.
    pub fn create_account(&mut self, address: Address) {
        let denom = self.evm_denom();
        let (idx, prev) = self.create_object(address);
        if let Some(prev) = prev {
            let balance = prev.balance(&denom);
            self.state_objects[idx].object.set_balance(&denom, balance);
        }
    }

    /// Drops all ephemeral state: live objects, dirty marks, logs, preimages,
    /// access list, per-transaction metadata, the params cache, the journal
    /// and the refund counter. The external store is untouched. Used between
    /// transactions.
    pub fn reset(&mut self, _root: B256) {
        self.state_objects.clear();
        self.address_to_object_index.clear();
        self.state_objects_dirty.clear();
        self.tx_hash = B256::ZERO;
        self.block_hash = B256::ZERO;
        self.tx_index = 0;
        self.log_size = 0;
        self.logs.clear();
        self.preimages.clear();
        self.hash_to_preimage_index.clear();
        self.access_list = AccessList::new();
        self.params = None;
        self.clear_journal_and_refund();
    }

    /// Drops the live object arena only. Used when accounts changed outside
    /// of the EVM, e.g. a non-EVM module moved funds.
    pub fn clear_state_objects(&mut self) {
        self.state_objects.clear();
        self.address_to_object_index.clear();
        self.state_objects_dirty.clear();
    }

    /// Reconciles cached balances and nonces against the external account
    /// store, replacing the mirrored record where they diverge.
    pub fn update_accounts(&mut self) {
        let denom = self.evm_denom();
        for idx in 0..self.state_objects.len() {
            let address = self.state_objects[idx].address;
            let Some(account) = self.backend.account(address) else {
                continue;
            };

            let balance = account.balance(&denom);
            let so = &self.state_objects[idx].object;
            if so.balance(&denom) != balance || so.nonce() != account.sequence {
                self.state_objects[idx].object.replace_account(account);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Object resolution
    // ------------------------------------------------------------------------

    /// Resolves the state object at `address`, creating one when it is absent
    /// or terminally deleted.
    fn get_or_new_state_object(&mut self, address: Address) -> usize {
        match self.get_state_object(address) {
            Some(idx) => idx,
            None => self.create_object(address).0,
        }
    }

    /// Resolves the state object at `address`: live objects win, deleted
    /// objects read as absent, unknown addresses are fetched from the account
    /// keeper and memoise a [`StateError::NoAccount`] when missing there too.
    pub(crate) fn get_state_object(&mut self, address: Address) -> Option<usize> {
        if let Some(&idx) = self.address_to_object_index.get(&address) {
            if self.state_objects[idx].object.is_deleted() {
                return None;
            }
            return Some(idx);
        }

        // Not cached; attempt to fetch the account from the account keeper.
        let Some(account) = self.backend.account(address) else {
            self.set_error(StateError::NoAccount(address));
            return None;
        };

        Some(self.set_state_object(StateObject::new(account)))
    }

    /// Creates a new state object at `address`, overwriting and returning any
    /// previous object.
    fn create_object(&mut self, address: Address) -> (usize, Option<StateObject>) {
        let prev = self
            .get_state_object(address)
            .map(|idx| self.state_objects[idx].object.clone());

        let account = self.backend.new_account_with_address(address);
        let mut object = StateObject::new(account);
        // Pin the fresh record's sequence even when the keeper minted it
        // non-zero.
        object.set_nonce(0);

        if let Some(prev) = &prev {
            self.journal.append(JournalEntry::ResetObject {
                prev: Box::new(prev.clone()),
            });
        } else {
            self.journal.append(JournalEntry::CreateObject { address });
        }

        let idx = self.set_state_object(object);
        (idx, prev)
    }

    /// Installs the object in the arena, overwriting in place when the
    /// address is already indexed.
    fn set_state_object(&mut self, object: StateObject) -> usize {
        let address = object.address();
        if let Some(&idx) = self.address_to_object_index.get(&address) {
            self.state_objects[idx].object = object;
            return idx;
        }

        let idx = self.state_objects.len();
        self.state_objects.push(StateEntry { address, object });
        self.address_to_object_index.insert(address, idx);
        idx
    }

    /// Removes the object from the arena and reindexes the survivors.
    /// Journal revert path.
    pub(crate) fn remove_state_object(&mut self, address: Address) {
        let Some(idx) = self.address_to_object_index.remove(&address) else {
            return;
        };
        self.state_objects.remove(idx);
        for (i, entry) in self.state_objects.iter().enumerate().skip(idx) {
            self.address_to_object_index.insert(entry.address, i);
        }
    }

    /// The live object at `address`. Journal revert path.
    ///
    /// # Panics
    ///
    /// Panics when no object is indexed at `address`; journalled mutations
    /// imply the object exists.
    pub(crate) fn object_mut(&mut self, address: Address) -> &mut StateObject {
        let idx = self.address_to_object_index[&address];
        &mut self.state_objects[idx].object
    }

    /// Remembers the first error observed while reading the external store.
    fn set_error(&mut self, err: StateError<B::Error>) {
        if self.db_err.is_none() {
            self.db_err = Some(err);
        }
    }

    // ------------------------------------------------------------------------
    // Object-level read-through
    // ------------------------------------------------------------------------

    /// Current slot value: dirty write first, then the committed view.
    fn object_state(&mut self, idx: usize, key: StorageKey) -> StorageValue {
        if let Some(value) = self.state_objects[idx].object.dirty_state(key) {
            return value;
        }
        self.object_committed_state(idx, key)
    }

    /// Committed slot value, read through the backing store and cached on
    /// first observation.
    fn object_committed_state(&mut self, idx: usize, key: StorageKey) -> StorageValue {
        if let Some(value) = self.state_objects[idx].object.cached_committed_state(key) {
            return value;
        }

        let address = self.state_objects[idx].address;
        let value = match self.backend.committed_state(address, key) {
            Ok(value) => value,
            Err(err) => {
                self.set_error(StateError::Store(err));
                return B256::ZERO;
            }
        };
        self.state_objects[idx]
            .object
            .cache_committed_state(key, value);
        value
    }

    /// Contract code of the object, loading and caching it from the backing
    /// store when needed.
    fn load_object_code(&mut self, idx: usize) -> Bytes {
        if let Some(code) = self.state_objects[idx].object.code() {
            return code.clone();
        }

        let code_hash = self.state_objects[idx].object.code_hash();
        if code_hash == KECCAK_EMPTY {
            return Bytes::new();
        }

        let code = match self.backend.code(code_hash) {
            Ok(code) => code,
            Err(err) => {
                self.set_error(StateError::Store(err));
                Bytes::new()
            }
        };
        if code.is_empty() {
            self.set_error(StateError::NoCode(code_hash));
        }
        self.state_objects[idx].object.cache_code(code.clone());
        code
    }
}
