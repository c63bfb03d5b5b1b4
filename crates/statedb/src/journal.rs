//! The journal of reversible state changes.
//!
//! Every mutation the overlay performs pushes one entry carrying enough
//! information to undo exactly that mutation. Snapshots record a journal
//! length; reverting replays entries backwards until the length is reached.

use crate::statedb::StateDB;
use cosmovm_primitives::{Address, Bytes, HashMap, StorageKey, StorageValue, B256, U256};
use cosmovm_state::StateObject;
use cosmovm_store::Backend;

/// A reversible state change.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JournalEntry {
    /// A state object was created for a previously unknown address.
    /// Revert: remove the object from the live set.
    CreateObject {
        /// Address of the created object.
        address: Address,
    },
    /// A state object was overwritten by `create_object`.
    /// Revert: reinstate the previous object at the same index.
    ResetObject {
        /// The object as it was before being overwritten.
        prev: Box<StateObject>,
    },
    /// An account was marked suicided and its balance zeroed.
    /// Revert: restore the flag and the balance.
    Suicide {
        /// Address of the suicided account.
        address: Address,
        /// Whether the account was already suicided.
        prev_suicided: bool,
        /// Balance before it was zeroed.
        prev_balance: U256,
    },
    /// An account balance changed.
    /// Revert: restore the previous balance.
    BalanceChange {
        /// Address of the account.
        address: Address,
        /// Balance before the change.
        prev_balance: U256,
    },
    /// An account nonce changed.
    /// Revert: restore the previous nonce.
    NonceChange {
        /// Address of the account.
        address: Address,
        /// Nonce before the change.
        prev_nonce: u64,
    },
    /// A storage slot was written.
    /// Revert: restore the previous dirty value, or drop the dirty entry when
    /// the slot had not been written this transaction.
    StorageChange {
        /// Address of the account.
        address: Address,
        /// Slot key.
        key: StorageKey,
        /// Previous dirty value; `None` when the key was clean.
        prev_value: Option<StorageValue>,
    },
    /// Contract code was installed.
    /// Revert: restore the previous code, hash and dirty flag.
    CodeChange {
        /// Address of the account.
        address: Address,
        /// Code before the change.
        prev_code: Bytes,
        /// Code hash before the change.
        prev_code_hash: B256,
        /// Whether the code was already dirty before the change.
        prev_dirty_code: bool,
    },
    /// The gas refund counter changed.
    /// Revert: restore the previous counter.
    RefundChange {
        /// Counter value before the change.
        prev: u64,
    },
    /// A log was emitted.
    /// Revert: pop the last log and decrement the running log index.
    AddLog {
        /// Hash of the transaction that emitted the log.
        tx_hash: B256,
    },
    /// A SHA3 preimage was recorded.
    /// Revert: remove the preimage entry.
    AddPreimage {
        /// Hash of the recorded preimage.
        hash: B256,
    },
    /// An account was touched without changing state.
    /// Revert: nothing; the touch only marks the address dirty for finalise.
    Touch {
        /// Address of the touched account.
        address: Address,
    },
    /// An address was added to the access list.
    /// Revert: remove the address and any slots it owns.
    AccessListAddAccount {
        /// The warmed address.
        address: Address,
    },
    /// A slot was added to an address's access-list entry.
    /// Revert: remove the slot from that address's set.
    AccessListAddSlot {
        /// The warmed address.
        address: Address,
        /// The warmed slot.
        slot: B256,
    },
}

impl JournalEntry {
    /// Address marked dirty by this entry, if any. Dirty addresses drive
    /// which objects `finalise`/`commit` write back.
    pub fn dirtied(&self) -> Option<Address> {
        match self {
            Self::CreateObject { address }
            | Self::Suicide { address, .. }
            | Self::BalanceChange { address, .. }
            | Self::NonceChange { address, .. }
            | Self::StorageChange { address, .. }
            | Self::CodeChange { address, .. }
            | Self::Touch { address } => Some(*address),
            Self::ResetObject { .. }
            | Self::RefundChange { .. }
            | Self::AddLog { .. }
            | Self::AddPreimage { .. }
            | Self::AccessListAddAccount { .. }
            | Self::AccessListAddSlot { .. } => None,
        }
    }

    /// Undoes the state change recorded by this entry.
    pub(crate) fn revert<B: Backend>(self, db: &mut StateDB<B>) {
        match self {
            Self::CreateObject { address } => {
                db.remove_state_object(address);
            }
            Self::ResetObject { prev } => {
                let idx = db.address_to_object_index[&prev.address()];
                db.state_objects[idx].object = *prev;
            }
            Self::Suicide {
                address,
                prev_suicided,
                prev_balance,
            } => {
                let denom = db.evm_denom();
                let so = db.object_mut(address);
                so.set_suicided(prev_suicided);
                so.set_balance(&denom, prev_balance);
            }
            Self::BalanceChange {
                address,
                prev_balance,
            } => {
                let denom = db.evm_denom();
                db.object_mut(address).set_balance(&denom, prev_balance);
            }
            Self::NonceChange {
                address,
                prev_nonce,
            } => {
                db.object_mut(address).set_nonce(prev_nonce);
            }
            Self::StorageChange {
                address,
                key,
                prev_value,
            } => {
                let so = db.object_mut(address);
                match prev_value {
                    Some(value) => so.write_state(key, value),
                    None => so.remove_dirty_state(key),
                }
            }
            Self::CodeChange {
                address,
                prev_code,
                prev_code_hash,
                prev_dirty_code,
            } => {
                db.object_mut(address)
                    .restore_code(prev_code, prev_code_hash, prev_dirty_code);
            }
            Self::RefundChange { prev } => {
                db.refund = prev;
            }
            Self::AddLog { .. } => {
                db.logs.pop();
                db.log_size -= 1;
            }
            Self::AddPreimage { hash } => {
                let idx = db
                    .hash_to_preimage_index
                    .remove(&hash)
                    .expect("reverting preimage not present in overlay");
                debug_assert_eq!(idx, db.preimages.len() - 1);
                db.preimages.truncate(idx);
            }
            Self::Touch { .. } => {}
            Self::AccessListAddAccount { address } => {
                db.access_list.remove_address(address);
            }
            Self::AccessListAddSlot { address, slot } => {
                db.access_list.remove_slot(address, slot);
            }
        }
    }
}

/// Ordered log of reversible changes plus the dirty-address bookkeeping that
/// drives `finalise` and `commit`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Journal {
    entries: Vec<JournalEntry>,
    /// Dirty addresses in first-touch order, with a change count per address.
    dirties: Vec<DirtyMark>,
    address_to_dirty_index: HashMap<Address, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct DirtyMark {
    address: Address,
    changes: usize,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded so far.
    pub fn length(&self) -> usize {
        self.entries.len()
    }

    /// Records an entry, marking its address dirty where applicable.
    pub fn append(&mut self, entry: JournalEntry) {
        if let Some(address) = entry.dirtied() {
            self.add_dirty(address);
        }
        self.entries.push(entry);
    }

    /// Pops the most recent entry, unwinding its dirty mark.
    pub(crate) fn pop(&mut self) -> Option<JournalEntry> {
        let entry = self.entries.pop()?;
        if let Some(address) = entry.dirtied() {
            self.sub_dirty(address);
        }
        Some(entry)
    }

    /// Addresses touched by journalled mutations, in first-touch order.
    pub fn dirty_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.dirties.iter().map(|mark| mark.address)
    }

    fn add_dirty(&mut self, address: Address) {
        match self.address_to_dirty_index.get(&address) {
            Some(&idx) => self.dirties[idx].changes += 1,
            None => {
                self.address_to_dirty_index
                    .insert(address, self.dirties.len());
                self.dirties.push(DirtyMark {
                    address,
                    changes: 1,
                });
            }
        }
    }

    fn sub_dirty(&mut self, address: Address) {
        let Some(&idx) = self.address_to_dirty_index.get(&address) else {
            return;
        };
        self.dirties[idx].changes -= 1;
        if self.dirties[idx].changes == 0 {
            self.address_to_dirty_index.remove(&address);
            self.dirties.remove(idx);
            for (i, mark) in self.dirties.iter().enumerate().skip(idx) {
                self.address_to_dirty_index.insert(mark.address, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn append_counts_dirty_addresses_once() {
        let mut journal = Journal::new();
        journal.append(JournalEntry::NonceChange {
            address: addr(1),
            prev_nonce: 0,
        });
        journal.append(JournalEntry::BalanceChange {
            address: addr(1),
            prev_balance: U256::ZERO,
        });
        journal.append(JournalEntry::Touch { address: addr(2) });

        assert_eq!(journal.length(), 3);
        let dirty: Vec<_> = journal.dirty_addresses().collect();
        assert_eq!(dirty, vec![addr(1), addr(2)]);
    }

    #[test]
    fn refund_and_log_entries_do_not_dirty() {
        let mut journal = Journal::new();
        journal.append(JournalEntry::RefundChange { prev: 0 });
        journal.append(JournalEntry::AddLog {
            tx_hash: B256::ZERO,
        });

        assert_eq!(journal.dirty_addresses().count(), 0);
    }

    #[test]
    fn pop_unwinds_dirty_marks_and_preserves_order() {
        let mut journal = Journal::new();
        journal.append(JournalEntry::Touch { address: addr(1) });
        journal.append(JournalEntry::Touch { address: addr(2) });
        journal.append(JournalEntry::Touch { address: addr(2) });
        journal.append(JournalEntry::Touch { address: addr(3) });

        // addr(3) drops out, addr(2) survives with one change left
        journal.pop();
        journal.pop();

        let dirty: Vec<_> = journal.dirty_addresses().collect();
        assert_eq!(dirty, vec![addr(1), addr(2)]);

        // removal from the middle reindexes survivors
        journal.pop();
        journal.pop();
        assert_eq!(journal.dirty_addresses().count(), 0);
        assert_eq!(journal.length(), 0);
    }
}
