//! Per-transaction warm set of addresses and storage slots (EIP-2930).

use cosmovm_primitives::{hash_map::Entry, Address, HashMap, HashSet, B256};

/// The per-transaction access list.
///
/// Addresses map to an optional index into `slot_sets`; an address that has
/// never accumulated slots carries `None`. Additions are journalled by the
/// overlay so that reverting a snapshot also cools the touched entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessList {
    addresses: HashMap<Address, Option<usize>>,
    slot_sets: Vec<HashSet<B256>>,
}

impl AccessList {
    /// Creates an empty access list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `address` is in the access list.
    pub fn contains_address(&self, address: Address) -> bool {
        self.addresses.contains_key(&address)
    }

    /// Returns `(address_present, slot_present)`. A slot is only reported
    /// present when its address is present too.
    pub fn contains(&self, address: Address, slot: B256) -> (bool, bool) {
        match self.addresses.get(&address) {
            Some(Some(idx)) => (true, self.slot_sets[*idx].contains(&slot)),
            Some(None) => (true, false),
            None => (false, false),
        }
    }

    /// Adds `address` to the list. Returns `true` iff it was newly added.
    pub fn add_address(&mut self, address: Address) -> bool {
        match self.addresses.entry(address) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(None);
                true
            }
        }
    }

    /// Adds the `(address, slot)` pair, allocating a slot set when needed.
    /// Returns `(address_newly_added, slot_newly_added)`.
    pub fn add_slot(&mut self, address: Address, slot: B256) -> (bool, bool) {
        match self.addresses.entry(address) {
            Entry::Occupied(mut entry) => match *entry.get() {
                Some(idx) => (false, self.slot_sets[idx].insert(slot)),
                None => {
                    // Address was warm without slots; give it a set now.
                    entry.insert(Some(self.slot_sets.len()));
                    self.slot_sets.push(HashSet::from_iter([slot]));
                    (false, true)
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(Some(self.slot_sets.len()));
                self.slot_sets.push(HashSet::from_iter([slot]));
                (true, true)
            }
        }
    }

    /// Removes a slot, undoing an `add_slot`. Journal revert path: entries
    /// unwind in reverse, so a slot set emptied here is always the last one.
    pub(crate) fn remove_slot(&mut self, address: Address, slot: B256) {
        let Some(Some(idx)) = self.addresses.get(&address).copied() else {
            panic!("reverting slot change, address not present in list");
        };
        let set = &mut self.slot_sets[idx];
        set.remove(&slot);
        if set.is_empty() {
            debug_assert_eq!(idx, self.slot_sets.len() - 1);
            self.slot_sets.truncate(idx);
            self.addresses.insert(address, None);
        }
    }

    /// Removes an address, undoing an `add_address` that allocated no slots.
    pub(crate) fn remove_address(&mut self, address: Address) {
        self.addresses.remove(&address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn slot(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn add_address_reports_novelty() {
        let mut list = AccessList::new();
        assert!(list.add_address(addr(1)));
        assert!(!list.add_address(addr(1)));
        assert!(list.contains_address(addr(1)));
        assert!(!list.contains_address(addr(2)));
    }

    #[test]
    fn slots_require_their_address() {
        let mut list = AccessList::new();
        assert_eq!(list.contains(addr(1), slot(9)), (false, false));

        list.add_address(addr(1));
        assert_eq!(list.contains(addr(1), slot(9)), (true, false));

        assert_eq!(list.add_slot(addr(1), slot(9)), (false, true));
        assert_eq!(list.contains(addr(1), slot(9)), (true, true));
        assert_eq!(list.add_slot(addr(1), slot(9)), (false, false));
    }

    #[test]
    fn add_slot_to_fresh_address_adds_both() {
        let mut list = AccessList::new();
        assert_eq!(list.add_slot(addr(1), slot(9)), (true, true));
        assert_eq!(list.contains(addr(1), slot(9)), (true, true));
    }

    #[test]
    fn remove_unwinds_in_reverse() {
        let mut list = AccessList::new();
        list.add_slot(addr(1), slot(9));

        list.remove_slot(addr(1), slot(9));
        assert_eq!(list.contains(addr(1), slot(9)), (true, false));

        list.remove_address(addr(1));
        assert_eq!(list.contains(addr(1), slot(9)), (false, false));
    }
}
