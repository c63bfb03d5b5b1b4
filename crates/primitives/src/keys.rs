//! Key layout of the module's KV store.
//!
//! All records written by the overlay live under one of three single-byte
//! prefixes. Contract storage keys additionally embed the owning address so
//! that one account's slots form a contiguous, prefix-iterable range.

use crate::{Address, StorageKey, B256};

/// Prefix under which contract code is stored, keyed by code hash.
pub const KEY_PREFIX_CODE: &[u8] = &[0x01];

/// Prefix under which contract storage is stored, keyed by address and slot.
pub const KEY_PREFIX_STORAGE: &[u8] = &[0x02];

/// Prefix under which block-height to header-hash records are stored.
pub const KEY_PREFIX_HEIGHT_HASH: &[u8] = &[0x03];

/// Store key of the code blob with the given hash.
pub fn code_key(code_hash: B256) -> Vec<u8> {
    [KEY_PREFIX_CODE, code_hash.as_slice()].concat()
}

/// Prefix scoping all storage slots of one account.
pub fn address_storage_prefix(address: Address) -> Vec<u8> {
    [KEY_PREFIX_STORAGE, address.as_slice()].concat()
}

/// Store key of a single storage slot.
pub fn state_key(address: Address, key: StorageKey) -> Vec<u8> {
    [KEY_PREFIX_STORAGE, address.as_slice(), key.as_slice()].concat()
}

/// Store key of the header hash recorded at `height`.
pub fn height_hash_key(height: u64) -> Vec<u8> {
    [KEY_PREFIX_HEIGHT_HASH, height.to_be_bytes().as_slice()].concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{address, b256};

    #[test]
    fn state_key_embeds_address_and_slot() {
        let address = address!("0x756f45e3fa69347a9a973a725e3c98bc4db0b4c1");
        let slot = b256!("0x00000000000000000000000000000000000000000000000000000000000000ff");

        let key = state_key(address, slot);
        assert_eq!(key.len(), 1 + 20 + 32);
        assert!(key.starts_with(KEY_PREFIX_STORAGE));
        assert!(key.ends_with(slot.as_slice()));
        assert_eq!(&key[..address_storage_prefix(address).len()], address_storage_prefix(address));
    }

    #[test]
    fn height_hash_key_is_big_endian() {
        let key = height_hash_key(0x0102_0304);
        assert_eq!(key, vec![0x03, 0, 0, 0, 0, 0x01, 0x02, 0x03, 0x04]);
    }
}
