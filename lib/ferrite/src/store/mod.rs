//! The in-memory byte-string store backing the `get`/`set`/`del` commands.

pub mod dict;

use self::dict::Dict;

/// Hash a key with the FNV-1a style construction used on the wire peers,
/// widened to 64 bits for the table's cached codes.
#[inline]
pub fn key_hash(key: &[u8]) -> u64 {
    let mut hash: u32 = 0x811C_9DC5;
    for &byte in key {
        hash = hash.wrapping_add(u32::from(byte)).wrapping_mul(0x0100_0193);
    }
    u64::from(hash)
}

/// Map of opaque byte-string keys to byte-string values. Entries own their
/// key and value storage; lookups borrow until the next mutation.
pub struct Store {
    dict: Dict<Vec<u8>, Vec<u8>>,
}

impl Store {
    #[inline]
    pub fn new() -> Store {
        Store { dict: Dict::new() }
    }

    /// Insert the pair, replacing the stored value in place when the key is
    /// already present.
    pub fn put(&mut self, key: &[u8], val: &[u8]) {
        let hcode = key_hash(key);

        match self.dict.lookup_mut(hcode, key) {
            Some(stored) => *stored = val.to_vec(),
            None => self.dict.insert(hcode, key.to_vec(), val.to_vec()),
        }
    }

    /// Borrow the value stored under the key.
    pub fn get(&mut self, key: &[u8]) -> Option<&[u8]> {
        self.dict.lookup(key_hash(key), key).map(Vec::as_slice)
    }

    /// Remove the entry. Returns whether a value was present; removing an
    /// absent key is a no-op.
    pub fn del(&mut self, key: &[u8]) -> bool {
        self.dict.remove(key_hash(key), key).is_some()
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.dict.clear()
    }
}
