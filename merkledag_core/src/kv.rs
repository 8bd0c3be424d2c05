//! Key-value stores that DAG objects are persisted into.

use crate::error::Result;
use crate::hash::{Algorithm, Hash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// A store of byte values keyed by content address.
///
/// Implementations must treat `put` as idempotent: writing the same bytes under
/// the same hash twice is harmless. The DAG builder checks `has` before every
/// `put`, but that check and the write are not atomic, so two builders may
/// both write an object.
pub trait KvStore {
    /// Check whether a value exists under `hash`.
    fn has(&self, hash: &Hash) -> Result<bool>;

    /// Store `value` under `hash`.
    fn put(&self, hash: &Hash, value: &[u8]) -> Result<()>;

    /// Read the value under `hash`, `None` if absent.
    fn get(&self, hash: &Hash) -> Result<Option<Vec<u8>>>;

    /// The hash algorithm this store is pinned to, if any.
    fn algorithm(&self) -> Option<Algorithm> {
        None
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn has(&self, hash: &Hash) -> Result<bool> {
        (**self).has(hash)
    }

    fn put(&self, hash: &Hash, value: &[u8]) -> Result<()> {
        (**self).put(hash, value)
    }

    fn get(&self, hash: &Hash) -> Result<Option<Vec<u8>>> {
        (**self).get(hash)
    }

    fn algorithm(&self) -> Option<Algorithm> {
        (**self).algorithm()
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn has(&self, hash: &Hash) -> Result<bool> {
        (**self).has(hash)
    }

    fn put(&self, hash: &Hash, value: &[u8]) -> Result<()> {
        (**self).put(hash, value)
    }

    fn get(&self, hash: &Hash) -> Result<Option<Vec<u8>>> {
        (**self).get(hash)
    }

    fn algorithm(&self) -> Option<Algorithm> {
        (**self).algorithm()
    }
}

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` and
/// cloned on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<Hash, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct values stored.
    pub fn len(&self) -> usize {
        self.values.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls received, including repeated ones.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    /// All stored hashes, sorted.
    pub fn ids(&self) -> Vec<Hash> {
        let map = self.values.read().expect("lock poisoned");
        let mut ids: Vec<Hash> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl KvStore for MemoryStore {
    fn has(&self, hash: &Hash) -> Result<bool> {
        Ok(self.values.read().expect("lock poisoned").contains_key(hash))
    }

    fn put(&self, hash: &Hash, value: &[u8]) -> Result<()> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.values
            .write()
            .expect("lock poisoned")
            .entry(*hash)
            .or_insert_with(|| value.to_vec());
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().expect("lock poisoned").get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HASH_SIZE;

    fn key(byte: u8) -> Hash {
        Hash::from_bytes([byte; HASH_SIZE])
    }

    #[test]
    fn test_put_get_has() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(!store.has(&key(1)).unwrap());
        assert_eq!(store.get(&key(1)).unwrap(), None);

        store.put(&key(1), b"value").unwrap();
        assert!(store.has(&key(1)).unwrap());
        assert_eq!(store.get(&key(1)).unwrap().as_deref(), Some(&b"value"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = MemoryStore::new();
        store.put(&key(1), b"value").unwrap();
        store.put(&key(1), b"value").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.put_count(), 2);
    }

    #[test]
    fn test_ids_sorted() {
        let store = MemoryStore::new();
        store.put(&key(3), b"c").unwrap();
        store.put(&key(1), b"a").unwrap();
        assert_eq!(store.ids(), vec![key(1), key(3)]);
    }

    #[test]
    fn test_blanket_impls_delegate() {
        let store = Arc::new(MemoryStore::new());
        let by_ref: &MemoryStore = &store;

        by_ref.put(&key(1), b"a").unwrap();
        assert!(store.has(&key(1)).unwrap());
        assert!(KvStore::has(&store, &key(1)).unwrap());
        assert_eq!(KvStore::algorithm(&store), None);
    }
}
