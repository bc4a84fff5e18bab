use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::{iter::MapIter, Store};

/// A typed view over one key prefix of a [`Store`].
pub struct StoreMap<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned, S: Store> {
    pub prefix: Box<[u8]>,
    store: Arc<S>,
    phantom: PhantomData<(K, V)>,
}

impl<K, V, S> Clone for StoreMap<K, V, S>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: Store,
{
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            store: Arc::clone(&self.store),
            phantom: PhantomData,
        }
    }
}

impl<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned, S: Store> StoreMap<K, V, S> {
    pub fn new(store: Arc<S>, prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().as_bytes().to_vec().into_boxed_slice(),
            store,
            phantom: PhantomData,
        }
    }

    fn full_key(&self, key: &K) -> anyhow::Result<Vec<u8>> {
        let key = bincode::serialize(key)?;
        Ok([&self.prefix, key.as_slice()].concat())
    }

    pub fn insert(&self, key: &K, value: &V) -> anyhow::Result<()> {
        let value = bincode::serialize(value)?;
        self.store.put(&self.full_key(key)?, &value)
    }

    /// Inserts only if the key is not present yet. Returns whether it was inserted.
    pub fn insert_if_absent(&self, key: &K, value: &V) -> anyhow::Result<bool> {
        let value = bincode::serialize(value)?;
        self.store.put_if_absent(&self.full_key(key)?, &value)
    }

    /// Atomically rewrites an existing value. `f` returns the new value, or
    /// `None` to keep the current one. Returns the value written, if any.
    pub fn update(&self, key: &K, mut f: impl FnMut(V) -> Option<V>) -> anyhow::Result<Option<V>> {
        let mut written = None;
        self.store.update(&self.full_key(key)?, &mut |raw| {
            let Some(next) = f(bincode::deserialize(raw)?) else {
                return Ok(None);
            };
            let bytes = bincode::serialize(&next)?;
            written = Some(next);
            Ok(Some(bytes))
        })?;
        Ok(written)
    }

    pub fn get(&self, key: &K) -> anyhow::Result<Option<V>> {
        match self.store.get(&self.full_key(key)?)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    pub fn remove(&self, key: &K) -> anyhow::Result<()> {
        self.store.delete(&self.full_key(key)?)
    }

    pub fn iter(&self) -> MapIter<K, V, S::Iter<'_>> {
        let iter = self.store.iter(&self.prefix);
        MapIter::new(&self.prefix, iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_maps_with_different_prefixes_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let left = MemoryStore::open_map::<String, u32>(&store, "left");
        let right = MemoryStore::open_map::<String, u32>(&store, "right");

        left.insert(&"key".to_string(), &1).unwrap();
        right.insert(&"key".to_string(), &2).unwrap();

        assert_eq!(left.get(&"key".to_string()).unwrap(), Some(1));
        assert_eq!(right.get(&"key".to_string()).unwrap(), Some(2));
        assert_eq!(left.iter().count(), 1);

        left.remove(&"key".to_string()).unwrap();
        assert_eq!(left.get(&"key".to_string()).unwrap(), None);
        assert_eq!(right.get(&"key".to_string()).unwrap(), Some(2));
    }

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        let store = Arc::new(MemoryStore::new());
        let map = MemoryStore::open_map::<String, String>(&store, "first_wins");

        assert!(map
            .insert_if_absent(&"k".to_string(), &"one".to_string())
            .unwrap());
        assert!(!map
            .insert_if_absent(&"k".to_string(), &"two".to_string())
            .unwrap());
        assert_eq!(map.get(&"k".to_string()).unwrap(), Some("one".to_string()));
    }

    #[test]
    fn test_update_rewrites_only_existing_values() {
        let store = Arc::new(MemoryStore::new());
        let map = MemoryStore::open_map::<String, u32>(&store, "counters");
        map.insert(&"hits".to_string(), &1).unwrap();

        assert_eq!(map.update(&"hits".to_string(), |n| Some(n + 1)).unwrap(), Some(2));
        assert_eq!(map.update(&"hits".to_string(), |_| None).unwrap(), None);
        assert_eq!(map.get(&"hits".to_string()).unwrap(), Some(2));

        assert_eq!(map.update(&"misses".to_string(), |n| Some(n + 1)).unwrap(), None);
        assert_eq!(map.get(&"misses".to_string()).unwrap(), None);
    }
}
