pub mod iter;
pub mod map;
pub mod memory;
#[cfg(feature = "rocks")]
pub mod rocksdb;

use std::sync::Arc;

pub use map::StoreMap;
use serde::{de::DeserializeOwned, Serialize};

/// The Store is an embedded key-value storage shared by every poller.
pub trait Store: Send + Sync + 'static {
    type Iter<'a>: Iterator<Item = (Box<[u8]>, Box<[u8]>)>
    where
        Self: 'a;

    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()>;

    /// Writes `value` only when `key` is absent. Returns whether the write happened.
    /// The check and the write must be atomic with respect to other writers.
    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> anyhow::Result<bool>;

    /// Read-modify-write of an existing value, atomic with respect to every other
    /// write and delete. `f` returns the replacement, or `None` to keep the value.
    /// Absent keys are left absent. Returns whether a write happened.
    fn update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<Option<Vec<u8>>>,
    ) -> anyhow::Result<bool>;

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;

    fn delete(&self, key: &[u8]) -> anyhow::Result<()>;

    /// Iterates every entry whose key starts with `prefix`, in key order.
    fn iter<'a>(&'a self, prefix: &[u8]) -> Self::Iter<'a>;

    fn open_map<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned>(
        store: &Arc<Self>,
        prefix: impl AsRef<str>,
    ) -> StoreMap<K, V, Self>
    where
        Self: Sized,
    {
        StoreMap::new(Arc::clone(store), prefix)
    }
}

#[cfg(feature = "rocks")]
pub type LocalStore = crate::store::rocksdb::RocksDB;

#[cfg(not(feature = "rocks"))]
pub type LocalStore = crate::store::memory::MemoryStore;
