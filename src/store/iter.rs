use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;

/// Decodes the raw entries of a prefix scan into typed pairs.
/// Entries that fail to decode are skipped.
pub struct MapIter<K, V, I>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    prefix_len: usize,
    iter: I,
    phantom: PhantomData<(K, V)>,
}

impl<K, V, I> MapIter<K, V, I>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    pub fn new(prefix: &[u8], iter: I) -> Self {
        Self {
            prefix_len: prefix.len(),
            iter,
            phantom: PhantomData,
        }
    }
}

impl<K, V, I> Iterator for MapIter<K, V, I>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, value) = self.iter.next()?;

            let key = match bincode::deserialize(&key[self.prefix_len..]) {
                Ok(key) => key,
                Err(e) => {
                    trace!("Store Iter deserialize(key) error: {e}");
                    continue;
                }
            };
            let value = match bincode::deserialize(&value) {
                Ok(value) => value,
                Err(e) => {
                    trace!("Store Iter deserialize(value) error: {e}");
                    continue;
                }
            };

            return Some((key, value));
        }
    }
}
