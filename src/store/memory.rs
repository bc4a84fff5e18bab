use std::collections::BTreeMap;
use std::sync::RwLock;

use super::Store;

/// In-process backend. Nothing survives a restart; used by tests and by
/// builds without the `rocks` feature.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("memory store lock poisoned")
}

impl Store for MemoryStore {
    type Iter<'a> = std::vec::IntoIter<(Box<[u8]>, Box<[u8]>)>;

    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    fn update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<Option<Vec<u8>>>,
    ) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let Some(current) = entries.get_mut(key) else {
            return Ok(false);
        };
        match f(current.as_slice())? {
            Some(next) => {
                *current = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn delete(&self, key: &[u8]) -> anyhow::Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn iter<'a>(&'a self, prefix: &[u8]) -> Self::Iter<'a> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| {
                (
                    key.clone().into_boxed_slice(),
                    value.clone().into_boxed_slice(),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}
