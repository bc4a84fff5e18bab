use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::Store;

/// RocksDB backend. Every write goes through `write_lock` so the
/// read-then-write operations stay atomic.
pub struct RocksDB {
    db: rocksdb::DB,
    write_lock: Mutex<()>,
}

impl RocksDB {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut options = rocksdb::Options::default();
        options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        options.increase_parallelism(2);
        options.set_max_background_jobs(4);
        options.create_if_missing(true);

        let db = rocksdb::DB::open(&options, path.as_ref())?;
        tracing::info!("Opened RocksDB store at {}", path.as_ref().display());

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("rocksdb write lock poisoned"))
    }
}

impl Store for RocksDB {
    type Iter<'a> = RocksDBIter<'a>;

    fn put(&self, key: &[u8], value: &[u8]) -> anyhow::Result<()> {
        let _guard = self.lock()?;
        self.db.put(key, value).map_err(Into::into)
    }

    fn put_if_absent(&self, key: &[u8], value: &[u8]) -> anyhow::Result<bool> {
        let _guard = self.lock()?;
        if self.db.get_pinned(key)?.is_some() {
            return Ok(false);
        }
        self.db.put(key, value)?;
        Ok(true)
    }

    fn update(
        &self,
        key: &[u8],
        f: &mut dyn FnMut(&[u8]) -> anyhow::Result<Option<Vec<u8>>>,
    ) -> anyhow::Result<bool> {
        let _guard = self.lock()?;
        let Some(current) = self.db.get(key)? else {
            return Ok(false);
        };
        match f(&current)? {
            Some(next) => {
                self.db.put(key, next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        self.db.get(key).map_err(Into::into)
    }

    fn delete(&self, key: &[u8]) -> anyhow::Result<()> {
        let _guard = self.lock()?;
        self.db.delete(key).map_err(Into::into)
    }

    fn iter<'a>(&'a self, prefix: &[u8]) -> Self::Iter<'a> {
        let mut db_iter = self.db.raw_iterator();
        db_iter.seek(prefix);
        RocksDBIter {
            db_iter,
            prefix: prefix.to_vec(),
        }
    }
}

/// Walks keys from the seek position and stops at the first key outside the prefix.
pub struct RocksDBIter<'a> {
    db_iter: rocksdb::DBRawIterator<'a>,
    prefix: Vec<u8>,
}

impl<'a> Iterator for RocksDBIter<'a> {
    type Item = (Box<[u8]>, Box<[u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.db_iter.valid() {
            return None;
        }

        let (key, value) = self.db_iter.item()?;
        if !key.starts_with(&self.prefix) {
            return None;
        }

        let (key, value) = (
            key.to_vec().into_boxed_slice(),
            value.to_vec().into_boxed_slice(),
        );
        self.db_iter.next();

        Some((key, value))
    }
}
