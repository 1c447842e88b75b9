use crate::{db::DB, errors::StoreError};

use super::prelude::{Cache, DbKey, DbWriter};
use rocksdb::{Direction, IteratorMode, ReadOptions};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::hash_map::RandomState, error::Error, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching.
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

pub type KeyDataResult<TData> = Result<(Box<[u8]>, TData), Box<dyn Error>>;

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_size: u64, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_size), prefix }
    }

    pub fn read_from_cache(&self, key: TKey) -> Option<TData> {
        self.cache.get(&key)
    }

    pub fn has(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        Ok(self.cache.contains_key(&key) || self.db.get_pinned(DbKey::new(&self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> Result<TData, StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned, // `db.get_pinned` slices are short lived
    {
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }
        let db_key = DbKey::new(&self.prefix, key.clone());
        if let Some(slice) = self.db.get_pinned(&db_key)? {
            let data: TData = bincode::deserialize(&slice)?;
            self.cache.insert(key, data.clone());
            Ok(data)
        } else {
            Err(StoreError::KeyNotFound(db_key))
        }
    }

    /// Iterates over all entries under the prefix, in key order
    pub fn iterator(&self) -> impl Iterator<Item = KeyDataResult<TData>> + '_
    where
        TData: DeserializeOwned,
    {
        let prefix_key = DbKey::prefix_only(&self.prefix);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix_key.as_ref()));
        self.db.iterator_opt(IteratorMode::From(prefix_key.as_ref(), Direction::Forward), read_opts).map(move |iter_result| {
            match iter_result {
                Ok((key, data_bytes)) => match bincode::deserialize(&data_bytes) {
                    Ok(data) => Ok((key[prefix_key.prefix_len()..].into(), data)),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: TData) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        writer.put(DbKey::new(&self.prefix, key.clone()), bin_data)?;
        self.cache.insert(key, data);
        Ok(())
    }

    pub fn delete(&self, mut writer: impl DbWriter, key: TKey) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        self.cache.remove(&key);
        writer.delete(DbKey::new(&self.prefix, key))?;
        Ok(())
    }

    /// Drops a cached entry without touching the DB, e.g. after a batch failed to commit
    pub fn invalidate(&self, key: &TKey) {
        self.cache.remove(key);
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        create_temp_db,
        prelude::{BatchDbWriter, ConnBuilder, DirectDbWriter, StoreResultExtensions},
    };
    use bobtail_hashes::Hash;
    use rocksdb::WriteBatch;

    #[test]
    fn test_access_read_write() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        let access = CachedDbAccess::<Hash, u64>::new(db.clone(), 2, vec![1, 2]);

        for i in 0..16u64 {
            access.write(DirectDbWriter::new(&db), i.into(), i * 10).unwrap();
        }
        assert_eq!(access.iterator().count(), 16);
        // Values evicted from the small cache are served from the DB
        for i in 0..16u64 {
            assert_eq!(access.read(i.into()).unwrap(), i * 10);
        }
        assert!(access.read(100.into()).optional().unwrap().is_none());
        assert!(!access.has(100.into()).unwrap());

        let mut batch = WriteBatch::default();
        access.delete(BatchDbWriter::new(&mut batch), 3.into()).unwrap();
        assert!(access.has(3.into()).unwrap());
        db.write(batch).unwrap();
        assert!(!access.has(3.into()).unwrap());
        assert_eq!(access.iterator().count(), 15);
    }

    #[test]
    fn test_prefix_isolation() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default()).unwrap();
        let a = CachedDbAccess::<Hash, u64>::new(db.clone(), 0, vec![1]);
        let b = CachedDbAccess::<Hash, u64>::new(db.clone(), 0, vec![2]);
        a.write(DirectDbWriter::new(&db), 1.into(), 5).unwrap();
        assert!(b.read(1.into()).optional().unwrap().is_none());
        assert_eq!(b.iterator().count(), 0);
    }
}
