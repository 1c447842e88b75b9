use crate::constants::perf::HEIGHT_INDEX_CACHE_SIZE;
use bobtail_consensus_core::strong_block::StrongBlock;
use bobtail_database::prelude::{BatchDbWriter, CachedDbAccess, DB, DirectDbWriter, StoreError, StoreResult};
use bobtail_database::registry::DatabaseStorePrefixes;
use bobtail_hashes::Hash;
use rocksdb::WriteBatch;
use std::sync::Arc;

pub trait StrongBlocksStoreReader {
    fn get(&self, hash: Hash) -> StoreResult<Arc<StrongBlock>>;
    fn has(&self, hash: Hash) -> StoreResult<bool>;
    fn get_hash_by_height(&self, height: u64) -> StoreResult<Hash>;
}

pub trait StrongBlocksStore: StrongBlocksStoreReader {
    // This is append only
    fn insert(&self, block: Arc<StrongBlock>) -> StoreResult<()>;
}

/// Big endian height, so that the index iterates in chain order
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct HeightKey([u8; 8]);

impl From<u64> for HeightKey {
    fn from(height: u64) -> Self {
        Self(height.to_be_bytes())
    }
}

impl AsRef<[u8]> for HeightKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A DB + cache implementation of `StrongBlocksStore` trait, with concurrency support.
#[derive(Clone)]
pub struct DbStrongBlocksStore {
    db: Arc<DB>,
    blocks_access: CachedDbAccess<Hash, Arc<StrongBlock>>,
    height_index_access: CachedDbAccess<HeightKey, Hash>,
}

impl DbStrongBlocksStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self {
            db: Arc::clone(&db),
            blocks_access: CachedDbAccess::new(Arc::clone(&db), cache_size, DatabaseStorePrefixes::StrongBlocks.into()),
            height_index_access: CachedDbAccess::new(db, HEIGHT_INDEX_CACHE_SIZE, DatabaseStorePrefixes::StrongBlockHashByHeight.into()),
        }
    }

    pub fn clone_with_new_cache(&self, cache_size: u64) -> Self {
        Self::new(Arc::clone(&self.db), cache_size)
    }

    pub fn insert_batch(&self, batch: &mut WriteBatch, block: Arc<StrongBlock>) -> StoreResult<()> {
        if self.blocks_access.has(block.hash)? {
            return Err(StoreError::KeyAlreadyExists(block.hash.to_string()));
        }
        self.height_index_access.write(BatchDbWriter::new(batch), block.height.into(), block.hash)?;
        self.blocks_access.write(BatchDbWriter::new(batch), block.hash, block)?;
        Ok(())
    }

    /// Forgets cached entries of a block whose batch was never committed
    pub fn invalidate(&self, block: &StrongBlock) {
        self.blocks_access.invalidate(&block.hash);
        self.height_index_access.invalidate(&block.height.into());
    }

    /// Number of persisted strong blocks
    pub fn count(&self) -> usize {
        self.blocks_access.iterator().count()
    }
}

impl StrongBlocksStoreReader for DbStrongBlocksStore {
    fn get(&self, hash: Hash) -> StoreResult<Arc<StrongBlock>> {
        self.blocks_access.read(hash)
    }

    fn has(&self, hash: Hash) -> StoreResult<bool> {
        self.blocks_access.has(hash)
    }

    fn get_hash_by_height(&self, height: u64) -> StoreResult<Hash> {
        self.height_index_access.read(height.into())
    }
}

impl StrongBlocksStore for DbStrongBlocksStore {
    fn insert(&self, block: Arc<StrongBlock>) -> StoreResult<()> {
        if self.blocks_access.has(block.hash)? {
            return Err(StoreError::KeyAlreadyExists(block.hash.to_string()));
        }
        self.height_index_access.write(DirectDbWriter::new(&self.db), block.height.into(), block.hash)?;
        self.blocks_access.write(DirectDbWriter::new(&self.db), block.hash, block)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_consensus_core::config::params::DEVNET_PARAMS;
    use bobtail_database::{create_temp_db, prelude::ConnBuilder, prelude::StoreResultExtensions};
    use bobtail_math::Uint256;

    #[test]
    fn test_strong_blocks_store() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        let store = DbStrongBlocksStore::new(db.clone(), 4);

        let genesis = Arc::new(StrongBlock::genesis(&DEVNET_PARAMS.genesis));
        store.insert(genesis.clone()).unwrap();
        assert!(matches!(store.insert(genesis.clone()), Err(StoreError::KeyAlreadyExists(_))));

        let next = Arc::new(StrongBlock::new(1, 1, genesis.hash, vec![3.into()], Uint256::from_u64(3), Uint256::from_u64(9)));
        let mut batch = WriteBatch::default();
        store.insert_batch(&mut batch, next.clone()).unwrap();
        db.write(batch).unwrap();

        let fresh = store.clone_with_new_cache(4);
        assert_eq!(fresh.get(next.hash).unwrap(), next);
        assert_eq!(fresh.get_hash_by_height(0).unwrap(), genesis.hash);
        assert_eq!(fresh.get_hash_by_height(1).unwrap(), next.hash);
        assert!(fresh.get_hash_by_height(2).optional().unwrap().is_none());
        assert_eq!(fresh.count(), 2);
    }

    #[test]
    fn test_invalidate_uncommitted() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default()).unwrap();
        let store = DbStrongBlocksStore::new(db, 4);
        let block = Arc::new(StrongBlock::new(1, 1, 7.into(), vec![3.into()], Uint256::from_u64(3), Uint256::from_u64(9)));

        let mut batch = WriteBatch::default();
        store.insert_batch(&mut batch, block.clone()).unwrap();
        assert!(store.has(block.hash).unwrap());
        // The batch is dropped instead of written
        drop(batch);
        store.invalidate(&block);
        assert!(!store.has(block.hash).unwrap());
        assert!(store.get_hash_by_height(1).optional().unwrap().is_none());
    }
}
