use bobtail_consensus_core::chain::ChainState;
use bobtail_database::prelude::{BatchDbWriter, CachedDbItem, DB, DirectDbWriter, StoreResult};
use bobtail_database::registry::DatabaseStorePrefixes;
use rocksdb::WriteBatch;
use std::sync::Arc;

/// Reader API for `ChainStateStore`.
pub trait ChainStateStoreReader {
    fn get(&self) -> StoreResult<ChainState>;
}

pub trait ChainStateStore: ChainStateStoreReader {
    fn set(&mut self, state: ChainState) -> StoreResult<()>;
}

/// A DB + cache implementation of `ChainStateStore` trait
#[derive(Clone)]
pub struct DbChainStateStore {
    db: Arc<DB>,
    access: CachedDbItem<ChainState>,
}

impl DbChainStateStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::ChainState.into()) }
    }

    pub fn clone_with_new_cache(&self) -> Self {
        Self::new(Arc::clone(&self.db))
    }

    pub fn set_batch(&mut self, batch: &mut WriteBatch, state: ChainState) -> StoreResult<()> {
        self.access.write(BatchDbWriter::new(batch), &state)
    }

    /// Drops the cached state so the next read reflects the DB
    pub fn invalidate(&self) {
        self.access.invalidate()
    }
}

impl ChainStateStoreReader for DbChainStateStore {
    fn get(&self) -> StoreResult<ChainState> {
        self.access.read()
    }
}

impl ChainStateStore for DbChainStateStore {
    fn set(&mut self, state: ChainState) -> StoreResult<()> {
        self.access.write(DirectDbWriter::new(&self.db), &state)
    }
}
