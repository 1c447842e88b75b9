use crate::{
    model::{
        epoch::{EpochState, EpochTransition},
        stores::{
            chain_state::DbChainStateStore,
            dag::DagStoreReader,
            strong_blocks::{DbStrongBlocksStore, StrongBlocksStoreReader},
        },
    },
    processes::{difficulty::calc_work, ordering::is_canonical, selector::KSelector, selector::Selection},
};
use bobtail_consensus_core::{chain::ChainState, config::params::STRONG_BLOCK_VERSION, strong_block::StrongBlock};
use bobtail_core::{error, info, warn};
use bobtail_database::prelude::{DB, StoreError, StoreResult};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::sync::Arc;
use thiserror::Error;

/// Reasons a selection may no longer be committed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecheckError {
    #[error("the epoch base moved from {expected} to {found}")]
    BaseChanged { expected: Hash, found: Hash },

    #[error("expected {expected} subblocks but the selection holds {found}")]
    WrongCount { expected: usize, found: usize },

    #[error("selected subblock {0} is no longer in the DAG")]
    Missing(Hash),

    #[error("selected subblock {0} changed rank")]
    RankMismatch(Hash),

    #[error("the selection is not in canonical order")]
    NonCanonical,

    #[error("the aggregate {0} no longer crosses the strong target")]
    NoLongerCrosses(Uint256),
}

/// A committed strong block together with the epoch swap it caused
#[derive(Debug)]
pub struct Finalization {
    pub block: Arc<StrongBlock>,
    pub transition: EpochTransition,
}

#[derive(Debug)]
pub enum FinalizeVerdict {
    Finalized(Finalization),
    NotYetFinalizable,
}

/// Turns selections into strong blocks. Owns the only write path to the chain
/// state and the strong block stores.
pub struct Finalizer {
    db: Arc<DB>,
    selector: KSelector,
    strong_blocks_store: Arc<DbStrongBlocksStore>,
    chain_state_store: Arc<RwLock<DbChainStateStore>>,
}

impl Finalizer {
    pub fn new(
        db: Arc<DB>,
        selector: KSelector,
        strong_blocks_store: Arc<DbStrongBlocksStore>,
        chain_state_store: Arc<RwLock<DbChainStateStore>>,
    ) -> Self {
        Self { db, selector, strong_blocks_store, chain_state_store }
    }

    /// Verifies that `selection` still holds against the current epoch
    pub fn recheck(&self, epoch: &EpochState, selection: &Selection) -> Result<(), RecheckError> {
        if selection.base != epoch.dag.base() {
            return Err(RecheckError::BaseChanged { expected: selection.base, found: epoch.dag.base() });
        }
        if selection.subblocks.len() != self.selector.k() {
            return Err(RecheckError::WrongCount { expected: self.selector.k(), found: selection.subblocks.len() });
        }
        for selected in selection.subblocks.iter() {
            match epoch.dag.get_rank(selected.hash) {
                None => return Err(RecheckError::Missing(selected.hash)),
                Some(rank) if rank != selected.rank => return Err(RecheckError::RankMismatch(selected.hash)),
                Some(_) => {}
            }
        }
        if !is_canonical(&selection.subblocks) {
            return Err(RecheckError::NonCanonical);
        }
        let ranks: Vec<Uint256> = selection.subblocks.iter().map(|s| s.rank).collect();
        let score = self.selector.score(&ranks);
        if !self.selector.crosses(score) {
            return Err(RecheckError::NoLongerCrosses(score));
        }
        Ok(())
    }

    pub fn build_block(&self, chain: &ChainState, selection: &Selection) -> StrongBlock {
        StrongBlock::new(
            STRONG_BLOCK_VERSION,
            chain.height + 1,
            chain.tip,
            selection.hashes(),
            selection.score,
            next_chain_work(chain.chain_work, selection.score),
        )
    }

    /// Rechecks, builds and commits. A failed recheck is not an error, the epoch
    /// simply is not finalizable yet.
    pub fn finalize(&self, epoch: &mut EpochState, selection: Selection) -> StoreResult<FinalizeVerdict> {
        if let Err(err) = self.recheck(epoch, &selection) {
            warn!("Discarding selection over base {}: {}", selection.base, err);
            return Ok(FinalizeVerdict::NotYetFinalizable);
        }
        let block = self.build_block(&epoch.chain, &selection);
        self.commit(epoch, block).map(FinalizeVerdict::Finalized)
    }

    /// Persists `block` with the matching chain state in a single batch, then swaps
    /// the epoch. On a store failure the epoch is left untouched.
    pub fn commit(&self, epoch: &mut EpochState, block: StrongBlock) -> StoreResult<Finalization> {
        let block = Arc::new(block);
        let state = ChainState::from(block.as_ref());

        let mut chain_state_write = self.chain_state_store.write();
        let mut batch = WriteBatch::default();
        let res = self
            .strong_blocks_store
            .insert_batch(&mut batch, block.clone())
            .and_then(|_| chain_state_write.set_batch(&mut batch, state))
            .and_then(|_| self.db.write(batch).map_err(StoreError::from));
        if let Err(err) = res {
            error!("Failed committing strong block {} at height {}: {}", block.hash, block.height, err);
            if !matches!(err, StoreError::KeyAlreadyExists(_)) {
                self.strong_blocks_store.invalidate(&block);
            }
            chain_state_write.invalidate();
            return Err(err);
        }
        drop(chain_state_write);

        let transition = epoch.advance(&block);
        info!(
            "Finalized strong block {} at height {} (score: {}, reparented orphans: {}, dropped orphans: {})",
            block.hash,
            block.height,
            block.score,
            transition.reparented.len(),
            transition.expired.len()
        );
        Ok(Finalization { block, transition })
    }

    pub fn has_strong_block(&self, hash: Hash) -> StoreResult<bool> {
        self.strong_blocks_store.has(hash)
    }
}

/// Cumulative work after adding a block with the given score
pub fn next_chain_work(prev_work: Uint256, score: Uint256) -> Uint256 {
    prev_work.saturating_add(calc_work(score))
}
