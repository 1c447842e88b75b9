use crate::model::{epoch::EpochState, stores::dag::DagStoreReader};
use arc_swap::ArcSwap;
use bobtail_consensus_core::api::{BobtailInfo, DagInfo};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use std::sync::Arc;

/// An immutable view of the chain head and the live DAG
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainTipSnapshot {
    pub tip: Hash,
    pub height: u64,
    pub chain_work: Uint256,
    pub dag_size: u64,
    /// Sorted
    pub dag_tips: Vec<Hash>,
}

impl From<&EpochState> for ChainTipSnapshot {
    fn from(epoch: &EpochState) -> Self {
        Self {
            tip: epoch.chain.tip,
            height: epoch.chain.height,
            chain_work: epoch.chain.chain_work,
            dag_size: epoch.dag.len() as u64,
            dag_tips: epoch.dag.get_tips(),
        }
    }
}

/// Serves chain tip queries without touching the epoch lock. The snapshot is
/// replaced as a whole, so tip, height and DAG size are always mutually consistent.
pub struct ChainTipTracker {
    snapshot: ArcSwap<ChainTipSnapshot>,
}

impl ChainTipTracker {
    pub fn new(snapshot: ChainTipSnapshot) -> Self {
        Self { snapshot: ArcSwap::from_pointee(snapshot) }
    }

    /// Must be called while holding the epoch write lock
    pub fn publish(&self, epoch: &EpochState) {
        self.snapshot.store(Arc::new(ChainTipSnapshot::from(epoch)));
    }

    pub fn snapshot(&self) -> Arc<ChainTipSnapshot> {
        self.snapshot.load_full()
    }

    pub fn chain_tip(&self) -> Hash {
        self.snapshot.load().tip
    }

    pub fn chain_height(&self) -> u64 {
        self.snapshot.load().height
    }

    pub fn dag_size(&self) -> u64 {
        self.snapshot.load().dag_size
    }

    pub fn dag_tips(&self) -> Vec<Hash> {
        self.snapshot.load().dag_tips.clone()
    }

    pub fn dag_info(&self) -> DagInfo {
        let snapshot = self.snapshot.load();
        DagInfo { size: snapshot.dag_size, tips: snapshot.dag_tips.clone() }
    }

    pub fn bobtail_info(&self) -> BobtailInfo {
        let snapshot = self.snapshot.load();
        BobtailInfo { chaintip: snapshot.tip, height: snapshot.height, chain_work: snapshot.chain_work, dag_size: snapshot.dag_size }
    }
}
