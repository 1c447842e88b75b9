use crate::model::stores::{
    dag::{DagStore, DagStoreReader},
    orphans::{ExpiredOrphan, OrphanEntry, OrphanPool},
};
use bobtail_consensus_core::{BlockHashSet, chain::ChainState, config::params::Params, strong_block::StrongBlock};
use bobtail_hashes::Hash;

/// What an epoch swap released from the orphan pool
#[derive(Debug, Default)]
pub struct EpochTransition {
    /// Orphans built directly on the new strong block, ready to be linked
    pub reparented: Vec<OrphanEntry>,
    /// Orphans descending from the epoch which was just closed
    pub expired: Vec<ExpiredOrphan>,
}

/// Mutable consensus state of the current epoch. Written by the DAG processor
/// only, read concurrently by validation workers.
pub struct EpochState {
    pub chain: ChainState,
    pub dag: DagStore,
    pub orphans: OrphanPool,
    /// Subblocks and base of the previous epoch. Parents found here are stale.
    pub retired: BlockHashSet,
    /// Set after the current top k was evaluated and failed to cross. Cleared
    /// whenever the top k may have changed.
    pub known_unfinalizable: bool,
}

impl EpochState {
    pub fn new(chain: ChainState, params: &Params) -> Self {
        Self {
            chain,
            dag: DagStore::new(chain.tip),
            orphans: OrphanPool::new(params.max_orphans, params.orphan_expire_interval, params.orphan_expire_scan_interval),
            retired: BlockHashSet::new(),
            known_unfinalizable: false,
        }
    }

    /// Whether the subblock is linked or buffered
    pub fn is_known(&self, hash: Hash) -> bool {
        self.dag.has(hash) || self.orphans.contains(hash)
    }

    pub fn is_retired(&self, hash: Hash) -> bool {
        self.retired.contains(&hash)
    }

    /// Marks a subblock rejected for a stale parent as stale itself. Its buffered
    /// descendants can never link and are dropped.
    pub fn retire_stale(&mut self, hash: Hash) -> Vec<ExpiredOrphan> {
        self.retired.insert(hash);
        self.orphans.drop_descendants_of(&BlockHashSet::from_iter([hash]))
    }

    /// Closes the current epoch on top of `block`, which must extend the current tip
    pub fn advance(&mut self, block: &StrongBlock) -> EpochTransition {
        debug_assert_eq!(block.prev_hash, self.chain.tip);
        let previous_base = self.dag.base();
        let mut cleared = self.dag.reset(block.hash);
        cleared.insert(previous_base);

        self.chain = ChainState::from(block);
        self.known_unfinalizable = false;

        let expired = self.orphans.drop_descendants_of(&cleared);
        let reparented = self.orphans.take_children(block.hash);
        self.retired = cleared;
        EpochTransition { reparented, expired }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_consensus_core::{config::params::DEVNET_PARAMS, subblock::Subblock};
    use bobtail_math::Uint256;

    #[test]
    fn test_advance() {
        let genesis = DEVNET_PARAMS.genesis.hash;
        let mut epoch = EpochState::new(ChainState::new(genesis, 0, Uint256::ZERO), &DEVNET_PARAMS);

        for (hash, parent) in [(1u64, genesis), (2, 1.into())] {
            let subblock = Subblock::from_precomputed_hash(hash.into(), parent);
            epoch.dag.link(subblock, Uint256::from_u64(hash)).unwrap();
        }
        let block = StrongBlock::new(1, 1, genesis, vec![1.into(), 2.into()], Uint256::from_u64(1), Uint256::from_u64(5));

        // One orphan hangs off the closing epoch, one off the coming strong block, one off the unknown
        epoch.orphans.insert(Subblock::from_precomputed_hash(10.into(), 2.into()), Uint256::from_u64(10));
        epoch.orphans.insert(Subblock::from_precomputed_hash(11.into(), block.hash), Uint256::from_u64(11));
        epoch.orphans.insert(Subblock::from_precomputed_hash(12.into(), 99.into()), Uint256::from_u64(12));
        assert!(epoch.is_known(10.into()) && epoch.is_known(1.into()));

        let transition = epoch.advance(&block);
        assert_eq!(transition.expired, vec![ExpiredOrphan { hash: 10.into(), missing_parent: 2.into() }]);
        assert_eq!(transition.reparented.len(), 1);
        assert_eq!(transition.reparented[0].subblock.hash(), 11.into());

        assert!(epoch.dag.is_empty());
        assert_eq!(epoch.dag.base(), block.hash);
        assert_eq!(epoch.chain, ChainState::from(&block));
        assert!(epoch.is_retired(1.into()) && epoch.is_retired(genesis));
        assert!(!epoch.is_retired(block.hash));
        assert!(epoch.orphans.contains(12.into()));
    }

    #[test]
    fn test_retire_stale() {
        let genesis = DEVNET_PARAMS.genesis.hash;
        let mut epoch = EpochState::new(ChainState::new(genesis, 0, Uint256::ZERO), &DEVNET_PARAMS);
        for (hash, parent) in [(20u64, 5u64), (21, 20), (22, 21), (30, 6)] {
            epoch.orphans.insert(Subblock::from_precomputed_hash(hash.into(), parent.into()), Uint256::from_u64(hash));
        }

        let dropped = epoch.retire_stale(5.into());
        let hashes: Vec<Hash> = dropped.iter().map(|expired| expired.hash).collect();
        assert_eq!(hashes, vec![20.into(), 21.into(), 22.into()]);
        assert_eq!(dropped[2].missing_parent, 21.into());
        assert!(epoch.is_retired(5.into()));
        assert!(!epoch.is_known(21.into()));
        assert!(epoch.orphans.contains(30.into()));
    }
}
