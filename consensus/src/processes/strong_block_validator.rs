use crate::{
    model::{epoch::EpochState, stores::dag::DagStoreReader},
    processes::{
        difficulty::calc_work,
        finalizer::next_chain_work,
        ordering::{SortableSubblock, is_canonical},
        selector::KSelector,
    },
};
use bobtail_consensus_core::{
    config::params::STRONG_BLOCK_VERSION,
    errors::strong_block::{StrongBlockError, StrongBlockProcessResult},
    hashing,
    strong_block::StrongBlock,
};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use bobtail_pow::calc_pow;

/// Validates strong blocks relayed by peers against the local chain tip and DAG
#[derive(Clone)]
pub struct StrongBlockValidator {
    selector: KSelector,
}

impl StrongBlockValidator {
    pub fn new(selector: KSelector) -> Self {
        Self { selector }
    }

    /// Checks that `block` is exactly what the local finalizer would build from the
    /// subblocks it names. Whether the block is already stored is the caller's concern.
    pub fn validate(&self, block: &StrongBlock, epoch: &EpochState) -> StrongBlockProcessResult<()> {
        self.validate_in_isolation(block)?;
        let score = self.validate_proof_of_work(block)?;
        self.validate_in_chain_context(block, epoch)?;
        self.validate_in_dag_context(block, epoch, score)
    }

    fn validate_in_isolation(&self, block: &StrongBlock) -> StrongBlockProcessResult<()> {
        if block.version != STRONG_BLOCK_VERSION {
            return Err(StrongBlockError::UnknownVersion(block.version));
        }
        let expected = hashing::strong_block::hash(block);
        if expected != block.hash {
            return Err(StrongBlockError::HashMismatch { expected, found: block.hash });
        }
        Ok(())
    }

    /// Checks the claims which follow from the subblock hashes alone. A block failing
    /// here is never weighed against the local chain.
    fn validate_proof_of_work(&self, block: &StrongBlock) -> StrongBlockProcessResult<Uint256> {
        if block.subblocks.len() != self.selector.k() {
            return Err(StrongBlockError::WrongSubblockCount { expected: self.selector.k(), found: block.subblocks.len() });
        }
        // Ranks derive from hashes alone, so ordering is checkable before lookup
        let sortable: Vec<SortableSubblock> = block.subblocks.iter().map(|&hash| SortableSubblock::new(hash, calc_pow(hash))).collect();
        if !is_canonical(&sortable) {
            return Err(StrongBlockError::NonCanonicalOrder);
        }
        let ranks: Vec<Uint256> = sortable.iter().map(|s| s.rank).collect();
        let score = self.selector.score(&ranks);
        if score != block.score {
            return Err(StrongBlockError::ScoreMismatch { expected: score, found: block.score });
        }
        if !self.selector.crosses(score) {
            return Err(StrongBlockError::InsufficientProofOfWork { score, target: self.selector.strong_target() });
        }
        let minimum = calc_work(score);
        if block.chain_work < minimum {
            return Err(StrongBlockError::ChainWorkBelowScore { minimum, found: block.chain_work });
        }
        Ok(score)
    }

    fn validate_in_chain_context(&self, block: &StrongBlock, epoch: &EpochState) -> StrongBlockProcessResult<()> {
        let chain = &epoch.chain;
        if block.prev_hash != chain.tip {
            if block.chain_work > chain.chain_work {
                return Err(StrongBlockError::ReorgRequired {
                    current_tip: chain.tip,
                    current_work: chain.chain_work,
                    competing: block.hash,
                    competing_work: block.chain_work,
                });
            }
            return Err(StrongBlockError::StaleStrongBlock(block.hash));
        }
        if block.height != chain.height + 1 {
            return Err(StrongBlockError::UnexpectedHeight { expected: chain.height + 1, found: block.height });
        }
        Ok(())
    }

    fn validate_in_dag_context(&self, block: &StrongBlock, epoch: &EpochState, score: Uint256) -> StrongBlockProcessResult<()> {
        let missing: Vec<Hash> = block.subblocks.iter().copied().filter(|&hash| !epoch.dag.has(hash)).collect();
        if !missing.is_empty() {
            return Err(StrongBlockError::MissingSubblocks(missing));
        }
        let chain_work = next_chain_work(epoch.chain.chain_work, score);
        if chain_work != block.chain_work {
            return Err(StrongBlockError::ChainWorkMismatch { expected: chain_work, found: block.chain_work });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_consensus_core::{
        chain::ChainState,
        config::params::{DEVNET_PARAMS, ScoreAggregation},
        subblock::Subblock,
    };

    fn setup(hashes: &[u64]) -> (StrongBlockValidator, EpochState) {
        let validator = StrongBlockValidator::new(KSelector::new(3, Uint256::from_u64(10), ScoreAggregation::ArithmeticMean));
        let genesis = DEVNET_PARAMS.genesis.hash;
        let mut epoch = EpochState::new(ChainState::new(genesis, 0, Uint256::ZERO), &DEVNET_PARAMS);
        for &hash in hashes {
            epoch.dag.link(Subblock::from_precomputed_hash(hash.into(), genesis), Uint256::from_u64(hash)).unwrap();
        }
        (validator, epoch)
    }

    fn block(epoch: &EpochState, subblocks: &[u64], score: u64) -> StrongBlock {
        let score = Uint256::from_u64(score);
        StrongBlock::new(
            STRONG_BLOCK_VERSION,
            epoch.chain.height + 1,
            epoch.chain.tip,
            subblocks.iter().map(|&h| h.into()).collect(),
            score,
            epoch.chain.chain_work + calc_work(score),
        )
    }

    #[test]
    fn test_valid_block() {
        let (validator, epoch) = setup(&[4, 8, 12, 14, 50]);
        assert_eq!(validator.validate(&block(&epoch, &[4, 8, 12], 8), &epoch), Ok(()));
        // Any crossing subset is acceptable, not only the best one
        assert_eq!(validator.validate(&block(&epoch, &[4, 12, 14], 10), &epoch), Ok(()));
        assert_eq!(validator.validate(&block(&epoch, &[4, 8, 50], 20), &epoch), Err(StrongBlockError::InsufficientProofOfWork {
            score: Uint256::from_u64(20),
            target: Uint256::from_u64(10)
        }));
        assert_eq!(validator.validate(&block(&epoch, &[4, 12, 8], 8), &epoch), Err(StrongBlockError::NonCanonicalOrder));
    }

    #[test]
    fn test_content_errors() {
        let (validator, epoch) = setup(&[4, 8, 12]);

        let mut tampered = block(&epoch, &[4, 8, 12], 8);
        tampered.score = Uint256::from_u64(7);
        assert!(matches!(validator.validate(&tampered, &epoch), Err(StrongBlockError::HashMismatch { .. })));

        assert_eq!(
            validator.validate(&block(&epoch, &[4, 8, 13], 8), &epoch),
            Err(StrongBlockError::MissingSubblocks(vec![13.into()]))
        );
        assert_eq!(
            validator.validate(&block(&epoch, &[4, 8, 12], 7), &epoch),
            Err(StrongBlockError::ScoreMismatch { expected: Uint256::from_u64(8), found: Uint256::from_u64(7) })
        );
        assert_eq!(
            validator.validate(&block(&epoch, &[4, 8], 6), &epoch),
            Err(StrongBlockError::WrongSubblockCount { expected: 3, found: 2 })
        );

        let mut bad_work = block(&epoch, &[4, 8, 12], 8);
        bad_work.chain_work = bad_work.chain_work + Uint256::ONE;
        bad_work.hash = hashing::strong_block::hash(&bad_work);
        assert!(matches!(validator.validate(&bad_work, &epoch), Err(StrongBlockError::ChainWorkMismatch { .. })));
    }

    #[test]
    fn test_chain_context() {
        let (validator, epoch) = setup(&[4, 8, 12]);
        let score = Uint256::from_u64(8);

        let heavier = StrongBlock::new(STRONG_BLOCK_VERSION, 1, 77.into(), vec![4.into(), 8.into(), 12.into()], score, calc_work(score));
        assert!(matches!(validator.validate(&heavier, &epoch), Err(StrongBlockError::ReorgRequired { .. })));

        // A competitor claiming less work than the local chain is stale
        let mut heavy_epoch = setup(&[4, 8, 12]).1;
        heavy_epoch.chain.chain_work = calc_work(Uint256::ONE);
        assert_eq!(validator.validate(&heavier, &heavy_epoch), Err(StrongBlockError::StaleStrongBlock(heavier.hash)));

        let mut skipping = block(&epoch, &[4, 8, 12], 8);
        skipping.height = 5;
        skipping.hash = hashing::strong_block::hash(&skipping);
        assert_eq!(validator.validate(&skipping, &epoch), Err(StrongBlockError::UnexpectedHeight { expected: 1, found: 5 }));

        let mut versioned = block(&epoch, &[4, 8, 12], 8);
        versioned.version = 7;
        assert_eq!(validator.validate(&versioned, &epoch), Err(StrongBlockError::UnknownVersion(7)));
    }

    #[test]
    fn test_unproven_competitor_is_not_a_reorg() {
        let (validator, epoch) = setup(&[4, 8, 12]);
        let bogus_prev: Hash = 77.into();

        // A single subblock with a huge work claim
        let lone = StrongBlock::new(STRONG_BLOCK_VERSION, 1, bogus_prev, vec![1.into()], Uint256::MAX, Uint256::MAX);
        assert_eq!(validator.validate(&lone, &epoch), Err(StrongBlockError::WrongSubblockCount { expected: 3, found: 1 }));

        // Right shape but the ranks do not cross the target
        let weak = StrongBlock::new(STRONG_BLOCK_VERSION, 1, bogus_prev, vec![30.into(), 40.into(), 50.into()], Uint256::from_u64(40), Uint256::MAX);
        assert_eq!(
            validator.validate(&weak, &epoch),
            Err(StrongBlockError::InsufficientProofOfWork { score: Uint256::from_u64(40), target: Uint256::from_u64(10) })
        );

        let misordered = StrongBlock::new(STRONG_BLOCK_VERSION, 1, bogus_prev, vec![8.into(), 4.into(), 12.into()], Uint256::from_u64(8), Uint256::MAX);
        assert_eq!(validator.validate(&misordered, &epoch), Err(StrongBlockError::NonCanonicalOrder));

        // A crossing block claiming less than its own work
        let score = Uint256::from_u64(8);
        let underclaimed = StrongBlock::new(STRONG_BLOCK_VERSION, 1, bogus_prev, vec![4.into(), 8.into(), 12.into()], score, Uint256::ONE);
        assert_eq!(
            validator.validate(&underclaimed, &epoch),
            Err(StrongBlockError::ChainWorkBelowScore { minimum: calc_work(score), found: Uint256::ONE })
        );
    }
}
