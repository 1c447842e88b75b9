use bobtail_consensus::{consensus::test_consensus::TestConsensus, test_helpers::rank_by_hash_config};
use bobtail_consensus_core::{
    api::ConsensusApi,
    config::{Config, params::ScoreAggregation},
    errors::{consensus::ConsensusError, strong_block::StrongBlockError},
    status::{StrongBlockStatus, SubblockStatus},
    strong_block::StrongBlock,
};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use std::sync::Arc;

fn config() -> Config {
    rank_by_hash_config(3, 10, ScoreAggregation::ArithmeticMean)
}

/// Finalizes a block out of the given sibling ranks on a fresh instance
fn finalize_on_fresh(consensus: &TestConsensus, ranks: &[u64]) -> Arc<StrongBlock> {
    let genesis = consensus.config().genesis.hash;
    let mut finalized = Vec::new();
    for &rank in ranks {
        finalized.extend(consensus.add_subblock(rank.into(), genesis).unwrap().finalized);
    }
    assert_eq!(finalized.len(), 1);
    finalized.pop().unwrap()
}

#[test]
fn test_adopt_reparents_waiting_orphans() {
    let config = config();
    let genesis = config.genesis.hash;
    let producer = TestConsensus::new(&config);
    let producer_handles = producer.init();
    let block = finalize_on_fresh(&producer, &[8, 10, 12]);

    let follower = TestConsensus::new(&config.to_builder().manual_finalization().build());
    let follower_handles = follower.init();
    for rank in [8u64, 10, 12, 20] {
        follower.add_subblock(rank.into(), genesis).unwrap();
    }
    // Mined on the relayed block before it arrived
    assert_eq!(follower.add_subblock(40.into(), block.hash).unwrap().status, SubblockStatus::OrphanBuffered);

    assert_eq!(follower.validate_and_insert_strong_block_blocking(block.as_ref().clone()).unwrap(), StrongBlockStatus::Adopted);
    assert_eq!(follower.chain_tip(), block.hash);
    assert_eq!(follower.chain_height(), 1);
    let expected_tips: Vec<Hash> = vec![40.into()];
    assert_eq!(follower.dag_tips(), expected_tips);
    assert_eq!(follower.processing_counters().snapshot().strong_blocks_adopted, 1);
    assert_eq!(follower.processing_counters().snapshot().strong_blocks_finalized, 0);

    // The arrival of a subblock of the closed epoch is now stale
    assert!(matches!(follower.add_subblock(21.into(), 20.into()), Err(ConsensusError::Rule(_))));

    producer.shutdown(producer_handles);
    follower.shutdown(follower_handles);
}

#[test]
fn test_missing_subblocks() {
    let config = config();
    let genesis = config.genesis.hash;
    let producer = TestConsensus::new(&config);
    let producer_handles = producer.init();
    let block = finalize_on_fresh(&producer, &[8, 10, 12]);

    let follower = TestConsensus::new(&config);
    let follower_handles = follower.init();
    follower.add_subblock(8.into(), genesis).unwrap();
    follower.add_subblock(12.into(), genesis).unwrap();

    let expected: Vec<Hash> = vec![10.into()];
    assert_eq!(
        follower.validate_and_insert_strong_block_blocking(block.as_ref().clone()),
        Err(ConsensusError::StrongBlock(StrongBlockError::MissingSubblocks(expected)))
    );
    assert_eq!(follower.chain_tip(), genesis);
    assert_eq!(follower.dag_size(), 2);

    // Once the missing subblock shows up, the follower finalizes the very same block
    let report = follower.add_subblock(10.into(), genesis).unwrap();
    assert_eq!(report.finalized, vec![block.clone()]);
    assert_eq!(follower.validate_and_insert_strong_block_blocking(block.as_ref().clone()).unwrap(), StrongBlockStatus::AlreadyKnown);

    producer.shutdown(producer_handles);
    follower.shutdown(follower_handles);
}

#[test]
fn test_competing_blocks() {
    let config = config();
    let light = TestConsensus::new(&config);
    let light_handles = light.init();
    let heavy = TestConsensus::new(&config);
    let heavy_handles = heavy.init();

    // A lower score means more work
    let light_block = finalize_on_fresh(&light, &[6, 7, 8]);
    let heavy_block = finalize_on_fresh(&heavy, &[2, 3, 4]);
    assert!(heavy_block.chain_work > light_block.chain_work);

    match light.validate_and_insert_strong_block_blocking(heavy_block.as_ref().clone()) {
        Err(ConsensusError::StrongBlock(StrongBlockError::ReorgRequired { current_tip, competing, .. })) => {
            assert_eq!(current_tip, light_block.hash);
            assert_eq!(competing, heavy_block.hash);
        }
        res => panic!("expected a reorg requirement, got {res:?}"),
    }
    assert_eq!(
        heavy.validate_and_insert_strong_block_blocking(light_block.as_ref().clone()),
        Err(ConsensusError::StrongBlock(StrongBlockError::StaleStrongBlock(light_block.hash)))
    );

    // Neither chain moved
    assert_eq!(light.chain_tip(), light_block.hash);
    assert_eq!(heavy.chain_tip(), heavy_block.hash);

    light.shutdown(light_handles);
    heavy.shutdown(heavy_handles);
}

#[test]
fn test_tampered_blocks() {
    let config = config();
    let genesis = config.genesis.hash;
    let producer = TestConsensus::new(&config);
    let producer_handles = producer.init();
    let block = finalize_on_fresh(&producer, &[8, 10, 12]);

    let follower = TestConsensus::new(&config.to_builder().manual_finalization().build());
    let follower_handles = follower.init();
    for rank in [8u64, 10, 12] {
        follower.add_subblock(rank.into(), genesis).unwrap();
    }

    let mut tampered = block.as_ref().clone();
    tampered.score = Uint256::from_u64(9);
    assert!(matches!(
        follower.validate_and_insert_strong_block_blocking(tampered),
        Err(ConsensusError::StrongBlock(StrongBlockError::HashMismatch { .. }))
    ));

    let mut tampered = block.as_ref().clone();
    tampered.version += 1;
    assert_eq!(
        follower.validate_and_insert_strong_block_blocking(tampered),
        Err(ConsensusError::StrongBlock(StrongBlockError::UnknownVersion(block.version + 1)))
    );

    // A consistent hash over a wrong chain work
    let forged = StrongBlock::new(block.version, block.height, block.prev_hash, block.subblocks.clone(), block.score, block.chain_work + Uint256::ONE);
    assert!(matches!(
        follower.validate_and_insert_strong_block_blocking(forged),
        Err(ConsensusError::StrongBlock(StrongBlockError::ChainWorkMismatch { .. }))
    ));
    let forged = StrongBlock::new(block.version, block.height, block.prev_hash, block.subblocks.clone(), block.score, Uint256::from_u64(1));
    assert!(matches!(
        follower.validate_and_insert_strong_block_blocking(forged),
        Err(ConsensusError::StrongBlock(StrongBlockError::ChainWorkBelowScore { .. }))
    ));

    assert_eq!(follower.chain_tip(), genesis);
    assert_eq!(follower.validate_and_insert_strong_block_blocking(block.as_ref().clone()).unwrap(), StrongBlockStatus::Adopted);

    producer.shutdown(producer_handles);
    follower.shutdown(follower_handles);
}
