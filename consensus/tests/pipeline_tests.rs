use bobtail_consensus::{
    consensus::test_consensus::TestConsensus,
    test_helpers::{chain, rank_by_hash_config},
};
use bobtail_consensus_core::{
    api::ConsensusApi,
    config::params::{STRONG_BLOCK_VERSION, ScoreAggregation},
    errors::{consensus::ConsensusError, rule::RuleError},
    notify::Notification,
    status::SubblockStatus,
    strong_block::StrongBlock,
};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;

mod common;

#[test]
fn test_geometric_mean_k4_scenario() {
    let config = rank_by_hash_config(4, 5, ScoreAggregation::GeometricMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    // No 3-set may finalize when k = 4
    for (i, hash) in [2u64, 5, 7].into_iter().enumerate() {
        let report = consensus.add_subblock(hash.into(), genesis).unwrap();
        assert_eq!(report.status, SubblockStatus::Linked);
        assert!(report.finalized.is_empty());
        assert_eq!(consensus.dag_size(), i as u64 + 1);
    }
    assert_eq!(consensus.chain_height(), 0);
    assert_eq!(consensus.chain_tip(), genesis);

    // floor(630 ^ 1/4) = 5 crosses
    let report = consensus.add_subblock(9.into(), genesis).unwrap();
    assert_eq!(report.status, SubblockStatus::Linked);
    assert_eq!(report.finalized.len(), 1);
    let block = report.finalized[0].clone();
    let expected: Vec<Hash> = vec![2.into(), 5.into(), 7.into(), 9.into()];
    assert_eq!(block.subblocks, expected);
    assert_eq!(block.score, Uint256::from_u64(5));
    assert_eq!(block.height, 1);
    assert_eq!(block.prev_hash, genesis);

    assert_eq!(consensus.chain_tip(), block.hash);
    assert_eq!(consensus.chain_height(), 1);
    assert_eq!(consensus.dag_size(), 0);
    assert!(consensus.dag_tips().is_empty());
    assert_eq!(consensus.bobtail_info().chain_work, block.chain_work);
    assert_eq!(consensus.get_strong_block(block.hash).unwrap(), block);
    assert_eq!(consensus.get_strong_block_by_height(1).unwrap(), block);
    assert!(matches!(consensus.get_strong_block_by_height(2), Err(ConsensusError::HeightNotFound(2))));

    consensus.shutdown(wait_handles);
}

#[test]
fn test_orphan_resolution_scenario() {
    let config = rank_by_hash_config(3, 10, ScoreAggregation::ArithmeticMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    let report = consensus.add_subblock(20.into(), 10.into()).unwrap();
    assert_eq!(report.status, SubblockStatus::OrphanBuffered);
    assert_eq!(consensus.dag_size(), 0);

    // An orphan of an orphan
    let report = consensus.add_subblock(30.into(), 20.into()).unwrap();
    assert_eq!(report.status, SubblockStatus::OrphanBuffered);
    assert_eq!(consensus.dag_size(), 0);

    let report = consensus.add_subblock(10.into(), genesis).unwrap();
    assert_eq!(report.status, SubblockStatus::Linked);
    let expected: Vec<Hash> = vec![20.into(), 30.into()];
    assert_eq!(report.resolved_orphans, expected);
    // The mean rank is 20, above the strong target
    assert!(report.finalized.is_empty());
    assert_eq!(consensus.dag_size(), 3);
    let expected_tips: Vec<Hash> = vec![30.into()];
    assert_eq!(consensus.dag_tips(), expected_tips);

    let linked: Vec<Hash> = consensus
        .take_notifications()
        .into_iter()
        .filter_map(|notification| match notification {
            Notification::SubblockLinked(n) => Some(n.hash),
            _ => None,
        })
        .collect();
    let expected_linked: Vec<Hash> = vec![10.into(), 20.into(), 30.into()];
    assert_eq!(linked, expected_linked);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_duplicate_and_stale_subblocks() {
    let config = rank_by_hash_config(2, 10, ScoreAggregation::ArithmeticMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    assert_eq!(consensus.add_subblock(4.into(), genesis).unwrap().status, SubblockStatus::Linked);
    let report = consensus.add_subblock(4.into(), genesis).unwrap();
    assert_eq!(report.status, SubblockStatus::Duplicate);
    assert_eq!(consensus.dag_size(), 1);

    let report = consensus.add_subblock(6.into(), genesis).unwrap();
    assert_eq!(report.finalized.len(), 1);
    let tip = consensus.chain_tip();
    assert_eq!(tip, report.finalized[0].hash);

    // Parents from the closed epoch, either a subblock or its base
    assert!(matches!(
        consensus.add_subblock(8.into(), 4.into()),
        Err(ConsensusError::Rule(RuleError::StaleParent(hash, parent))) if hash == 8.into() && parent == 4.into()
    ));
    assert!(matches!(
        consensus.add_subblock(9.into(), genesis),
        Err(ConsensusError::Rule(RuleError::StaleParent(_, parent))) if parent == genesis
    ));
    assert_eq!(consensus.dag_size(), 0);

    assert_eq!(consensus.add_subblock(3.into(), tip).unwrap().status, SubblockStatus::Linked);
    assert_eq!(consensus.dag_size(), 1);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_stale_subblock_drops_waiting_orphans() {
    let config = rank_by_hash_config(2, 10, ScoreAggregation::ArithmeticMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    consensus.add_subblock(4.into(), genesis).unwrap();
    assert_eq!(consensus.add_subblock(6.into(), genesis).unwrap().finalized.len(), 1);

    // Children of 8 arrive first, while 8 itself is still unknown
    for subblock in chain(8.into(), &[50, 51]) {
        assert_eq!(consensus.validate_and_insert_subblock_blocking(subblock).unwrap().status, SubblockStatus::OrphanBuffered);
    }
    consensus.take_notifications();

    assert!(matches!(consensus.add_subblock(8.into(), 4.into()), Err(ConsensusError::Rule(RuleError::StaleParent(..)))));
    let expected: Vec<Hash> = vec![50.into(), 51.into()];
    assert_eq!(common::expired_orphans(&consensus.take_notifications()), expected);

    // Resubmitting a dropped orphan is now judged against its stale parent
    assert!(matches!(
        consensus.add_subblock(50.into(), 8.into()),
        Err(ConsensusError::Rule(RuleError::StaleParent(hash, parent))) if hash == 50.into() && parent == 8.into()
    ));
    assert_eq!(consensus.dag_size(), 0);
    assert_eq!(consensus.processing_counters().snapshot().orphans_expired, 2);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_orphans_reparent_onto_new_strong_block() {
    let config = rank_by_hash_config(2, 10, ScoreAggregation::ArithmeticMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    // Chain work stays out of the hash, so the coming block hash is known in advance
    let upcoming = StrongBlock::new(STRONG_BLOCK_VERSION, 1, genesis, vec![4.into(), 6.into()], Uint256::from_u64(5), Uint256::ZERO);
    for subblock in chain(upcoming.hash, &[40, 41]) {
        assert_eq!(consensus.validate_and_insert_subblock_blocking(subblock).unwrap().status, SubblockStatus::OrphanBuffered);
    }

    consensus.add_subblock(4.into(), genesis).unwrap();
    let report = consensus.add_subblock(6.into(), genesis).unwrap();
    assert_eq!(report.finalized.len(), 1);
    assert_eq!(report.finalized[0].hash, upcoming.hash);
    let expected: Vec<Hash> = vec![40.into(), 41.into()];
    assert_eq!(report.resolved_orphans, expected);

    assert_eq!(consensus.chain_tip(), upcoming.hash);
    assert_eq!(consensus.dag_size(), 2);
    let expected_tips: Vec<Hash> = vec![41.into()];
    assert_eq!(consensus.dag_tips(), expected_tips);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_orphan_eviction_and_expiry() {
    let config = rank_by_hash_config(3, 10, ScoreAggregation::ArithmeticMean)
        .to_builder()
        .edit_consensus_params(|p| {
            p.max_orphans = 2;
            p.orphan_expire_interval = 4;
            p.orphan_expire_scan_interval = 1;
        })
        .build();
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();

    assert!(consensus.add_subblock(100.into(), 1000.into()).unwrap().expired_orphans.is_empty());
    assert!(consensus.add_subblock(101.into(), 1001.into()).unwrap().expired_orphans.is_empty());
    // The buffer holds two, so the oldest goes
    let report = consensus.add_subblock(102.into(), 1002.into()).unwrap();
    assert_eq!(report.status, SubblockStatus::OrphanBuffered);
    let expected: Vec<Hash> = vec![100.into()];
    assert_eq!(report.expired_orphans, expected);

    // Admissions advance the clock until 101 outlives the expiry interval
    for subblock in chain(config.genesis.hash, &[50, 60, 70]) {
        assert!(consensus.validate_and_insert_subblock_blocking(subblock).unwrap().expired_orphans.is_empty());
    }
    // The same admission expires 101 and links the parent of the younger 102
    let report = consensus.add_subblock(1002.into(), 70.into()).unwrap();
    let expected: Vec<Hash> = vec![101.into()];
    assert_eq!(report.expired_orphans, expected);
    let expected: Vec<Hash> = vec![102.into()];
    assert_eq!(report.resolved_orphans, expected);
    assert_eq!(consensus.processing_counters().snapshot().orphans_expired, 2);

    let expected: Vec<Hash> = vec![100.into(), 101.into()];
    assert_eq!(common::expired_orphans(&consensus.take_notifications()), expected);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_manual_finalization() {
    let config = rank_by_hash_config(3, 10, ScoreAggregation::ArithmeticMean).to_builder().manual_finalization().build();
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    let genesis = config.genesis.hash;

    assert_eq!(consensus.try_finalize_blocking().unwrap(), None);
    for hash in [3u64, 5, 9, 40] {
        assert!(consensus.add_subblock(hash.into(), genesis).unwrap().finalized.is_empty());
    }
    assert_eq!(consensus.chain_height(), 0);
    assert_eq!(consensus.dag_size(), 4);

    let block = consensus.try_finalize_blocking().unwrap().unwrap();
    let expected: Vec<Hash> = vec![3.into(), 5.into(), 9.into()];
    assert_eq!(block.subblocks, expected);
    assert_eq!(block.score, Uint256::from_u64(5));
    assert_eq!(consensus.chain_tip(), block.hash);
    assert_eq!(consensus.dag_size(), 0);
    assert_eq!(consensus.try_finalize_blocking().unwrap(), None);

    consensus.shutdown(wait_handles);
}

#[test]
fn test_exit() {
    let config = rank_by_hash_config(3, 10, ScoreAggregation::ArithmeticMean);
    let consensus = TestConsensus::new(&config);
    let wait_handles = consensus.init();
    consensus.shutdown(wait_handles);

    assert!(matches!(consensus.add_subblock(1.into(), config.genesis.hash), Err(ConsensusError::Exiting)));
    assert!(matches!(consensus.try_finalize_blocking(), Err(ConsensusError::Exiting)));
}
