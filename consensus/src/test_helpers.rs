use bobtail_consensus_core::{
    KType,
    config::{Config, ConfigBuilder, params::{DEVNET_PARAMS, ScoreAggregation}},
    subblock::Subblock,
};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;

/// A devnet config which skips the weak pow check, so that the rank of a subblock
/// built through `Subblock::from_precomputed_hash` is its hash read as a number
pub fn rank_by_hash_config(k: KType, strong_target: u64, aggregation: ScoreAggregation) -> Config {
    ConfigBuilder::new(DEVNET_PARAMS)
        .skip_proof_of_work()
        .edit_consensus_params(|p| {
            p.bobtail_k = k;
            p.strong_bits = Uint256::from_u64(strong_target).compact_target_bits();
            p.score_aggregation = aggregation;
        })
        .apply_args(|config| config.validation_threads = 2)
        .build()
}

pub fn subblock_from_precomputed_hash(hash: u64, parent: Hash) -> Subblock {
    Subblock::from_precomputed_hash(hash.into(), parent)
}

/// Subblocks with the given hashes, each built directly on `base`
pub fn siblings(base: Hash, hashes: &[u64]) -> Vec<Subblock> {
    hashes.iter().map(|&hash| subblock_from_precomputed_hash(hash, base)).collect()
}

/// Subblocks with the given hashes forming a single chain on top of `base`
pub fn chain(base: Hash, hashes: &[u64]) -> Vec<Subblock> {
    let mut parent = base;
    hashes
        .iter()
        .map(|&hash| {
            let subblock = subblock_from_precomputed_hash(hash, parent);
            parent = subblock.hash();
            subblock
        })
        .collect()
}
