use crate::{blockhash, config::genesis::GenesisBlock, hashing};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use serde::{Deserialize, Serialize};

/// A finalized block aggregating k subblocks. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongBlock {
    pub hash: Hash,
    pub version: u16,
    pub height: u64,
    pub prev_hash: Hash,
    /// Selected subblocks ordered by (rank, hash) ascending
    pub subblocks: Vec<Hash>,
    /// Aggregate score of the selected subblock ranks
    pub score: Uint256,
    /// Cumulative work of the chain ending at this block
    pub chain_work: Uint256,
}

impl StrongBlock {
    pub fn new(version: u16, height: u64, prev_hash: Hash, subblocks: Vec<Hash>, score: Uint256, chain_work: Uint256) -> Self {
        let mut block = Self { hash: blockhash::NONE, version, height, prev_hash, subblocks, score, chain_work };
        block.hash = hashing::strong_block::hash(&block);
        block
    }

    pub fn genesis(genesis: &GenesisBlock) -> Self {
        Self {
            hash: genesis.hash,
            version: genesis.version,
            height: 0,
            prev_hash: blockhash::NONE,
            subblocks: Vec::new(),
            score: Uint256::ZERO,
            chain_work: Uint256::ZERO,
        }
    }

    /// Whether the cached hash matches the block content
    pub fn is_hash_consistent(&self) -> bool {
        self.hash == hashing::strong_block::hash(self)
    }
}
