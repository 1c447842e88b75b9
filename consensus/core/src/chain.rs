use crate::strong_block::StrongBlock;
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use serde::{Deserialize, Serialize};

/// The persisted head of the strong chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub tip: Hash,
    pub height: u64,
    pub chain_work: Uint256,
}

impl ChainState {
    pub fn new(tip: Hash, height: u64, chain_work: Uint256) -> Self {
        Self { tip, height, chain_work }
    }
}

impl From<&StrongBlock> for ChainState {
    fn from(block: &StrongBlock) -> Self {
        Self { tip: block.hash, height: block.height, chain_work: block.chain_work }
    }
}
