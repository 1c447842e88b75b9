use crate::{
    errors::consensus::ConsensusResult,
    status::{AdmissionReport, StrongBlockStatus},
    strong_block::StrongBlock,
    subblock::Subblock,
};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use futures_util::future::BoxFuture;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DagInfo {
    pub size: u64,
    /// Sorted
    pub tips: Vec<Hash>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BobtailInfo {
    pub chaintip: Hash,
    pub height: u64,
    pub chain_work: Uint256,
    pub dag_size: u64,
}

/// Abstracts the consensus external API
pub trait ConsensusApi: Send + Sync {
    /// Validates a subblock and admits it into the live DAG
    fn validate_and_insert_subblock(&self, subblock: Subblock) -> BoxFuture<'static, ConsensusResult<AdmissionReport>>;

    /// Validates a relayed strong block against the local DAG and adopts it
    fn validate_and_insert_strong_block(&self, block: StrongBlock) -> BoxFuture<'static, ConsensusResult<StrongBlockStatus>>;

    /// Runs selection once and finalizes if possible
    fn try_finalize(&self) -> BoxFuture<'static, ConsensusResult<Option<Arc<StrongBlock>>>>;

    fn chain_tip(&self) -> Hash;

    fn chain_height(&self) -> u64;

    fn dag_size(&self) -> u64;

    fn dag_info(&self) -> DagInfo;

    fn dag_tips(&self) -> Vec<Hash>;

    fn bobtail_info(&self) -> BobtailInfo;

    fn get_strong_block(&self, hash: Hash) -> ConsensusResult<Arc<StrongBlock>>;

    fn get_strong_block_by_height(&self, height: u64) -> ConsensusResult<Arc<StrongBlock>>;
}

pub type DynConsensus = Arc<dyn ConsensusApi>;
