use bobtail_consensus_core::errors::consensus::{ConsensusError, ConsensusResult};
use bobtail_database::prelude::StoreResult;

pub trait StoreResultConsensusExtensions<T> {
    /// Surfaces a store failure through the consensus API
    fn into_consensus_result(self) -> ConsensusResult<T>;
}

impl<T> StoreResultConsensusExtensions<T> for StoreResult<T> {
    fn into_consensus_result(self) -> ConsensusResult<T> {
        self.map_err(|err| ConsensusError::Store(err.to_string()))
    }
}
