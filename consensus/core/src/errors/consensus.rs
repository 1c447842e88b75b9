use super::{config::ConfigError, rule::RuleError, strong_block::StrongBlockError};
use bobtail_hashes::Hash;
use thiserror::Error;

/// Errors surfaced by the consensus API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    StrongBlock(#[from] StrongBlockError),

    #[error("strong block {0} not found")]
    StrongBlockNotFound(Hash),

    #[error("no strong block at height {0}")]
    HeightNotFound(u64),

    #[error("store failure: {0}")]
    Store(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database genesis {found} does not match the configured genesis {expected}")]
    GenesisMismatch { expected: Hash, found: Hash },

    #[error("failed starting consensus processors: {0}")]
    Startup(String),

    #[error("consensus is shutting down")]
    Exiting,
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
