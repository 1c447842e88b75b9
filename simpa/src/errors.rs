use bobtail_consensus_core::errors::{config::ConfigError, consensus::ConsensusError};
use bobtail_core::log::LogError;
use bobtail_database::prelude::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid arguments: {0}")]
    Args(String),

    #[error("failed reading the params file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid params file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Log(#[from] LogError),
}

pub type SimResult<T> = std::result::Result<T, SimError>;
