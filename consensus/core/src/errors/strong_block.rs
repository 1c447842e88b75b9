use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrongBlockError {
    #[error("strong block hash {found} does not match its content hash {expected}")]
    HashMismatch { expected: Hash, found: Hash },

    #[error("unknown strong block version {0}")]
    UnknownVersion(u16),

    /// A competing chain with more work exists. Reorganizing is left to a higher layer.
    #[error("strong block {competing} with work {competing_work} outweighs the current tip {current_tip} with work {current_work}")]
    ReorgRequired { current_tip: Hash, current_work: Uint256, competing: Hash, competing_work: Uint256 },

    #[error("strong block {0} does not extend the current tip and carries no more work")]
    StaleStrongBlock(Hash),

    #[error("expected height {expected} but found {found}")]
    UnexpectedHeight { expected: u64, found: u64 },

    #[error("expected {expected} subblocks but found {found}")]
    WrongSubblockCount { expected: usize, found: usize },

    #[error("subblocks are not in canonical (rank, hash) order")]
    NonCanonicalOrder,

    #[error("{} subblocks are missing from the local DAG", .0.len())]
    MissingSubblocks(Vec<Hash>),

    #[error("claimed score {found} differs from the computed {expected}")]
    ScoreMismatch { expected: Uint256, found: Uint256 },

    #[error("score {score} does not reach the strong target {target}")]
    InsufficientProofOfWork { score: Uint256, target: Uint256 },

    #[error("claimed chain work {found} is below the work {minimum} of the block itself")]
    ChainWorkBelowScore { minimum: Uint256, found: Uint256 },

    #[error("claimed chain work {found} differs from the computed {expected}")]
    ChainWorkMismatch { expected: Uint256, found: Uint256 },
}

pub type StrongBlockProcessResult<T> = std::result::Result<T, StrongBlockError>;
