use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("missing parent reference")]
    MissingParent,

    #[error("unknown version {0}")]
    UnknownVersion(u16),

    #[error("empty transaction set")]
    EmptyTxSet,

    #[error("transaction set commitment {found} does not match the computed {expected}")]
    CommitmentMismatch { expected: Hash, found: Hash },

    #[error("first transaction is not a proofbase")]
    MissingProofbase,

    #[error("transaction at index {0} is an extra proofbase")]
    ExtraProofbase(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("subblock {0} has invalid proof of work: {1} exceeds the weak target {2}")]
    InvalidProofOfWork(Hash, Uint256, Uint256),

    #[error("subblock {0} proof of work is beyond the KOS threshold")]
    AboveKosThreshold(Hash),

    #[error("subblock {0} is malformed: {1}")]
    Malformed(Hash, MalformedReason),

    #[error("subblock {0} extends {1} which belongs to an already finalized epoch")]
    StaleParent(Hash, Hash),
}

pub type SubblockProcessResult<T> = std::result::Result<T, RuleError>;
