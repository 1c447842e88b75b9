use crate::strong_block::StrongBlock;
use bobtail_hashes::Hash;
use std::sync::Arc;

/// Outcome of admitting a valid subblock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubblockStatus {
    /// Linked into the live DAG
    Linked,
    /// Parent unknown, buffered until it arrives
    OrphanBuffered,
    /// Already known, nothing changed
    Duplicate,
}

impl SubblockStatus {
    pub fn is_linked(self) -> bool {
        matches!(self, SubblockStatus::Linked)
    }
}

/// Everything a single admission caused
#[derive(Clone, Debug)]
pub struct AdmissionReport {
    pub hash: Hash,
    pub status: SubblockStatus,
    /// Orphans linked because this admission supplied their missing ancestor
    pub resolved_orphans: Vec<Hash>,
    /// Orphans dropped during this admission, by age, by buffer bound or as stale
    pub expired_orphans: Vec<Hash>,
    /// Strong blocks finalized as a consequence, in chain order
    pub finalized: Vec<Arc<StrongBlock>>,
}

impl AdmissionReport {
    pub fn new(hash: Hash, status: SubblockStatus) -> Self {
        Self { hash, status, resolved_orphans: Vec::new(), expired_orphans: Vec::new(), finalized: Vec::new() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrongBlockStatus {
    /// Validated against the local DAG and now the chain tip
    Adopted,
    AlreadyKnown,
}
