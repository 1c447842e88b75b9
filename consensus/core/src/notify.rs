use crate::strong_block::StrongBlock;
use bobtail_hashes::Hash;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SubblockLinkedNotification {
    pub hash: Hash,
    pub parent: Hash,
}

#[derive(Clone, Debug)]
pub struct StrongBlockFinalizedNotification {
    pub block: Arc<StrongBlock>,
}

#[derive(Clone, Debug)]
pub struct OrphanExpiredNotification {
    pub hash: Hash,
    pub missing_parent: Hash,
}

/// Events emitted for the relay layer
#[derive(Clone, Debug)]
pub enum Notification {
    SubblockLinked(SubblockLinkedNotification),
    StrongBlockFinalized(StrongBlockFinalizedNotification),
    OrphanExpired(OrphanExpiredNotification),
}
