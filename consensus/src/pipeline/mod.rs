pub mod dag_processor;
pub mod deps_manager;
pub mod subblock_processor;

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProcessingCounters {
    pub subblocks_submitted: AtomicU64,
    pub subblocks_validated: AtomicU64,
    pub subblocks_linked: AtomicU64,
    pub orphans_buffered: AtomicU64,
    pub orphans_expired: AtomicU64,
    pub strong_blocks_finalized: AtomicU64,
    pub strong_blocks_adopted: AtomicU64,
}

impl ProcessingCounters {
    pub fn snapshot(&self) -> ProcessingCountersSnapshot {
        ProcessingCountersSnapshot {
            subblocks_submitted: self.subblocks_submitted.load(Ordering::SeqCst),
            subblocks_validated: self.subblocks_validated.load(Ordering::SeqCst),
            subblocks_linked: self.subblocks_linked.load(Ordering::SeqCst),
            orphans_buffered: self.orphans_buffered.load(Ordering::SeqCst),
            orphans_expired: self.orphans_expired.load(Ordering::SeqCst),
            strong_blocks_finalized: self.strong_blocks_finalized.load(Ordering::SeqCst),
            strong_blocks_adopted: self.strong_blocks_adopted.load(Ordering::SeqCst),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingCountersSnapshot {
    pub subblocks_submitted: u64,
    pub subblocks_validated: u64,
    pub subblocks_linked: u64,
    pub orphans_buffered: u64,
    pub orphans_expired: u64,
    pub strong_blocks_finalized: u64,
    pub strong_blocks_adopted: u64,
}
