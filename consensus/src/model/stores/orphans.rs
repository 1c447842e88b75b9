use bobtail_consensus_core::{BlockHashMap, BlockHashSet, subblock::Subblock};
use bobtail_core::debug;
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use std::collections::BTreeSet;

/// A buffered subblock whose parent is still unknown
#[derive(Clone, Debug)]
pub struct OrphanEntry {
    pub subblock: Subblock,
    pub rank: Uint256,
    /// Logical admission clock at the time of buffering
    pub buffered_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiredOrphan {
    pub hash: Hash,
    pub missing_parent: Hash,
}

/// Holds orphan subblocks keyed by their missing parent. The pool is bounded in
/// size, and entries also expire after a number of admissions. Time is measured
/// by a logical clock advanced on every admission, so that behavior is reproducible.
pub struct OrphanPool {
    max_orphans: usize,
    expire_interval: u64,
    expire_scan_interval: u64,

    clock: u64,
    entries: BlockHashMap<OrphanEntry>,
    by_parent: BlockHashMap<BlockHashSet>,
    /// (buffered_at, hash), oldest first
    by_age: BTreeSet<(u64, Hash)>,
}

impl OrphanPool {
    pub fn new(max_orphans: usize, expire_interval: u64, expire_scan_interval: u64) -> Self {
        Self {
            max_orphans,
            expire_interval,
            expire_scan_interval,
            clock: 0,
            entries: BlockHashMap::new(),
            by_parent: BlockHashMap::new(),
            by_age: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: Hash) -> bool {
        self.entries.contains_key(&hash)
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Advances the logical clock by one admission. On scan intervals, drops and
    /// returns the entries which outlived the expiry interval.
    pub fn tick(&mut self) -> Vec<ExpiredOrphan> {
        self.clock += 1;
        if self.clock % self.expire_scan_interval != 0 {
            return Vec::new();
        }
        let deadline = self.clock.saturating_sub(self.expire_interval);
        let expired: Vec<Hash> = self.by_age.iter().take_while(|(buffered_at, _)| *buffered_at < deadline).map(|(_, hash)| *hash).collect();
        expired.into_iter().filter_map(|hash| self.remove(hash)).collect()
    }

    /// Buffers an orphan. Returns the entries evicted to respect the size bound,
    /// oldest first with ties broken by hash.
    pub fn insert(&mut self, subblock: Subblock, rank: Uint256) -> Vec<ExpiredOrphan> {
        let hash = subblock.hash();
        if self.entries.contains_key(&hash) {
            return Vec::new();
        }
        let parent = subblock.parent();
        debug!("Buffering orphan subblock {} awaiting parent {}", hash, parent);
        self.by_parent.entry(parent).or_default().insert(hash);
        self.by_age.insert((self.clock, hash));
        self.entries.insert(hash, OrphanEntry { subblock, rank, buffered_at: self.clock });

        let mut evicted = Vec::new();
        while self.entries.len() > self.max_orphans {
            let Some(&(_, oldest)) = self.by_age.first() else { break };
            evicted.extend(self.remove(oldest));
        }
        evicted
    }

    /// Removes and returns the orphans waiting on `parent`, sorted by hash
    pub fn take_children(&mut self, parent: Hash) -> Vec<OrphanEntry> {
        let Some(hashes) = self.by_parent.remove(&parent) else { return Vec::new() };
        let mut children: Vec<OrphanEntry> = hashes
            .into_iter()
            .filter_map(|hash| {
                let entry = self.entries.remove(&hash)?;
                self.by_age.remove(&(entry.buffered_at, hash));
                Some(entry)
            })
            .collect();
        children.sort_by_key(|entry| entry.subblock.hash());
        children
    }

    /// Drops every orphan descending from `parents`, transitively through buffered
    /// orphans. The result is sorted by hash.
    pub fn drop_descendants_of(&mut self, parents: &BlockHashSet) -> Vec<ExpiredOrphan> {
        let mut queue: Vec<Hash> = parents.iter().filter(|parent| self.by_parent.contains_key(parent)).copied().collect();
        let mut dropped = Vec::new();
        while let Some(parent) = queue.pop() {
            for entry in self.take_children(parent) {
                let hash = entry.subblock.hash();
                queue.push(hash);
                dropped.push(ExpiredOrphan { hash, missing_parent: parent });
            }
        }
        dropped.sort_by_key(|expired| expired.hash);
        dropped
    }

    pub fn missing_parents(&self) -> impl Iterator<Item = &Hash> {
        self.by_parent.keys()
    }

    fn remove(&mut self, hash: Hash) -> Option<ExpiredOrphan> {
        let entry = self.entries.remove(&hash)?;
        let parent = entry.subblock.parent();
        self.by_age.remove(&(entry.buffered_at, hash));
        if let Some(siblings) = self.by_parent.get_mut(&parent) {
            siblings.remove(&hash);
            if siblings.is_empty() {
                self.by_parent.remove(&parent);
            }
        }
        Some(ExpiredOrphan { hash, missing_parent: parent })
    }
}
