use crate::processes::ordering::SortableSubblock;
use bobtail_consensus_core::{BlockHashMap, BlockHashSet, subblock::Subblock};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use itertools::Itertools;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("subblock {0} is already linked")]
    AlreadyLinked(Hash),

    #[error("parent {1} of subblock {0} is neither linked nor the epoch base")]
    UnknownParent(Hash, Hash),
}

pub type DagResult<T> = std::result::Result<T, DagError>;

#[derive(Clone, Debug)]
pub struct DagNode {
    pub subblock: Subblock,
    /// Cached at admission
    pub rank: Uint256,
}

/// Read-only view of the live DAG
pub trait DagStoreReader {
    /// The strong block the current epoch builds on
    fn base(&self) -> Hash;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn has(&self, hash: Hash) -> bool;
    fn get_rank(&self, hash: Hash) -> Option<Uint256>;
    fn get_parent(&self, hash: Hash) -> Option<Hash>;
    fn get_children(&self, hash: Hash) -> Vec<Hash>;
    /// Subblocks without linked children, sorted by hash
    fn get_tips(&self) -> Vec<Hash>;
    /// The `k` best subblocks in canonical order. Fewer if the DAG is smaller.
    fn top_k(&self, k: usize) -> Vec<SortableSubblock>;
}

/// The subblocks admitted since the last strong block. Nodes live in a hash keyed
/// arena with a parent to children index, and a rank ordered index serves selection.
pub struct DagStore {
    base: Hash,
    nodes: BlockHashMap<DagNode>,
    children: BlockHashMap<Vec<Hash>>,
    tips: BlockHashSet,
    ranked: BTreeSet<SortableSubblock>,
}

impl DagStore {
    pub fn new(base: Hash) -> Self {
        Self {
            base,
            nodes: BlockHashMap::new(),
            children: BlockHashMap::new(),
            tips: BlockHashSet::new(),
            ranked: BTreeSet::new(),
        }
    }

    /// Whether a subblock with this parent can be linked right away
    pub fn can_link(&self, parent: Hash) -> bool {
        parent == self.base || self.nodes.contains_key(&parent)
    }

    pub fn link(&mut self, subblock: Subblock, rank: Uint256) -> DagResult<()> {
        let hash = subblock.hash();
        let parent = subblock.parent();
        if self.nodes.contains_key(&hash) {
            return Err(DagError::AlreadyLinked(hash));
        }
        if !self.can_link(parent) {
            return Err(DagError::UnknownParent(hash, parent));
        }

        if parent != self.base {
            self.tips.remove(&parent);
            self.children.entry(parent).or_default().push(hash);
        }
        self.tips.insert(hash);
        self.ranked.insert(SortableSubblock::new(hash, rank));
        self.nodes.insert(hash, DagNode { subblock, rank });
        Ok(())
    }

    /// Whether an entry would rank among the `k` best of the current DAG
    pub fn enters_top_k(&self, entry: &SortableSubblock, k: usize) -> bool {
        self.ranked.range(..entry).take(k).count() < k
    }

    pub fn get(&self, hash: Hash) -> Option<&DagNode> {
        self.nodes.get(&hash)
    }

    /// Number of parent hops from `hash` down to the epoch base, or `None` if
    /// the walk leaves the DAG or exceeds its size
    pub fn depth(&self, hash: Hash) -> Option<usize> {
        let mut current = hash;
        for hops in 0..self.nodes.len() {
            let parent = self.nodes.get(&current)?.subblock.parent();
            if parent == self.base {
                return Some(hops + 1);
            }
            current = parent;
        }
        None
    }

    /// Drops every node and starts a new epoch on top of `new_base`.
    /// Returns the hashes which were cleared.
    pub fn reset(&mut self, new_base: Hash) -> BlockHashSet {
        let cleared = std::mem::take(&mut self.nodes).into_keys().collect();
        self.children.clear();
        self.tips.clear();
        self.ranked.clear();
        self.base = new_base;
        cleared
    }

    pub fn iter(&self) -> impl Iterator<Item = &DagNode> {
        self.nodes.values()
    }
}

impl DagStoreReader for DagStore {
    fn base(&self) -> Hash {
        self.base
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn has(&self, hash: Hash) -> bool {
        self.nodes.contains_key(&hash)
    }

    fn get_rank(&self, hash: Hash) -> Option<Uint256> {
        self.nodes.get(&hash).map(|node| node.rank)
    }

    fn get_parent(&self, hash: Hash) -> Option<Hash> {
        self.nodes.get(&hash).map(|node| node.subblock.parent())
    }

    fn get_children(&self, hash: Hash) -> Vec<Hash> {
        self.children.get(&hash).cloned().unwrap_or_default()
    }

    fn get_tips(&self) -> Vec<Hash> {
        self.tips.iter().copied().sorted().collect()
    }

    fn top_k(&self, k: usize) -> Vec<SortableSubblock> {
        self.ranked.iter().take(k).copied().collect()
    }
}
