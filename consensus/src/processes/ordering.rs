use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use std::cmp::Ordering;

/// A subblock hash paired with its cached rank. Orders by rank and then by hash,
/// which is the canonical order of subblocks inside a strong block.
#[derive(Clone, Copy, Debug, Eq)]
pub struct SortableSubblock {
    pub hash: Hash,
    pub rank: Uint256,
}

impl SortableSubblock {
    pub fn new(hash: Hash, rank: Uint256) -> Self {
        Self { hash, rank }
    }
}

impl PartialEq for SortableSubblock {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.rank == other.rank
    }
}

impl PartialOrd for SortableSubblock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableSubblock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank).then_with(|| self.hash.cmp(&other.hash))
    }
}

/// Whether `items` is strictly ascending in canonical order
pub fn is_canonical(items: &[SortableSubblock]) -> bool {
    items.windows(2).all(|w| w[0] < w[1])
}
