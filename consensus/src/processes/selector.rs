use crate::{
    model::stores::dag::DagStoreReader,
    processes::{aggregation::aggregate, ordering::SortableSubblock},
};
use bobtail_consensus_core::{KType, config::params::ScoreAggregation};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;

/// A subset of k subblocks whose aggregate crosses the strong target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// The epoch base the selection was computed against
    pub base: Hash,
    /// Canonical (rank, hash) order
    pub subblocks: Vec<SortableSubblock>,
    pub score: Uint256,
}

impl Selection {
    pub fn hashes(&self) -> Vec<Hash> {
        self.subblocks.iter().map(|s| s.hash).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionVerdict {
    Finalizable(Selection),
    NotYetFinalizable,
}

/// Picks the best scoring k subset of the live DAG.
///
/// The aggregations are monotone in every rank, so the k lowest ranks minimize the
/// score. If they do not cross the strong target, no other subset can. Ties are
/// broken by hash, which makes the selected set the lexicographically smallest.
#[derive(Clone)]
pub struct KSelector {
    k: KType,
    strong_target: Uint256,
    aggregation: ScoreAggregation,
}

impl KSelector {
    pub fn new(k: KType, strong_target: Uint256, aggregation: ScoreAggregation) -> Self {
        Self { k, strong_target, aggregation }
    }

    pub fn k(&self) -> usize {
        self.k as usize
    }

    pub fn strong_target(&self) -> Uint256 {
        self.strong_target
    }

    pub fn score(&self, ranks: &[Uint256]) -> Uint256 {
        aggregate(self.aggregation, ranks)
    }

    pub fn crosses(&self, score: Uint256) -> bool {
        score <= self.strong_target
    }

    pub fn select(&self, dag: &impl DagStoreReader) -> SelectionVerdict {
        let subblocks = dag.top_k(self.k());
        if subblocks.len() < self.k() {
            return SelectionVerdict::NotYetFinalizable;
        }
        let ranks: Vec<Uint256> = subblocks.iter().map(|s| s.rank).collect();
        let score = self.score(&ranks);
        if !self.crosses(score) {
            return SelectionVerdict::NotYetFinalizable;
        }
        SelectionVerdict::Finalizable(Selection { base: dag.base(), subblocks, score })
    }
}
