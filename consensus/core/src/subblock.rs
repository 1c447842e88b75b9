use crate::{header::SubblockHeader, tx::TxSet};
use bobtail_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A weak proof-of-work share. Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subblock {
    pub header: Arc<SubblockHeader>,
    pub txs: Arc<TxSet>,
}

impl Subblock {
    pub fn new(header: SubblockHeader, txs: TxSet) -> Self {
        Self { header: Arc::new(header), txs: Arc::new(txs) }
    }

    pub fn from_arcs(header: Arc<SubblockHeader>, txs: Arc<TxSet>) -> Self {
        Self { header, txs }
    }

    #[inline]
    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    #[inline]
    pub fn parent(&self) -> Hash {
        self.header.parent
    }

    /// A well-formed subblock with an arbitrary hash, whose proof of work is
    /// the hash read as a little-endian integer. Useful for tests.
    pub fn from_precomputed_hash(hash: Hash, parent: Hash) -> Self {
        let txs = TxSet::with_proofbase(&hash.as_bytes());
        Self::new(SubblockHeader::from_precomputed_hash(hash, parent, txs.commitment()), txs)
    }
}
