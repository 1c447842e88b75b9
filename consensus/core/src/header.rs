use crate::hashing;
use bobtail_hashes::Hash;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubblockHeader {
    /// Cached hash
    pub hash: Hash,
    pub version: u16,
    /// The parent subblock, or the strong block this subblock starts an epoch from
    pub parent: Hash,
    pub tx_commitment: Hash,
    /// Timestamp in milliseconds
    pub timestamp: u64,
    pub nonce: u64,
}

impl SubblockHeader {
    pub fn new_finalized(version: u16, parent: Hash, tx_commitment: Hash, timestamp: u64, nonce: u64) -> Self {
        let mut header = Self { hash: Default::default(), version, parent, tx_commitment, timestamp, nonce };
        header.finalize();
        header
    }

    /// Recomputes and caches the hash. Must be called after any field mutation.
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }

    /// Builds a header carrying an arbitrary hash. Meant for tests which need
    /// full control over the hash, and thus over the proof of work.
    pub fn from_precomputed_hash(hash: Hash, parent: Hash, tx_commitment: Hash) -> Self {
        Self { hash, version: crate::config::params::SUBBLOCK_VERSION, parent, tx_commitment, timestamp: 0, nonce: 0 }
    }
}
