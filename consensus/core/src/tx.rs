use crate::hashing;
use bobtail_hashes::Hash;
use serde::{Deserialize, Serialize};

/// Leading byte marking the proofbase transaction, which pays the subblock miner
pub const PROOFBASE_TAG: u8 = 0xb0;

/// A transaction as seen by this engine: an opaque serialized blob
pub type TransactionBlob = Vec<u8>;

/// The transaction set a subblock commits to. Its content is owned by the
/// mempool layer; only the proofbase position and the commitment are checked here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSet {
    pub transactions: Vec<TransactionBlob>,
}

impl TxSet {
    pub fn new(transactions: Vec<TransactionBlob>) -> Self {
        Self { transactions }
    }

    /// A set holding only a proofbase carrying `payload`
    pub fn with_proofbase(payload: &[u8]) -> Self {
        Self { transactions: vec![proofbase(payload)] }
    }

    pub fn commitment(&self) -> Hash {
        hashing::tx::tx_set_commitment(&self.transactions)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

pub fn proofbase(payload: &[u8]) -> TransactionBlob {
    let mut tx = Vec::with_capacity(payload.len() + 1);
    tx.push(PROOFBASE_TAG);
    tx.extend_from_slice(payload);
    tx
}

#[inline]
pub fn is_proofbase(tx: &[u8]) -> bool {
    tx.first() == Some(&PROOFBASE_TAG)
}
