use bobtail_hashes::{Hash, Hasher, HasherExtensions, TxSetCommitmentHash};

/// Commits to the ordered transaction list. Each blob is length prefixed so
/// that a different split of the same bytes yields a different commitment.
pub fn tx_set_commitment(transactions: &[Vec<u8>]) -> Hash {
    let mut hasher = TxSetCommitmentHash::new();
    hasher.write_len(transactions.len());
    for tx in transactions {
        hasher.write_var_bytes(tx);
    }
    hasher.finalize()
}
