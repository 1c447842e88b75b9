use crate::header::SubblockHeader;
use bobtail_hashes::{Hash, Hasher, HasherBase, HasherExtensions, SubblockHash};

/// Returns the subblock header hash. The cached `hash` field is not part of the preimage.
pub fn hash(header: &SubblockHeader) -> Hash {
    let mut hasher = SubblockHash::new();
    hasher
        .write_u16(header.version)
        .update(header.parent)
        .update(header.tx_commitment)
        .write_u64(header.timestamp)
        .write_u64(header.nonce);
    hasher.finalize()
}
