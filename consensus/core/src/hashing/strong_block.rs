use crate::strong_block::StrongBlock;
use bobtail_hashes::{Hash, Hasher, HasherBase, HasherExtensions, StrongBlockHash};

/// Returns the strong block hash over version, height, previous hash, the
/// ordered subblock list and the aggregate score. Chain work is derived from
/// these and left out.
pub fn hash(block: &StrongBlock) -> Hash {
    let mut hasher = StrongBlockHash::new();
    hasher.write_u16(block.version).write_u64(block.height).update(block.prev_hash).write_len(block.subblocks.len());
    for subblock in block.subblocks.iter() {
        hasher.update(subblock);
    }
    hasher.update(block.score.to_le_bytes());
    hasher.finalize()
}
