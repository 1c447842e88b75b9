use bobtail_hashes::{Hash, ZERO_HASH};

/// The null parent reference. A subblock pointing at it is malformed.
pub const NONE: Hash = ZERO_HASH;

pub trait BlockHashExtensions {
    fn is_none(&self) -> bool;
}

impl BlockHashExtensions for Hash {
    fn is_none(&self) -> bool {
        self.eq(&NONE)
    }
}
