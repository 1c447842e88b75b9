use bobtail_consensus_core::header::SubblockHeader;
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use std::ops::Range;

/// The proof of work of a subblock: its header hash read as a little-endian integer.
/// Lower is better, and it doubles as the subblock rank.
#[inline]
#[must_use]
pub fn calc_pow(hash: Hash) -> Uint256 {
    Uint256::from_le_bytes(hash.as_bytes())
}

/// Checks subblock headers against a fixed weak target
#[derive(Clone, Copy, Debug)]
pub struct State {
    target: Uint256,
}

impl State {
    #[inline]
    pub fn new(target: Uint256) -> Self {
        Self { target }
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Self::new(Uint256::from_compact_target_bits(bits))
    }

    #[inline]
    #[must_use]
    pub fn check_pow(&self, header: &SubblockHeader) -> (bool, Uint256) {
        let pow = calc_pow(header.hash);
        // The pow must be less or equal than the target
        (pow <= self.target, pow)
    }

    /// Searches `nonces` for a header satisfying the target. The returned header is finalized.
    pub fn mine(&self, mut header: SubblockHeader, nonces: Range<u64>) -> Option<SubblockHeader> {
        for nonce in nonces {
            header.nonce = nonce;
            header.finalize();
            if self.check_pow(&header).0 {
                return Some(header);
            }
        }
        None
    }
}
