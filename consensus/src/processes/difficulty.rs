use bobtail_math::Uint256;

/// Expected number of hashes needed to reach `target`, i.e. `2^256 / (target + 1)`.
pub fn calc_work(target: Uint256) -> Uint256 {
    // 2^256 does not fit in 256 bits. Since 2^256 >= target + 1, it equals
    // ((2^256 - target - 1) / (target + 1)) + 1, or !target / (target + 1) + 1.
    (!target / target.saturating_add(Uint256::ONE)).saturating_add(Uint256::ONE)
}
