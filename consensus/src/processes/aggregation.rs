use bobtail_consensus_core::config::params::ScoreAggregation;
use bobtail_math::Uint256;
use malachite_base::num::arithmetic::traits::FloorRoot;
use malachite_nz::natural::Natural;

/// Combines the ranks of a selected subset into a single score.
/// An empty input scores `Uint256::MAX`, which never crosses a target.
pub fn aggregate(kind: ScoreAggregation, ranks: &[Uint256]) -> Uint256 {
    if ranks.is_empty() {
        return Uint256::MAX;
    }
    match kind {
        ScoreAggregation::ArithmeticMean => arithmetic_mean(ranks),
        ScoreAggregation::GeometricMean => geometric_mean(ranks),
    }
}

/// `floor(sum / n)` computed without a 256-bit overflow on the sum
pub fn arithmetic_mean(ranks: &[Uint256]) -> Uint256 {
    let n = ranks.len() as u64;
    let mut quotients = Uint256::ZERO;
    let mut remainders = 0u128;
    for &rank in ranks {
        let (q, r) = rank.div_rem_u64(n);
        quotients = quotients + q;
        remainders += r as u128;
    }
    quotients + Uint256::from_u128(remainders / n as u128)
}

/// `floor(prod^(1/n))`, exact over arbitrary precision
pub fn geometric_mean(ranks: &[Uint256]) -> Uint256 {
    let product = ranks.iter().fold(Natural::from(1u64), |acc, rank| acc * rank.to_natural());
    let root = (&product).floor_root(ranks.len() as u64);
    // The root of a product of n values below 2^256 is itself below 2^256
    Uint256::try_from_natural(&root).unwrap_or(Uint256::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(values: &[u64]) -> Vec<Uint256> {
        values.iter().copied().map(Uint256::from_u64).collect()
    }

    #[test]
    fn test_arithmetic_mean() {
        assert_eq!(arithmetic_mean(&ranks(&[2, 5, 7, 9])), Uint256::from_u64(5));
        assert_eq!(arithmetic_mean(&ranks(&[1, 1, 2])), Uint256::from_u64(1));
        assert_eq!(arithmetic_mean(&ranks(&[4])), Uint256::from_u64(4));

        // Summing these naively would overflow
        let big = vec![Uint256::MAX, Uint256::MAX, Uint256::MAX - Uint256::from_u64(2)];
        assert_eq!(arithmetic_mean(&big), Uint256::MAX - Uint256::ONE);
    }

    #[test]
    fn test_geometric_mean() {
        // 2 * 5 * 7 * 9 = 630 and 5^4 = 625 <= 630 < 1296 = 6^4
        assert_eq!(geometric_mean(&ranks(&[2, 5, 7, 9])), Uint256::from_u64(5));
        assert_eq!(geometric_mean(&ranks(&[4, 16])), Uint256::from_u64(8));
        assert_eq!(geometric_mean(&ranks(&[0, 1000])), Uint256::ZERO);
        assert_eq!(geometric_mean(&[Uint256::MAX, Uint256::MAX]), Uint256::MAX);
    }

    #[test]
    fn test_monotone() {
        let base = ranks(&[3, 10, 40, 41]);
        for kind in [ScoreAggregation::ArithmeticMean, ScoreAggregation::GeometricMean] {
            let score = aggregate(kind, &base);
            for i in 0..base.len() {
                let mut lowered = base.clone();
                lowered[i] = lowered[i] - Uint256::ONE;
                assert!(aggregate(kind, &lowered) <= score, "{:?} is not monotone", kind);
            }
        }
        assert_eq!(aggregate(ScoreAggregation::ArithmeticMean, &[]), Uint256::MAX);
    }
}
