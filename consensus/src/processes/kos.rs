//!
//! The KOS threshold bounds the weak proof of work a subblock may carry. With k
//! subblocks per strong block, the sum of the k best ranks is roughly
//! Gamma(k, target) distributed, so a single subblock whose pow lies past the
//! high quantile of that distribution can never be part of a useful subset.
//!

use crate::constants::GAMMA_QUANTILE_ITERATIONS;
use bobtail_consensus_core::{KType, config::params::KosParams};
use bobtail_math::Uint256;
use rv::{dist::Gamma, traits::Cdf};

/// Builds `Gamma(shape, scale)`. `rv` is parameterized by rate, the inverse of scale.
fn gamma(shape: f64, scale: f64) -> Option<Gamma> {
    Gamma::new(shape, 1.0 / scale).ok()
}

/// Inverts a CDF by bisection. `cdf` must be non-decreasing over `[0, inf)`.
fn quantile(cdf: impl Fn(f64) -> f64, mean: f64, p: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = mean.max(1.0);
    while cdf(hi) < p {
        lo = hi;
        hi *= 2.0;
        if !hi.is_finite() {
            return f64::INFINITY;
        }
    }
    for _ in 0..GAMMA_QUANTILE_ITERATIONS {
        let mid = lo + (hi - lo) / 2.0;
        if mid <= lo || mid >= hi {
            break;
        }
        if cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}

/// The `p` quantile of `Gamma(k, target)`. Zero for `k = 0`.
pub fn kos_threshold(target: Uint256, k: KType, p: f64) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let scale = target.as_f64();
    match gamma(k as f64, scale) {
        Some(dist) => quantile(|x| dist.cdf(&x), k as f64 * scale, p),
        None => 0.0,
    }
}

/// Whether `pow` is plausible for a strong block of `k` subblocks under `target`.
/// Large targets are scaled down to `scale_factor` first to keep the `f64` math
/// well conditioned. Targets below the scale factor are used as is.
pub fn is_below_kos_threshold(pow: Uint256, target: Uint256, k: KType, params: &KosParams) -> bool {
    if k == 0 {
        return true;
    }
    let scalar = target / params.scale_factor;
    let (scaled_target, scaled_pow) =
        if scalar.is_zero() { (target.as_f64(), pow.as_f64()) } else { (params.scale_factor as f64, (pow / scalar).as_f64()) };
    match gamma(k as f64, scaled_target) {
        Some(dist) => dist.cdf(&scaled_pow) <= params.inclusion_prob,
        None => false,
    }
}

/// The largest k in `[0, u16::MAX]` for which the `probability` quantile of
/// `Gamma(k, 1)` stays below `desired_dag_nodes`. In other words, the k for which
/// a strong block is found within `desired_dag_nodes` subblocks with the given probability.
pub fn best_k(desired_dag_nodes: u16, probability: f64) -> u32 {
    let mut k_low = 0u32;
    let mut k_high = u16::MAX as u32;
    let desired = desired_dag_nodes as f64;
    while k_high - k_low > 1 {
        let k_mid = k_low + (k_high - k_low) / 2;
        // quantile(p) < desired  <=>  cdf(desired) > p
        let below = gamma(k_mid as f64, 1.0).is_some_and(|dist| dist.cdf(&desired) > probability);
        if below {
            k_low = k_mid;
        } else {
            k_high = k_mid;
        }
    }
    k_low
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_consensus_core::config::params::{DEFAULT_KOS_INCLUSION_PROB, DEFAULT_KOS_PARAMS};

    #[test]
    fn test_exponential_median() {
        // Gamma(1, 1) is the unit exponential, whose median is ln 2
        let median = kos_threshold(Uint256::ONE, 1, 0.5);
        assert!((median - std::f64::consts::LN_2).abs() < 1e-9, "{}", median);
    }

    #[test]
    fn test_quantile_inverts_cdf_at_mean() {
        let k = 3;
        let scale = 1e6;
        let dist = gamma(k as f64, scale).unwrap();
        let mean = k as f64 * scale;
        let q = kos_threshold(Uint256::from_u64(1_000_000), k, dist.cdf(&mean));
        assert!((q - mean).abs() / mean < 1e-6, "{} vs {}", q, mean);
    }

    #[test]
    fn test_kos_threshold_above_mean() {
        let k = 3;
        let target = Uint256::from_u64(1_000_000);
        let threshold = kos_threshold(target, k, DEFAULT_KOS_INCLUSION_PROB);
        assert!(threshold > target.as_f64() * k as f64);
        assert_eq!(kos_threshold(target, 0, DEFAULT_KOS_INCLUSION_PROB), 0.0);
    }

    #[test]
    fn test_is_below_kos_threshold() {
        let k = 3;
        let target = Uint256::from_u64(1_000_000);
        let low_pow = Uint256::from_u64(300_000);
        let high_pow = Uint256::from_u64(30_000_000);

        // A scale factor equal to the target means no scaling at all
        let unscaled = KosParams { scale_factor: 1_000_000, ..DEFAULT_KOS_PARAMS };
        assert!(is_below_kos_threshold(low_pow, target, k, &unscaled));
        assert!(!is_below_kos_threshold(high_pow, target, k, &unscaled));

        assert!(is_below_kos_threshold(low_pow, target, k, &DEFAULT_KOS_PARAMS));
        assert!(!is_below_kos_threshold(high_pow, target, k, &DEFAULT_KOS_PARAMS));

        // A target below the scale factor is used unscaled
        let small_target = Uint256::from_u64(1_000);
        assert!(is_below_kos_threshold(Uint256::from_u64(300), small_target, k, &DEFAULT_KOS_PARAMS));
        assert!(!is_below_kos_threshold(Uint256::from_u64(30_000), small_target, k, &DEFAULT_KOS_PARAMS));

        assert!(is_below_kos_threshold(Uint256::MAX, target, 0, &DEFAULT_KOS_PARAMS));
    }

    #[test]
    fn test_scaling_preserves_verdict() {
        let k = 3;
        let target = Uint256::from_u64(1_000_000) << 160;
        assert!(is_below_kos_threshold(Uint256::from_u64(300_000) << 160, target, k, &DEFAULT_KOS_PARAMS));
        assert!(!is_below_kos_threshold(Uint256::from_u64(30_000_000) << 160, target, k, &DEFAULT_KOS_PARAMS));
    }

    #[test]
    fn test_best_k() {
        assert_eq!(best_k(30, 0.9), 23);
        // More tolerance for DAG size admits a larger k
        assert!(best_k(100, 0.9) > best_k(30, 0.9));
    }
}
