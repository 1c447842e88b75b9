use super::genesis::{DEVNET_GENESIS, GenesisBlock, SIMNET_GENESIS};
use crate::{
    KType,
    errors::config::{ConfigError, ConfigResult},
};
use bobtail_math::Uint256;
use serde::{Deserialize, Serialize};

pub const SUBBLOCK_VERSION: u16 = 1;
pub const STRONG_BLOCK_VERSION: u16 = 1;

/// How the ranks of the k selected subblocks combine into one score.
/// Both functions are monotone: lowering any rank never raises the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    /// Exact integer mean of the ranks
    ArithmeticMean,
    /// Floor of the k-th root of the product of the ranks
    GeometricMean,
}

/// Parameters of the KOS admission threshold, which rejects subblocks whose
/// pow is implausibly large for a strong block built from k of them
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KosParams {
    /// Subblocks whose scaled pow falls beyond this Gamma CDF value are rejected
    pub inclusion_prob: f64,
    /// Targets are divided down to this scale before the f64 Gamma math
    pub scale_factor: u64,
}

pub const DEFAULT_KOS_INCLUSION_PROB: f64 = 0.99999;
pub const DEFAULT_KOS_SCALE_FACTOR: u64 = 1_000_000;

pub const DEFAULT_KOS_PARAMS: KosParams = KosParams { inclusion_prob: DEFAULT_KOS_INCLUSION_PROB, scale_factor: DEFAULT_KOS_SCALE_FACTOR };

/// Consensus parameters. Every node on a network must agree on these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub genesis: GenesisBlock,
    /// Number of subblocks aggregated into a strong block
    pub bobtail_k: KType,
    /// Compact encoding of the target a single subblock pow must not exceed
    pub weak_bits: u32,
    /// Compact encoding of the target the aggregate score must not exceed
    pub strong_bits: u32,
    pub score_aggregation: ScoreAggregation,
    pub kos: Option<KosParams>,
    /// Upper bound on buffered orphans. The oldest are evicted first.
    pub max_orphans: usize,
    /// Orphans older than this many admissions are expired
    pub orphan_expire_interval: u64,
    /// Admissions between two expiry scans of the orphan buffer
    pub orphan_expire_scan_interval: u64,
    pub skip_proof_of_work: bool,
}

impl Params {
    #[inline]
    pub fn weak_target(&self) -> Uint256 {
        Uint256::from_compact_target_bits(self.weak_bits)
    }

    #[inline]
    pub fn strong_target(&self) -> Uint256 {
        Uint256::from_compact_target_bits(self.strong_bits)
    }

    /// Clones the params and sets `skip_proof_of_work = true`. For tests only.
    pub fn clone_with_skip_pow(&self) -> Self {
        let mut cloned_params = self.clone();
        cloned_params.skip_proof_of_work = true;
        cloned_params
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.bobtail_k == 0 {
            return Err(ConfigError::ZeroK);
        }
        if self.weak_target().is_zero() || self.strong_target().is_zero() {
            return Err(ConfigError::ZeroTarget);
        }
        if self.strong_target() > self.weak_target() {
            return Err(ConfigError::StrongAboveWeak);
        }
        if self.max_orphans == 0 || self.orphan_expire_interval == 0 || self.orphan_expire_scan_interval == 0 {
            return Err(ConfigError::ZeroOrphanBound);
        }
        if let Some(kos) = self.kos {
            if !(kos.inclusion_prob > 0.0 && kos.inclusion_prob < 1.0) {
                return Err(ConfigError::KosProbability(kos.inclusion_prob));
            }
            if kos.scale_factor == 0 {
                return Err(ConfigError::KosScale);
            }
        }
        Ok(())
    }
}

pub const DEFAULT_BOBTAIL_K: KType = 3;

pub const DEVNET_PARAMS: Params = Params {
    genesis: DEVNET_GENESIS,
    bobtail_k: DEFAULT_BOBTAIL_K,
    // 2^248, about one hash in 256 qualifies
    weak_bits: 0x2000ffff,
    // Half the weak target
    strong_bits: 0x1f7fffff,
    score_aggregation: ScoreAggregation::ArithmeticMean,
    kos: None,
    max_orphans: 1000,
    orphan_expire_interval: 600,
    orphan_expire_scan_interval: 10,
    skip_proof_of_work: false,
};

pub const SIMNET_PARAMS: Params = Params {
    genesis: SIMNET_GENESIS,
    bobtail_k: DEFAULT_BOBTAIL_K,
    // 2^252, one hash in 16 qualifies
    weak_bits: 0x200fffff,
    strong_bits: 0x2007ffff,
    score_aggregation: ScoreAggregation::ArithmeticMean,
    kos: Some(DEFAULT_KOS_PARAMS),
    max_orphans: 200,
    orphan_expire_interval: 100,
    orphan_expire_scan_interval: 5,
    skip_proof_of_work: false,
};
