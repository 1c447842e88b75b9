use crate::errors::SimResult;
use bobtail_consensus_core::{
    KType,
    config::params::{KosParams, Params, ScoreAggregation},
};
use serde::Deserialize;
use std::{fs, path::Path};

/// Consensus params read from a TOML file. Every field is optional and
/// overrides the matching network param when set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsOverrides {
    pub bobtail_k: Option<KType>,
    pub weak_bits: Option<u32>,
    pub strong_bits: Option<u32>,
    pub score_aggregation: Option<ScoreAggregation>,
    pub kos: Option<KosParams>,
    pub max_orphans: Option<usize>,
    pub orphan_expire_interval: Option<u64>,
    pub orphan_expire_scan_interval: Option<u64>,
}

impl ParamsOverrides {
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn apply(&self, params: &mut Params) {
        if let Some(k) = self.bobtail_k {
            params.bobtail_k = k;
        }
        if let Some(bits) = self.weak_bits {
            params.weak_bits = bits;
        }
        if let Some(bits) = self.strong_bits {
            params.strong_bits = bits;
        }
        if let Some(aggregation) = self.score_aggregation {
            params.score_aggregation = aggregation;
        }
        if self.kos.is_some() {
            params.kos = self.kos;
        }
        if let Some(max_orphans) = self.max_orphans {
            params.max_orphans = max_orphans;
        }
        if let Some(interval) = self.orphan_expire_interval {
            params.orphan_expire_interval = interval;
        }
        if let Some(interval) = self.orphan_expire_scan_interval {
            params.orphan_expire_scan_interval = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_consensus_core::config::params::DEVNET_PARAMS;

    #[test]
    fn test_overrides() {
        let overrides: ParamsOverrides = toml::from_str(
            r#"
            bobtail_k = 8
            score_aggregation = "geometric_mean"
            max_orphans = 50

            [kos]
            inclusion_prob = 0.999
            scale_factor = 1000
            "#,
        )
        .unwrap();
        let mut params = DEVNET_PARAMS;
        overrides.apply(&mut params);
        assert_eq!(params.bobtail_k, 8);
        assert_eq!(params.score_aggregation, ScoreAggregation::GeometricMean);
        assert_eq!(params.max_orphans, 50);
        assert_eq!(params.kos, Some(KosParams { inclusion_prob: 0.999, scale_factor: 1000 }));
        // Untouched fields keep the network value
        assert_eq!(params.weak_bits, DEVNET_PARAMS.weak_bits);
        params.validate().unwrap();

        assert!(toml::from_str::<ParamsOverrides>("bobtail_q = 3").is_err());
    }
}
