use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("bobtail k must be at least 1")]
    ZeroK,

    #[error("weak and strong targets must be non-zero")]
    ZeroTarget,

    #[error("the strong target may not exceed the weak target")]
    StrongAboveWeak,

    #[error("orphan buffer bounds must be non-zero")]
    ZeroOrphanBound,

    #[error("KOS inclusion probability {0} is outside (0, 1)")]
    KosProbability(f64),

    #[error("KOS scale factor must be non-zero")]
    KosScale,
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
