pub mod perf {
    //!
    //! Performance tuning constants. None of these are consensus sensitive.
    //!

    /// The default cache size for the height to strong block hash index
    pub const HEIGHT_INDEX_CACHE_SIZE: u64 = 2_048;
}

/// Bisection steps used when inverting the Gamma CDF
pub const GAMMA_QUANTILE_ITERATIONS: usize = 200;
