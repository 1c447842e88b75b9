pub mod genesis;
pub mod params;

use params::Params;
use std::ops::Deref;

/// Consensus params bundled with node-local settings. Use `Config::new` to build
/// directly from `Params`, or `ConfigBuilder` for anything more involved.
/// NOTE: this struct derefs into `Params`
#[derive(Clone, Debug)]
pub struct Config {
    /// Consensus params
    pub params: Params,

    //
    // Node-local settings which are not consensus sensitive
    //
    /// Run selection after every linked admission. When off, finalization
    /// happens only through an explicit `try_finalize`.
    pub auto_finalize: bool,

    /// Size of the validation thread pool. Zero means one per logical core.
    pub validation_threads: usize,

    pub strong_blocks_cache_size: u64,
}

impl Config {
    pub fn new(params: Params) -> Self {
        Self { params, auto_finalize: true, validation_threads: 0, strong_blocks_cache_size: 512 }
    }

    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder { config: self.clone() }
    }
}

impl AsRef<Params> for Config {
    fn as_ref(&self) -> &Params {
        &self.params
    }
}

impl Deref for Config {
    type Target = Params;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(params: Params) -> Self {
        Self { config: Config::new(params) }
    }

    pub fn edit_consensus_params<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut Params),
    {
        edit_func(&mut self.config.params);
        self
    }

    pub fn apply_args<F>(mut self, edit_func: F) -> Self
    where
        F: Fn(&mut Config),
    {
        edit_func(&mut self.config);
        self
    }

    pub fn skip_proof_of_work(mut self) -> Self {
        self.config.params.skip_proof_of_work = true;
        self
    }

    pub fn manual_finalization(mut self) -> Self {
        self.config.auto_finalize = false;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
