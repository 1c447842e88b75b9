use super::{
    SimMessage,
    infra::{Environment, Process, Resumption, Suspension},
};
use bobtail_consensus::consensus::Consensus;
use bobtail_consensus_core::{
    config::params::{Params, SUBBLOCK_VERSION},
    header::SubblockHeader,
    subblock::Subblock,
    tx::TxSet,
};
use bobtail_core::trace;
use bobtail_hashes::Hash;
use bobtail_pow::State as PowState;
use rand::{Rng, rngs::StdRng};
use rand_distr::{Distribution, Exp};
use std::{cmp::max, sync::Arc};

/// Nonces tried per mining event before giving up on it
const NONCE_ATTEMPTS: u64 = 1 << 20;

/// Produces subblocks at Poisson intervals, building on the view of one node
pub struct Miner {
    // ID
    pub(super) id: u64,

    // The node whose DAG the miner extends
    consensus: Arc<Consensus>,
    pow_state: PowState,

    // Rand
    dist: Exp<f64>, // The time interval between Poisson(lambda) events distributes ~Exp(lambda)
    rng: StdRng,

    // Counters
    num_subblocks: u64,
    failed_searches: u64,
    sim_time: u64,

    verbose: bool,
}

impl Miner {
    pub fn new(id: u64, dist: Exp<f64>, rng: StdRng, consensus: Arc<Consensus>, params: &Params, verbose: bool) -> Self {
        Self {
            id,
            consensus,
            pow_state: PowState::new(params.weak_target()),
            dist,
            rng,
            num_subblocks: 0,
            failed_searches: 0,
            sim_time: 0,
            verbose,
        }
    }

    /// Either the chain tip, starting a new branch, or one of the live DAG tips
    fn choose_parent(&mut self) -> Hash {
        let snapshot = self.consensus.chain_tip_snapshot();
        if snapshot.dag_tips.is_empty() || self.rng.gen_bool(0.5) {
            return snapshot.tip;
        }
        snapshot.dag_tips[self.rng.gen_range(0..snapshot.dag_tips.len())]
    }

    fn build_subblock(&mut self, timestamp: u64) -> Option<Subblock> {
        let parent = self.choose_parent();
        let payload = [self.id.to_le_bytes(), self.num_subblocks.to_le_bytes()].concat();
        let txs = TxSet::with_proofbase(&payload);
        let header = SubblockHeader::new_finalized(SUBBLOCK_VERSION, parent, txs.commitment(), timestamp, 0);
        let start = self.rng.r#gen::<u64>() >> 1;
        let header = self.pow_state.mine(header, start..start + NONCE_ATTEMPTS)?;
        Some(Subblock::new(header, txs))
    }

    fn mine(&mut self, env: &mut Environment<SimMessage>) -> Suspension {
        match self.build_subblock(env.now()) {
            Some(subblock) => {
                self.num_subblocks += 1;
                env.broadcast(self.id, SimMessage::Subblock(subblock));
                self.report_progress(env);
            }
            None => self.failed_searches += 1,
        }
        self.sample_mining_interval()
    }

    fn sample_mining_interval(&mut self) -> Suspension {
        Suspension::Timeout(max((self.dist.sample(&mut self.rng) * 1000.0) as u64, 1))
    }

    fn report_progress(&mut self, env: &Environment<SimMessage>) {
        if !self.verbose {
            return;
        }
        if self.num_subblocks % 50 == 0 || self.sim_time / 5000 != env.now() / 5000 {
            trace!(
                "Simulation time: {}\tMiner {} generated {} subblocks ({} failed searches)",
                env.now() as f64 / 1000.0,
                self.id,
                self.num_subblocks,
                self.failed_searches
            );
        }
        self.sim_time = env.now();
    }
}

impl Process<SimMessage> for Miner {
    fn resume(&mut self, resumption: Resumption<SimMessage>, env: &mut Environment<SimMessage>) -> Suspension {
        match resumption {
            Resumption::Initial => self.sample_mining_interval(),
            Resumption::Scheduled => self.mine(env),
            // Miners are not part of the broadcast group
            Resumption::Message(_) => Suspension::Idle,
        }
    }
}
