use super::{
    SimMessage,
    infra::Simulation,
    miner::Miner,
    node::{Node, NodeStats},
};
use crate::errors::{SimError, SimResult};
use bobtail_consensus::{consensus::Consensus, pipeline::ProcessingCountersSnapshot};
use bobtail_consensus_core::{api::ConsensusApi, config::Config};
use bobtail_database::{create_temp_db, prelude::ConnBuilder, utils::DbLifetime};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::Exp;
use std::{
    sync::{Arc, atomic::Ordering},
    thread::JoinHandle,
};

struct NodeInstance {
    consensus: Arc<Consensus>,
    stats: Arc<NodeStats>,
    handles: Vec<JoinHandle<()>>,
    _lifetime: DbLifetime,
}

pub struct NodeReport {
    pub id: u64,
    pub tip: Hash,
    pub height: u64,
    pub chain_work: Uint256,
    pub counters: ProcessingCountersSnapshot,
    pub forks: u64,
    pub stale_subblocks: u64,
    pub rejected_subblocks: u64,
    pub relayed_blocks: u64,
    pub adopted_blocks: u64,
    pub orphans_expired: u64,
}

pub struct SimReport {
    pub nodes: Vec<NodeReport>,
    /// Highest height up to which every node holds the same strong chain
    pub common_height: u64,
}

impl SimReport {
    pub fn converged(&self) -> bool {
        self.nodes.windows(2).all(|pair| pair[0].tip == pair[1].tip)
    }
}

pub struct BobtailNetworkSimulator {
    // Internal simulation env
    simulation: Simulation<SimMessage>,

    // Consensus instances
    nodes: Vec<NodeInstance>,

    config: Arc<Config>,
    rate: f64, // Network-wide subblocks per second
    seed: u64,
}

impl BobtailNetworkSimulator {
    pub fn new(delay: f64, rate: f64, config: Config, seed: u64) -> Self {
        Self {
            simulation: Simulation::new((delay * 1000.0) as u64, StdRng::seed_from_u64(seed)),
            nodes: Vec::new(),
            config: Arc::new(config),
            rate,
            seed,
        }
    }

    pub fn init(&mut self, num_nodes: u64, num_miners: u64, verbose: bool) -> SimResult<&mut Self> {
        if num_nodes == 0 || num_miners == 0 {
            return Err(SimError::Args("at least one node and one miner are required".to_string()));
        }
        for id in 0..num_nodes {
            let (lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10))?;
            let (notification_sender, notification_receiver) = async_channel::unbounded();
            let consensus = Arc::new(Consensus::new(db, self.config.clone(), Some(notification_sender))?);
            let handles = consensus.init()?;
            let stats = Arc::new(NodeStats::default());
            self.simulation.register(id, Box::new(Node::new(id, consensus.clone(), notification_receiver, stats.clone())));
            self.simulation.join_broadcast_group(id);
            self.nodes.push(NodeInstance { consensus, stats, handles, _lifetime: lifetime });
        }
        for i in 0..num_miners {
            let id = num_nodes + i;
            let dist = Exp::new(self.rate / num_miners as f64).map_err(|err| SimError::Args(format!("invalid mining rate: {err}")))?;
            // Miners are spread evenly over the nodes
            let consensus = self.nodes[(i % num_nodes) as usize].consensus.clone();
            let rng = StdRng::seed_from_u64(self.seed.wrapping_add(id));
            self.simulation.register(id, Box::new(Miner::new(id, dist, rng, consensus, &self.config.params, verbose)));
        }
        Ok(self)
    }

    /// Runs the simulation until `until` milliseconds, lets in-flight messages drain
    /// and stops all consensus instances
    pub fn run(&mut self, until: u64) -> SimReport {
        self.simulation.run(until);
        for node in self.nodes.iter_mut() {
            node.consensus.shutdown(std::mem::take(&mut node.handles));
        }
        self.report()
    }

    fn report(&self) -> SimReport {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, node)| {
                let info = node.consensus.bobtail_info();
                NodeReport {
                    id: id as u64,
                    tip: info.chaintip,
                    height: info.height,
                    chain_work: info.chain_work,
                    counters: node.consensus.processing_counters().snapshot(),
                    forks: node.stats.forks(),
                    stale_subblocks: node.stats.stale_subblocks.load(Ordering::Relaxed),
                    rejected_subblocks: node.stats.subblocks_rejected.load(Ordering::Relaxed),
                    relayed_blocks: node.stats.relayed_blocks.load(Ordering::Relaxed),
                    adopted_blocks: node.stats.adopted_blocks.load(Ordering::Relaxed),
                    orphans_expired: node.stats.orphans_expired.load(Ordering::Relaxed),
                }
            })
            .collect();
        SimReport { nodes, common_height: self.common_height() }
    }

    fn common_height(&self) -> u64 {
        let min_height = self.nodes.iter().map(|node| node.consensus.chain_height()).min().unwrap_or_default();
        let mut common = 0;
        for height in 1..=min_height {
            let mut hashes = self.nodes.iter().map(|node| node.consensus.get_strong_block_by_height(height).ok().map(|block| block.hash));
            let Some(first) = hashes.next().flatten() else { break };
            if !hashes.all(|hash| hash == Some(first)) {
                break;
            }
            common = height;
        }
        common
    }
}
