use super::{
    SimMessage,
    infra::{Environment, Process, Resumption, Suspension},
};
use async_channel::Receiver;
use bobtail_consensus::consensus::Consensus;
use bobtail_consensus_core::{
    api::ConsensusApi,
    errors::{consensus::ConsensusError, rule::RuleError, strong_block::StrongBlockError},
    notify::Notification,
    status::StrongBlockStatus,
    strong_block::StrongBlock,
    subblock::Subblock,
};
use bobtail_core::{debug, warn};
use futures::executor::block_on;
use itertools::Itertools;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Network level outcomes observed by a single node
#[derive(Default)]
pub struct NodeStats {
    pub subblocks_rejected: AtomicU64,
    pub stale_subblocks: AtomicU64,
    pub relayed_blocks: AtomicU64,
    pub adopted_blocks: AtomicU64,
    pub already_known_blocks: AtomicU64,
    /// Competing blocks carrying more work than the local tip
    pub reorgs_required: AtomicU64,
    /// Competing blocks carrying no more work than the local tip
    pub stale_blocks: AtomicU64,
    pub orphans_expired: AtomicU64,
}

impl NodeStats {
    pub fn forks(&self) -> u64 {
        self.reorgs_required.load(Ordering::Relaxed) + self.stale_blocks.load(Ordering::Relaxed)
    }
}

/// An engine instance fed by the simulated network. Blocks it finalizes are
/// relayed to every other node.
pub struct Node {
    id: u64,
    consensus: Arc<Consensus>,
    notification_receiver: Receiver<Notification>,
    /// Relayed blocks waiting for subblocks which did not arrive yet
    pending: Vec<StrongBlock>,
    stats: Arc<NodeStats>,
}

impl Node {
    pub fn new(id: u64, consensus: Arc<Consensus>, notification_receiver: Receiver<Notification>, stats: Arc<NodeStats>) -> Self {
        Self { id, consensus, notification_receiver, pending: Vec::new(), stats }
    }

    fn process_subblock(&mut self, subblock: Subblock, env: &mut Environment<SimMessage>) {
        let hash = subblock.hash();
        match block_on(self.consensus.validate_and_insert_subblock(subblock)) {
            Ok(_) => {}
            Err(ConsensusError::Rule(RuleError::StaleParent(..))) => {
                self.stats.stale_subblocks.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                debug!("Node {} rejected subblock {}: {}", self.id, hash, err);
                self.stats.subblocks_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.drain_notifications(env);
        self.retry_pending(env);
    }

    fn process_strong_block(&mut self, block: StrongBlock, env: &mut Environment<SimMessage>) {
        match block_on(self.consensus.validate_and_insert_strong_block(block.clone())) {
            Ok(StrongBlockStatus::Adopted) => {
                self.stats.adopted_blocks.fetch_add(1, Ordering::Relaxed);
            }
            Ok(StrongBlockStatus::AlreadyKnown) => {
                self.stats.already_known_blocks.fetch_add(1, Ordering::Relaxed);
            }
            Err(ConsensusError::StrongBlock(StrongBlockError::MissingSubblocks(_))) => {
                if !self.pending.iter().any(|pending| pending.hash == block.hash) {
                    self.pending.push(block);
                }
            }
            Err(ConsensusError::StrongBlock(StrongBlockError::ReorgRequired { current_tip, competing, .. })) => {
                warn!("Node {}: block {} outweighs the local tip {}", self.id, competing, current_tip);
                self.stats.reorgs_required.fetch_add(1, Ordering::Relaxed);
            }
            Err(ConsensusError::StrongBlock(StrongBlockError::StaleStrongBlock(hash))) => {
                debug!("Node {}: block {} lost against the local tip", self.id, hash);
                self.stats.stale_blocks.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!("Node {} rejected strong block {}: {}", self.id, block.hash, err);
            }
        }
        self.drain_notifications(env);
    }

    /// Retries pending relayed blocks above the local height, lowest first
    fn retry_pending(&mut self, env: &mut Environment<SimMessage>) {
        if self.pending.is_empty() {
            return;
        }
        let height = self.consensus.chain_height();
        let pending = std::mem::take(&mut self.pending);
        for block in pending.into_iter().filter(|block| block.height > height).sorted_by_key(|block| block.height) {
            self.process_strong_block(block, env);
        }
    }

    /// Relays locally finalized blocks and records orphan expiries
    fn drain_notifications(&mut self, env: &mut Environment<SimMessage>) {
        while let Ok(notification) = self.notification_receiver.try_recv() {
            match notification {
                Notification::StrongBlockFinalized(n) => {
                    self.stats.relayed_blocks.fetch_add(1, Ordering::Relaxed);
                    env.broadcast(self.id, SimMessage::StrongBlock(n.block.as_ref().clone()));
                }
                Notification::OrphanExpired(_) => {
                    self.stats.orphans_expired.fetch_add(1, Ordering::Relaxed);
                }
                Notification::SubblockLinked(_) => {}
            }
        }
    }
}

impl Process<SimMessage> for Node {
    fn resume(&mut self, resumption: Resumption<SimMessage>, env: &mut Environment<SimMessage>) -> Suspension {
        match resumption {
            Resumption::Initial | Resumption::Scheduled => {}
            Resumption::Message(SimMessage::Subblock(subblock)) => self.process_subblock(subblock, env),
            Resumption::Message(SimMessage::StrongBlock(block)) => self.process_strong_block(block, env),
        }
        Suspension::Idle
    }
}
