use super::Consensus;
use crate::model::stores::DB;
use async_channel::{Receiver, unbounded};
use bobtail_consensus_core::{
    config::Config,
    errors::consensus::{ConsensusError, ConsensusResult},
    notify::Notification,
    status::{AdmissionReport, StrongBlockStatus},
    strong_block::StrongBlock,
    subblock::Subblock,
};
use bobtail_database::{create_temp_db, prelude::ConnBuilder, utils::DbLifetime};
use bobtail_hashes::Hash;
use std::{ops::Deref, sync::Arc, thread::JoinHandle};

/// A consensus instance over a temporary DB, with blocking helpers for tests.
/// Blocking helpers must not be called from within an async runtime.
pub struct TestConsensus {
    consensus: Arc<Consensus>,
    notification_receiver: Receiver<Notification>,
    _db_lifetime: DbLifetime,
}

impl TestConsensus {
    /// Creates a test consensus instance based on `config` with a temp DB
    pub fn new(config: &Config) -> Self {
        let (db_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10)).unwrap();
        Self::with_db(db, db_lifetime, config)
    }

    /// Creates a test consensus instance over an existing DB
    pub fn with_db(db: Arc<DB>, db_lifetime: DbLifetime, config: &Config) -> Self {
        let (notification_sender, notification_receiver) = unbounded();
        let consensus = Arc::new(Consensus::new(db, Arc::new(config.clone()), Some(notification_sender)).unwrap());
        Self { consensus, notification_receiver, _db_lifetime: db_lifetime }
    }

    pub fn init(&self) -> Vec<JoinHandle<()>> {
        self.consensus.init().unwrap()
    }

    pub fn consensus(&self) -> Arc<Consensus> {
        self.consensus.clone()
    }

    pub fn notification_receiver(&self) -> Receiver<Notification> {
        self.notification_receiver.clone()
    }

    /// Drains the notifications emitted so far
    pub fn take_notifications(&self) -> Vec<Notification> {
        let mut notifications = Vec::new();
        while let Ok(notification) = self.notification_receiver.try_recv() {
            notifications.push(notification);
        }
        notifications
    }

    pub fn build_subblock(&self, hash: Hash, parent: Hash) -> Subblock {
        Subblock::from_precomputed_hash(hash, parent)
    }

    pub fn add_subblock(&self, hash: Hash, parent: Hash) -> ConsensusResult<AdmissionReport> {
        self.validate_and_insert_subblock_blocking(self.build_subblock(hash, parent))
    }

    pub fn validate_and_insert_subblock_blocking(&self, subblock: Subblock) -> ConsensusResult<AdmissionReport> {
        self.consensus.submit_subblock(subblock).blocking_recv().unwrap_or(Err(ConsensusError::Exiting))
    }

    pub fn validate_and_insert_strong_block_blocking(&self, block: StrongBlock) -> ConsensusResult<StrongBlockStatus> {
        self.consensus.submit_strong_block(block).blocking_recv().unwrap_or(Err(ConsensusError::Exiting))
    }

    pub fn try_finalize_blocking(&self) -> ConsensusResult<Option<Arc<StrongBlock>>> {
        self.consensus.submit_try_finalize().blocking_recv().unwrap_or(Err(ConsensusError::Exiting))
    }
}

impl Deref for TestConsensus {
    type Target = Consensus;

    fn deref(&self) -> &Self::Target {
        &self.consensus
    }
}
