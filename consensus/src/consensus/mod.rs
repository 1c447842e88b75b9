pub mod test_consensus;

use crate::{
    errors::StoreResultConsensusExtensions,
    model::{
        epoch::EpochState,
        services::chain_tip::{ChainTipSnapshot, ChainTipTracker},
        stores::{
            DB,
            chain_state::{ChainStateStoreReader, DbChainStateStore},
            strong_blocks::{DbStrongBlocksStore, StrongBlocksStoreReader},
        },
    },
    pipeline::{
        ProcessingCounters,
        dag_processor::{DagProcessingMessage, DagProcessor},
        deps_manager::SubblockProcessingMessage,
        subblock_processor::SubblockProcessor,
    },
    processes::{finalizer::Finalizer, selector::KSelector, validator::SubblockValidator},
};
use async_channel::Sender as NotificationSender;
use bobtail_consensus_core::{
    api::{BobtailInfo, ConsensusApi, DagInfo},
    chain::ChainState,
    config::{Config, params::Params},
    errors::consensus::{ConsensusError, ConsensusResult},
    notify::Notification,
    status::{AdmissionReport, StrongBlockStatus},
    strong_block::StrongBlock,
    subblock::Subblock,
};
use bobtail_core::info;
use bobtail_database::prelude::StoreResultExtensions;
use bobtail_hashes::Hash;
use crossbeam_channel::{Receiver as CrossbeamReceiver, Sender as CrossbeamSender, unbounded as unbounded_crossbeam};
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};
use tokio::sync::oneshot;

pub struct Consensus {
    // Channels
    subblock_sender: CrossbeamSender<SubblockProcessingMessage>,
    dag_sender: CrossbeamSender<DagProcessingMessage>,

    // Processors
    subblock_processor: Arc<SubblockProcessor>,
    dag_processor: Arc<DagProcessor>,

    // Stores
    strong_blocks_store: Arc<DbStrongBlocksStore>,

    // Services
    tracker: Arc<ChainTipTracker>,

    // Config
    config: Arc<Config>,

    // Counters
    counters: Arc<ProcessingCounters>,

    // Signals
    is_consensus_exiting: Arc<AtomicBool>,
}

impl Consensus {
    pub fn new(db: Arc<DB>, config: Arc<Config>, notification_sender: Option<NotificationSender<Notification>>) -> ConsensusResult<Self> {
        let params = &config.params;
        params.validate()?;

        //
        // Storage layer
        //

        let strong_blocks_store = Arc::new(DbStrongBlocksStore::new(db.clone(), config.strong_blocks_cache_size));
        let chain_state_store = Arc::new(RwLock::new(DbChainStateStore::new(db.clone())));
        let chain = Self::load_or_init_chain_state(&db, params, &strong_blocks_store, &chain_state_store)?;

        //
        // Epoch state and services
        //

        let epoch = EpochState::new(chain, params);
        let tracker = Arc::new(ChainTipTracker::new(ChainTipSnapshot::from(&epoch)));
        let epoch = Arc::new(RwLock::new(epoch));
        let counters = Arc::new(ProcessingCounters::default());
        let selector = KSelector::new(params.bobtail_k, params.strong_target(), params.score_aggregation);

        //
        // Processor channels
        //

        let (subblock_sender, subblock_receiver): (CrossbeamSender<SubblockProcessingMessage>, CrossbeamReceiver<SubblockProcessingMessage>) =
            unbounded_crossbeam();
        let (dag_sender, dag_receiver): (CrossbeamSender<DagProcessingMessage>, CrossbeamReceiver<DagProcessingMessage>) =
            unbounded_crossbeam();

        //
        // Thread-pools
        //

        let num_threads = if config.validation_threads == 0 { num_cpus::get() } else { config.validation_threads };
        let validation_pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("validation-pool-{i}"))
                .build()
                .map_err(|err| ConsensusError::Startup(err.to_string()))?,
        );

        //
        // Pipeline processors
        //

        let subblock_processor = Arc::new(SubblockProcessor::new(
            subblock_receiver,
            dag_sender.clone(),
            validation_pool,
            SubblockValidator::new(params),
            epoch.clone(),
            counters.clone(),
        ));
        let finalizer = Finalizer::new(db, selector.clone(), strong_blocks_store.clone(), chain_state_store);
        let dag_processor = Arc::new(DagProcessor::new(
            dag_receiver,
            notification_sender,
            epoch,
            tracker.clone(),
            selector,
            finalizer,
            config.auto_finalize,
            counters.clone(),
        ));

        Ok(Self {
            subblock_sender,
            dag_sender,
            subblock_processor,
            dag_processor,
            strong_blocks_store,
            tracker,
            config,
            counters,
            is_consensus_exiting: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Resumes from the persisted chain state, or stores genesis on an empty DB
    fn load_or_init_chain_state(
        db: &DB,
        params: &Params,
        strong_blocks_store: &DbStrongBlocksStore,
        chain_state_store: &RwLock<DbChainStateStore>,
    ) -> ConsensusResult<ChainState> {
        if let Some(state) = chain_state_store.read().get().optional().into_consensus_result()? {
            let stored_genesis = strong_blocks_store.get_hash_by_height(0).into_consensus_result()?;
            if stored_genesis != params.genesis.hash {
                return Err(ConsensusError::GenesisMismatch { expected: params.genesis.hash, found: stored_genesis });
            }
            info!("Resuming the strong chain at height {} (tip: {})", state.height, state.tip);
            return Ok(state);
        }

        let genesis = Arc::new(StrongBlock::genesis(&params.genesis));
        let state = ChainState::from(genesis.as_ref());
        let mut batch = WriteBatch::default();
        strong_blocks_store.insert_batch(&mut batch, genesis).into_consensus_result()?;
        chain_state_store.write().set_batch(&mut batch, state).into_consensus_result()?;
        db.write(batch).map_err(|err| ConsensusError::Store(err.to_string()))?;
        info!("Initialized a new strong chain from genesis {}", state.tip);
        Ok(state)
    }

    pub fn run_processors(&self) -> ConsensusResult<Vec<JoinHandle<()>>> {
        // Spawn the asynchronous processors.
        let subblock_processor = self.subblock_processor.clone();
        let dag_processor = self.dag_processor.clone();

        let spawn_failed = |err: std::io::Error| ConsensusError::Startup(err.to_string());
        Ok(vec![
            thread::Builder::new().name("subblock-processor".to_string()).spawn(move || subblock_processor.worker()).map_err(spawn_failed)?,
            thread::Builder::new().name("dag-processor".to_string()).spawn(move || dag_processor.worker()).map_err(spawn_failed)?,
        ])
    }

    pub fn init(&self) -> ConsensusResult<Vec<JoinHandle<()>>> {
        self.run_processors()
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn processing_counters(&self) -> &Arc<ProcessingCounters> {
        &self.counters
    }

    pub fn chain_tip_snapshot(&self) -> Arc<ChainTipSnapshot> {
        self.tracker.snapshot()
    }

    pub fn signal_exit(&self) {
        self.is_consensus_exiting.store(true, Ordering::Relaxed);
        let _ = self.subblock_sender.send(SubblockProcessingMessage::Exit);
    }

    pub fn shutdown(&self, wait_handles: Vec<JoinHandle<()>>) {
        self.signal_exit();
        // Wait for async consensus processors to exit
        for handle in wait_handles {
            let _ = handle.join();
        }
    }

    fn is_exiting(&self) -> bool {
        self.is_consensus_exiting.load(Ordering::Relaxed)
    }

    /// Queues a subblock and returns the receiving end of its admission result. The
    /// sender is dropped without a result once consensus is exiting.
    pub(crate) fn submit_subblock(&self, subblock: Subblock) -> oneshot::Receiver<ConsensusResult<AdmissionReport>> {
        let (tx, rx) = oneshot::channel();
        if !self.is_exiting() {
            self.counters.subblocks_submitted.fetch_add(1, Ordering::Relaxed);
            let _ = self.subblock_sender.send(SubblockProcessingMessage::Process(subblock, tx));
        }
        rx
    }

    pub(crate) fn submit_strong_block(&self, block: StrongBlock) -> oneshot::Receiver<ConsensusResult<StrongBlockStatus>> {
        let (tx, rx) = oneshot::channel();
        if !self.is_exiting() {
            let _ = self.dag_sender.send(DagProcessingMessage::SubmitStrongBlock(block, tx));
        }
        rx
    }

    pub(crate) fn submit_try_finalize(&self) -> oneshot::Receiver<ConsensusResult<Option<Arc<StrongBlock>>>> {
        let (tx, rx) = oneshot::channel();
        if !self.is_exiting() {
            let _ = self.dag_sender.send(DagProcessingMessage::TryFinalize(tx));
        }
        rx
    }
}

/// Resolves a pipeline result, mapping a dropped sender to an exit
async fn resolve<T>(receiver: oneshot::Receiver<ConsensusResult<T>>) -> ConsensusResult<T> {
    receiver.await.unwrap_or(Err(ConsensusError::Exiting))
}

impl ConsensusApi for Consensus {
    fn validate_and_insert_subblock(&self, subblock: Subblock) -> BoxFuture<'static, ConsensusResult<AdmissionReport>> {
        Box::pin(resolve(self.submit_subblock(subblock)))
    }

    fn validate_and_insert_strong_block(&self, block: StrongBlock) -> BoxFuture<'static, ConsensusResult<StrongBlockStatus>> {
        Box::pin(resolve(self.submit_strong_block(block)))
    }

    fn try_finalize(&self) -> BoxFuture<'static, ConsensusResult<Option<Arc<StrongBlock>>>> {
        Box::pin(resolve(self.submit_try_finalize()))
    }

    fn chain_tip(&self) -> Hash {
        self.tracker.chain_tip()
    }

    fn chain_height(&self) -> u64 {
        self.tracker.chain_height()
    }

    fn dag_size(&self) -> u64 {
        self.tracker.dag_size()
    }

    fn dag_info(&self) -> DagInfo {
        self.tracker.dag_info()
    }

    fn dag_tips(&self) -> Vec<Hash> {
        self.tracker.dag_tips()
    }

    fn bobtail_info(&self) -> BobtailInfo {
        self.tracker.bobtail_info()
    }

    fn get_strong_block(&self, hash: Hash) -> ConsensusResult<Arc<StrongBlock>> {
        self.strong_blocks_store.get(hash).optional().into_consensus_result()?.ok_or(ConsensusError::StrongBlockNotFound(hash))
    }

    fn get_strong_block_by_height(&self, height: u64) -> ConsensusResult<Arc<StrongBlock>> {
        let hash = self
            .strong_blocks_store
            .get_hash_by_height(height)
            .optional()
            .into_consensus_result()?
            .ok_or(ConsensusError::HeightNotFound(height))?;
        self.get_strong_block(hash)
    }
}
