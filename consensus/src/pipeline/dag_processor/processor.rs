use crate::{
    errors::StoreResultConsensusExtensions,
    model::{
        epoch::{EpochState, EpochTransition},
        services::chain_tip::ChainTipTracker,
        stores::{dag::DagStoreReader, orphans::ExpiredOrphan},
    },
    pipeline::{ProcessingCounters, deps_manager::SubblockResultSender},
    processes::{
        finalizer::{Finalization, FinalizeVerdict, Finalizer},
        ordering::SortableSubblock,
        selector::{KSelector, SelectionVerdict},
        strong_block_validator::StrongBlockValidator,
    },
};
use async_channel::Sender as NotificationSender;
use bobtail_consensus_core::{
    errors::{
        consensus::ConsensusResult,
        rule::RuleError,
    },
    notify::{Notification, OrphanExpiredNotification, StrongBlockFinalizedNotification, SubblockLinkedNotification},
    status::{AdmissionReport, StrongBlockStatus, SubblockStatus},
    strong_block::StrongBlock,
    subblock::Subblock,
};
use bobtail_core::{debug, info, time::Stopwatch, trace, warn};
use bobtail_hashes::Hash;
use bobtail_math::Uint256;
use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use std::{
    collections::VecDeque,
    sync::{Arc, atomic::Ordering},
};
use tokio::sync::oneshot;

pub type StrongBlockResultSender = oneshot::Sender<ConsensusResult<StrongBlockStatus>>;
pub type FinalizeResultSender = oneshot::Sender<ConsensusResult<Option<Arc<StrongBlock>>>>;

pub enum DagProcessingMessage {
    Exit,
    /// A subblock which passed validation, with its rank
    Admit(Subblock, Uint256, SubblockResultSender),
    SubmitStrongBlock(StrongBlock, StrongBlockResultSender),
    TryFinalize(FinalizeResultSender),
}

/// Side effects collected while the epoch lock is held
#[derive(Default)]
struct EpochEffects {
    resolved_orphans: Vec<Hash>,
    expired_orphans: Vec<Hash>,
    finalized: Vec<Arc<StrongBlock>>,
}

impl EpochEffects {
    fn into_report(self, hash: Hash, status: SubblockStatus) -> AdmissionReport {
        AdmissionReport {
            hash,
            status,
            resolved_orphans: self.resolved_orphans,
            expired_orphans: self.expired_orphans,
            finalized: self.finalized,
        }
    }
}

/// The single mutator of the epoch state. Every admission, orphan resolution,
/// selection and finalization runs here, one message at a time.
pub struct DagProcessor {
    // Channels
    receiver: Receiver<DagProcessingMessage>,
    notification_sender: Option<NotificationSender<Notification>>,

    // State
    epoch: Arc<RwLock<EpochState>>,
    tracker: Arc<ChainTipTracker>,

    // Managers
    selector: KSelector,
    finalizer: Finalizer,
    strong_block_validator: StrongBlockValidator,

    // Config
    auto_finalize: bool,

    counters: Arc<ProcessingCounters>,
}

impl DagProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        receiver: Receiver<DagProcessingMessage>,
        notification_sender: Option<NotificationSender<Notification>>,
        epoch: Arc<RwLock<EpochState>>,
        tracker: Arc<ChainTipTracker>,
        selector: KSelector,
        finalizer: Finalizer,
        auto_finalize: bool,
        counters: Arc<ProcessingCounters>,
    ) -> Self {
        Self {
            receiver,
            notification_sender,
            epoch,
            tracker,
            strong_block_validator: StrongBlockValidator::new(selector.clone()),
            selector,
            finalizer,
            auto_finalize,
            counters,
        }
    }

    pub fn worker(self: &Arc<DagProcessor>) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                DagProcessingMessage::Exit => break,
                DagProcessingMessage::Admit(subblock, rank, result_transmitter) => {
                    // We don't care if receivers were dropped
                    let _ = result_transmitter.send(self.admit(subblock, rank));
                }
                DagProcessingMessage::SubmitStrongBlock(block, result_transmitter) => {
                    let _ = result_transmitter.send(self.process_strong_block(block));
                }
                DagProcessingMessage::TryFinalize(result_transmitter) => {
                    let _ = result_transmitter.send(self.try_finalize());
                }
            }
        }
        // Dropping whatever is left releases the callers, who observe an exit
        while self.receiver.try_recv().is_ok() {}
        trace!("DAG processor exiting");
    }

    fn admit(&self, subblock: Subblock, rank: Uint256) -> ConsensusResult<AdmissionReport> {
        let mut epoch = self.epoch.write();
        let mut effects = EpochEffects::default();
        let hash = subblock.hash();
        let parent = subblock.parent();

        let expired = epoch.orphans.tick();
        if !expired.is_empty() {
            debug!("Expired {} orphan subblocks", expired.len());
        }
        self.record_expired(&mut effects, expired);

        // Re-judged here since the epoch may have moved since validation
        if epoch.is_known(hash) {
            return Ok(effects.into_report(hash, SubblockStatus::Duplicate));
        }
        if !epoch.dag.can_link(parent) {
            if self.is_stale_parent(&epoch, parent)? {
                let dropped = epoch.retire_stale(hash);
                if !dropped.is_empty() {
                    debug!("Dropping {} orphan subblocks descending from stale subblock {}", dropped.len(), hash);
                }
                self.record_expired(&mut effects, dropped);
                return Err(RuleError::StaleParent(hash, parent).into());
            }
            self.counters.orphans_buffered.fetch_add(1, Ordering::Relaxed);
            let evicted = epoch.orphans.insert(subblock, rank);
            for orphan in evicted.iter() {
                warn!("Orphan buffer is full, evicting subblock {} (missing parent {})", orphan.hash, orphan.missing_parent);
            }
            self.record_expired(&mut effects, evicted);
            self.tracker.publish(&epoch);
            return Ok(effects.into_report(hash, SubblockStatus::OrphanBuffered));
        }

        self.link(&mut epoch, subblock, rank);
        self.resolve_orphans(&mut epoch, hash, &mut effects);
        self.finalize_if_eager(&mut epoch, &mut effects);
        self.tracker.publish(&epoch);
        Ok(effects.into_report(hash, SubblockStatus::Linked))
    }

    /// Finalizes eagerly when configured to. A store failure is logged by the finalizer
    /// and leaves the epoch open, so it does not alter the verdict of the triggering input.
    fn finalize_if_eager(&self, epoch: &mut EpochState, effects: &mut EpochEffects) {
        if !self.auto_finalize {
            return;
        }
        if let Err(err) = self.finalize_while_possible(epoch, effects) {
            warn!("Postponing finalization of epoch {}: {}", epoch.chain.tip, err);
        }
    }

    /// Whether `parent`, which is not linkable, belongs to an already closed epoch
    fn is_stale_parent(&self, epoch: &EpochState, parent: Hash) -> ConsensusResult<bool> {
        if epoch.is_retired(parent) {
            return Ok(true);
        }
        // Strong blocks other than the tip are closed epoch bases
        Ok(parent != epoch.chain.tip && self.finalizer.has_strong_block(parent).into_consensus_result()?)
    }

    /// Links a subblock whose parent is known. Returns whether it was linked.
    fn link(&self, epoch: &mut EpochState, subblock: Subblock, rank: Uint256) -> bool {
        let hash = subblock.hash();
        let parent = subblock.parent();
        let enters_top_k = epoch.dag.enters_top_k(&SortableSubblock::new(hash, rank), self.selector.k());
        if let Err(err) = epoch.dag.link(subblock, rank) {
            warn!("Failed linking subblock {}: {}", hash, err);
            return false;
        }
        // A subblock ranking below the current top k leaves selection unchanged
        if enters_top_k {
            epoch.known_unfinalizable = false;
        }
        self.counters.subblocks_linked.fetch_add(1, Ordering::Relaxed);
        self.notify(Notification::SubblockLinked(SubblockLinkedNotification { hash, parent }));
        true
    }

    /// Links the orphans waiting on `parent`, and transitively their own waiting children
    fn resolve_orphans(&self, epoch: &mut EpochState, parent: Hash, effects: &mut EpochEffects) {
        let mut queue = VecDeque::from([parent]);
        while let Some(parent) = queue.pop_front() {
            for entry in epoch.orphans.take_children(parent) {
                let hash = entry.subblock.hash();
                debug!("Resolving orphan subblock {} through parent {}", hash, parent);
                if self.link(epoch, entry.subblock, entry.rank) {
                    effects.resolved_orphans.push(hash);
                    queue.push_back(hash);
                }
            }
        }
    }

    /// Runs selection and finalizes for as long as the epoch keeps crossing
    fn finalize_while_possible(&self, epoch: &mut EpochState, effects: &mut EpochEffects) -> ConsensusResult<()> {
        while let Some(finalization) = self.finalize_once(epoch)? {
            effects.finalized.push(finalization.block);
            self.apply_transition(epoch, finalization.transition, effects);
        }
        Ok(())
    }

    fn finalize_once(&self, epoch: &mut EpochState) -> ConsensusResult<Option<Finalization>> {
        if epoch.known_unfinalizable {
            return Ok(None);
        }
        let _sw = Stopwatch::<100>::with_threshold("finalize_once op");
        let selection = match self.selector.select(&epoch.dag) {
            SelectionVerdict::Finalizable(selection) => selection,
            SelectionVerdict::NotYetFinalizable => {
                epoch.known_unfinalizable = true;
                return Ok(None);
            }
        };
        match self.finalizer.finalize(epoch, selection).into_consensus_result()? {
            FinalizeVerdict::Finalized(finalization) => {
                self.counters.strong_blocks_finalized.fetch_add(1, Ordering::Relaxed);
                self.notify(Notification::StrongBlockFinalized(StrongBlockFinalizedNotification { block: finalization.block.clone() }));
                Ok(Some(finalization))
            }
            FinalizeVerdict::NotYetFinalizable => Ok(None),
        }
    }

    /// Links the orphans built on the new base and records those dropped with the old epoch
    fn apply_transition(&self, epoch: &mut EpochState, transition: EpochTransition, effects: &mut EpochEffects) {
        self.record_expired(effects, transition.expired);
        for entry in transition.reparented {
            let hash = entry.subblock.hash();
            if self.link(epoch, entry.subblock, entry.rank) {
                effects.resolved_orphans.push(hash);
                self.resolve_orphans(epoch, hash, effects);
            }
        }
    }

    fn process_strong_block(&self, block: StrongBlock) -> ConsensusResult<StrongBlockStatus> {
        let mut epoch = self.epoch.write();
        if self.finalizer.has_strong_block(block.hash).into_consensus_result()? {
            return Ok(StrongBlockStatus::AlreadyKnown);
        }
        self.strong_block_validator.validate(&block, &epoch)?;

        let finalization = self.finalizer.commit(&mut epoch, block).into_consensus_result()?;
        info!("Adopted relayed strong block {} at height {}", finalization.block.hash, finalization.block.height);
        self.counters.strong_blocks_adopted.fetch_add(1, Ordering::Relaxed);

        let mut effects = EpochEffects::default();
        self.apply_transition(&mut epoch, finalization.transition, &mut effects);
        self.finalize_if_eager(&mut epoch, &mut effects);
        self.tracker.publish(&epoch);
        Ok(StrongBlockStatus::Adopted)
    }

    fn try_finalize(&self) -> ConsensusResult<Option<Arc<StrongBlock>>> {
        let mut epoch = self.epoch.write();
        let Some(finalization) = self.finalize_once(&mut epoch)? else { return Ok(None) };
        let block = finalization.block.clone();
        self.apply_transition(&mut epoch, finalization.transition, &mut EpochEffects::default());
        self.tracker.publish(&epoch);
        Ok(Some(block))
    }

    fn record_expired(&self, effects: &mut EpochEffects, expired: Vec<ExpiredOrphan>) {
        self.counters.orphans_expired.fetch_add(expired.len() as u64, Ordering::Relaxed);
        for orphan in expired {
            effects.expired_orphans.push(orphan.hash);
            self.notify(Notification::OrphanExpired(OrphanExpiredNotification {
                hash: orphan.hash,
                missing_parent: orphan.missing_parent,
            }));
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(sender) = self.notification_sender.as_ref() {
            // The channel is unbounded, so this fails only once listeners are gone
            let _ = sender.try_send(notification);
        }
    }
}

