use crate::{
    model::epoch::EpochState,
    pipeline::{
        ProcessingCounters,
        dag_processor::DagProcessingMessage,
        deps_manager::{SubblockProcessingMessage, SubblockTaskDependencyManager, TaskId},
    },
    processes::validator::{SubblockValidator, ValidationOutcome},
};
use bobtail_consensus_core::{
    errors::rule::SubblockProcessResult,
    status::{AdmissionReport, SubblockStatus},
    subblock::Subblock,
};
use bobtail_core::trace;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use rayon::ThreadPool;
use std::sync::{Arc, atomic::Ordering};

/// Validates subblocks in parallel and forwards the valid ones to the DAG processor
pub struct SubblockProcessor {
    // Channels
    receiver: Receiver<SubblockProcessingMessage>,
    dag_sender: Sender<DagProcessingMessage>,

    // Thread pool
    thread_pool: Arc<ThreadPool>,

    validator: SubblockValidator,
    epoch: Arc<RwLock<EpochState>>,

    task_manager: SubblockTaskDependencyManager,
    counters: Arc<ProcessingCounters>,
}

impl SubblockProcessor {
    pub fn new(
        receiver: Receiver<SubblockProcessingMessage>,
        dag_sender: Sender<DagProcessingMessage>,
        thread_pool: Arc<ThreadPool>,
        validator: SubblockValidator,
        epoch: Arc<RwLock<EpochState>>,
        counters: Arc<ProcessingCounters>,
    ) -> Self {
        Self { receiver, dag_sender, thread_pool, validator, epoch, task_manager: SubblockTaskDependencyManager::new(), counters }
    }

    pub fn worker(self: &Arc<SubblockProcessor>) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                SubblockProcessingMessage::Exit => break,
                SubblockProcessingMessage::Process(task, result_transmitter) => {
                    if let Some(task_id) = self.task_manager.register(task, result_transmitter) {
                        let processor = self.clone();
                        self.thread_pool.spawn(move || {
                            processor.queue_subblock(task_id);
                        });
                    }
                }
            };
        }

        // Wait until all workers are idle before exiting
        self.task_manager.wait_for_idle();

        // Release callers who raced the exit signal
        while self.receiver.try_recv().is_ok() {}

        // Pass the exit signal on to the following processor
        let _ = self.dag_sender.send(DagProcessingMessage::Exit);
        trace!("Subblock processor exiting");
    }

    fn queue_subblock(self: &Arc<SubblockProcessor>, task_id: TaskId) {
        if let Some(task) = self.task_manager.try_begin(task_id) {
            let res = self.validate(&task);
            let dependent_tasks = self.task_manager.end(task, |task, result_transmitter| match res {
                Ok(ValidationOutcome::Accepted(rank)) => {
                    // If the DAG processor is gone the transmitter drops with the message,
                    // which the caller observes as an exit
                    let _ = self.dag_sender.send(DagProcessingMessage::Admit(task, rank, result_transmitter));
                }
                Ok(ValidationOutcome::Duplicate) => {
                    // We don't care if receivers were dropped
                    let _ = result_transmitter.send(Ok(AdmissionReport::new(task.hash(), SubblockStatus::Duplicate)));
                }
                Err(err) => {
                    let _ = result_transmitter.send(Err(err.into()));
                }
            });

            for dep in dependent_tasks {
                let processor = self.clone();
                self.thread_pool.spawn(move || processor.queue_subblock(dep));
            }
        }
    }

    fn validate(&self, subblock: &Subblock) -> SubblockProcessResult<ValidationOutcome> {
        self.counters.subblocks_validated.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.read();
        self.validator.validate(subblock, &epoch)
    }
}
