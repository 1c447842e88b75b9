use bobtail_consensus_core::{errors::consensus::ConsensusResult, status::AdmissionReport, subblock::Subblock};
use bobtail_hashes::Hash;
use parking_lot::{Condvar, Mutex};
use std::collections::{
    HashMap, VecDeque,
    hash_map::Entry::{Occupied, Vacant},
};
use tokio::sync::oneshot;

pub type SubblockResultSender = oneshot::Sender<ConsensusResult<AdmissionReport>>;

pub enum SubblockProcessingMessage {
    Exit,
    Process(Subblock, SubblockResultSender),
}

/// An internal struct used to manage a subblock validation task
struct SubblockTaskInternal {
    // Taken by the worker which begins processing
    task: Option<Subblock>,

    // Transmits the admission result to the async caller
    result_transmitter: SubblockResultSender,
}

impl SubblockTaskInternal {
    fn new(task: Subblock, result_transmitter: SubblockResultSender) -> Self {
        Self { task: Some(task), result_transmitter }
    }
}

pub(crate) type TaskId = Hash;

struct SubblockTaskGroup {
    // Tasks of the same hash, processed one after the other
    tasks: VecDeque<SubblockTaskInternal>,

    // Hashes of children waiting on the completion of this group
    dependent_tasks: Vec<TaskId>,
}

impl SubblockTaskGroup {
    fn new(task: SubblockTaskInternal) -> Self {
        Self { tasks: VecDeque::from([task]), dependent_tasks: Vec::new() }
    }
}

/// Tracks validation tasks in flight. A subblock whose parent is still being validated
/// waits for it, so that children submitted after their parent reach the DAG processor
/// after it and are linked directly rather than buffered as orphans.
pub(crate) struct SubblockTaskDependencyManager {
    /// Holds pending subblock hashes and their corresponding tasks
    pending: Mutex<HashMap<Hash, SubblockTaskGroup>>,

    // Used to signal that workers are idle
    idle_signal: Condvar,
}

impl SubblockTaskDependencyManager {
    pub fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()), idle_signal: Condvar::new() }
    }

    /// Registers a pending task. Returns `None` if a task with the same hash is already
    /// pending, in which case this one runs once the former ends. Expected to be called
    /// by the single worker receiving tasks.
    pub fn register(&self, task: Subblock, result_transmitter: SubblockResultSender) -> Option<TaskId> {
        let mut pending = self.pending.lock();
        let hash = task.hash();
        match pending.entry(hash) {
            Vacant(e) => {
                e.insert(SubblockTaskGroup::new(SubblockTaskInternal::new(task, result_transmitter)));
                Some(hash)
            }
            Occupied(mut e) => {
                e.get_mut().tasks.push_back(SubblockTaskInternal::new(task, result_transmitter));
                None
            }
        }
    }

    /// Takes the task registered under `hash` for processing. If its parent is pending,
    /// the task is queued as a dependency of the parent and `None` is returned.
    pub fn try_begin(&self, hash: TaskId) -> Option<Subblock> {
        let mut pending = self.pending.lock();
        let parent = pending.get(&hash)?.tasks.front()?.task.as_ref()?.parent();
        if parent != hash
            && let Some(parent_group) = pending.get_mut(&parent)
        {
            parent_group.dependent_tasks.push(hash);
            return None;
        }
        pending.get_mut(&hash)?.tasks.front_mut()?.task.take()
    }

    /// Reports the completion of a task. The `callback` receives the task and its result
    /// transmitter under the internal lock, which keeps dependents ordered after it.
    /// Returns the tasks which should now be queued.
    pub fn end<F>(&self, task: Subblock, callback: F) -> Vec<TaskId>
    where
        F: FnOnce(Subblock, SubblockResultSender),
    {
        let hash = task.hash();
        let mut pending = self.pending.lock();

        let Occupied(mut entry) = pending.entry(hash) else { return Vec::new() };
        let Some(internal_task) = entry.get_mut().tasks.pop_front() else { return Vec::new() };
        debug_assert!(internal_task.task.is_none());

        // A non-empty group requeues itself, otherwise its dependents are released
        let next_tasks = if entry.get().tasks.is_empty() { entry.remove().dependent_tasks } else { vec![hash] };

        callback(task, internal_task.result_transmitter);

        if pending.is_empty() {
            self.idle_signal.notify_all();
        }

        next_tasks
    }

    /// Waits until all pending tasks are completed
    pub fn wait_for_idle(&self) {
        let mut pending = self.pending.lock();
        while !pending.is_empty() {
            self.idle_signal.wait(&mut pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_waits_for_pending_parent() {
        let manager = SubblockTaskDependencyManager::new();
        let parent = Subblock::from_precomputed_hash(1.into(), 100.into());
        let child = Subblock::from_precomputed_hash(2.into(), 1.into());
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();

        assert_eq!(manager.register(parent, tx1), Some(1.into()));
        assert_eq!(manager.register(child, tx2), Some(2.into()));

        assert!(manager.try_begin(2.into()).is_none());
        let task = manager.try_begin(1.into()).unwrap();
        let mut forwarded = Vec::new();
        let released = manager.end(task, |task, _| forwarded.push(task.hash()));
        assert_eq!(forwarded, vec![Hash::from(1u64)]);
        assert_eq!(released, vec![Hash::from(2u64)]);

        let task = manager.try_begin(2.into()).unwrap();
        assert!(manager.end(task, |_, _| {}).is_empty());
        manager.wait_for_idle();
    }

    #[test]
    fn test_same_hash_tasks_run_in_sequence() {
        let manager = SubblockTaskDependencyManager::new();
        let subblock = Subblock::from_precomputed_hash(7.into(), 100.into());
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert!(manager.register(subblock.clone(), tx1).is_some());
        assert!(manager.register(subblock, tx2).is_none());

        let task = manager.try_begin(7.into()).unwrap();
        assert_eq!(manager.end(task, |_, _| {}), vec![Hash::from(7u64)]);
        let task = manager.try_begin(7.into()).unwrap();
        assert!(manager.end(task, |_, _| {}).is_empty());
        manager.wait_for_idle();
    }
}
