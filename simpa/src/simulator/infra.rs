use rand::{Rng, rngs::StdRng};
use std::collections::{BTreeMap, BinaryHeap};

struct Event<T> {
    timestamp: u64,
    // Insertion order, keeps same-time events deterministic
    seq: u64,
    dest: u64,
    msg: Option<T>,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversing so that min timestamp is scheduled first
        other.timestamp.cmp(&self.timestamp).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// What a process gets woken up with
pub enum Resumption<T> {
    Initial,
    /// A timeout the process asked for has elapsed
    Scheduled,
    Message(T),
}

/// What a process asks for once it is done with a resumption
pub enum Suspension {
    /// Wake up again after the given number of milliseconds
    Timeout(u64),
    /// Wake up only on incoming messages
    Idle,
    /// Never wake up again
    Halt,
}

pub trait Process<T> {
    fn resume(&mut self, resumption: Resumption<T>, env: &mut Environment<T>) -> Suspension;
}

pub struct Environment<T> {
    time: u64,
    seq: u64,
    max_delay: u64,
    /// Destinations reached by broadcasts
    broadcast_group: Vec<u64>,
    scheduler: BinaryHeap<Event<T>>,
    rng: StdRng,
}

impl<T: Clone> Environment<T> {
    fn new(max_delay: u64, rng: StdRng) -> Self {
        Self { time: 0, seq: 0, max_delay, broadcast_group: Vec::new(), scheduler: BinaryHeap::new(), rng }
    }

    pub fn now(&self) -> u64 {
        self.time
    }

    pub fn send(&mut self, delay: u64, dest: u64, msg: T) {
        self.push(self.time + delay, dest, Some(msg));
    }

    /// Sends `msg` to every member of the broadcast group other than `sender`, each
    /// copy with its own uniformly sampled delay
    pub fn broadcast(&mut self, sender: u64, msg: T) {
        for dest in self.broadcast_group.clone() {
            if dest == sender {
                continue;
            }
            let delay = self.rng.gen_range(0..=self.max_delay);
            self.send(delay, dest, msg.clone());
        }
    }

    fn timeout(&mut self, timeout: u64, dest: u64) {
        self.push(self.time + timeout, dest, None);
    }

    fn push(&mut self, timestamp: u64, dest: u64, msg: Option<T>) {
        self.seq += 1;
        self.scheduler.push(Event { timestamp, seq: self.seq, dest, msg });
    }
}

/// A discrete event simulation over processes exchanging messages of type `T`.
/// Time advances only through the event queue.
pub struct Simulation<T> {
    env: Environment<T>,
    processes: BTreeMap<u64, Box<dyn Process<T>>>,
}

impl<T: Clone> Simulation<T> {
    pub fn new(max_delay: u64, rng: StdRng) -> Self {
        Self { env: Environment::new(max_delay, rng), processes: BTreeMap::new() }
    }

    pub fn register(&mut self, id: u64, process: Box<dyn Process<T>>) {
        self.processes.insert(id, process);
    }

    /// Adds `id` to the receivers of broadcasts
    pub fn join_broadcast_group(&mut self, id: u64) {
        self.env.broadcast_group.push(id);
    }

    /// Runs until simulated time `until`. Timeouts due later are dropped while
    /// messages keep being delivered, so that in-flight traffic drains.
    pub fn run(&mut self, until: u64) {
        let ids: Vec<u64> = self.processes.keys().copied().collect();
        for id in ids {
            self.step(id, Resumption::Initial);
        }

        while let Some(event) = self.env.scheduler.pop() {
            if event.msg.is_none() && event.timestamp > until {
                continue;
            }
            self.env.time = event.timestamp;
            let resumption = match event.msg {
                Some(msg) => Resumption::Message(msg),
                None => Resumption::Scheduled,
            };
            self.step(event.dest, resumption);
        }
    }

    fn step(&mut self, id: u64, resumption: Resumption<T>) {
        let Some(process) = self.processes.get_mut(&id) else { return };
        match process.resume(resumption, &mut self.env) {
            Suspension::Timeout(timeout) => self.env.timeout(timeout, id),
            Suspension::Idle => {}
            Suspension::Halt => {
                self.processes.remove(&id);
            }
        }
    }
}
