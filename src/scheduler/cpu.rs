//! Virtual CPUs: scheduling domains with local clocks.
//!
//! A [`VirtualCpu`] owns a queue of runnable threads and a monotone virtual
//! clock. It enforces the one-`Running`-thread-at-a-time rule for its domain
//! and provides the deterministic pop order the dispatch loop relies on:
//! highest priority first, creation order as the tie-break.
//!
//! Time-slicing is cooperative. The current thread keeps the execution slot
//! until it blocks, terminates or reaches an explicit yield point; the CPU
//! never preempts it mid-statement.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::scheduler::thread::{Priority, ThreadId};
use crate::scheduler::time::VirtualTime;

/// Identifier of a [`VirtualCpu`] within one scheduler topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(pub(crate) u32);

impl CpuId {
    /// Raw numeric value of the id.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu-{}", self.0)
    }
}

/// A run-queue entry. Carries the ordering keys so the queue never has to
/// reach back into the thread registry.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    thread: ThreadId,
    priority: Priority,
}

#[derive(Debug, Default)]
struct CpuState {
    run_queue: Vec<QueueEntry>,
    current: Option<ThreadId>,
}

/// One scheduling domain: a virtual processor with its own clock and run
/// queue.
#[derive(Debug)]
pub struct VirtualCpu {
    id: CpuId,
    name: String,
    clock: AtomicU64,
    state: Mutex<CpuState>,
}

impl VirtualCpu {
    pub(crate) fn new(id: CpuId, name: String) -> Self {
        VirtualCpu {
            id,
            name,
            clock: AtomicU64::new(0),
            state: Mutex::new(CpuState::default()),
        }
    }

    /// Identifier of this CPU.
    #[must_use]
    pub fn id(&self) -> CpuId {
        self.id
    }

    /// Name given in the deployment description.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value of this CPU's local clock.
    #[must_use]
    pub fn clock(&self) -> VirtualTime {
        VirtualTime::new(self.clock.load(Ordering::Acquire))
    }

    /// The thread presently swapped in on this CPU, if any.
    #[must_use]
    pub fn current(&self) -> Option<ThreadId> {
        self.state.lock().unwrap().current
    }

    /// Number of threads queued as runnable on this CPU.
    #[must_use]
    pub fn runnable_count(&self) -> usize {
        self.state.lock().unwrap().run_queue.len()
    }

    /// Advances the local clock to `instant` if it is later. The clock never
    /// moves backwards.
    pub(crate) fn advance_clock_to(&self, instant: VirtualTime) {
        self.clock.fetch_max(instant.as_units(), Ordering::AcqRel);
    }

    /// Adds `thread` to the run queue. Duplicate enqueues are ignored.
    pub(crate) fn enqueue(&self, thread: ThreadId, priority: Priority) {
        let mut state = self.state.lock().unwrap();
        if state.run_queue.iter().any(|e| e.thread == thread) {
            return;
        }
        state.run_queue.push(QueueEntry { thread, priority });
    }

    /// Removes `thread` from the run queue if queued.
    pub(crate) fn dequeue(&self, thread: ThreadId) {
        let mut state = self.state.lock().unwrap();
        state.run_queue.retain(|e| e.thread != thread);
    }

    /// Pops the best runnable thread: highest priority, then earliest
    /// creation (smallest id). Returns `None` if the queue is empty.
    pub(crate) fn pop_best(&self) -> Option<ThreadId> {
        let mut state = self.state.lock().unwrap();
        let best = state
            .run_queue
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| (e.priority, std::cmp::Reverse(e.thread)))?
            .0;
        Some(state.run_queue.swap_remove(best).thread)
    }

    /// Installs `thread` as the current thread of this CPU. Panics in debug
    /// builds if another thread still holds the slot; the dispatch loop must
    /// clear it first.
    pub(crate) fn swap_in(&self, thread: ThreadId) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(
            state.current.is_none() || state.current == Some(thread),
            "execution slot already taken on {}",
            self.id
        );
        state.current = Some(thread);
    }

    /// Clears the execution slot if `thread` holds it.
    pub(crate) fn swap_out(&self, thread: ThreadId) {
        let mut state = self.state.lock().unwrap();
        if state.current == Some(thread) {
            state.current = None;
        }
    }
}
