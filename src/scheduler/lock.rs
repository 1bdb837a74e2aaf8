//! Cooperative mutual-exclusion locks with explicit waiter sets.
//!
//! A [`ResourceLock`] models a shared resource declared by the specification
//! under execution. It is *cooperative*: blocking never parks a host thread.
//! Instead, contention is recorded in the lock's waiter set and in the blocked
//! thread's run state, and the scheduler's dispatch loop re-runs the
//! contention once the lock is released or signalled.
//!
//! The `(holder, waiters)` pair lives behind one mutex, making every
//! "become a waiter, then block" sequence atomic with respect to a concurrent
//! `release` or `signal`. Without that single critical section a waiter could
//! register itself just after the wake-up scan and miss the wake-up entirely.
//!
//! Lock hand-off is deliberately *not* FIFO: a release wakes every waiter in
//! `Locking` mode and the dispatch order decides who re-acquires first. The
//! waiter set only answers "who must be woken", never "who wins".

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::scheduler::thread::ThreadId;

/// Unique identifier of a [`ResourceLock`] within one scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(pub(crate) u64);

impl LockId {
    /// Raw numeric value of the id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock-{}", self.0)
    }
}

/// Why a thread sits in a lock's waiter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitMode {
    /// Contending for the lock itself (`acquire` or the re-acquire phase of
    /// `wait_for`). Woken by `release` and by signals.
    Locking,
    /// Parked in `wait_for` until a condition signal. *Not* woken by a plain
    /// `release`; only `signal`/`signal_all` move these.
    Waiting,
}

#[derive(Debug, Default)]
struct LockState {
    holder: Option<ThreadId>,
    waiters: HashMap<ThreadId, WaitMode>,
}

/// A cooperative mutual-exclusion primitive with condition-variable
/// semantics layered on top.
///
/// Locks are created per run through
/// [`Scheduler::create_lock`](super::Scheduler::create_lock) and live in the
/// scheduler's lock registry. The methods here only mutate the lock's own
/// `(holder, waiters)` state; the corresponding thread-state transitions are
/// applied by the scheduler, which is the only caller.
#[derive(Debug)]
pub struct ResourceLock {
    id: LockId,
    state: Mutex<LockState>,
}

impl ResourceLock {
    pub(crate) fn new(id: LockId) -> Self {
        ResourceLock {
            id,
            state: Mutex::new(LockState::default()),
        }
    }

    /// Unique id of this lock.
    #[must_use]
    pub fn id(&self) -> LockId {
        self.id
    }

    /// The thread currently holding the lock, if any.
    #[must_use]
    pub fn holder(&self) -> Option<ThreadId> {
        self.state.lock().unwrap().holder
    }

    /// Ids of all threads currently registered as waiters, in unspecified
    /// order.
    #[must_use]
    pub fn waiters(&self) -> Vec<ThreadId> {
        self.state.lock().unwrap().waiters.keys().copied().collect()
    }

    /// Clears holder and waiters, returning the lock to its initial state.
    /// Used between debug/verification runs, never during one.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.holder = None;
        state.waiters.clear();
    }

    /// Attempts to take the lock for `thread`.
    ///
    /// Succeeds when the lock is free or already held by `thread`
    /// (re-entrant). On success the thread is removed from the waiter set; on
    /// failure it is registered as a `Locking` waiter. Both outcomes happen
    /// under the same critical section, so a concurrent release cannot slip
    /// between the failed attempt and the registration.
    pub(crate) fn try_acquire(&self, thread: ThreadId) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.holder {
            None => {
                state.holder = Some(thread);
                state.waiters.remove(&thread);
                true
            }
            Some(holder) if holder == thread => {
                state.waiters.remove(&thread);
                true
            }
            Some(_) => {
                state.waiters.insert(thread, WaitMode::Locking);
                false
            }
        }
    }

    /// Releases the lock held by `thread` and returns the waiters that were
    /// in `Locking` mode, all of which become eligible to race for the lock
    /// again. `Waiting` (condition) waiters are untouched. Releasing an
    /// unheld lock succeeds with nothing to wake.
    ///
    /// Returns `None` when *another* thread holds the lock; the state is
    /// left unchanged in that case and the caller reports the discipline
    /// violation.
    pub(crate) fn release(&self, thread: ThreadId) -> Option<Vec<ThreadId>> {
        let mut state = self.state.lock().unwrap();
        match state.holder {
            Some(holder) if holder != thread => None,
            _ => {
                state.holder = None;
                Some(Self::locking_waiters(&state))
            }
        }
    }

    /// First half of `wait_for`: releases the lock (caller must hold it),
    /// wakes `Locking` waiters and re-registers the caller as a `Waiting`
    /// waiter, all atomically.
    ///
    /// Returns `None` when `thread` does not hold the lock.
    pub(crate) fn release_and_wait(&self, thread: ThreadId) -> Option<Vec<ThreadId>> {
        let mut state = self.state.lock().unwrap();
        if state.holder != Some(thread) {
            return None;
        }
        state.holder = None;
        let woken = Self::locking_waiters(&state);
        state.waiters.insert(thread, WaitMode::Waiting);
        Some(woken)
    }

    /// Moves every current waiter, `Locking` and `Waiting` alike, into
    /// `Locking` mode and returns them. The caller makes them runnable; each
    /// will re-contend for the lock when dispatched.
    pub(crate) fn signal_all(&self) -> Vec<ThreadId> {
        let mut state = self.state.lock().unwrap();
        let woken: Vec<ThreadId> = state.waiters.keys().copied().collect();
        for mode in state.waiters.values_mut() {
            *mode = WaitMode::Locking;
        }
        woken
    }

    /// Force-releases the lock if `thread` holds it, returning the `Locking`
    /// waiters to wake. Used by the debugger's `stop` path; a normal release
    /// by a non-holder is an error, this is not.
    pub(crate) fn force_release(&self, thread: ThreadId) -> Option<Vec<ThreadId>> {
        let mut state = self.state.lock().unwrap();
        if state.holder != Some(thread) {
            return None;
        }
        state.holder = None;
        Some(Self::locking_waiters(&state))
    }

    /// Drops `thread` from the waiter set, whatever its mode. Part of the
    /// guaranteed-release discipline: a thread leaving a blocked state for
    /// any reason (grant, termination, debugger stop) must not linger as a
    /// waiter.
    pub(crate) fn remove_waiter(&self, thread: ThreadId) {
        self.state.lock().unwrap().waiters.remove(&thread);
    }

    /// Whether `thread` currently holds this lock.
    #[must_use]
    pub fn is_held_by(&self, thread: ThreadId) -> bool {
        self.state.lock().unwrap().holder == Some(thread)
    }

    fn locking_waiters(state: &LockState) -> Vec<ThreadId> {
        state
            .waiters
            .iter()
            .filter(|(_, mode)| **mode == WaitMode::Locking)
            .map(|(id, _)| *id)
            .collect()
    }
}
