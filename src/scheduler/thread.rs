//! Logical threads and their run-state machine.
//!
//! A [`LogicalThread`] is the unit of scheduling: one independent strand of
//! specification execution, bound to a single [`VirtualCpu`](super::VirtualCpu)
//! for its whole life. The interpreter only ever holds a shared reference to a
//! thread and reads from it; every state transition goes through the
//! [`Scheduler`](super::Scheduler) or the lock primitives, never through the
//! interpreter directly.
//!
//! # State machine
//!
//! ```text
//! Created -> Runnable -> Running -> {Locking, Waiting, Timestep, Suspended}
//!                ^                                  |
//!                +----------------------------------+
//!                            ... -> Terminated
//! ```
//!
//! - `Created`: registered, not yet eligible to run.
//! - `Runnable`: eligible, waiting for its CPU to dispatch it.
//! - `Running`: currently executing interpreter code; at most one per CPU.
//! - `Locking`: blocked acquiring a [`ResourceLock`](super::ResourceLock).
//! - `Waiting`: blocked on a condition signal or a pending bus delivery.
//! - `Timestep`: voluntarily yielded for a fixed virtual duration.
//! - `Suspended`: halted by the debugger; resumes only on an explicit command.
//! - `Terminated`: finished; the id stays valid for reporting but the thread
//!   is never dispatched again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use strum::{Display, EnumIter};

use crate::scheduler::bus::BusId;
use crate::scheduler::cpu::CpuId;
use crate::scheduler::lock::LockId;
use crate::scheduler::time::VirtualTime;

/// Unique identifier of a [`LogicalThread`].
///
/// Ids are allocated sequentially by the scheduler, so the numeric order of
/// two ids is also their creation order. The scheduler uses that as the
/// deterministic tie-break between runnable threads of equal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub(crate) u64);

impl ThreadId {
    /// Raw numeric value of the id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

/// Scheduling priority of a thread. Higher values run first among runnable
/// threads at the same virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// The default priority given to threads that do not ask for one.
    pub const NORMAL: Priority = Priority(0);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run state of a [`LogicalThread`]. See the module docs for the transition
/// diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RunState {
    /// Registered with the scheduler, not yet started.
    Created,
    /// Eligible to run, queued on its CPU.
    Runnable,
    /// Currently holds its CPU's execution slot.
    Running,
    /// Blocked trying to acquire a lock.
    Locking,
    /// Blocked on a condition signal or a bus delivery.
    Waiting,
    /// Voluntarily yielded for a fixed virtual duration.
    Timestep,
    /// Halted by the debugger.
    Suspended,
    /// Finished; never dispatched again.
    Terminated,
}

impl RunState {
    /// Whether the thread is blocked on something another party must resolve
    /// (a lock, a signal, a bus delivery or the debugger).
    #[must_use]
    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            RunState::Locking | RunState::Waiting | RunState::Suspended
        )
    }

    /// Whether the thread can still make progress in this run.
    #[must_use]
    pub fn is_live(self) -> bool {
        self != RunState::Terminated
    }
}

/// What a blocked thread is waiting for. Used to resume the thread with the
/// right continuation and to name the blocking resource in deadlock reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wakeup {
    /// Blocked in `acquire` on a contended lock.
    AcquireLock(LockId),
    /// Signalled out of `wait_for`; must re-acquire the lock before running.
    ReacquireLock(LockId),
    /// Parked in `wait_for`, waiting for a signal on the lock's condition.
    ConditionSignal(LockId),
    /// Waiting for a cross-CPU bus delivery to mature.
    BusDelivery { bus: BusId, due: VirtualTime },
    /// In an explicit timestep until the CPU clock reaches `due`.
    TimestepDone { due: VirtualTime },
}

/// Mutable part of a thread, guarded by one mutex so that a state and its
/// wakeup reason are always observed together.
#[derive(Debug)]
struct ThreadState {
    run_state: RunState,
    wakeup: Option<Wakeup>,
    /// Debugger single-step flag: suspend again at the next boundary.
    step_pending: bool,
}

/// One independent strand of specification execution.
///
/// Threads are created through
/// [`Scheduler::create_thread`](super::Scheduler::create_thread) and owned by
/// the scheduler's registry; the interpreter and the debugger only hold
/// `Arc<LogicalThread>` references and use the read-only accessors here.
#[derive(Debug)]
pub struct LogicalThread {
    id: ThreadId,
    name: String,
    priority: Priority,
    cpu: CpuId,
    state: Mutex<ThreadState>,
    /// Local elapsed virtual time; only ever advanced, never rewound.
    virtual_time: AtomicU64,
    /// Whether this thread currently holds its CPU's execution slot.
    swapped_in: AtomicBool,
}

impl LogicalThread {
    pub(crate) fn new(id: ThreadId, name: String, priority: Priority, cpu: CpuId) -> Self {
        LogicalThread {
            id,
            name,
            priority,
            cpu,
            state: Mutex::new(ThreadState {
                run_state: RunState::Created,
                wakeup: None,
                step_pending: false,
            }),
            virtual_time: AtomicU64::new(0),
            swapped_in: AtomicBool::new(false),
        }
    }

    /// Unique id of this thread.
    #[must_use]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Human-readable name given at creation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scheduling priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// The CPU this thread is bound to. Fixed at creation.
    #[must_use]
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    /// Current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.state.lock().unwrap().run_state
    }

    /// The thread's local notion of elapsed virtual time.
    #[must_use]
    pub fn virtual_time(&self) -> VirtualTime {
        VirtualTime::new(self.virtual_time.load(Ordering::Acquire))
    }

    /// Whether the thread currently holds its CPU's execution slot.
    #[must_use]
    pub fn swapped_in(&self) -> bool {
        self.swapped_in.load(Ordering::Acquire)
    }

    /// Advances local virtual time to `instant` if it is later than the
    /// current value. Monotone by construction.
    pub(crate) fn advance_time_to(&self, instant: VirtualTime) {
        self.virtual_time
            .fetch_max(instant.as_units(), Ordering::AcqRel);
    }

    pub(crate) fn set_swapped_in(&self, value: bool) {
        self.swapped_in.store(value, Ordering::Release);
    }

    pub(crate) fn wakeup(&self) -> Option<Wakeup> {
        self.state.lock().unwrap().wakeup
    }

    /// Moves the thread into `state` with an optional wakeup record,
    /// returning the previous state.
    pub(crate) fn transition(&self, state: RunState, wakeup: Option<Wakeup>) -> RunState {
        let mut guard = self.state.lock().unwrap();
        let previous = guard.run_state;
        guard.run_state = state;
        guard.wakeup = wakeup;
        previous
    }

    /// Moves the thread into `state` only if it is currently in `expected`.
    /// Returns `true` on success.
    pub(crate) fn transition_from(
        &self,
        expected: RunState,
        state: RunState,
        wakeup: Option<Wakeup>,
    ) -> bool {
        let mut guard = self.state.lock().unwrap();
        if guard.run_state != expected {
            return false;
        }
        guard.run_state = state;
        guard.wakeup = wakeup;
        true
    }

    pub(crate) fn set_step_pending(&self, value: bool) {
        self.state.lock().unwrap().step_pending = value;
    }

    pub(crate) fn take_step_pending(&self) -> bool {
        let mut guard = self.state.lock().unwrap();
        std::mem::replace(&mut guard.step_pending, false)
    }
}
