//! Debugger-facing surface of the scheduling core.
//!
//! An external debugger drives execution through methods on
//! [`Scheduler`](crate::scheduler::Scheduler) (`suspend_at`, `resume`,
//! `step`, `stop`, `list_threads`) while this module provides the supporting
//! types: [`Catchpoint`]s describing where execution should pause,
//! [`CatchpointSet`] holding the active ones, and [`ThreadInfo`] snapshots for
//! thread listings and catchpoint conditions.
//!
//! # Suspension model
//!
//! The interpreter calls
//! [`Scheduler::breakpoint_check`](crate::scheduler::Scheduler::breakpoint_check)
//! at every statement and expression boundary. If a registered catchpoint
//! matches (and its condition, when present, evaluates to true for the
//! pausing thread), the thread moves from `Running` to `Suspended` and stays
//! there until an explicit `resume`, `step` or `stop` command.
//!
//! A suspended thread keeps every lock it holds. Threads contending for such
//! a lock simply remain `Locking`; suspension never implicitly releases a
//! resource. The only lock-forcing path is `stop`, which reports each forced
//! release as abnormal before terminating the thread.

mod catchpoint;

pub use catchpoint::{BreakCondition, Catchpoint, CatchpointId, CatchpointSet, LocationKind};

use std::fmt;

use crate::scheduler::{CpuId, Priority, RunState, ThreadId, VirtualTime};

/// Read-only snapshot of one thread, as returned by
/// [`Scheduler::list_threads`](crate::scheduler::Scheduler::list_threads)
/// and passed to catchpoint conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    /// Unique id of the thread.
    pub id: ThreadId,
    /// Human-readable name.
    pub name: String,
    /// Run state at snapshot time.
    pub state: RunState,
    /// The CPU the thread is bound to.
    pub cpu: CpuId,
    /// Scheduling priority.
    pub priority: Priority,
    /// Local elapsed virtual time at snapshot time.
    pub virtual_time: VirtualTime,
}

impl fmt::Display for ThreadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) [{}] on {} at {}",
            self.id, self.name, self.state, self.cpu, self.virtual_time
        )
    }
}
