use thiserror::Error;

use crate::scheduler::{BlockedThread, BusId, CpuId, LockId, RunState, ThreadId};

/// The generic Error type covering every failure this library can report.
///
/// Two of the variants surface programming errors in the *modeled*
/// specification, not in the host program: [`Error::IllegalLockState`] for
/// violations of the locking discipline and [`Error::LockHeldAtExit`] for a
/// thread that tries to terminate while still holding a resource. Both are
/// reported at the call site with the identity of the resource involved and
/// are never silently swallowed.
///
/// [`Error::DeadlockDetected`] is fatal for the current run and is raised by
/// the central dispatch loop, never by individual threads timing out. Its
/// display form is the single consolidated message naming every blocked
/// thread and its blocking resource.
#[derive(Error, Debug)]
pub enum Error {
    /// A lock was released while another thread holds it, or waited on by a
    /// thread that does not hold it.
    ///
    /// This is a locking-discipline violation in the modeled specification.
    /// The lock's state is unchanged when this is returned.
    #[error("Illegal lock state: {thread} called {operation} on {lock} without holding it")]
    IllegalLockState {
        /// The lock involved.
        lock: LockId,
        /// The offending thread.
        thread: ThreadId,
        /// The operation that was attempted (`release` or `wait_for`).
        operation: &'static str,
    },

    /// No thread can make progress and no pending bus delivery could unblock
    /// one. Fatal for the current run.
    #[error("Deadlock detected: {}", format_blocked(.blocked))]
    DeadlockDetected {
        /// Every blocked thread and the resource it is blocked on.
        blocked: Vec<BlockedThread>,
    },

    /// A thread attempted a normal termination while still holding at least
    /// one lock. Only the debugger's `stop` command may terminate a lock
    /// holder, and that path force-releases the locks first.
    #[error("{thread} terminated while holding {}", format_locks(.locks))]
    LockHeldAtExit {
        /// The offending thread.
        thread: ThreadId,
        /// Every lock it still holds.
        locks: Vec<LockId>,
    },

    /// An operation referenced a thread id that is unknown to the registry.
    /// Terminated threads remain known for reporting, so this means the id
    /// was never allocated by this scheduler.
    #[error("Unknown thread reference: {0}")]
    InvalidThreadReference(ThreadId),

    /// An operation referenced a CPU that is not part of the topology.
    #[error("Unknown CPU reference: {0}")]
    InvalidCpuReference(CpuId),

    /// An operation referenced a bus that is not part of the topology.
    #[error("Unknown bus reference: {0}")]
    InvalidBusReference(BusId),

    /// An operation referenced a lock id that was not created by this
    /// scheduler.
    #[error("Unknown lock reference: {0}")]
    InvalidLockReference(LockId),

    /// A scheduling operation was applied to a thread in the wrong state,
    /// e.g. `resume` on a thread that is not suspended or `acquire` on
    /// behalf of a thread that is not running.
    #[error("{thread} cannot {operation} while {state}")]
    IllegalTransition {
        /// The thread involved.
        thread: ThreadId,
        /// Its state at the time of the call.
        state: RunState,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A scheduler was built without any CPU. The deployment description
    /// must declare at least one.
    #[error("Topology has no CPUs")]
    EmptyTopology,
}

fn format_blocked(blocked: &[BlockedThread]) -> String {
    blocked
        .iter()
        .map(BlockedThread::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_locks(locks: &[LockId]) -> String {
    locks
        .iter()
        .map(LockId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::BlockedOn;

    #[test]
    fn deadlock_display_is_a_single_consolidated_message() {
        let err = Error::DeadlockDetected {
            blocked: vec![
                BlockedThread {
                    thread: ThreadId(1),
                    name: "producer".to_string(),
                    blocked_on: BlockedOn::Lock(LockId(0)),
                },
                BlockedThread {
                    thread: ThreadId(2),
                    name: "consumer".to_string(),
                    blocked_on: BlockedOn::Condition(LockId(0)),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("thread-1 (producer) blocked on acquire of lock-0"));
        assert!(message.contains("thread-2 (consumer) blocked on condition of lock-0"));
    }

    #[test]
    fn lock_held_at_exit_names_every_lock() {
        let err = Error::LockHeldAtExit {
            thread: ThreadId(3),
            locks: vec![LockId(0), LockId(4)],
        };
        assert_eq!(
            err.to_string(),
            "thread-3 terminated while holding lock-0, lock-4"
        );
    }
}
