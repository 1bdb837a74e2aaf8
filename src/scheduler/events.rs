//! Scheduler event notifications.
//!
//! The scheduler records run-level occurrences (thread termination, abnormal
//! lock releases, deadlock) in an append-only journal that the debugger
//! layer polls. The journal is a [`boxcar::Vec`], so producers append without
//! locking and consumers read concurrently with a simple cursor.

use std::fmt;

use crate::scheduler::bus::BusId;
use crate::scheduler::lock::LockId;
use crate::scheduler::thread::ThreadId;

/// What a blocked thread is blocked on, for deadlock and status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedOn {
    /// Contending for a lock.
    Lock(LockId),
    /// Parked in `wait_for` on a lock's condition.
    Condition(LockId),
    /// Waiting for a bus delivery.
    Bus(BusId),
    /// Suspended by the debugger.
    Debugger,
}

impl fmt::Display for BlockedOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockedOn::Lock(id) => write!(f, "acquire of {id}"),
            BlockedOn::Condition(id) => write!(f, "condition of {id}"),
            BlockedOn::Bus(id) => write!(f, "delivery on {id}"),
            BlockedOn::Debugger => write!(f, "debugger"),
        }
    }
}

/// One blocked thread in a deadlock report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedThread {
    /// Id of the blocked thread.
    pub thread: ThreadId,
    /// Name of the blocked thread.
    pub name: String,
    /// The resource it is blocked on.
    pub blocked_on: BlockedOn,
}

impl fmt::Display for BlockedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) blocked on {}",
            self.thread, self.name, self.blocked_on
        )
    }
}

/// A run-level occurrence recorded in the scheduler's event journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A thread reached `Terminated`. `abnormal` is set when the debugger
    /// stopped the thread rather than the thread finishing on its own.
    ThreadTerminated {
        /// The terminated thread.
        thread: ThreadId,
        /// Whether termination was forced by the debugger.
        abnormal: bool,
    },
    /// A lock was force-released because the debugger stopped its holder.
    AbnormalRelease {
        /// The lock that was force-released.
        lock: LockId,
        /// The stopped thread that held it.
        thread: ThreadId,
    },
    /// No thread can make progress and no bus delivery could unblock one.
    DeadlockDetected {
        /// Every blocked thread and what it is blocked on.
        blocked: Vec<BlockedThread>,
    },
}

/// Append-only journal of [`SchedulerEvent`]s for one run.
#[derive(Debug, Default)]
pub struct EventJournal {
    entries: boxcar::Vec<SchedulerEvent>,
}

impl EventJournal {
    pub(crate) fn new() -> Self {
        EventJournal::default()
    }

    pub(crate) fn record(&self, event: SchedulerEvent) {
        self.entries.push(event);
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Whether no event has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.count() == 0
    }

    /// Events recorded at or after `cursor`, cloned out in order. Callers
    /// keep their own cursor (the previous [`EventJournal::len`]) to consume
    /// the journal incrementally.
    #[must_use]
    pub fn since(&self, cursor: usize) -> Vec<SchedulerEvent> {
        self.entries
            .iter()
            .filter(|(index, _)| *index >= cursor)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_preserves_order_and_cursor_semantics() {
        let journal = EventJournal::new();
        journal.record(SchedulerEvent::ThreadTerminated {
            thread: ThreadId(1),
            abnormal: false,
        });
        journal.record(SchedulerEvent::ThreadTerminated {
            thread: ThreadId(2),
            abnormal: true,
        });
        assert_eq!(journal.len(), 2);
        let tail = journal.since(1);
        assert_eq!(
            tail,
            vec![SchedulerEvent::ThreadTerminated {
                thread: ThreadId(2),
                abnormal: true,
            }]
        );
        assert!(journal.since(2).is_empty());
    }

    #[test]
    fn blocked_thread_display_names_the_resource() {
        let entry = BlockedThread {
            thread: ThreadId(4),
            name: "consumer".to_string(),
            blocked_on: BlockedOn::Lock(LockId(2)),
        };
        assert_eq!(entry.to_string(), "thread-4 (consumer) blocked on acquire of lock-2");
    }
}
