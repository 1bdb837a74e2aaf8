//! Catchpoints: where and when the debugger wants execution paused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use strum::{Display, EnumIter};

use crate::debugger::ThreadInfo;

/// The kind of source location a catchpoint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum LocationKind {
    /// A statement boundary.
    Statement,
    /// An expression boundary.
    Expression,
}

/// Identifier of a registered [`Catchpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatchpointId(u64);

impl CatchpointId {
    /// Raw numeric value of the id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CatchpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catchpoint-{}", self.0)
    }
}

/// A condition evaluated against the pausing thread's snapshot.
///
/// The debug-adapter layer compiles the user's condition expression into one
/// of these; the scheduling core only cares whether it holds.
pub type BreakCondition = Box<dyn Fn(&ThreadInfo) -> bool + Send + Sync>;

/// One registered suspension request: pause any thread reaching a boundary
/// of `kind` for which `condition` (if any) holds.
pub struct Catchpoint {
    id: CatchpointId,
    kind: LocationKind,
    condition: Option<BreakCondition>,
}

impl Catchpoint {
    /// Identifier assigned at registration.
    #[must_use]
    pub fn id(&self) -> CatchpointId {
        self.id
    }

    /// The boundary kind this catchpoint applies to.
    #[must_use]
    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// Whether this catchpoint fires for `thread` at a `kind` boundary.
    #[must_use]
    pub fn matches(&self, kind: LocationKind, thread: &ThreadInfo) -> bool {
        self.kind == kind
            && self
                .condition
                .as_ref()
                .map_or(true, |condition| condition(thread))
    }
}

impl fmt::Debug for Catchpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catchpoint")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}

/// The set of catchpoints currently active for a run.
#[derive(Debug, Default)]
pub struct CatchpointSet {
    entries: DashMap<CatchpointId, Catchpoint>,
    next_id: AtomicU64,
}

impl CatchpointSet {
    pub(crate) fn new() -> Self {
        CatchpointSet::default()
    }

    /// Registers a catchpoint and returns its id.
    pub(crate) fn add(
        &self,
        kind: LocationKind,
        condition: Option<BreakCondition>,
    ) -> CatchpointId {
        let id = CatchpointId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            id,
            Catchpoint {
                id,
                kind,
                condition,
            },
        );
        id
    }

    /// Removes a catchpoint. Returns `false` if the id was unknown.
    pub(crate) fn remove(&self, id: CatchpointId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Whether any registered catchpoint fires for `thread` at a `kind`
    /// boundary.
    #[must_use]
    pub fn matches(&self, kind: LocationKind, thread: &ThreadInfo) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.value().matches(kind, thread))
    }

    /// Number of registered catchpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no catchpoint is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{CpuId, Priority, RunState, ThreadId, VirtualTime};

    fn info(name: &str) -> ThreadInfo {
        ThreadInfo {
            id: ThreadId(1),
            name: name.to_string(),
            state: RunState::Running,
            cpu: CpuId(0),
            priority: Priority::NORMAL,
            virtual_time: VirtualTime::ZERO,
        }
    }

    #[test]
    fn unconditional_catchpoint_matches_its_kind_only() {
        let set = CatchpointSet::new();
        set.add(LocationKind::Statement, None);
        assert!(set.matches(LocationKind::Statement, &info("t")));
        assert!(!set.matches(LocationKind::Expression, &info("t")));
    }

    #[test]
    fn condition_gates_the_match() {
        let set = CatchpointSet::new();
        set.add(
            LocationKind::Statement,
            Some(Box::new(|thread| thread.name == "worker")),
        );
        assert!(set.matches(LocationKind::Statement, &info("worker")));
        assert!(!set.matches(LocationKind::Statement, &info("other")));
    }

    #[test]
    fn removal_deactivates_the_catchpoint() {
        let set = CatchpointSet::new();
        let id = set.add(LocationKind::Expression, None);
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(!set.matches(LocationKind::Expression, &info("t")));
    }
}
