//! # virtime Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types from the virtime library. Import it to get quick access to the
//! essentials for building and driving a scheduler.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all virtime operations
pub use crate::Error;

/// The result type used throughout virtime
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The per-run coordination context
pub use crate::scheduler::Scheduler;

/// Declarative topology description and scheduler construction
pub use crate::scheduler::SchedulerBuilder;

// ================================================================================================
// Scheduling Vocabulary
// ================================================================================================

/// Result of one dispatch step
pub use crate::scheduler::DispatchOutcome;

/// Whether a blocking operation completed immediately or parked the thread
pub use crate::scheduler::Progress;

/// Thread, lock, CPU and bus identifiers
pub use crate::scheduler::{BusId, CpuId, LockId, ThreadId};

/// Thread run states and priorities
pub use crate::scheduler::{Priority, RunState};

/// Virtual time instants and durations
pub use crate::scheduler::{VirtualDuration, VirtualTime};

/// Bus latency models
pub use crate::scheduler::LatencyModel;

/// Run-level event notifications
pub use crate::scheduler::{BlockedOn, BlockedThread, SchedulerEvent};

// ================================================================================================
// Debugger Surface
// ================================================================================================

/// Catchpoint registration and identification
pub use crate::debugger::{CatchpointId, LocationKind};

/// Read-only thread snapshots for listings and conditions
pub use crate::debugger::ThreadInfo;
