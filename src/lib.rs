// Copyright 2026 The virtime contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # virtime
//!
//! A deterministic virtual-time scheduler for executing real-time formal
//! specifications. `virtime` is the concurrency-coordination core of a
//! specification execution engine: it models logical threads running on
//! virtual CPUs, communicating over virtual buses with modeled latency,
//! contending for exclusive resources and advancing a shared virtual clock,
//! deterministically enough for interactive debugging and reproducible
//! verification runs.
//!
//! ## Features
//!
//! - **Cooperative logical threads**: an explicit run-state machine with
//!   yield points at lock operations, time advances, bus crossings and
//!   debugger boundaries; no preemption mid-statement
//! - **Virtual time**: per-CPU monotone clocks decoupled from wall-clock
//!   time, advanced only by the dispatch step
//! - **Resource locks**: cooperative mutual exclusion with explicit waiter
//!   sets, re-entrancy and condition-variable wait/signal semantics
//! - **Modeled bus latency**: FIFO cross-CPU deliveries delayed by a pure
//!   latency function, keeping timings reproducible
//! - **Central deadlock detection**: a single consolidated report naming
//!   every blocked thread and its blocking resource
//! - **Debugger protocol**: catchpoints, suspend/resume/step/stop and
//!   thread listings that never corrupt scheduler invariants
//!
//! ## Quick Start
//!
//! ```rust
//! use virtime::prelude::*;
//!
//! let sched = SchedulerBuilder::single_cpu().build()?;
//! let cpu = sched.cpu_ids()[0];
//!
//! let worker = sched.create_thread(cpu, Priority::NORMAL, "worker")?;
//! sched.start(worker)?;
//!
//! let lock = sched.create_lock();
//! if let DispatchOutcome::Dispatched(id) = sched.dispatch_next()? {
//!     assert_eq!(id, worker);
//!     assert_eq!(sched.acquire(lock, worker)?, Progress::Completed);
//!     sched.release(lock, worker)?;
//!     sched.terminate(worker)?;
//! }
//! assert_eq!(sched.dispatch_next()?, DispatchOutcome::Quiescent);
//! # Ok::<(), virtime::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `virtime` is organized into two modules:
//!
//! - [`scheduler`]: the core: [`Scheduler`], [`scheduler::LogicalThread`],
//!   [`scheduler::ResourceLock`], [`scheduler::VirtualCpu`],
//!   [`scheduler::VirtualBus`] and the event journal
//! - [`debugger`]: the debugger-facing surface: catchpoints, thread
//!   snapshots and the suspend/resume protocol types
//!
//! The expression/statement interpreter, the type checker and the DAP/LSP
//! front ends are external collaborators: they call into the scheduler at
//! well-defined points and hold only read-only references to its state.
//!
//! ## Determinism
//!
//! For a given topology and sequence of interpreter calls, every dispatch
//! decision is reproducible: CPUs dispatch in clock order (smallest id on
//! ties), runnable threads in (priority, creation-order) order, and bus
//! deliveries strictly FIFO per bus. Lock hand-off is intentionally *not*
//! FIFO (any eligible waiter may win after a release), but the winner is
//! still determined by the dispatch order, never by host-thread timing.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Locking-discipline
//! violations ([`Error::IllegalLockState`], [`Error::LockHeldAtExit`]) are
//! specification-level errors reported at the call site; deadlock
//! ([`Error::DeadlockDetected`]) is detected centrally and is fatal for the
//! run.

pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use virtime::prelude::*;
///
/// let sched = SchedulerBuilder::single_cpu().build()?;
/// assert_eq!(sched.global_clock(), VirtualTime::ZERO);
/// # Ok::<(), virtime::Error>(())
/// ```
pub mod prelude;

/// The scheduling and concurrency-coordination core.
///
/// Contains the [`Scheduler`] and everything it coordinates: logical
/// threads, resource locks, virtual CPUs, virtual buses and the run's event
/// journal. See the module docs for the execution model.
pub mod scheduler;

/// Debugger-facing types: catchpoints, thread snapshots and the
/// suspend/resume protocol surface.
pub mod debugger;

/// `virtime` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type
/// is always [`Error`]. Used consistently throughout the crate for all
/// fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `virtime` Error type
///
/// The main error type for all operations in this crate: locking-discipline
/// violations, deadlock reports, and invalid thread/CPU/bus/lock references.
pub use error::Error;

/// The per-run coordination context and its builder.
///
/// See [`scheduler::Scheduler`] for the full API surface.
pub use scheduler::{Scheduler, SchedulerBuilder};

/// Core scheduling vocabulary, re-exported at the crate root.
pub use scheduler::{
    BusId, CpuId, DispatchOutcome, LatencyModel, LockId, Priority, Progress, RunState,
    SchedulerEvent, ThreadId, VirtualDuration, VirtualTime,
};

/// Debugger vocabulary, re-exported at the crate root.
pub use debugger::{CatchpointId, LocationKind, ThreadInfo};
