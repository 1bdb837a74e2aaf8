//! The scheduling and concurrency-coordination core.
//!
//! This module implements the execution model for the real-time dialect of
//! the specification language: logical threads running on virtual CPUs,
//! communicating over virtual buses with modeled latency, contending for
//! exclusive resources and advancing a shared virtual clock.
//!
//! # Key Components
//!
//! - [`Scheduler`] / [`SchedulerBuilder`]: the per-run coordination context
//!   holding topology, thread and lock registries, the dispatch loop and
//!   deadlock detection.
//! - [`LogicalThread`]: one strand of specification execution with an
//!   explicit [`RunState`] machine.
//! - [`ResourceLock`]: cooperative mutual exclusion with an explicit waiter
//!   set and condition-variable semantics.
//! - [`VirtualCpu`]: a scheduling domain with a run queue and a local
//!   monotone clock.
//! - [`VirtualBus`]: modeled inter-CPU latency with FIFO delivery.
//! - [`EventJournal`] / [`SchedulerEvent`]: run-level notifications for the
//!   debugger layer.
//!
//! # Execution model
//!
//! Scheduling is cooperative: a thread keeps its CPU until it reaches a
//! defined yield point (a lock operation, an explicit time advance, a bus
//! crossing, a debugger boundary or a voluntary yield). Statement execution
//! within one thread is therefore atomic with respect to other threads on
//! the same CPU. Across CPUs, threads execute independently except where
//! locks or buses synchronize them.
//!
//! Virtual time is decoupled from wall-clock time and advances only inside
//! the dispatch step. Each CPU clock is monotone, and the global clock (the
//! minimum over CPUs still doing work) never decreases either.

mod bus;
mod core;
mod cpu;
mod events;
mod lock;
mod thread;
mod time;

pub use bus::{BusId, LatencyModel, VirtualBus};
pub use self::core::{DispatchOutcome, Progress, Scheduler, SchedulerBuilder};
pub use cpu::{CpuId, VirtualCpu};
pub use events::{BlockedOn, BlockedThread, EventJournal, SchedulerEvent};
pub use lock::{LockId, ResourceLock};
pub use thread::{LogicalThread, Priority, RunState, ThreadId};
pub use time::{VirtualDuration, VirtualTime};
