//! The process-wide scheduler: topology, registries and the dispatch loop.
//!
//! A [`Scheduler`] is the coordination context for exactly one debug or
//! verification run. It owns the fixed CPU/bus topology, the thread and lock
//! registries, the event journal and the active catchpoints. Construct one
//! with [`SchedulerBuilder`] at run start and drop it at run end; nothing
//! persists across runs.
//!
//! # Control flow
//!
//! The interpreter executes one thread at a time per CPU and calls into the
//! scheduler at the defined yield points: thread creation and termination,
//! lock operations, explicit time advances, bus crossings and debugger
//! boundaries. Operations that block return [`Progress::Blocked`]; the
//! interpreter then asks [`Scheduler::dispatch_next`] which thread to execute
//! next:
//!
//! ```rust
//! use virtime::{DispatchOutcome, Priority, SchedulerBuilder};
//!
//! let sched = SchedulerBuilder::single_cpu().build()?;
//! let cpu = sched.cpu_ids()[0];
//! let worker = sched.create_thread(cpu, Priority::NORMAL, "worker")?;
//! sched.start(worker)?;
//!
//! match sched.dispatch_next()? {
//!     DispatchOutcome::Dispatched(id) => assert_eq!(id, worker),
//!     other => panic!("expected a dispatch, got {other:?}"),
//! }
//! # Ok::<(), virtime::Error>(())
//! ```
//!
//! # Determinism
//!
//! Dispatch is fully deterministic for a given sequence of interpreter
//! calls: the CPU with the smallest clock dispatches first (smallest id on a
//! tie), and within a CPU the runnable thread with the highest priority and
//! earliest creation runs first. Virtual time advances only inside the
//! dispatch step, never behind the scheduler's back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use log::{debug, trace, warn};

use crate::debugger::{BreakCondition, CatchpointId, CatchpointSet, LocationKind, ThreadInfo};
use crate::scheduler::bus::{BusId, LatencyModel, VirtualBus};
use crate::scheduler::cpu::{CpuId, VirtualCpu};
use crate::scheduler::events::{BlockedOn, BlockedThread, EventJournal, SchedulerEvent};
use crate::scheduler::lock::{LockId, ResourceLock};
use crate::scheduler::thread::{LogicalThread, Priority, RunState, ThreadId, Wakeup};
use crate::scheduler::time::{VirtualDuration, VirtualTime};
use crate::{Error, Result};

/// Whether a blocking operation completed immediately or parked the thread.
///
/// [`Progress::Blocked`] means the calling thread gave up its execution slot;
/// the interpreter must stop driving it and consult
/// [`Scheduler::dispatch_next`] for the next thread to run. The blocked
/// operation completes transparently when the thread is next dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The operation finished; the thread is still `Running`.
    Completed,
    /// The thread blocked and released its CPU slot.
    Blocked,
}

/// Result of one [`Scheduler::dispatch_next`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// `thread` now holds its CPU's execution slot and is `Running`; the
    /// interpreter should execute it until its next yield point.
    Dispatched(ThreadId),
    /// Only debugger-suspended threads could still make progress. Not a
    /// deadlock: an explicit resume/step/stop is awaited.
    AllSuspended,
    /// Every thread has terminated (or was never started); the run is
    /// complete.
    Quiescent,
}

/// Declarative description of a run's topology, from the specification's
/// deployment section.
///
/// ```rust
/// use virtime::{LatencyModel, SchedulerBuilder, VirtualDuration};
///
/// let mut builder = SchedulerBuilder::new();
/// let client = builder.cpu("client");
/// let server = builder.cpu("server");
/// builder.bus(client, server, LatencyModel::Fixed(VirtualDuration::new(10)));
/// let sched = builder.build()?;
/// assert_eq!(sched.cpu_ids().len(), 2);
/// # Ok::<(), virtime::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SchedulerBuilder {
    cpus: Vec<String>,
    buses: Vec<(CpuId, CpuId, LatencyModel)>,
}

impl SchedulerBuilder {
    /// Starts an empty topology.
    #[must_use]
    pub fn new() -> Self {
        SchedulerBuilder::default()
    }

    /// Convenience topology: one CPU named `vcpu0`, no buses. Matches the
    /// implicit deployment of specifications without a deployment section.
    #[must_use]
    pub fn single_cpu() -> Self {
        let mut builder = SchedulerBuilder::new();
        builder.cpu("vcpu0");
        builder
    }

    /// Declares a CPU and returns its id.
    pub fn cpu(&mut self, name: impl Into<String>) -> CpuId {
        let id = CpuId(u32::try_from(self.cpus.len()).unwrap_or(u32::MAX));
        self.cpus.push(name.into());
        id
    }

    /// Declares a bus between two already-declared CPUs and returns its id.
    pub fn bus(&mut self, a: CpuId, b: CpuId, latency: LatencyModel) -> BusId {
        let id = BusId(u32::try_from(self.buses.len()).unwrap_or(u32::MAX));
        self.buses.push((a, b, latency));
        id
    }

    /// Builds the scheduler, validating the topology.
    pub fn build(self) -> Result<Scheduler> {
        if self.cpus.is_empty() {
            return Err(Error::EmptyTopology);
        }
        let cpu_count = self.cpus.len();
        let cpus: Vec<Arc<VirtualCpu>> = self
            .cpus
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                Arc::new(VirtualCpu::new(
                    CpuId(u32::try_from(index).unwrap_or(u32::MAX)),
                    name,
                ))
            })
            .collect();
        let mut buses = Vec::with_capacity(self.buses.len());
        for (index, (a, b, latency)) in self.buses.into_iter().enumerate() {
            for endpoint in [a, b] {
                if endpoint.value() as usize >= cpu_count {
                    return Err(Error::InvalidCpuReference(endpoint));
                }
            }
            buses.push(Arc::new(VirtualBus::new(
                BusId(u32::try_from(index).unwrap_or(u32::MAX)),
                (a, b),
                latency,
            )));
        }
        Ok(Scheduler {
            cpus,
            buses,
            threads: SkipMap::new(),
            locks: DashMap::new(),
            next_thread_id: AtomicU64::new(1),
            next_lock_id: AtomicU64::new(0),
            events: EventJournal::new(),
            catchpoints: CatchpointSet::new(),
            deadlock_reported: AtomicBool::new(false),
        })
    }
}

/// The process-wide coordinator for one run.
///
/// See the [module docs](self) for the control-flow contract. All methods
/// take `&self`; the registries are concurrent structures so the debugger
/// layer can inspect threads from another host thread while the interpreter
/// drives execution.
#[derive(Debug)]
pub struct Scheduler {
    cpus: Vec<Arc<VirtualCpu>>,
    buses: Vec<Arc<VirtualBus>>,
    threads: SkipMap<ThreadId, Arc<LogicalThread>>,
    locks: DashMap<LockId, Arc<ResourceLock>>,
    next_thread_id: AtomicU64,
    next_lock_id: AtomicU64,
    events: EventJournal,
    catchpoints: CatchpointSet,
    deadlock_reported: AtomicBool,
}

impl Scheduler {
    // ------------------------------------------------------------------
    // Topology and registry access
    // ------------------------------------------------------------------

    /// Ids of all CPUs in the topology, in declaration order.
    #[must_use]
    pub fn cpu_ids(&self) -> Vec<CpuId> {
        self.cpus.iter().map(|cpu| cpu.id()).collect()
    }

    /// Ids of all buses in the topology, in declaration order.
    #[must_use]
    pub fn bus_ids(&self) -> Vec<BusId> {
        self.buses.iter().map(|bus| bus.id()).collect()
    }

    /// The clock of one CPU.
    pub fn cpu_clock(&self, cpu: CpuId) -> Result<VirtualTime> {
        Ok(self.cpu(cpu)?.clock())
    }

    /// The global clock: the minimum over the clocks of CPUs that still have
    /// live threads bound to them. When no CPU does, the maximum clock is
    /// reported so a finished run ends at the instant its last event
    /// happened.
    #[must_use]
    pub fn global_clock(&self) -> VirtualTime {
        let advancing: Vec<VirtualTime> = self
            .cpus
            .iter()
            .filter(|cpu| self.has_live_threads(cpu.id()))
            .map(|cpu| cpu.clock())
            .collect();
        if advancing.is_empty() {
            self.cpus
                .iter()
                .map(|cpu| cpu.clock())
                .max()
                .unwrap_or(VirtualTime::ZERO)
        } else {
            advancing
                .into_iter()
                .min()
                .unwrap_or(VirtualTime::ZERO)
        }
    }

    /// Shared handle to a registered thread. Valid for terminated threads
    /// too; only unknown ids fail.
    pub fn thread(&self, id: ThreadId) -> Result<Arc<LogicalThread>> {
        self.threads
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::InvalidThreadReference(id))
    }

    /// Shared handle to a registered lock.
    pub fn lock(&self, id: LockId) -> Result<Arc<ResourceLock>> {
        self.locks
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::InvalidLockReference(id))
    }

    /// The event journal for this run.
    #[must_use]
    pub fn events(&self) -> &EventJournal {
        &self.events
    }

    // ------------------------------------------------------------------
    // Interpreter-facing operations
    // ------------------------------------------------------------------

    /// Registers a new thread bound to `cpu`. The thread starts in
    /// `Created`; it becomes eligible to run only after [`Scheduler::start`].
    pub fn create_thread(
        &self,
        cpu: CpuId,
        priority: Priority,
        name: impl Into<String>,
    ) -> Result<ThreadId> {
        self.cpu(cpu)?;
        let id = ThreadId(self.next_thread_id.fetch_add(1, Ordering::Relaxed));
        let thread = Arc::new(LogicalThread::new(id, name.into(), priority, cpu));
        // A thread enters the world at the current global instant.
        thread.advance_time_to(self.global_clock());
        self.threads.insert(id, thread);
        debug!("created {id} on {cpu}");
        Ok(id)
    }

    /// Makes a `Created` thread eligible to run.
    pub fn start(&self, thread: ThreadId) -> Result<()> {
        let th = self.live(thread)?;
        if !th.transition_from(RunState::Created, RunState::Runnable, None) {
            return Err(Error::IllegalTransition {
                thread,
                state: th.run_state(),
                operation: "start",
            });
        }
        self.cpu(th.cpu())?.enqueue(thread, th.priority());
        Ok(())
    }

    /// Creates a new lock in this run's registry.
    #[must_use]
    pub fn create_lock(&self) -> LockId {
        let id = LockId(self.next_lock_id.fetch_add(1, Ordering::Relaxed));
        self.locks.insert(id, Arc::new(ResourceLock::new(id)));
        id
    }

    /// Acquires `lock` on behalf of the running `thread`.
    ///
    /// Returns [`Progress::Completed`] when the lock was free or already held
    /// by `thread` (re-entrant). Otherwise the thread moves to `Locking`,
    /// joins the lock's waiter set and gives up its CPU slot; the acquisition
    /// is retried automatically each time the thread is dispatched, until it
    /// wins the race.
    pub fn acquire(&self, lock: LockId, thread: ThreadId) -> Result<Progress> {
        let th = self.running(thread, "acquire")?;
        let l = self.lock(lock)?;
        if l.try_acquire(thread) {
            trace!("{thread} acquired {lock}");
            return Ok(Progress::Completed);
        }
        th.transition(RunState::Locking, Some(Wakeup::AcquireLock(lock)));
        self.vacate(&th);
        trace!("{thread} blocked acquiring {lock}");
        Ok(Progress::Blocked)
    }

    /// Releases `lock` held by the running `thread`.
    ///
    /// Every waiter blocked in `Locking` mode becomes `Runnable` and races
    /// for the lock again; no single winner is picked here. Waiters parked on
    /// the lock's condition are not woken. Releasing a lock that no thread
    /// holds is a no-op; a release while *another* thread holds it fails
    /// with [`Error::IllegalLockState`] and leaves the lock untouched.
    pub fn release(&self, lock: LockId, thread: ThreadId) -> Result<()> {
        let _th = self.running(thread, "release")?;
        let l = self.lock(lock)?;
        match l.release(thread) {
            None => {
                warn!("{thread} released {lock} without holding it");
                Err(Error::IllegalLockState {
                    lock,
                    thread,
                    operation: "release",
                })
            }
            Some(woken) => {
                trace!("{thread} released {lock}, waking {} waiter(s)", woken.len());
                self.wake_lock_contenders(&woken);
                Ok(())
            }
        }
    }

    /// Condition-variable wait on `lock`: releases it (waking `Locking`
    /// waiters exactly as [`Scheduler::release`] does), parks `thread` on the
    /// lock's condition and gives up the CPU slot.
    ///
    /// After a [`Scheduler::signal_all`], the thread re-contends for the lock
    /// and holds it again before it next runs. Fails with
    /// [`Error::IllegalLockState`] if `thread` does not hold the lock.
    pub fn wait_for(&self, lock: LockId, thread: ThreadId) -> Result<Progress> {
        let th = self.running(thread, "wait_for")?;
        let l = self.lock(lock)?;
        match l.release_and_wait(thread) {
            None => {
                warn!("{thread} waited on {lock} without holding it");
                Err(Error::IllegalLockState {
                    lock,
                    thread,
                    operation: "wait_for",
                })
            }
            Some(woken) => {
                th.transition(RunState::Waiting, Some(Wakeup::ConditionSignal(lock)));
                self.vacate(&th);
                self.wake_lock_contenders(&woken);
                trace!("{thread} waiting on condition of {lock}");
                Ok(Progress::Blocked)
            }
        }
    }

    /// Wakes a single waiter of `lock`. Same effect as
    /// [`Scheduler::signal_all`]: every waiter becomes eligible, none is
    /// granted the lock outright.
    pub fn signal(&self, lock: LockId) -> Result<()> {
        self.signal_all(lock)
    }

    /// Moves every waiter of `lock`, contenders and condition waiters alike,
    /// to `Runnable`. None of them is handed the lock; each re-contends
    /// when dispatched.
    pub fn signal_all(&self, lock: LockId) -> Result<()> {
        let l = self.lock(lock)?;
        for id in l.signal_all() {
            let Ok(th) = self.thread(id) else { continue };
            match th.wakeup() {
                Some(Wakeup::ConditionSignal(signalled)) if signalled == lock => {
                    if th.transition_from(
                        RunState::Waiting,
                        RunState::Runnable,
                        Some(Wakeup::ReacquireLock(lock)),
                    ) {
                        self.enqueue(&th);
                    }
                }
                Some(Wakeup::AcquireLock(contended)) if contended == lock => {
                    if th.transition_from(
                        RunState::Locking,
                        RunState::Runnable,
                        Some(Wakeup::AcquireLock(lock)),
                    ) {
                        self.enqueue(&th);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Explicit time advance: `thread` yields for `duration` units of
    /// virtual time and becomes runnable again once its CPU clock reaches
    /// the deadline.
    pub fn advance_time(&self, thread: ThreadId, duration: VirtualDuration) -> Result<Progress> {
        let th = self.running(thread, "advance_time")?;
        let due = self.cpu(th.cpu())?.clock() + duration;
        th.transition(RunState::Timestep, Some(Wakeup::TimestepDone { due }));
        self.vacate(&th);
        trace!("{thread} in timestep until {due}");
        Ok(Progress::Blocked)
    }

    /// Sends a call from `thread` across `bus`. The thread blocks until the
    /// global clock reaches `enqueue time + latency(payload_bytes)`;
    /// deliveries on one bus are strictly FIFO.
    pub fn cross_bus(&self, bus: BusId, thread: ThreadId, payload_bytes: u64) -> Result<Progress> {
        let th = self.running(thread, "cross_bus")?;
        let b = self.bus(bus)?;
        if !b.connects(th.cpu()) {
            return Err(Error::InvalidBusReference(bus));
        }
        let now = self.cpu(th.cpu())?.clock();
        let due = b.enqueue(thread, now, payload_bytes);
        th.transition(RunState::Waiting, Some(Wakeup::BusDelivery { bus, due }));
        self.vacate(&th);
        trace!("{thread} crossing {bus}: enqueued at {now}, due {due}");
        Ok(Progress::Blocked)
    }

    /// Voluntary yield: `thread` stays runnable but gives up its slot so the
    /// CPU can pick the best runnable thread again.
    pub fn yield_now(&self, thread: ThreadId) -> Result<()> {
        let th = self.running(thread, "yield")?;
        th.transition(RunState::Runnable, None);
        self.vacate(&th);
        self.enqueue(&th);
        Ok(())
    }

    /// Normal termination of `thread`, called when its strand of execution
    /// finishes.
    ///
    /// Fails with [`Error::LockHeldAtExit`] if the thread still holds any
    /// lock; finishing while holding a resource is a specification error,
    /// not something to ignore silently.
    pub fn terminate(&self, thread: ThreadId) -> Result<()> {
        let th = self.live(thread)?;
        let held = self.locks_held_by(thread);
        if !held.is_empty() {
            warn!("{thread} attempted to terminate while holding {} lock(s)", held.len());
            return Err(Error::LockHeldAtExit {
                thread,
                locks: held,
            });
        }
        self.retire(&th, false);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Performs one dispatch step and reports which thread should execute
    /// next.
    ///
    /// The step: wake every thread whose timestep or bus delivery has
    /// matured, then hand the execution slot to the best runnable thread on
    /// the CPU with the smallest clock. When nothing is runnable but timed
    /// work is pending, virtual time jumps to the earliest deadline and the
    /// step repeats. A still-`Running` thread keeps its slot (cooperative
    /// scheduling), so calling this again without blocking the current
    /// thread returns the same id.
    ///
    /// Returns [`Error::DeadlockDetected`] when every live thread is blocked
    /// on a lock or condition and no bus delivery or timestep could unblock
    /// one. The consolidated report names each blocked thread and its
    /// blocking resource, and a [`SchedulerEvent::DeadlockDetected`] is
    /// recorded once per run.
    pub fn dispatch_next(&self) -> Result<DispatchOutcome> {
        // Cooperative slot retention.
        for cpu in &self.cpus {
            if let Some(current) = cpu.current() {
                return Ok(DispatchOutcome::Dispatched(current));
            }
        }
        loop {
            self.wake_matured();
            if let Some(cpu) = self.best_cpu() {
                if let Some(id) = self.swap_in_best(&cpu)? {
                    return Ok(DispatchOutcome::Dispatched(id));
                }
                // Every candidate lost its lock race and re-blocked.
                continue;
            }
            if let Some(instant) = self.next_event_time() {
                // Nothing runnable: virtual time jumps to the next deadline
                // on every CPU that still has live work.
                for cpu in &self.cpus {
                    if self.has_live_threads(cpu.id()) {
                        cpu.advance_clock_to(instant);
                    }
                }
                debug!("advanced virtual time to {instant}");
                continue;
            }
            return self.quiescent_or_deadlocked();
        }
    }

    /// Drives the dispatch loop to completion.
    ///
    /// Each dispatched thread is handed to `step`, which must execute it up
    /// to its next yield point (a blocking operation, a yield or
    /// termination). A thread left `Running` keeps its slot and is handed to
    /// `step` again. Returns once the run is quiescent or every remaining
    /// thread is debugger-suspended; deadlock and `step` errors propagate.
    pub fn run_until_quiescent<F>(&self, mut step: F) -> Result<DispatchOutcome>
    where
        F: FnMut(&Scheduler, ThreadId) -> Result<()>,
    {
        loop {
            match self.dispatch_next()? {
                DispatchOutcome::Dispatched(id) => step(self, id)?,
                outcome => return Ok(outcome),
            }
        }
    }

    // ------------------------------------------------------------------
    // Debugger-facing operations
    // ------------------------------------------------------------------

    /// Ordered snapshot of every registered thread, terminated ones
    /// included.
    #[must_use]
    pub fn list_threads(&self) -> Vec<ThreadInfo> {
        self.threads
            .iter()
            .map(|entry| self.info(entry.value()))
            .collect()
    }

    /// Registers a suspension request: pause any thread reaching a boundary
    /// of `kind` for which `condition` (when present) holds.
    pub fn suspend_at(
        &self,
        kind: LocationKind,
        condition: Option<BreakCondition>,
    ) -> CatchpointId {
        self.catchpoints.add(kind, condition)
    }

    /// Removes a catchpoint. Returns `false` if the id was unknown.
    pub fn clear_catchpoint(&self, id: CatchpointId) -> bool {
        self.catchpoints.remove(id)
    }

    /// Called by the interpreter at every statement/expression boundary of
    /// the running `thread`. Returns `true` when the thread was suspended
    /// and must not execute further until resumed.
    ///
    /// A suspended thread keeps all its locks; contenders simply stay
    /// `Locking` until it resumes and releases them.
    pub fn breakpoint_check(&self, thread: ThreadId, kind: LocationKind) -> Result<bool> {
        let th = self.running(thread, "breakpoint_check")?;
        let stepped = th.take_step_pending();
        if !stepped && !self.catchpoints.matches(kind, &self.info(&th)) {
            return Ok(false);
        }
        // Preserve any pending wakeup across the suspension.
        let wakeup = th.wakeup();
        th.transition(RunState::Suspended, wakeup);
        self.vacate(&th);
        debug!("{thread} suspended at {kind} boundary");
        Ok(true)
    }

    /// Resumes a suspended thread.
    pub fn resume(&self, thread: ThreadId) -> Result<()> {
        let th = self.live(thread)?;
        let wakeup = th.wakeup();
        if !th.transition_from(RunState::Suspended, RunState::Runnable, wakeup) {
            return Err(Error::IllegalTransition {
                thread,
                state: th.run_state(),
                operation: "resume",
            });
        }
        self.enqueue(&th);
        debug!("{thread} resumed");
        Ok(())
    }

    /// Resumes a suspended thread for a single step: it will suspend again
    /// at the next boundary it reaches, whether or not a catchpoint matches.
    pub fn step(&self, thread: ThreadId) -> Result<()> {
        let th = self.live(thread)?;
        let wakeup = th.wakeup();
        if !th.transition_from(RunState::Suspended, RunState::Runnable, wakeup) {
            return Err(Error::IllegalTransition {
                thread,
                state: th.run_state(),
                operation: "step",
            });
        }
        // Arm the single-step flag only once the resume is committed; a
        // failed step must not leave a trap behind.
        th.set_step_pending(true);
        self.enqueue(&th);
        debug!("{thread} resumed for one step");
        Ok(())
    }

    /// Debugger-driven termination. Unlike [`Scheduler::terminate`] this is
    /// allowed while the thread holds locks: each one is force-released
    /// first (reported as an abnormal release, and every `Locking` waiter
    /// wakes), then the thread is retired.
    pub fn stop(&self, thread: ThreadId) -> Result<()> {
        let th = self.live(thread)?;
        for id in self.locks_held_by(thread) {
            let Ok(lock) = self.lock(id) else { continue };
            if let Some(woken) = lock.force_release(thread) {
                warn!("{id} force-released: holder {thread} stopped by debugger");
                self.events.record(SchedulerEvent::AbnormalRelease {
                    lock: id,
                    thread,
                });
                self.wake_lock_contenders(&woken);
            }
        }
        self.retire(&th, true);
        Ok(())
    }

    /// Global pause: suspends every thread that is currently `Running` or
    /// `Runnable`. Blocked threads are left blocked; they will surface as
    /// suspended work once their wakeup arrives while the pause holds.
    pub fn suspend_all(&self) {
        for entry in self.threads.iter() {
            let th = entry.value();
            let wakeup = th.wakeup();
            if th.transition_from(RunState::Running, RunState::Suspended, wakeup) {
                self.vacate(th);
            } else if th.transition_from(RunState::Runnable, RunState::Suspended, wakeup) {
                self.cpu_of(th).dequeue(th.id());
            }
        }
    }

    /// Resumes every suspended thread.
    pub fn resume_all(&self) {
        for entry in self.threads.iter() {
            let th = entry.value();
            let wakeup = th.wakeup();
            if th.transition_from(RunState::Suspended, RunState::Runnable, wakeup) {
                self.enqueue(th);
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn cpu(&self, id: CpuId) -> Result<&Arc<VirtualCpu>> {
        self.cpus
            .get(id.value() as usize)
            .ok_or(Error::InvalidCpuReference(id))
    }

    fn bus(&self, id: BusId) -> Result<&Arc<VirtualBus>> {
        self.buses
            .get(id.value() as usize)
            .ok_or(Error::InvalidBusReference(id))
    }

    /// The CPU a registered thread is bound to. Bindings are validated at
    /// creation, so this cannot miss.
    fn cpu_of(&self, thread: &LogicalThread) -> &Arc<VirtualCpu> {
        &self.cpus[thread.cpu().value() as usize]
    }

    /// A registered, non-terminated thread.
    fn live(&self, id: ThreadId) -> Result<Arc<LogicalThread>> {
        let th = self.thread(id)?;
        if th.run_state() == RunState::Terminated {
            return Err(Error::InvalidThreadReference(id));
        }
        Ok(th)
    }

    /// A thread that currently holds its CPU's execution slot.
    fn running(&self, id: ThreadId, operation: &'static str) -> Result<Arc<LogicalThread>> {
        let th = self.live(id)?;
        if th.run_state() != RunState::Running {
            return Err(Error::IllegalTransition {
                thread: id,
                state: th.run_state(),
                operation,
            });
        }
        Ok(th)
    }

    fn info(&self, thread: &LogicalThread) -> ThreadInfo {
        ThreadInfo {
            id: thread.id(),
            name: thread.name().to_string(),
            state: thread.run_state(),
            cpu: thread.cpu(),
            priority: thread.priority(),
            virtual_time: thread.virtual_time(),
        }
    }

    fn enqueue(&self, thread: &LogicalThread) {
        self.cpu_of(thread).enqueue(thread.id(), thread.priority());
    }

    /// Takes `thread` off its CPU's execution slot.
    fn vacate(&self, thread: &LogicalThread) {
        self.cpu_of(thread).swap_out(thread.id());
        thread.set_swapped_in(false);
    }

    fn has_live_threads(&self, cpu: CpuId) -> bool {
        self.threads
            .iter()
            .any(|entry| entry.value().cpu() == cpu && entry.value().run_state().is_live())
    }

    fn locks_held_by(&self, thread: ThreadId) -> Vec<LockId> {
        let mut held: Vec<LockId> = self
            .locks
            .iter()
            .filter(|entry| entry.value().is_held_by(thread))
            .map(|entry| *entry.key())
            .collect();
        held.sort();
        held
    }

    /// Makes woken lock contenders runnable again, keeping their pending
    /// acquisition so the dispatch step retries it.
    fn wake_lock_contenders(&self, woken: &[ThreadId]) {
        for &id in woken {
            let Ok(th) = self.thread(id) else { continue };
            let Some(Wakeup::AcquireLock(lock)) = th.wakeup() else {
                continue;
            };
            if th.transition_from(
                RunState::Locking,
                RunState::Runnable,
                Some(Wakeup::AcquireLock(lock)),
            ) {
                self.enqueue(&th);
            }
        }
    }

    /// Wakes every thread whose timestep deadline or bus delivery has
    /// matured. Bus deliveries are gated on the global clock and kept FIFO
    /// per bus.
    fn wake_matured(&self) {
        for entry in self.threads.iter() {
            let th = entry.value();
            if let Some(Wakeup::TimestepDone { due }) = th.wakeup() {
                if due <= self.cpu_of(th).clock()
                    && th.transition_from(RunState::Timestep, RunState::Runnable, None)
                {
                    th.advance_time_to(due);
                    self.enqueue(th);
                }
            }
        }
        let now = self.global_clock();
        for bus in &self.buses {
            for message in bus.deliver_due(now) {
                let Ok(th) = self.thread(message.thread) else {
                    continue;
                };
                if th.transition_from(RunState::Waiting, RunState::Runnable, None) {
                    th.advance_time_to(message.due);
                    trace!(
                        "{} delivered on {}: enqueued at {}, due {}",
                        message.thread,
                        bus.id(),
                        message.enqueued_at,
                        message.due
                    );
                    self.enqueue(&th);
                }
            }
        }
    }

    /// The CPU that should dispatch next: smallest clock among CPUs with
    /// runnable work, smallest id on a tie.
    fn best_cpu(&self) -> Option<Arc<VirtualCpu>> {
        self.cpus
            .iter()
            .filter(|cpu| cpu.runnable_count() > 0)
            .min_by_key(|cpu| (cpu.clock(), cpu.id()))
            .map(Arc::clone)
    }

    /// Pops runnable threads off `cpu` until one can actually run. A thread
    /// with a pending lock acquisition re-contends here; losing the race
    /// puts it back into `Locking` and the next candidate is tried.
    fn swap_in_best(&self, cpu: &VirtualCpu) -> Result<Option<ThreadId>> {
        while let Some(id) = cpu.pop_best() {
            let th = self.thread(id)?;
            if th.run_state() != RunState::Runnable {
                continue; // stale queue entry
            }
            match th.wakeup() {
                Some(Wakeup::AcquireLock(lock)) | Some(Wakeup::ReacquireLock(lock)) => {
                    let l = self.lock(lock)?;
                    if !l.try_acquire(id) {
                        th.transition(RunState::Locking, Some(Wakeup::AcquireLock(lock)));
                        continue;
                    }
                    trace!("{id} won the race for {lock}");
                }
                _ => {}
            }
            cpu.advance_clock_to(th.virtual_time());
            th.advance_time_to(cpu.clock());
            th.transition(RunState::Running, None);
            th.set_swapped_in(true);
            cpu.swap_in(id);
            trace!("{id} dispatched on {} at {}", cpu.id(), cpu.clock());
            return Ok(Some(id));
        }
        Ok(None)
    }

    /// Earliest instant at which timed work matures: the soonest timestep
    /// deadline or head-of-line bus delivery.
    fn next_event_time(&self) -> Option<VirtualTime> {
        let timesteps = self.threads.iter().filter_map(|entry| {
            match entry.value().wakeup() {
                Some(Wakeup::TimestepDone { due }) => Some(due),
                _ => None,
            }
        });
        let deliveries = self.buses.iter().filter_map(|bus| bus.next_due());
        timesteps.chain(deliveries).min()
    }

    /// End-of-run classification: all work done, all remaining work held by
    /// the debugger, or deadlock.
    fn quiescent_or_deadlocked(&self) -> Result<DispatchOutcome> {
        let mut blocked = Vec::new();
        let mut any_suspended = false;
        for entry in self.threads.iter() {
            let th = entry.value();
            match th.run_state() {
                RunState::Suspended => any_suspended = true,
                RunState::Locking | RunState::Waiting => blocked.push(BlockedThread {
                    thread: th.id(),
                    name: th.name().to_string(),
                    blocked_on: self.blocked_on(th),
                }),
                _ => {}
            }
        }
        if any_suspended {
            // Not a deadlock: the debugger still owns suspended threads and
            // may resume one that unblocks the rest.
            return Ok(DispatchOutcome::AllSuspended);
        }
        if blocked.is_empty() {
            return Ok(DispatchOutcome::Quiescent);
        }
        if !self.deadlock_reported.swap(true, Ordering::AcqRel) {
            warn!("deadlock detected: {} thread(s) blocked", blocked.len());
            self.events.record(SchedulerEvent::DeadlockDetected {
                blocked: blocked.clone(),
            });
        }
        Err(Error::DeadlockDetected { blocked })
    }

    fn blocked_on(&self, thread: &LogicalThread) -> BlockedOn {
        match thread.wakeup() {
            Some(Wakeup::AcquireLock(lock)) | Some(Wakeup::ReacquireLock(lock)) => {
                BlockedOn::Lock(lock)
            }
            Some(Wakeup::ConditionSignal(lock)) => BlockedOn::Condition(lock),
            Some(Wakeup::BusDelivery { bus, .. }) => BlockedOn::Bus(bus),
            _ => BlockedOn::Debugger,
        }
    }

    /// Final transition to `Terminated`: off the run queue, off the slot,
    /// out of every waiter set, any in-flight bus message cancelled. The
    /// registry entry stays so the id remains valid for reporting.
    fn retire(&self, thread: &LogicalThread, abnormal: bool) {
        let id = thread.id();
        let cpu = self.cpu_of(thread);
        cpu.dequeue(id);
        cpu.swap_out(id);
        thread.set_swapped_in(false);
        for entry in self.locks.iter() {
            entry.value().remove_waiter(id);
        }
        for bus in &self.buses {
            bus.cancel(id);
        }
        thread.transition(RunState::Terminated, None);
        self.events
            .record(SchedulerEvent::ThreadTerminated { thread: id, abnormal });
        debug!("{id} terminated (abnormal: {abnormal})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> (Scheduler, CpuId) {
        let sched = SchedulerBuilder::single_cpu().build().unwrap();
        let cpu = sched.cpu_ids()[0];
        (sched, cpu)
    }

    /// Creates, starts and dispatches one thread, returning it in `Running`.
    fn spawn_running(sched: &Scheduler, cpu: CpuId, name: &str) -> ThreadId {
        let id = sched.create_thread(cpu, Priority::NORMAL, name).unwrap();
        sched.start(id).unwrap();
        match sched.dispatch_next().unwrap() {
            DispatchOutcome::Dispatched(running) => {
                assert_eq!(running, id);
                id
            }
            other => panic!("expected dispatch of {name}, got {other:?}"),
        }
    }

    #[test]
    fn empty_topology_is_rejected() {
        assert!(matches!(
            SchedulerBuilder::new().build(),
            Err(Error::EmptyTopology)
        ));
    }

    #[test]
    fn bus_endpoints_are_validated() {
        let mut builder = SchedulerBuilder::new();
        let a = builder.cpu("a");
        builder.bus(a, CpuId(9), LatencyModel::Fixed(VirtualDuration::new(1)));
        assert!(matches!(
            builder.build(),
            Err(Error::InvalidCpuReference(CpuId(9)))
        ));
    }

    #[test]
    fn lifecycle_create_start_dispatch_terminate() {
        let (sched, cpu) = single();
        let id = sched.create_thread(cpu, Priority::NORMAL, "t").unwrap();
        assert_eq!(sched.thread(id).unwrap().run_state(), RunState::Created);
        sched.start(id).unwrap();
        assert_eq!(
            sched.dispatch_next().unwrap(),
            DispatchOutcome::Dispatched(id)
        );
        assert!(sched.thread(id).unwrap().swapped_in());
        sched.terminate(id).unwrap();
        assert_eq!(sched.thread(id).unwrap().run_state(), RunState::Terminated);
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Quiescent);
        assert_eq!(
            sched.events().since(0),
            vec![SchedulerEvent::ThreadTerminated {
                thread: id,
                abnormal: false,
            }]
        );
    }

    #[test]
    fn start_twice_is_an_illegal_transition() {
        let (sched, cpu) = single();
        let id = sched.create_thread(cpu, Priority::NORMAL, "t").unwrap();
        sched.start(id).unwrap();
        assert!(matches!(
            sched.start(id),
            Err(Error::IllegalTransition { .. })
        ));
    }

    #[test]
    fn dispatch_prefers_priority_then_creation_order() {
        let (sched, cpu) = single();
        let low = sched.create_thread(cpu, Priority(1), "low").unwrap();
        let high = sched.create_thread(cpu, Priority(5), "high").unwrap();
        sched.start(low).unwrap();
        sched.start(high).unwrap();
        assert_eq!(
            sched.dispatch_next().unwrap(),
            DispatchOutcome::Dispatched(high)
        );
        // Cooperative: the running thread keeps its slot on a re-dispatch.
        assert_eq!(
            sched.dispatch_next().unwrap(),
            DispatchOutcome::Dispatched(high)
        );
        sched.yield_now(high).unwrap();
        // Equal footing now; high priority still wins the queue.
        assert_eq!(
            sched.dispatch_next().unwrap(),
            DispatchOutcome::Dispatched(high)
        );
        sched.terminate(high).unwrap();
        assert_eq!(
            sched.dispatch_next().unwrap(),
            DispatchOutcome::Dispatched(low)
        );
    }

    #[test]
    fn contended_acquire_blocks_then_wins_after_release() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);

        let b = sched.create_thread(cpu, Priority::NORMAL, "b").unwrap();
        sched.start(b).unwrap();
        // a steps into a timestep; b gets the CPU and hits the held lock.
        sched.advance_time(a, VirtualDuration::new(1)).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));

        assert_eq!(sched.acquire(lock, b).unwrap(), Progress::Blocked);
        assert_eq!(sched.thread(b).unwrap().run_state(), RunState::Locking);
        assert_eq!(sched.lock(lock).unwrap().holder(), Some(a));

        // a resumes from its timestep, releases, and b wins the lock.
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        sched.release(lock, a).unwrap();
        assert_eq!(sched.thread(b).unwrap().run_state(), RunState::Runnable);
        sched.terminate(a).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        assert_eq!(sched.thread(b).unwrap().run_state(), RunState::Running);
        assert!(sched.lock(lock).unwrap().is_held_by(b));
    }

    #[test]
    fn reentrant_acquire_completes() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);
        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);
        assert!(sched.lock(lock).unwrap().is_held_by(a));
    }

    #[test]
    fn release_of_an_unheld_lock_is_a_no_op() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        sched.release(lock, a).unwrap();
        assert_eq!(sched.lock(lock).unwrap().holder(), None);
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Running);
    }

    #[test]
    fn release_by_another_holder_fails_and_preserves_state() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);
        sched.advance_time(a, VirtualDuration::new(1)).unwrap();

        let b = sched.create_thread(cpu, Priority::NORMAL, "b").unwrap();
        sched.start(b).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        assert!(matches!(
            sched.release(lock, b),
            Err(Error::IllegalLockState {
                operation: "release",
                ..
            })
        ));
        assert_eq!(sched.lock(lock).unwrap().holder(), Some(a));
    }

    #[test]
    fn wait_for_without_holding_fails() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        assert!(matches!(
            sched.wait_for(lock, a),
            Err(Error::IllegalLockState {
                operation: "wait_for",
                ..
            })
        ));
    }

    #[test]
    fn wait_for_releases_then_reholds_after_signal() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        let b = sched.create_thread(cpu, Priority::NORMAL, "b").unwrap();
        sched.start(b).unwrap();

        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);
        assert_eq!(sched.wait_for(lock, a).unwrap(), Progress::Blocked);
        // The lock is free while a waits.
        assert_eq!(sched.lock(lock).unwrap().holder(), None);
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Waiting);

        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        assert_eq!(sched.acquire(lock, b).unwrap(), Progress::Completed);
        // A plain release must not wake the condition waiter.
        sched.release(lock, b).unwrap();
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Waiting);
        assert_eq!(sched.acquire(lock, b).unwrap(), Progress::Completed);
        sched.signal_all(lock).unwrap();
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Runnable);
        sched.release(lock, b).unwrap();
        sched.terminate(b).unwrap();

        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert!(sched.lock(lock).unwrap().is_held_by(a));
    }

    #[test]
    fn advance_time_moves_cpu_and_thread_clocks() {
        let (sched, cpu) = single();
        let a = spawn_running(&sched, cpu, "a");
        sched.advance_time(a, VirtualDuration::new(25)).unwrap();
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Timestep);
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert_eq!(sched.cpu_clock(cpu).unwrap(), VirtualTime::new(25));
        assert_eq!(sched.thread(a).unwrap().virtual_time(), VirtualTime::new(25));
        assert_eq!(sched.global_clock(), VirtualTime::new(25));
    }

    #[test]
    fn bus_crossing_resumes_after_latency() {
        let mut builder = SchedulerBuilder::new();
        let cpu0 = builder.cpu("client");
        let cpu1 = builder.cpu("server");
        let bus = builder.bus(cpu0, cpu1, LatencyModel::Fixed(VirtualDuration::new(10)));
        let sched = builder.build().unwrap();

        let a = sched.create_thread(cpu0, Priority::NORMAL, "caller").unwrap();
        sched.start(a).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert_eq!(sched.cross_bus(bus, a, 64).unwrap(), Progress::Blocked);
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Waiting);

        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert!(sched.global_clock() >= VirtualTime::new(10));
        assert_eq!(sched.thread(a).unwrap().virtual_time(), VirtualTime::new(10));
    }

    #[test]
    fn crossing_an_unconnected_bus_is_rejected() {
        let mut builder = SchedulerBuilder::new();
        let cpu0 = builder.cpu("a");
        let cpu1 = builder.cpu("b");
        let cpu2 = builder.cpu("c");
        let bus = builder.bus(cpu1, cpu2, LatencyModel::Fixed(VirtualDuration::new(1)));
        let sched = builder.build().unwrap();
        let t = sched.create_thread(cpu0, Priority::NORMAL, "t").unwrap();
        sched.start(t).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(t));
        assert!(matches!(
            sched.cross_bus(bus, t, 0),
            Err(Error::InvalidBusReference(_))
        ));
    }

    #[test]
    fn cyclic_lock_wait_is_reported_as_deadlock_once() {
        let (sched, cpu) = single();
        let l1 = sched.create_lock();
        let l2 = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        let b = sched.create_thread(cpu, Priority::NORMAL, "b").unwrap();
        sched.start(b).unwrap();

        assert_eq!(sched.acquire(l1, a).unwrap(), Progress::Completed);
        sched.advance_time(a, VirtualDuration::new(1)).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        assert_eq!(sched.acquire(l2, b).unwrap(), Progress::Completed);
        assert_eq!(sched.acquire(l1, b).unwrap(), Progress::Blocked);
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert_eq!(sched.acquire(l2, a).unwrap(), Progress::Blocked);

        let err = sched.dispatch_next().unwrap_err();
        let Error::DeadlockDetected { blocked } = err else {
            panic!("expected deadlock, got {err}");
        };
        assert_eq!(blocked.len(), 2);
        let journal_len = sched.events().len();
        // A second dispatch reports the same deadlock without re-recording.
        assert!(matches!(
            sched.dispatch_next(),
            Err(Error::DeadlockDetected { .. })
        ));
        assert_eq!(sched.events().len(), journal_len);
    }

    #[test]
    fn terminate_while_holding_a_lock_is_reported() {
        let (sched, cpu) = single();
        let lock = sched.create_lock();
        let a = spawn_running(&sched, cpu, "a");
        assert_eq!(sched.acquire(lock, a).unwrap(), Progress::Completed);
        assert!(matches!(
            sched.terminate(a),
            Err(Error::LockHeldAtExit { .. })
        ));
        // The thread is still alive and still the holder.
        assert_eq!(sched.thread(a).unwrap().run_state(), RunState::Running);
        assert!(sched.lock(lock).unwrap().is_held_by(a));
    }

    #[test]
    fn unknown_references_fail_fast() {
        let (sched, cpu) = single();
        assert!(matches!(
            sched.start(ThreadId(99)),
            Err(Error::InvalidThreadReference(_))
        ));
        assert!(matches!(
            sched.create_thread(CpuId(7), Priority::NORMAL, "t"),
            Err(Error::InvalidCpuReference(_))
        ));
        let t = sched.create_thread(cpu, Priority::NORMAL, "t").unwrap();
        sched.start(t).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(t));
        assert!(matches!(
            sched.acquire(LockId(3), t),
            Err(Error::InvalidLockReference(_))
        ));
        assert!(matches!(
            sched.cross_bus(BusId(0), t, 0),
            Err(Error::InvalidBusReference(_))
        ));
    }

    #[test]
    fn operations_on_terminated_threads_fail_fast() {
        let (sched, cpu) = single();
        let t = spawn_running(&sched, cpu, "t");
        sched.terminate(t).unwrap();
        assert!(matches!(
            sched.yield_now(t),
            Err(Error::InvalidThreadReference(_))
        ));
        // The id itself stays valid for reporting.
        assert_eq!(sched.thread(t).unwrap().run_state(), RunState::Terminated);
        assert_eq!(sched.list_threads().len(), 1);
    }

    #[test]
    fn run_until_quiescent_drives_every_thread() {
        use std::collections::HashMap;

        let (sched, cpu) = single();
        let a = sched.create_thread(cpu, Priority::NORMAL, "a").unwrap();
        let b = sched.create_thread(cpu, Priority::NORMAL, "b").unwrap();
        sched.start(a).unwrap();
        sched.start(b).unwrap();

        let mut steps: HashMap<ThreadId, u32> = HashMap::new();
        let outcome = sched
            .run_until_quiescent(|s, id| {
                let count = steps.entry(id).or_insert(0);
                *count += 1;
                if *count < 3 {
                    s.advance_time(id, VirtualDuration::new(1))?;
                } else {
                    s.terminate(id)?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Quiescent);
        assert_eq!(steps[&a], 3);
        assert_eq!(steps[&b], 3);
    }

    #[test]
    fn global_clock_tracks_cpus_with_live_work() {
        let mut builder = SchedulerBuilder::new();
        let cpu0 = builder.cpu("slow");
        let cpu1 = builder.cpu("fast");
        let sched = builder.build().unwrap();
        let a = sched.create_thread(cpu0, Priority::NORMAL, "a").unwrap();
        let b = sched.create_thread(cpu1, Priority::NORMAL, "b").unwrap();
        sched.start(a).unwrap();
        sched.start(b).unwrap();

        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        sched.advance_time(a, VirtualDuration::new(100)).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        sched.advance_time(b, VirtualDuration::new(10)).unwrap();

        // Nothing runnable until b's earlier deadline; time jumps to 10.
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(b));
        assert_eq!(sched.global_clock(), VirtualTime::new(10));

        // With b gone, cpu1 no longer participates in the minimum.
        sched.terminate(b).unwrap();
        assert_eq!(sched.dispatch_next().unwrap(), DispatchOutcome::Dispatched(a));
        assert_eq!(sched.global_clock(), VirtualTime::new(100));
    }
}
