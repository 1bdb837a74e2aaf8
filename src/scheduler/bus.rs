//! Virtual buses: modeled inter-CPU communication latency.
//!
//! When a thread's call targets an object deployed on another CPU, the call
//! crosses a [`VirtualBus`]. The crossing blocks the thread and enqueues a
//! delivery record whose maturity instant is `enqueue time + latency`. The
//! latency comes from a [`LatencyModel`], a pure function of the message
//! attributes, never of unrelated scheduler state, so that timings are
//! reproducible across runs with the same inputs.
//!
//! Deliveries on one bus are strictly FIFO: a message never overtakes an
//! earlier one, even when jitter in the latency computation gives the later
//! message a smaller maturity instant.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use crate::scheduler::cpu::CpuId;
use crate::scheduler::thread::ThreadId;
use crate::scheduler::time::{VirtualDuration, VirtualTime};

/// Identifier of a [`VirtualBus`] within one scheduler topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(pub(crate) u32);

impl BusId {
    /// Raw numeric value of the id.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus-{}", self.0)
    }
}

/// How a bus converts a message into a virtual-time delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyModel {
    /// Every message takes the same fixed delay.
    Fixed(VirtualDuration),
    /// A per-message base cost plus a cost per payload byte, modeling a
    /// bandwidth-limited link.
    PerByte {
        /// Fixed cost paid by every message.
        base: VirtualDuration,
        /// Additional delay per payload byte.
        per_byte: VirtualDuration,
    },
}

impl LatencyModel {
    /// Delay for a message with `payload_bytes` of payload. Pure: depends on
    /// the model parameters and the message size only.
    #[must_use]
    pub fn delay(&self, payload_bytes: u64) -> VirtualDuration {
        match *self {
            LatencyModel::Fixed(d) => d,
            LatencyModel::PerByte { base, per_byte } => {
                base.saturating_add(per_byte.saturating_mul(payload_bytes))
            }
        }
    }
}

/// One pending cross-CPU call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BusMessage {
    pub thread: ThreadId,
    pub enqueued_at: VirtualTime,
    pub due: VirtualTime,
}

/// A modeled communication channel between two CPUs.
#[derive(Debug)]
pub struct VirtualBus {
    id: BusId,
    endpoints: (CpuId, CpuId),
    latency: LatencyModel,
    in_flight: Mutex<VecDeque<BusMessage>>,
}

impl VirtualBus {
    pub(crate) fn new(id: BusId, endpoints: (CpuId, CpuId), latency: LatencyModel) -> Self {
        VirtualBus {
            id,
            endpoints,
            latency,
            in_flight: Mutex::new(VecDeque::new()),
        }
    }

    /// Identifier of this bus.
    #[must_use]
    pub fn id(&self) -> BusId {
        self.id
    }

    /// The pair of CPUs this bus connects.
    #[must_use]
    pub fn endpoints(&self) -> (CpuId, CpuId) {
        self.endpoints
    }

    /// Whether `cpu` is one of the endpoints.
    #[must_use]
    pub fn connects(&self, cpu: CpuId) -> bool {
        self.endpoints.0 == cpu || self.endpoints.1 == cpu
    }

    /// Number of messages currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    /// Enqueues a crossing for `thread` at instant `now` and returns the
    /// delivery instant.
    pub(crate) fn enqueue(
        &self,
        thread: ThreadId,
        now: VirtualTime,
        payload_bytes: u64,
    ) -> VirtualTime {
        let due = now + self.latency.delay(payload_bytes);
        self.in_flight.lock().unwrap().push_back(BusMessage {
            thread,
            enqueued_at: now,
            due,
        });
        due
    }

    /// Delivers every message matured by `now`, in enqueue order, and returns
    /// the delivered records. Stops at the first unmatured message even if a
    /// later one is already due, preserving FIFO delivery.
    pub(crate) fn deliver_due(&self, now: VirtualTime) -> Vec<BusMessage> {
        let mut queue = self.in_flight.lock().unwrap();
        let mut delivered = Vec::new();
        while let Some(front) = queue.front() {
            if front.due > now {
                break;
            }
            delivered.push(queue.pop_front().unwrap());
        }
        delivered
    }

    /// Maturity instant of the head-of-line message, if any. Because
    /// delivery is FIFO this is the earliest instant at which this bus can
    /// unblock a thread.
    #[must_use]
    pub(crate) fn next_due(&self) -> Option<VirtualTime> {
        self.in_flight.lock().unwrap().front().map(|m| m.due)
    }

    /// Removes any in-flight message belonging to `thread`. Used when the
    /// debugger stops a thread mid-crossing.
    pub(crate) fn cancel(&self, thread: ThreadId) {
        self.in_flight.lock().unwrap().retain(|m| m.thread != thread);
    }
}
