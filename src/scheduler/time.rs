//! Virtual time primitives.
//!
//! All scheduling in this crate is expressed in *virtual* time units, fully
//! decoupled from wall-clock time. [`VirtualTime`] is an absolute instant on a
//! CPU's clock; [`VirtualDuration`] is a span between two instants. Both are
//! plain `u64` newtypes so they stay `Copy` and trivially comparable, and all
//! arithmetic saturates rather than wrapping so a clock can never be observed
//! moving backwards.

use std::fmt;
use std::ops::Add;

/// An absolute instant in virtual time.
///
/// Virtual time starts at [`VirtualTime::ZERO`] when a scheduler is built and
/// only ever moves forward. Instants are totally ordered, which the scheduler
/// relies on when picking the CPU with the smallest clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The origin of every run.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Creates an instant at `units` virtual time units past the origin.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        VirtualTime(units)
    }

    /// Raw number of time units since the origin.
    #[must_use]
    pub const fn as_units(self) -> u64 {
        self.0
    }

    /// Returns the later of `self` and `other`.
    #[must_use]
    pub fn max(self, other: VirtualTime) -> VirtualTime {
        VirtualTime(self.0.max(other.0))
    }

    /// The duration from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub fn since(self, earlier: VirtualTime) -> VirtualDuration {
        VirtualDuration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<VirtualDuration> for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: VirtualDuration) -> VirtualTime {
        VirtualTime(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// A span of virtual time, e.g. the argument of an explicit `advance_time`
/// request or a bus latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualDuration(u64);

impl VirtualDuration {
    /// The empty duration.
    pub const ZERO: VirtualDuration = VirtualDuration(0);

    /// Creates a duration of `units` virtual time units.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        VirtualDuration(units)
    }

    /// Raw number of time units.
    #[must_use]
    pub const fn as_units(self) -> u64 {
        self.0
    }

    /// Sum of two durations, saturating at the representable maximum.
    #[must_use]
    pub fn saturating_add(self, rhs: VirtualDuration) -> VirtualDuration {
        VirtualDuration(self.0.saturating_add(rhs.0))
    }

    /// Scales the duration by `factor`, saturating on overflow.
    #[must_use]
    pub fn saturating_mul(self, factor: u64) -> VirtualDuration {
        VirtualDuration(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for VirtualDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} units", self.0)
    }
}
