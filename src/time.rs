//! Simulated time.
//!
//! [`SimTime`] is a logical timestamp with no dependency on `std::time`.
//! It is owned exclusively by the [`Scheduler`](crate::Scheduler): time
//! advances only when the scheduler dispatches records, never from
//! wall-clock observation, and it never decreases.

/// A point in simulated time, counted in abstract ticks.
///
/// The surrounding program decides what a tick means (ns, ps, cycles);
/// the kernel performs no unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// The zero-point of simulated time.
    pub const ZERO: SimTime = SimTime(0);

    /// The largest representable time, used as the ceiling for unbounded runs.
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Creates a `SimTime` from a raw tick count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Returns the raw tick count.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the time `delta` ticks after `self`, or `None` on overflow.
    #[inline]
    pub fn advance(self, delta: u64) -> Option<SimTime> {
        self.0.checked_add(delta).map(SimTime)
    }

    /// Returns the number of ticks elapsed since `earlier`,
    /// or `None` if `earlier` is actually later.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}
