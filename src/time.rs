//! Time abstraction traits and the interrupt-driven millisecond tick counter.

use core::sync::atomic::{AtomicU32, Ordering};

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;

    /// Creates duration from milliseconds.
    fn from_millis(millis: u64) -> Self;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

/// Millisecond duration measured by a [`TickCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickDuration(pub u32);

impl TimeDuration for TickDuration {
    fn as_millis(&self) -> u64 {
        self.0 as u64
    }

    fn from_millis(millis: u64) -> Self {
        TickDuration(millis.min(u32::MAX as u64) as u32)
    }
}

/// Snapshot of a [`TickCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickInstant(pub u32);

impl TimeInstant for TickInstant {
    type Duration = TickDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        // The counter wraps after ~49.7 days
        TickDuration(self.0.wrapping_sub(earlier.0))
    }
}

/// Monotonic millisecond counter advanced from a timer interrupt.
///
/// The interrupt handler calls [`tick`](Self::tick) and nothing else; the main loop
/// only ever reads snapshots through [`TimeSource::now`]. Protocol state is never
/// touched from interrupt context, so timeout decisions happen in exactly one place.
///
/// ```
/// use led_matrix_link::{TickCounter, TimeSource};
///
/// static TICKS: TickCounter = TickCounter::new();
///
/// TICKS.tick();
/// TICKS.tick();
/// assert_eq!(TICKS.now().0, 2);
/// ```
#[derive(Debug)]
pub struct TickCounter {
    millis: AtomicU32,
}

impl TickCounter {
    /// Creates a counter starting at zero.
    pub const fn new() -> Self {
        Self {
            millis: AtomicU32::new(0),
        }
    }

    /// Advances the counter by one millisecond.
    ///
    /// Load and store instead of `fetch_add` so this also builds for cores without
    /// atomic read-modify-write (thumbv6m). There must be a single writer.
    pub fn tick(&self) {
        let current = self.millis.load(Ordering::Relaxed);
        self.millis.store(current.wrapping_add(1), Ordering::Relaxed);
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource<TickInstant> for TickCounter {
    fn now(&self) -> TickInstant {
        TickInstant(self.millis.load(Ordering::Relaxed))
    }
}
