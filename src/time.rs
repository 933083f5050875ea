//! Time abstraction traits for platform-agnostic timing.
//!
//! Button edges are timestamped by the interrupt context with whatever
//! monotonic clock the board provides; the event source only needs to
//! measure the distance between two instants in milliseconds.

/// Trait for abstracting time sources.
pub trait TimeSource<I: TimeInstant> {
    /// Returns the current time instant.
    fn now(&self) -> I;
}

/// Trait abstraction for duration types.
pub trait TimeDuration: Copy + PartialEq {
    /// Converts duration to milliseconds.
    fn as_millis(&self) -> u64;
}

/// Trait abstraction for instant types.
pub trait TimeInstant: Copy {
    /// Duration type for this instant.
    type Duration: TimeDuration;

    /// Calculates duration since an earlier instant.
    ///
    /// Implementations should saturate to zero if `earlier` is later than `self`.
    fn duration_since(&self, earlier: Self) -> Self::Duration;
}

/// Milliseconds elapsed from `earlier` to `later`.
#[inline]
pub fn millis_between<I: TimeInstant>(earlier: I, later: I) -> u64 {
    later.duration_since(earlier).as_millis()
}
