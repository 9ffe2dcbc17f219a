use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Clock a trial measures reaction time against.
///
/// Timestamps are opaque to callers; only elapsed intervals are read, so an
/// implementation is free to pick its own epoch.
pub trait Clock {
    type Timestamp: Copy + Clone;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, since: Self::Timestamp) -> Duration;

    /// Elapsed milliseconds with sub-millisecond precision, the resolution
    /// reaction times are reported in.
    fn elapsed_ms(&self, since: Self::Timestamp) -> f64 {
        self.elapsed(since).as_nanos() as f64 / 1e6
    }
}

/// Wall-clock backed by `Instant`, counting nanoseconds from construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since))
    }
}

/// Hand-driven clock. Clones share the same time source, so a test can hold
/// one handle to advance time while the trial controller owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.set(self.now_ns.get() + d.as_nanos() as u64);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.now_ns.get()
    }

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now_ns.get().saturating_sub(since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let t0 = clock.now();
        handle.advance_ms(250);
        assert_eq!(clock.elapsed_ms(t0), 250.0);
    }

    #[test]
    fn elapsed_never_goes_negative() {
        let clock = ManualClock::new();
        clock.advance_ms(10);
        let later = clock.now();
        // Asking about a timestamp from the future saturates to zero.
        assert_eq!(ManualClock::new().elapsed(later), Duration::ZERO);
        assert!(MonotonicClock::new().elapsed_ms(0) >= 0.0);
    }
}
