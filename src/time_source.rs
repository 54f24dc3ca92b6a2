//! Clock readings used to seed the unsynced generator.
//!
//! Time sourcing is injected so tests and replays can pin the seed without
//! touching the system clock.

use std::sync::OnceLock;

use web_time::{Instant, SystemTime, UNIX_EPOCH};

/// Origin of every [`SystemClock`]'s monotonic reading, fixed on first use.
static PROCESS_ORIGIN: OnceLock<Instant> = OnceLock::new();

/// A source of the two clock readings the session seed is derived from.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> u64;

    /// Nanoseconds on a monotonic high-resolution timer.
    fn monotonic_nanos(&self) -> u64;
}

/// Reads the real system clock.
///
/// The monotonic reading is a process-wide timer: it counts from the first time any
/// `SystemClock` was created in this process, so a clock created later does not
/// start again at zero.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock sharing the process-wide monotonic origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: *PROCESS_ORIGIN.get_or_init(Instant::now),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_clock_secs(&self) -> u64 {
        // A clock set before 1970 yields 0 rather than an error; the seed only
        // needs to vary between runs.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }

    fn monotonic_nanos(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// A clock that returns fixed readings until told otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualClock {
    wall_clock_secs: u64,
    monotonic_nanos: u64,
}

impl ManualClock {
    /// Creates a clock with the given readings.
    #[must_use]
    pub const fn new(wall_clock_secs: u64, monotonic_nanos: u64) -> Self {
        Self {
            wall_clock_secs,
            monotonic_nanos,
        }
    }

    /// Moves both readings forward.
    pub fn advance(&mut self, secs: u64, nanos: u64) {
        self.wall_clock_secs = self.wall_clock_secs.saturating_add(secs);
        self.monotonic_nanos = self.monotonic_nanos.saturating_add(nanos);
    }
}

impl Clock for ManualClock {
    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock_secs
    }

    fn monotonic_nanos(&self) -> u64 {
        self.monotonic_nanos
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reports_fixed_readings() {
        let mut clock = ManualClock::new(10, 20);
        assert_eq!(clock.wall_clock_secs(), 10);
        assert_eq!(clock.monotonic_nanos(), 20);

        clock.advance(1, 5);
        assert_eq!(clock.wall_clock_secs(), 11);
        assert_eq!(clock.monotonic_nanos(), 25);
    }

    #[test]
    fn manual_clock_advance_saturates() {
        let mut clock = ManualClock::new(u64::MAX, u64::MAX);
        clock.advance(1, 1);
        assert_eq!(clock.wall_clock_secs(), u64::MAX);
    }

    #[test]
    fn system_clock_is_after_epoch_and_monotonic() {
        let clock = SystemClock::new();
        assert!(clock.wall_clock_secs() > 1_600_000_000);
        let a = clock.monotonic_nanos();
        let b = clock.monotonic_nanos();
        assert!(b >= a);
    }

    #[test]
    fn system_clocks_share_one_process_timer() {
        let first = SystemClock::new();
        let early = first.monotonic_nanos();
        std::thread::sleep(std::time::Duration::from_millis(2));

        let second = SystemClock::new();
        assert_eq!(first.origin, second.origin);
        assert!(second.monotonic_nanos() >= early + 2_000_000);
    }
}
