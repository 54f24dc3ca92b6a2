//! Unsynced random number generation based on PCG32.
//!
//! # PCG32 Algorithm
//!
//! PCG (Permuted Congruential Generator) is a family of simple fast space-efficient
//! statistically good algorithms for random number generation. PCG32 specifically:
//! - Has 64 bits of state, producing 32-bit output
//! - Period of 2^64
//! - Passes TestU01 statistical tests
//!
//! Reference: <https://www.pcg-random.org/>
//!
//! # Unsynced Use Only
//!
//! [`UnsyncedRng`] is seeded from the local clock, so every client draws a different
//! sequence. It exists for client-local cosmetic randomness (UI jitter, sound variation,
//! particle offsets). Drawing from it inside the simulation desyncs the game.
//!
//! ```rust
//! use unsynced_state::rng::{session_seed, Pcg32, Rng, SeedableRng};
//!
//! let seed = session_seed(1_700_000_000, 42);
//! let mut rng = Pcg32::seed_from_u64(seed);
//! let value = rng.gen_range(0..100);
//! assert!(value < 100);
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::{
    report_violation, report_violation_to,
    telemetry::{ViolationKind, ViolationObserver, ViolationSeverity},
    time_source::Clock,
};

/// PCG32 random number generator.
///
/// A minimal implementation of the PCG-XSH-RR variant with 64-bit state.
/// NOT cryptographically secure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

/// Default increment for single-stream PCG32.
const PCG_DEFAULT_INCREMENT: u64 = 1442695040888963407;

/// Multiplier constant for the LCG step.
const PCG_MULTIPLIER: u64 = 6364136223846793005;

/// Multiplier applied to the monotonic timestamp when deriving the session seed.
pub const SEED_TIME_MULTIPLIER: u64 = 9007;

impl Pcg32 {
    /// Creates a new PCG32 generator with the given state and stream.
    ///
    /// The increment must be odd; it is derived from `stream` as `(stream << 1) | 1`.
    #[must_use]
    pub const fn new(state: u64, stream: u64) -> Self {
        let inc = (stream << 1) | 1;
        let mut pcg = Self { state: 0, inc };
        pcg.state = pcg.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(pcg.inc);
        pcg.state = pcg.state.wrapping_add(state);
        pcg.state = pcg.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(pcg.inc);
        pcg
    }

    /// Generates the next 32-bit random value.
    #[inline]
    #[must_use]
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.inc);
        // XSH-RR output permutation
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Generates the next 64-bit random value by combining two 32-bit values.
    #[inline]
    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }
}

/// Trait for seeding random number generators.
pub trait SeedableRng: Sized {
    /// Creates a new RNG seeded from a 64-bit value.
    ///
    /// Different seeds produce different (statistically independent) sequences.
    #[must_use]
    fn seed_from_u64(seed: u64) -> Self;
}

impl SeedableRng for Pcg32 {
    fn seed_from_u64(seed: u64) -> Self {
        Self::new(seed, PCG_DEFAULT_INCREMENT)
    }
}

/// Trait for random number generation.
pub trait Rng {
    /// Returns the next 32-bit random value.
    fn next_u32(&mut self) -> u32;

    /// Returns the next 64-bit random value.
    fn next_u64(&mut self) -> u64;

    /// Generates a random `u32` value in the given range `[low, high)`.
    ///
    /// # Empty Range Behavior
    /// If `range.is_empty()`, reports a violation and returns `range.start`. The default
    /// reports to the [`TracingObserver`](crate::telemetry::TracingObserver);
    /// [`UnsyncedRng`] reports to the observer of the state that owns it.
    fn gen_range(&mut self, range: Range<u32>) -> u32 {
        if range.is_empty() {
            report_violation!(
                ViolationSeverity::Error,
                ViolationKind::Configuration,
                "gen_range called with empty range [{}..{})",
                range.start,
                range.end
            );
            return range.start;
        }
        sample_range(self, range)
    }

    /// Generates a random `f32` in `[0.0, 1.0)`.
    fn gen_f32(&mut self) -> f32 {
        // f32 has 24 bits of mantissa precision
        let val = self.next_u32() >> 8;
        val as f32 / (1u32 << 24) as f32
    }

    /// Generates a random boolean with the given probability of being `true`.
    ///
    /// `probability` is clamped to `[0.0, 1.0]`.
    fn gen_bool(&mut self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        let threshold = (p * f64::from(u32::MAX)) as u32;
        self.next_u32() < threshold
    }
}

/// Draws uniformly from a non-empty `range`.
fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: Range<u32>) -> u32 {
    let span = range.end.wrapping_sub(range.start);
    // Rejection sampling to avoid modulo bias
    let threshold = span.wrapping_neg() % span;
    loop {
        let random_value = rng.next_u32();
        if random_value >= threshold {
            return range.start.wrapping_add(random_value % span);
        }
    }
}

impl Rng for Pcg32 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        Self::next_u32(self)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        Self::next_u64(self)
    }
}

/// Derives the unsynced session seed from the two clock readings.
///
/// `seed = wall_clock_secs % ((monotonic_nanos + 1) * 9007)`. The modulus is never zero;
/// if the multiplication overflows `u64`, the wall-clock seconds are used unchanged
/// (they are already smaller than any modulus that large).
#[must_use]
pub const fn session_seed(wall_clock_secs: u64, monotonic_nanos: u64) -> u64 {
    match monotonic_nanos
        .saturating_add(1)
        .checked_mul(SEED_TIME_MULTIPLIER)
    {
        Some(modulus) => wall_clock_secs % modulus,
        None => wall_clock_secs,
    }
}

/// The per-process unsynced generator owned by [`UnsyncedState`](crate::UnsyncedState).
///
/// Wraps a [`Pcg32`] and remembers the seed it started from, which is useful when a
/// cosmetic glitch has to be reproduced from a log line.
///
/// Equality compares the seed and the position in the sequence.
#[derive(Clone)]
pub struct UnsyncedRng {
    seed: u64,
    inner: Pcg32,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl std::fmt::Debug for UnsyncedRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            seed,
            inner,
            violation_observer,
        } = self;

        f.debug_struct("UnsyncedRng")
            .field("seed", seed)
            .field("inner", inner)
            .field("has_violation_observer", &violation_observer.is_some())
            .finish()
    }
}

impl PartialEq for UnsyncedRng {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed && self.inner == other.inner
    }
}

impl Eq for UnsyncedRng {}

impl UnsyncedRng {
    /// Creates a generator from an explicit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg32::seed_from_u64(seed),
            violation_observer: None,
        }
    }

    /// Creates a generator seeded from the given clock via [`session_seed`].
    #[must_use]
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::from_seed(session_seed(
            clock.wall_clock_secs(),
            clock.monotonic_nanos(),
        ))
    }

    /// Returns the seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Restarts the sequence from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.inner = Pcg32::seed_from_u64(seed);
    }

    /// Routes empty-range reports to `observer` instead of the tracing fallback.
    pub(crate) fn set_violation_observer(
        &mut self,
        observer: Option<Arc<dyn ViolationObserver>>,
    ) {
        self.violation_observer = observer;
    }
}

impl Rng for UnsyncedRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn gen_range(&mut self, range: Range<u32>) -> u32 {
        if range.is_empty() {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Error,
                ViolationKind::Configuration,
                "gen_range called with empty range [{}..{})",
                range.start,
                range.end
            );
            return range.start;
        }
        sample_range(&mut self.inner, range)
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
    use super::Rng;
    use super::*;
    use crate::test_config::miri_case_count;
    use crate::time_source::ManualClock;
    use proptest::prelude::*;

    #[test]
    fn test_pcg32_deterministic() {
        let mut rng1 = Pcg32::seed_from_u64(12345);
        let mut rng2 = Pcg32::seed_from_u64(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_pcg32_different_seeds() {
        let mut rng1 = Pcg32::seed_from_u64(12345);
        let mut rng2 = Pcg32::seed_from_u64(54321);

        let mut same_count = 0;
        for _ in 0..100 {
            if rng1.next_u32() == rng2.next_u32() {
                same_count += 1;
            }
        }
        assert!(same_count < 10);
    }

    #[test]
    fn test_gen_range_empty_returns_start() {
        let mut rng = Pcg32::seed_from_u64(7);
        assert_eq!(rng.gen_range(5..5), 5);
    }

    #[test]
    fn test_gen_bool_extremes() {
        let mut rng = Pcg32::seed_from_u64(99);
        for _ in 0..100 {
            assert!(!rng.gen_bool(0.0));
        }
    }

    #[test]
    fn test_session_seed_formula() {
        // modulus = (42 + 1) * 9007 = 387301
        assert_eq!(session_seed(1_000_000, 42), 1_000_000 % 387_301);
        assert_eq!(session_seed(100, 0), 100 % 9007);
    }

    #[test]
    fn test_session_seed_overflow_uses_wall_clock() {
        assert_eq!(session_seed(1_700_000_000, u64::MAX), 1_700_000_000);
        assert_eq!(session_seed(55, u64::MAX / 2), 55);
    }

    #[test]
    fn test_unsynced_rng_from_clock_uses_session_seed() {
        let clock = ManualClock::new(1_000_000, 42);
        let rng = UnsyncedRng::from_clock(&clock);
        assert_eq!(rng.seed(), session_seed(1_000_000, 42));
    }

    #[test]
    fn test_unsynced_rng_reseed_restarts_sequence() {
        let mut rng = UnsyncedRng::from_seed(11);
        let first: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        rng.reseed(11);
        let second: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsynced_rng_reports_empty_range_to_its_observer() {
        let observer = Arc::new(crate::telemetry::CollectingObserver::new());
        let mut rng = UnsyncedRng::from_seed(11);
        rng.set_violation_observer(Some(observer.clone()));
        rng.reseed(12);

        assert_eq!(rng.gen_range(9..9), 9);
        assert!(observer.has_violation(ViolationKind::Configuration));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn test_unsynced_rng_draws_match_pcg32() {
        let mut unsynced = UnsyncedRng::from_seed(77);
        let mut plain = Pcg32::seed_from_u64(77);
        for _ in 0..32 {
            assert_eq!(unsynced.gen_range(3..40), plain.gen_range(3..40));
        }
    }

    #[test]
    fn test_unsynced_rng_equality_ignores_observer() {
        let mut observed = UnsyncedRng::from_seed(5);
        let observer = Arc::new(crate::telemetry::CollectingObserver::new());
        observed.set_violation_observer(Some(observer));
        assert_eq!(observed, UnsyncedRng::from_seed(5));
        assert!(format!("{observed:?}").contains("has_violation_observer: true"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: miri_case_count(),
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_gen_range_in_bounds(seed in any::<u64>(), start in 0u32..1000, len in 1u32..1000) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let v = rng.gen_range(start..start + len);
            prop_assert!(v >= start && v < start + len);
        }

        #[test]
        fn prop_gen_f32_unit_interval(seed in any::<u64>()) {
            let mut rng = UnsyncedRng::from_seed(seed);
            let v = rng.gen_f32();
            prop_assert!((0.0..1.0).contains(&v));
        }

        #[test]
        fn prop_session_seed_below_modulus(wall in any::<u64>(), nanos in 0u64..1_000_000_000) {
            let modulus = (nanos + 1) * SEED_TIME_MULTIPLIER;
            prop_assert!(session_seed(wall, nanos) < modulus);
        }
    }
}
