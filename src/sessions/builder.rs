//! Builder for [`UnsyncedState`](crate::UnsyncedState).

use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    rng::UnsyncedRng,
    sessions::config::UnsyncedConfig,
    sessions::player_registry::{PlayerRegistry, PlayerRoster},
    telemetry::ViolationObserver,
    time_source::{Clock, SystemClock},
    SessionError, UnsyncedState,
};

/// The [`UnsyncedStateBuilder`] builds the process-wide [`UnsyncedState`].
///
/// Defaults: the production [`PlayerRegistry`], [`UnsyncedConfig::default`], the system
/// clock for seeding, and violations logged through `tracing`.
///
/// # Example
///
/// ```
/// use unsynced_state::{ManualClock, UnsyncedStateBuilder};
///
/// let state = UnsyncedStateBuilder::new()
///     .with_clock(ManualClock::new(1_700_000_000, 41))
///     .build();
/// assert_eq!(state.rng().seed(), 1_700_000_000 % (42 * 9007));
/// ```
#[must_use = "UnsyncedStateBuilder must be consumed by calling build()"]
pub struct UnsyncedStateBuilder<P: PlayerRoster = PlayerRegistry> {
    config: UnsyncedConfig,
    /// Clock the generator seed is derived from when no explicit seed is configured.
    clock: Option<Box<dyn Clock>>,
    /// Optional observer for precondition and invariant violations.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
    roster: PhantomData<fn() -> P>,
}

impl<P: PlayerRoster> std::fmt::Debug for UnsyncedStateBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            config,
            clock,
            violation_observer,
            roster: _,
        } = self;

        f.debug_struct("UnsyncedStateBuilder")
            .field("config", config)
            .field("has_clock", &clock.is_some())
            .field("has_violation_observer", &violation_observer.is_some())
            .field("roster", &std::any::type_name::<P>())
            .finish()
    }
}

impl UnsyncedStateBuilder {
    /// Creates a builder for a state backed by [`PlayerRegistry`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: PlayerRoster> Default for UnsyncedStateBuilder<P> {
    fn default() -> Self {
        Self {
            config: UnsyncedConfig::default(),
            clock: None,
            violation_observer: None,
            roster: PhantomData,
        }
    }
}

impl<P: PlayerRoster> UnsyncedStateBuilder<P> {
    /// Switches the player roster type, keeping every other setting.
    pub fn with_roster<Q: PlayerRoster>(self) -> UnsyncedStateBuilder<Q> {
        let Self {
            config,
            clock,
            violation_observer,
            roster: _,
        } = self;
        UnsyncedStateBuilder {
            config,
            clock,
            violation_observer,
            roster: PhantomData,
        }
    }

    /// Sets the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidRequest`] if the configuration is out of range.
    pub fn with_config(mut self, config: UnsyncedConfig) -> Result<Self, SessionError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Sets the clock the generator seed is derived from.
    ///
    /// Ignored when [`UnsyncedConfig::rng_seed`] is set.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Sets a custom observer for violations.
    ///
    /// Without one, violations are logged via `tracing`.
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Consumes the builder and constructs the state.
    ///
    /// The roster is created here and the state starts out in its reset defaults.
    pub fn build(self) -> UnsyncedState<P> {
        let Self {
            config,
            clock,
            violation_observer,
            roster: _,
        } = self;

        let rng = match config.rng_seed {
            Some(seed) => UnsyncedRng::from_seed(seed),
            None => match clock {
                Some(clock) => UnsyncedRng::from_clock(clock.as_ref()),
                None => UnsyncedRng::from_clock(&SystemClock::new()),
            },
        };

        UnsyncedState::from_parts(rng, config, violation_observer)
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
    use crate::error::SessionResult;
    use crate::rng::session_seed;
    use crate::setup::GameSetup;
    use crate::telemetry::CollectingObserver;
    use crate::time_source::ManualClock;
    use crate::{PlayerHandle, PlayerRecord};

    #[derive(Debug, Default)]
    struct EmptyRoster {
        resets: usize,
    }

    impl PlayerRoster for EmptyRoster {
        fn reset(&mut self) {
            self.resets += 1;
        }

        fn load_from_setup(&mut self, _setup: &GameSetup) -> SessionResult<()> {
            Ok(())
        }

        fn player(&self, _handle: PlayerHandle) -> Option<&PlayerRecord> {
            None
        }

        fn num_players(&self) -> usize {
            0
        }
    }

    #[test]
    fn explicit_seed_wins_over_clock() {
        let state = UnsyncedStateBuilder::new()
            .with_clock(ManualClock::new(10, 10))
            .with_config(UnsyncedConfig::deterministic(99))
            .unwrap()
            .build();
        assert_eq!(state.rng().seed(), 99);
    }

    #[test]
    fn clock_seeds_generator() {
        let state = UnsyncedStateBuilder::new()
            .with_clock(ManualClock::new(1_234_567, 8))
            .build();
        assert_eq!(state.rng().seed(), session_seed(1_234_567, 8));
    }

    #[test]
    fn default_clock_keeps_counting_across_builds() {
        let anchor = SystemClock::new();
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(anchor.monotonic_nanos() >= 1_000_000);

        // Past ~190µs the modulus exceeds the wall clock, so the seed is the wall clock.
        let before = anchor.wall_clock_secs();
        let seed = UnsyncedStateBuilder::new().build().rng().seed();
        let after = anchor.wall_clock_secs();
        assert!((before..=after).contains(&seed));
    }

    #[test]
    fn with_config_rejects_invalid_balance() {
        let result = UnsyncedStateBuilder::new().with_config(UnsyncedConfig {
            reconnect_sim_draw_balance: 2.0,
            ..UnsyncedConfig::default()
        });
        assert!(matches!(result, Err(SessionError::InvalidRequest { .. })));
    }

    #[test]
    fn with_roster_keeps_settings() {
        let observer = Arc::new(CollectingObserver::new());
        let mut state = UnsyncedStateBuilder::new()
            .with_config(UnsyncedConfig::deterministic(3))
            .unwrap()
            .with_violation_observer(observer.clone())
            .with_roster::<EmptyRoster>()
            .build();

        assert_eq!(state.rng().seed(), 3);
        assert_eq!(state.players().resets, 0);
        state.reset();
        assert_eq!(state.players().resets, 1);

        assert!(state.my_player().is_none());
    }

    #[test]
    fn debug_lists_settings() {
        let builder = UnsyncedStateBuilder::new().with_clock(ManualClock::default());
        let debug = format!("{builder:?}");
        assert!(debug.contains("has_clock: true"));
        assert!(debug.contains("has_violation_observer: false"));
        assert!(debug.contains("PlayerRegistry"));
    }
}
