//! Configuration for [`UnsyncedState`](crate::UnsyncedState).
//!
//! # Example
//!
//! ```
//! use unsynced_state::{UnsyncedConfig, UnsyncedStateBuilder};
//!
//! // Pin the unsynced generator so a cosmetic bug can be replayed.
//! let state = UnsyncedStateBuilder::new()
//!     .with_config(UnsyncedConfig::deterministic(1234))?
//!     .build();
//! assert_eq!(state.rng().seed(), 1234);
//! # Ok::<(), unsynced_state::SessionError>(())
//! ```

use crate::{SessionError, RECONNECT_SIM_DRAW_BALANCE};

/// Configuration for the unsynced session state.
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Always use the
/// `..UnsyncedConfig::default()` pattern when constructing instances.
#[derive(Debug, Clone, Copy, PartialEq)]
#[must_use = "UnsyncedConfig has no effect unless passed to UnsyncedStateBuilder::with_config()"]
pub struct UnsyncedConfig {
    /// Optional seed for the unsynced generator.
    ///
    /// When `None`, the seed is derived from the configured clock at construction.
    ///
    /// Default: `None`
    pub rng_seed: Option<u64>,

    /// Fraction of the frame budget given to the simulation while a reconnecting
    /// client catches up. Must be in `(0.0, 1.0]`.
    ///
    /// Default: 0.15
    pub reconnect_sim_draw_balance: f32,

    /// Run the state invariant check after every lifecycle operation, even in release
    /// builds without the `paranoid` feature.
    ///
    /// Default: false
    pub check_invariants: bool,
}

impl Default for UnsyncedConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            reconnect_sim_draw_balance: RECONNECT_SIM_DRAW_BALANCE,
            check_invariants: false,
        }
    }
}

impl UnsyncedConfig {
    /// Creates a new `UnsyncedConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with a fixed generator seed and invariant checking on.
    ///
    /// Intended for tests and replay debugging.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            check_invariants: true,
            ..Self::default()
        }
    }

    /// Checks the configuration for out-of-range values.
    pub fn validate(&self) -> Result<(), SessionError> {
        let balance = self.reconnect_sim_draw_balance;
        if !(balance > 0.0 && balance <= 1.0) {
            return Err(SessionError::InvalidRequest {
                info: format!(
                    "reconnect_sim_draw_balance must be in (0.0, 1.0], got {}",
                    balance
                ),
            });
        }
        Ok(())
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
    fn default_matches_engine_constants() {
        let config = UnsyncedConfig::default();
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.reconnect_sim_draw_balance, 0.15);
        assert!(!config.check_invariants);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn new_equals_default() {
        assert_eq!(UnsyncedConfig::new(), UnsyncedConfig::default());
    }

    #[test]
    fn deterministic_preset_pins_seed() {
        let config = UnsyncedConfig::deterministic(77);
        assert_eq!(config.rng_seed, Some(77));
        assert!(config.check_invariants);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_balance() {
        for balance in [0.0, -0.1, 1.5, f32::NAN] {
            let config = UnsyncedConfig {
                reconnect_sim_draw_balance: balance,
                ..UnsyncedConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(SessionError::InvalidRequest { .. })),
                "balance {balance} should be rejected"
            );
        }
    }

    #[test]
    fn validate_accepts_full_budget() {
        let config = UnsyncedConfig {
            reconnect_sim_draw_balance: 1.0,
            ..UnsyncedConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
