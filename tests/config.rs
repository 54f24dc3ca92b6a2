//! Integration tests for [`UnsyncedConfig`].
//!
//! These tests verify that:
//! 1. The config has a consistent API (Default, Copy, Clone, PartialEq)
//! 2. The state works with the default config
//! 3. Presets and custom values reach the built state

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use unsynced_state::{
    ManualClock, SessionError, UnsyncedConfig, UnsyncedStateBuilder, RECONNECT_SIM_DRAW_BALANCE,
};

// ============================================================================
// UnsyncedConfig Tests
// ============================================================================

#[test]
fn config_is_copy_and_comparable() {
    let config = UnsyncedConfig::deterministic(5);
    let copy = config;
    assert_eq!(config, copy);
    assert_ne!(config, UnsyncedConfig::default());
}

#[test]
fn default_config_builds() {
    let state = UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::default())
        .unwrap()
        .build();
    assert_eq!(
        state.config().reconnect_sim_draw_balance,
        RECONNECT_SIM_DRAW_BALANCE
    );
    assert!(!state.config().check_invariants);
}

#[test]
fn custom_config_is_applied() {
    let config = UnsyncedConfig {
        rng_seed: Some(31337),
        reconnect_sim_draw_balance: 0.5,
        ..UnsyncedConfig::default()
    };
    let state = UnsyncedStateBuilder::new()
        .with_config(config)
        .unwrap()
        .build();
    assert_eq!(state.config(), &config);
    assert_eq!(state.rng().seed(), 31337);
}

#[test]
fn unseeded_config_uses_the_clock() {
    let build = |nanos| {
        UnsyncedStateBuilder::new()
            .with_clock(ManualClock::new(987_654_321, nanos))
            .build()
            .rng()
            .seed()
    };
    assert_eq!(build(0), 987_654_321 % 9007);
    assert_eq!(build(3), build(3));
}

#[test]
fn invalid_config_is_rejected_by_the_builder() {
    let err = UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig {
            reconnect_sim_draw_balance: 0.0,
            ..UnsyncedConfig::default()
        })
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidRequest { .. }));
}
