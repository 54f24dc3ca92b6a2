use std::sync::Arc;

use crate::common::loaded_state;
use unsynced_state::telemetry::{CollectingObserver, ViolationKind, ViolationSeverity};
use unsynced_state::{
    FrameTimings, PlayerHandle, Rng, SessionError, UnsyncedConfig, UnsyncedState,
    UnsyncedStateBuilder,
};

#[test]
fn timing_values_are_stored() {
    let mut state = UnsyncedState::new();
    state.set_sim_steps_per_second(29.5);
    state.update_frame_timings(FrameTimings {
        avg_sim_step_time: 0.004,
        avg_draw_frame_time: 0.008,
        avg_frame_time: 0.016,
    });
    state.set_start_time(3.0);
    state.advance_time(0.033, 0.016);
    state.advance_time(0.033, 0.016);

    assert_eq!(state.sim_steps_per_second(), 29.5);
    assert_eq!(state.frame_timings().avg_frame_time, 0.016);
    assert_eq!(state.timing().start_time, 3.0);
    assert_eq!(state.timing().sim_elapsed_time, 0.033 + 0.033);
    assert_eq!(state.timing().wall_elapsed_time, 0.016 + 0.016);
}

#[test]
fn out_of_range_timings_are_clamped_with_a_warning() {
    let observer = Arc::new(CollectingObserver::new());
    let mut state = UnsyncedStateBuilder::new()
        .with_violation_observer(observer.clone())
        .build();

    state.set_start_time(f32::INFINITY);
    state.advance_time(f32::NAN, -2.0);

    assert_eq!(state.timing().start_time, 0.0);
    assert_eq!(state.timing().sim_elapsed_time, 0.0);
    assert_eq!(state.timing().wall_elapsed_time, 0.0);

    let warnings = observer.violations_of_kind(ViolationKind::Timing);
    assert_eq!(warnings.len(), 3);
    assert!(warnings
        .iter()
        .all(|v| v.severity == ViolationSeverity::Warning));
}

#[test]
fn quit_request_sticks_until_reset() {
    let mut state = UnsyncedState::new();
    state.request_quit();
    state.request_quit();
    assert!(state.quit_requested());
    state.reset();
    assert!(!state.quit_requested());
}

#[test]
fn reload_request_hands_over_script_once() {
    let mut state = UnsyncedState::new();
    state.request_reload("[game] { mapname=Tabula; }");

    assert!(state.reload_requested());
    let script = state.take_reload_request().unwrap();
    assert_eq!(script, "[game] { mapname=Tabula; }");
    assert!(!state.reload_requested());
    assert_eq!(state.take_reload_request(), None);
}

#[test]
fn reload_with_empty_script_means_current_script() {
    let mut state = UnsyncedState::new();
    state.request_reload("");
    assert_eq!(state.take_reload_request(), Some(String::new()));
}

#[test]
fn first_person_control_toggles() {
    let mut state = UnsyncedState::new();
    state.set_first_person_control(true);
    assert!(state.first_person_control());
    state.set_first_person_control(false);
    assert!(!state.first_person_control());
}

#[test]
fn spectator_can_narrow_its_view() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();

    state.set_spectating_full_view(false).unwrap();
    assert!(!state.spectating_full_view());
    assert!(state.spectating_full_select());

    state.set_spectating_full_select(false).unwrap();
    state.set_spectating_full_view(true).unwrap();
    assert!(state.spectating_full_view());
    assert!(!state.spectating_full_select());
}

#[test]
fn player_cannot_enable_full_view() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();

    let err = state.set_spectating_full_view(true).unwrap_err();
    assert!(matches!(err, SessionError::InvalidRequest { .. }));
    let err = state.set_spectating_full_select(true).unwrap_err();
    assert!(matches!(err, SessionError::InvalidRequest { .. }));
    assert!(!state.spectating_full_view());
    assert!(!state.spectating_full_select());
}

#[test]
fn pinned_seed_gives_repeatable_draws() {
    let draw = || {
        let mut state = UnsyncedStateBuilder::new()
            .with_config(UnsyncedConfig::deterministic(2024))
            .unwrap()
            .build();
        (0..8)
            .map(|_| state.rng_mut().gen_range(0..100))
            .collect::<Vec<u32>>()
    };
    assert_eq!(draw(), draw());
}

#[test]
fn empty_rng_range_is_reported_to_the_state_observer() {
    let observer = Arc::new(CollectingObserver::new());
    let mut state = UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::deterministic(7))
        .unwrap()
        .with_violation_observer(observer.clone())
        .build();

    assert_eq!(state.rng_mut().gen_range(5..5), 5);

    let reports = observer.violations_of_kind(ViolationKind::Configuration);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, ViolationSeverity::Error);
}
