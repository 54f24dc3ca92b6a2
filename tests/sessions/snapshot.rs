use crate::common::loaded_state;
use unsynced_state::{
    FrameTimings, PlayerHandle, SessionError, TeamId, UnsyncedSnapshot, UnsyncedState,
};

#[test]
fn save_and_restore_across_states() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();
    state.set_spectating_full_select(false).unwrap();
    state.advance_time(10.0, 11.0);
    state.set_start_time(2.0);

    let bytes = state.snapshot().encode().unwrap();

    let mut restored = UnsyncedState::new();
    restored
        .restore(&UnsyncedSnapshot::decode(&bytes).unwrap())
        .unwrap();

    assert_eq!(restored.identity(), state.identity());
    assert_eq!(restored.timing().sim_elapsed_time, 10.0);
    assert_eq!(restored.timing().wall_elapsed_time, 11.0);
    assert_eq!(restored.timing().start_time, 2.0);
}

#[test]
fn runtime_only_fields_are_not_persisted() {
    let (mut state, _) = loaded_state();
    state.set_sim_steps_per_second(30.0);
    state.update_frame_timings(FrameTimings {
        avg_sim_step_time: 0.5,
        avg_draw_frame_time: 0.5,
        avg_frame_time: 0.5,
    });
    state.request_quit();
    state.set_first_person_control(true);
    let snapshot = state.snapshot();

    let mut restored = UnsyncedState::new();
    restored.restore(&snapshot).unwrap();

    assert_eq!(restored.sim_steps_per_second(), 0.0);
    assert_eq!(restored.frame_timings(), FrameTimings::default());
    assert!(!restored.quit_requested());
    assert!(!restored.first_person_control());
}

#[test]
fn inconsistent_snapshot_is_refused() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();

    let mut snapshot = state.snapshot();
    snapshot.spectating_full_view = true;

    let err = state.restore(&snapshot).unwrap_err();
    assert!(matches!(err, SessionError::InvalidRequest { .. }));
    assert!(!state.spectating_full_view());
    assert_eq!(state.local_playing_team(), TeamId::new(0));
}

#[test]
fn garbage_bytes_do_not_decode() {
    let err = UnsyncedSnapshot::decode(&[1, 2, 3]).unwrap_err();
    assert!(matches!(err, SessionError::SerializationError { .. }));
}
