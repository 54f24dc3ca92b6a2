use crate::common::{four_player_setup, loaded_state, CountingRoster};
use unsynced_state::telemetry::InvariantChecker;
use unsynced_state::{
    AllyTeamId, FrameTimings, GameSetup, PlayerHandle, PlayerRoster, SessionError, TeamId,
    TeamRegistry, UnsyncedConfig, UnsyncedState, UnsyncedStateBuilder,
};

fn counting_state() -> UnsyncedState<CountingRoster> {
    UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::deterministic(7))
        .unwrap()
        .with_roster::<CountingRoster>()
        .build()
}

#[test]
fn construction_starts_in_reset_defaults() {
    let state = UnsyncedState::new();

    assert_eq!(state.local_player(), PlayerHandle::new(0));
    assert_eq!(state.local_team(), TeamId::new(1));
    assert_eq!(state.local_ally_team(), AllyTeamId::new(1));
    assert_eq!(state.local_playing_team(), TeamId::NONE);
    assert_eq!(state.local_playing_ally_team(), AllyTeamId::NONE);
    assert_eq!(state.frame_timings(), FrameTimings::default());
    assert_eq!(state.sim_steps_per_second(), 0.0);
    assert!(!state.spectating());
    assert!(!state.quit_requested());
    assert!(state.check_invariants().is_ok());
}

#[test]
fn construction_creates_one_roster_without_resetting_it() {
    let state = counting_state();
    assert_eq!(state.players().resets(), 0);
    assert_eq!(state.players().loads(), 0);
}

#[test]
fn reset_reuses_the_same_roster() {
    let mut state = counting_state();
    let instance = state.players().instance();

    state.load_from_setup(&four_player_setup()).unwrap();
    state.reset();
    state.reset();

    assert_eq!(state.players().instance(), instance);
    assert_eq!(state.players().resets(), 2);
    assert_eq!(state.players().num_players(), 0);
}

#[test]
fn reset_undoes_a_full_session() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();
    state.set_sim_steps_per_second(30.0);
    state.update_frame_timings(FrameTimings {
        avg_sim_step_time: 0.01,
        avg_draw_frame_time: 0.02,
        avg_frame_time: 0.03,
    });
    state.advance_time(5.0, 6.0);
    state.set_start_time(1.5);
    state.set_first_person_control(true);
    state.request_quit();
    state.request_reload("restart.txt");

    state.reset();

    let fresh = UnsyncedState::new();
    assert_eq!(state.identity(), fresh.identity());
    assert_eq!(state.timing(), fresh.timing());
    assert_eq!(state.control(), fresh.control());
    assert!(state.my_player().is_none());
}

#[test]
fn reset_twice_equals_reset_once() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();

    state.reset();
    let once = (*state.identity(), *state.timing(), state.control().clone());
    state.reset();
    let twice = (*state.identity(), *state.timing(), state.control().clone());

    assert_eq!(once, twice);
}

#[test]
fn load_only_touches_the_roster() {
    let mut state = counting_state();
    state.set_sim_steps_per_second(12.0);
    let identity = *state.identity();

    state.load_from_setup(&four_player_setup()).unwrap();

    assert_eq!(state.players().loads(), 1);
    assert_eq!(*state.identity(), identity);
    assert_eq!(state.sim_steps_per_second(), 12.0);
}

#[test]
fn load_rejects_empty_setup() {
    let mut state = UnsyncedState::new();
    let err = state.load_from_setup(&GameSetup::default()).unwrap_err();
    assert!(matches!(err, SessionError::InvalidSetup { .. }));
    assert!(err.is_content_error());
}

#[test]
fn session_restart_cycle() {
    let setup = four_player_setup();
    let teams = TeamRegistry::from_setup(&setup).unwrap();
    let mut state = counting_state();

    for round in 0..3 {
        state.reset();
        state.load_from_setup(&setup).unwrap();
        state.assign_local_player(PlayerHandle::new(round % 3), &teams).unwrap();
        assert!(state.my_player().is_some());
        assert!(state.check_invariants().is_ok());
    }
    assert_eq!(state.players().resets(), 3);
    assert_eq!(state.players().loads(), 3);
}
