use std::sync::Arc;

use crate::common::{
    capture_logs, four_player_setup, loaded_state, CountingRoster, RecordingTeams, TeamCall,
};
use unsynced_state::telemetry::{CollectingObserver, ViolationKind, ViolationSeverity};
use unsynced_state::{
    AllyTeamId, PlayerHandle, PlayerRoster, SessionError, TeamId, TeamRegistry, UnsyncedConfig,
    UnsyncedStateBuilder,
};

#[test]
fn normal_player_controls_its_team() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();

    assert_eq!(state.local_player(), PlayerHandle::new(1));
    assert_eq!(state.local_team(), TeamId::new(1));
    assert_eq!(state.local_ally_team(), AllyTeamId::new(1));
    assert_eq!(state.local_playing_team(), TeamId::new(1));
    assert_eq!(state.local_playing_ally_team(), AllyTeamId::new(1));
    assert!(!state.spectating());
    assert!(!state.spectating_full_view());
    assert!(!state.spectating_full_select());
    assert_eq!(state.my_player().unwrap().name, "bob");
}

#[test]
fn spectator_sees_and_selects_everything_but_controls_nothing() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();

    assert!(state.spectating());
    assert!(state.spectating_full_view());
    assert!(state.spectating_full_select());
    assert_eq!(state.local_team(), TeamId::new(2));
    assert_eq!(state.local_ally_team(), AllyTeamId::new(0));
    assert_eq!(state.local_playing_team(), TeamId::NONE);
    assert_eq!(state.local_playing_ally_team(), AllyTeamId::NONE);
}

#[test]
fn invalid_team_fails_after_storing_the_index() {
    let (mut state, teams) = loaded_state();
    let err = state
        .assign_local_player(PlayerHandle::new(3), &teams)
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::InvalidTeam {
            player: PlayerHandle::new(3),
            team: TeamId::new(99),
        }
    );
    assert!(err.to_string().starts_with("Invalid team in player setup"));
    assert_eq!(state.local_player(), PlayerHandle::new(3));
    assert_eq!(state.local_team(), TeamId::new(1));
    assert_eq!(state.local_playing_team(), TeamId::NONE);
    assert_eq!(state.my_player().unwrap().name, "mallory");
}

#[test]
fn invalid_ally_team_fails_without_touching_identity() {
    let (mut state, teams) = loaded_state();
    state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();

    let err = state
        .assign_local_player(PlayerHandle::new(4), &teams)
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::InvalidAllyTeam {
            player: PlayerHandle::new(4),
            team: TeamId::new(4),
            ally_team: AllyTeamId::new(7),
        }
    );
    assert!(err
        .to_string()
        .starts_with("Invalid ally-team in player setup"));

    assert_eq!(state.local_player(), PlayerHandle::new(4));
    assert_eq!(state.local_team(), TeamId::new(0));
    assert_eq!(state.local_ally_team(), AllyTeamId::new(0));
    assert_eq!(state.local_playing_team(), TeamId::new(0));
}

#[test]
fn team_is_validated_before_its_ally_team_is_looked_up() {
    let (mut state, teams) = loaded_state();
    let teams = RecordingTeams::new(teams);

    let _ = state.assign_local_player(PlayerHandle::new(3), &teams);
    assert_eq!(teams.calls(), vec![TeamCall::IsValidTeam(TeamId::new(99))]);

    teams.clear();
    state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();
    assert_eq!(
        teams.calls(),
        vec![
            TeamCall::IsValidTeam(TeamId::new(1)),
            TeamCall::AllyTeamOf(TeamId::new(1)),
            TeamCall::IsValidAllyTeam(AllyTeamId::new(1)),
        ]
    );
}

#[test]
fn unknown_player_is_reported_not_panicked() {
    let observer = Arc::new(CollectingObserver::new());
    let mut state = UnsyncedStateBuilder::new()
        .with_violation_observer(observer.clone())
        .build();
    state.load_from_setup(&four_player_setup()).unwrap();
    let teams = RecordingTeams::new(TeamRegistry::from_setup(&four_player_setup()).unwrap());

    let err = state
        .assign_local_player(PlayerHandle::new(17), &teams)
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::UnknownPlayer {
            player: PlayerHandle::new(17),
            num_players: 5,
        }
    );
    assert!(teams.calls().is_empty());
    assert!(observer.has_severity(ViolationSeverity::Critical));
    assert_eq!(observer.violations_of_kind(ViolationKind::PlayerLookup).len(), 1);
}

#[test]
fn assignment_by_setup_name() {
    let setup = four_player_setup();
    let (mut state, teams) = loaded_state();
    let me = state
        .assign_local_player_by_name(&setup.my_player_name, &teams)
        .unwrap();
    assert_eq!(Some(me), setup.my_player_handle());
    assert!(state.is_playing_team(TeamId::new(1)));
    assert!(!state.is_playing_team(TeamId::new(0)));
}

#[test]
fn assignment_works_with_any_roster() {
    let mut state = UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::deterministic(1))
        .unwrap()
        .with_roster::<CountingRoster>()
        .build();
    state.load_from_setup(&four_player_setup()).unwrap();
    let teams = TeamRegistry::from_setup(&four_player_setup()).unwrap();

    state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();
    assert_eq!(state.players().loads(), 1);
    assert_eq!(state.players().num_players(), 5);
    assert_eq!(state.local_playing_team(), TeamId::new(0));
}

#[test]
fn assignment_logs_outcome() {
    let ((), logs) = capture_logs(|| {
        let (mut state, teams) = loaded_state();
        state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();
        let _ = state.assign_local_player(PlayerHandle::new(3), &teams);
    });

    assert!(logs.contains("local player assigned"), "logs: {logs}");
    assert!(logs.contains("spectating=true"), "logs: {logs}");
    assert!(logs.contains("invalid team in player setup"), "logs: {logs}");
}
