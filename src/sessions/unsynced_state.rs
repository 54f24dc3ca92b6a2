//! The per-process container for client-local session state.

use std::sync::Arc;

use crate::error::{SessionError, SessionResult};
use crate::report_violation_to;
use crate::rng::UnsyncedRng;
use crate::sessions::config::UnsyncedConfig;
use crate::sessions::player_registry::{PlayerRecord, PlayerRegistry, PlayerRoster};
use crate::sessions::snapshot::UnsyncedSnapshot;
use crate::sessions::team_registry::TeamRoster;
use crate::setup::GameSetup;
use crate::telemetry::{
    report_to_observer, InvariantChecker, InvariantViolation, SpecViolation, ViolationKind,
    ViolationObserver, ViolationSeverity,
};
use crate::{AllyTeamId, PlayerHandle, TeamId};

/// Smoothed frame duration every average starts from after a reset.
pub const DEFAULT_FRAME_TIME: f32 = 0.001;

/// Smoothed frame durations, recomputed continuously by the timing driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimings {
    /// Average duration of one simulation step.
    pub avg_sim_step_time: f32,
    /// Average duration of drawing one frame.
    pub avg_draw_frame_time: f32,
    /// Average duration of a whole frame.
    pub avg_frame_time: f32,
}

impl Default for FrameTimings {
    fn default() -> Self {
        Self {
            avg_sim_step_time: DEFAULT_FRAME_TIME,
            avg_draw_frame_time: DEFAULT_FRAME_TIME,
            avg_frame_time: DEFAULT_FRAME_TIME,
        }
    }
}

/// Frame-timing statistics. Never negative, never read by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingStats {
    /// Simulation steps per second as last measured.
    pub sim_steps_per_second: f32,
    /// Smoothed frame durations.
    pub frame_timings: FrameTimings,
    /// Simulation time elapsed since session start, scaled by game speed.
    pub sim_elapsed_time: f32,
    /// Wall-clock time elapsed since session start.
    pub wall_elapsed_time: f32,
    /// Timestamp at which the session started.
    pub start_time: f32,
}

/// Who this process is within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Index of the local player record.
    pub player: PlayerHandle,
    /// Team from the local player's record.
    pub team: TeamId,
    /// Ally-team of [`team`](Self::team).
    pub ally_team: AllyTeamId,
    /// Team the local player controls; [`TeamId::NONE`] while spectating.
    pub playing_team: TeamId,
    /// Ally-team the local player controls; [`AllyTeamId::NONE`] while spectating.
    pub playing_ally_team: AllyTeamId,
    /// Whether the local player only watches.
    pub spectating: bool,
    /// Whether the spectator sees everything.
    pub spectating_full_view: bool,
    /// Whether the spectator may select anything.
    pub spectating_full_select: bool,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self {
            player: PlayerHandle::new(0),
            team: TeamId::new(1),
            ally_team: AllyTeamId::new(1),
            playing_team: TeamId::NONE,
            playing_ally_team: AllyTeamId::NONE,
            spectating: false,
            spectating_full_view: false,
            spectating_full_select: false,
        }
    }
}

impl LocalIdentity {
    /// Checks the spectator/playing-team relationship.
    ///
    /// A spectator controls no team. A non-spectator controls its own team, or nothing
    /// at all before the first successful assignment.
    pub(crate) fn check(&self) -> Result<(), InvariantViolation> {
        if self.spectating {
            if !self.playing_team.is_none() || !self.playing_ally_team.is_none() {
                return Err(
                    InvariantViolation::new("LocalIdentity", "spectator controls a team")
                        .with_details(format!(
                            "playing_team={}, playing_ally_team={}",
                            self.playing_team, self.playing_ally_team
                        )),
                );
            }
        } else {
            let unassigned = self.playing_team.is_none() && self.playing_ally_team.is_none();
            let own_team =
                self.playing_team == self.team && self.playing_ally_team == self.ally_team;
            if !(unassigned || own_team) {
                return Err(InvariantViolation::new(
                    "LocalIdentity",
                    "player controls a team other than its own",
                )
                .with_details(format!(
                    "team={}, playing_team={}, ally_team={}, playing_ally_team={}",
                    self.team, self.playing_team, self.ally_team, self.playing_ally_team
                )));
            }
            if self.spectating_full_view || self.spectating_full_select {
                return Err(InvariantViolation::new(
                    "LocalIdentity",
                    "full spectator view or selection without spectating",
                ));
            }
        }
        Ok(())
    }
}

/// Quit/reload requests and input mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionControl {
    /// Whether the local player drives a unit in first-person mode.
    pub first_person_control: bool,
    /// Set once the user asked to leave the process.
    pub quit_requested: bool,
    /// Set once the session should be torn down and restarted.
    pub reload_requested: bool,
    /// Start script to restart with; empty means "the current one".
    pub reload_script: String,
}

/// Client-local ("unsynced") session state.
///
/// One instance lives for the whole process. It is [`reset`](Self::reset), not
/// recreated, on every session restart, and it exclusively owns the player roster `P`.
/// Team data is borrowed from the synced side only for the duration of
/// [`assign_local_player`](Self::assign_local_player).
///
/// Nothing here may influence simulation outcomes: not the timing statistics, not the
/// unsynced generator.
pub struct UnsyncedState<P: PlayerRoster = PlayerRegistry> {
    timing: TimingStats,
    identity: LocalIdentity,
    control: SessionControl,
    players: P,
    rng: UnsyncedRng,
    config: UnsyncedConfig,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl<P: PlayerRoster + std::fmt::Debug> std::fmt::Debug for UnsyncedState<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            timing,
            identity,
            control,
            players,
            rng,
            config,
            violation_observer,
        } = self;

        f.debug_struct("UnsyncedState")
            .field("timing", timing)
            .field("identity", identity)
            .field("control", control)
            .field("players", players)
            .field("rng", rng)
            .field("config", config)
            .field("has_violation_observer", &violation_observer.is_some())
            .finish()
    }
}

impl UnsyncedState {
    /// Creates the state with the production player registry, a clock-derived
    /// generator seed and default configuration.
    ///
    /// Use [`UnsyncedStateBuilder`](crate::UnsyncedStateBuilder) to choose the roster
    /// type, seed, clock or violation observer.
    #[must_use]
    pub fn new() -> Self {
        crate::UnsyncedStateBuilder::new().build()
    }
}

impl Default for UnsyncedState {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PlayerRoster> UnsyncedState<P> {
    /// Construction proper: the roster is created here, once, and never again.
    pub(crate) fn from_parts(
        mut rng: UnsyncedRng,
        config: UnsyncedConfig,
        violation_observer: Option<Arc<dyn ViolationObserver>>,
    ) -> Self {
        rng.set_violation_observer(violation_observer.clone());
        let state = Self {
            timing: TimingStats::default(),
            identity: LocalIdentity::default(),
            control: SessionControl::default(),
            players: P::default(),
            rng,
            config,
            violation_observer,
        };
        tracing::debug!(seed = state.rng.seed(), "unsynced state constructed");
        state.verify_invariants("construct");
        state
    }

    // ###############
    // #  LIFECYCLE  #
    // ###############

    /// Restores every field to its default and resets the owned roster in place.
    ///
    /// Idempotent and infallible. The unsynced generator keeps its sequence.
    pub fn reset(&mut self) {
        self.timing = TimingStats::default();
        self.identity = LocalIdentity::default();
        self.control = SessionControl::default();
        self.players.reset();
        tracing::debug!("unsynced state reset");
        self.verify_invariants("reset");
    }

    /// Hands session setup data to the player roster.
    ///
    /// None of this state's own fields change.
    pub fn load_from_setup(&mut self, setup: &GameSetup) -> SessionResult<()> {
        self.players.load_from_setup(setup)?;
        tracing::debug!(
            num_players = self.players.num_players(),
            "player roster loaded from setup"
        );
        Ok(())
    }

    /// Resolves which player this process is and what it controls.
    ///
    /// The player index is stored before anything is validated, so it stays updated even
    /// when this returns an error. All other identity fields are only written once the
    /// team, and then the ally-team derived from it, have been validated; on error they
    /// keep their previous values.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownPlayer`] if the roster has no record for `player`. This is
    ///   a caller bug and is also reported as a critical violation.
    /// - [`SessionError::InvalidTeam`] if the record's team is not valid.
    /// - [`SessionError::InvalidAllyTeam`] if that team's ally-team is not valid.
    pub fn assign_local_player<T>(&mut self, player: PlayerHandle, teams: &T) -> SessionResult<()>
    where
        T: TeamRoster + ?Sized,
    {
        self.identity.player = player;
        tracing::debug!(%player, "local player index set");

        let Some(record) = self.players.player(player) else {
            let num_players = self.players.num_players();
            let violation = SpecViolation::new(
                ViolationSeverity::Critical,
                ViolationKind::PlayerLookup,
                "no player record for the local player",
                concat!(file!(), ":", line!()),
            )
            .with_player(player)
            .with_context("num_players", num_players.to_string());
            report_to_observer(self.violation_observer.as_ref(), &violation);
            return Err(SessionError::UnknownPlayer {
                player,
                num_players,
            });
        };
        let team = record.team;
        let spectator = record.spectator;

        if !teams.is_valid_team(team) {
            tracing::warn!(%player, %team, "invalid team in player setup");
            return Err(SessionError::InvalidTeam { player, team });
        }

        let ally_team = teams.ally_team_of(team);
        if !teams.is_valid_ally_team(ally_team) {
            tracing::warn!(%player, %team, %ally_team, "invalid ally-team in player setup");
            return Err(SessionError::InvalidAllyTeam {
                player,
                team,
                ally_team,
            });
        }

        let identity = &mut self.identity;
        identity.team = team;
        identity.ally_team = ally_team;
        identity.spectating = spectator;
        identity.spectating_full_view = spectator;
        identity.spectating_full_select = spectator;
        if spectator {
            identity.playing_team = TeamId::NONE;
            identity.playing_ally_team = AllyTeamId::NONE;
        } else {
            identity.playing_team = team;
            identity.playing_ally_team = ally_team;
        }

        tracing::info!(
            %player,
            %team,
            %ally_team,
            spectating = spectator,
            "local player assigned"
        );
        self.verify_invariants("assign_local_player");
        Ok(())
    }

    /// Finds the local player by name and assigns it.
    ///
    /// A name that matches nobody is a content error ([`SessionError::InvalidSetup`]).
    pub fn assign_local_player_by_name<T>(
        &mut self,
        name: &str,
        teams: &T,
    ) -> SessionResult<PlayerHandle>
    where
        T: TeamRoster + ?Sized,
    {
        let player =
            self.players
                .find_by_name(name)
                .ok_or_else(|| SessionError::InvalidSetup {
                    reason: format!("no player named {:?} in setup", name),
                })?;
        self.assign_local_player(player, teams)?;
        Ok(player)
    }

    /// The local player's record.
    ///
    /// `None` only if the roster holds no record at the stored index, which means
    /// [`assign_local_player`](Self::assign_local_player) has not succeeded for the
    /// current setup.
    #[must_use]
    pub fn my_player(&self) -> Option<&PlayerRecord> {
        self.players.player(self.identity.player)
    }

    /// Read access to the owned player roster.
    #[must_use]
    pub fn players(&self) -> &P {
        &self.players
    }

    // ##############
    // #  IDENTITY  #
    // ##############

    /// The whole local identity.
    #[must_use]
    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Index of the local player record.
    #[must_use]
    pub fn local_player(&self) -> PlayerHandle {
        self.identity.player
    }

    /// The local player's team.
    #[must_use]
    pub fn local_team(&self) -> TeamId {
        self.identity.team
    }

    /// The local player's ally-team.
    #[must_use]
    pub fn local_ally_team(&self) -> AllyTeamId {
        self.identity.ally_team
    }

    /// The team the local player controls, [`TeamId::NONE`] if none.
    #[must_use]
    pub fn local_playing_team(&self) -> TeamId {
        self.identity.playing_team
    }

    /// The ally-team the local player controls, [`AllyTeamId::NONE`] if none.
    #[must_use]
    pub fn local_playing_ally_team(&self) -> AllyTeamId {
        self.identity.playing_ally_team
    }

    /// Whether the local player only watches.
    #[must_use]
    pub fn spectating(&self) -> bool {
        self.identity.spectating
    }

    /// Whether the spectator sees everything.
    #[must_use]
    pub fn spectating_full_view(&self) -> bool {
        self.identity.spectating_full_view
    }

    /// Whether the spectator may select anything.
    #[must_use]
    pub fn spectating_full_select(&self) -> bool {
        self.identity.spectating_full_select
    }

    /// Whether the local player controls a team.
    #[must_use]
    pub fn controls_team(&self) -> bool {
        !self.identity.playing_team.is_none()
    }

    /// Whether `team` is the team the local player controls.
    #[must_use]
    pub fn is_playing_team(&self, team: TeamId) -> bool {
        !team.is_none() && self.identity.playing_team == team
    }

    /// Narrows or restores the spectator's view.
    ///
    /// Only spectators have a full view to toggle.
    pub fn set_spectating_full_view(&mut self, enabled: bool) -> SessionResult<()> {
        self.require_spectating("full spectator view")?;
        self.identity.spectating_full_view = enabled;
        Ok(())
    }

    /// Narrows or restores the spectator's selection rights.
    pub fn set_spectating_full_select(&mut self, enabled: bool) -> SessionResult<()> {
        self.require_spectating("full spectator selection")?;
        self.identity.spectating_full_select = enabled;
        Ok(())
    }

    fn require_spectating(&self, what: &str) -> SessionResult<()> {
        if self.identity.spectating {
            Ok(())
        } else {
            Err(SessionError::InvalidRequest {
                info: format!("{} requires spectating", what),
            })
        }
    }

    // ############
    // #  TIMING  #
    // ############

    /// The timing statistics.
    #[must_use]
    pub fn timing(&self) -> &TimingStats {
        &self.timing
    }

    /// Simulation steps per second as last measured.
    #[must_use]
    pub fn sim_steps_per_second(&self) -> f32 {
        self.timing.sim_steps_per_second
    }

    /// Smoothed frame durations.
    #[must_use]
    pub fn frame_timings(&self) -> FrameTimings {
        self.timing.frame_timings
    }

    /// Stores a new steps-per-second measurement.
    pub fn set_sim_steps_per_second(&mut self, value: f32) {
        self.timing.sim_steps_per_second = self.sanitize("sim_steps_per_second", value);
    }

    /// Stores new smoothed frame durations.
    pub fn update_frame_timings(&mut self, timings: FrameTimings) {
        self.timing.frame_timings = FrameTimings {
            avg_sim_step_time: self.sanitize("avg_sim_step_time", timings.avg_sim_step_time),
            avg_draw_frame_time: self
                .sanitize("avg_draw_frame_time", timings.avg_draw_frame_time),
            avg_frame_time: self.sanitize("avg_frame_time", timings.avg_frame_time),
        };
    }

    /// Adds elapsed simulation and wall-clock time.
    pub fn advance_time(&mut self, sim_delta: f32, wall_delta: f32) {
        let sim_delta = self.sanitize("sim_delta", sim_delta);
        let wall_delta = self.sanitize("wall_delta", wall_delta);
        self.timing.sim_elapsed_time += sim_delta;
        self.timing.wall_elapsed_time += wall_delta;
    }

    /// Records the session start timestamp.
    pub fn set_start_time(&mut self, start_time: f32) {
        self.timing.start_time = self.sanitize("start_time", start_time);
    }

    fn sanitize(&self, what: &'static str, value: f32) -> f32 {
        if value.is_finite() && value >= 0.0 {
            value
        } else {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::Timing,
                "{} must be finite and non-negative, got {}; clamped to 0",
                what,
                value
            );
            0.0
        }
    }

    // #####################
    // #  SESSION CONTROL  #
    // #####################

    /// Quit/reload flags and input mode.
    #[must_use]
    pub fn control(&self) -> &SessionControl {
        &self.control
    }

    /// Whether the user asked to quit.
    #[must_use]
    pub fn quit_requested(&self) -> bool {
        self.control.quit_requested
    }

    /// Whether a session restart is pending.
    #[must_use]
    pub fn reload_requested(&self) -> bool {
        self.control.reload_requested
    }

    /// Start script for the pending restart; empty means "the current one".
    #[must_use]
    pub fn reload_script(&self) -> &str {
        &self.control.reload_script
    }

    /// Whether first-person control is active.
    #[must_use]
    pub fn first_person_control(&self) -> bool {
        self.control.first_person_control
    }

    /// Asks the main loop to quit.
    pub fn request_quit(&mut self) {
        tracing::info!("quit requested");
        self.control.quit_requested = true;
    }

    /// Asks the bootstrap loop to restart the session with `script`.
    pub fn request_reload(&mut self, script: impl Into<String>) {
        self.control.reload_requested = true;
        self.control.reload_script = script.into();
        tracing::info!(
            script_len = self.control.reload_script.len(),
            "session reload requested"
        );
    }

    /// Consumes a pending reload request, returning its start script.
    pub fn take_reload_request(&mut self) -> Option<String> {
        if !self.control.reload_requested {
            return None;
        }
        self.control.reload_requested = false;
        Some(std::mem::take(&mut self.control.reload_script))
    }

    /// Switches first-person control on or off.
    pub fn set_first_person_control(&mut self, enabled: bool) {
        self.control.first_person_control = enabled;
    }

    // ############
    // #  OTHERS  #
    // ############

    /// The unsynced generator.
    #[must_use]
    pub fn rng(&self) -> &UnsyncedRng {
        &self.rng
    }

    /// Mutable access to the unsynced generator, for client-local cosmetic draws.
    pub fn rng_mut(&mut self) -> &mut UnsyncedRng {
        &mut self.rng
    }

    /// The configuration this state was built with.
    #[must_use]
    pub fn config(&self) -> &UnsyncedConfig {
        &self.config
    }

    /// Captures the persisted fields.
    #[must_use]
    pub fn snapshot(&self) -> UnsyncedSnapshot {
        UnsyncedSnapshot::capture(&self.identity, &self.timing)
    }

    /// Restores the persisted fields from a snapshot.
    ///
    /// Timing averages, session-control flags and the roster are left alone. A snapshot
    /// whose identity breaks the spectator rules is rejected without changing anything.
    pub fn restore(&mut self, snapshot: &UnsyncedSnapshot) -> SessionResult<()> {
        let identity = snapshot.identity();
        if let Err(violation) = identity.check() {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Error,
                ViolationKind::Lifecycle,
                "refusing to restore snapshot: {}",
                violation
            );
            return Err(SessionError::InvalidRequest {
                info: format!("inconsistent snapshot: {}", violation),
            });
        }

        self.identity = identity;
        self.timing.sim_elapsed_time = self.sanitize("sim_elapsed_time", snapshot.sim_elapsed_time);
        self.timing.wall_elapsed_time =
            self.sanitize("wall_elapsed_time", snapshot.wall_elapsed_time);
        self.timing.start_time = self.sanitize("start_time", snapshot.start_time);
        tracing::debug!(player = %self.identity.player, "unsynced state restored from snapshot");
        self.verify_invariants("restore");
        Ok(())
    }

    fn verify_invariants(&self, context: &str) {
        if !(self.config.check_invariants || cfg!(any(debug_assertions, feature = "paranoid")))
        {
            return;
        }
        if let Err(violation) = self.check_invariants() {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Critical,
                ViolationKind::Invariant,
                "{} [context: {}]",
                violation,
                context
            );
        }
    }
}

impl<P: PlayerRoster> InvariantChecker for UnsyncedState<P> {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let TimingStats {
            sim_steps_per_second,
            frame_timings:
                FrameTimings {
                    avg_sim_step_time,
                    avg_draw_frame_time,
                    avg_frame_time,
                },
            sim_elapsed_time,
            wall_elapsed_time,
            start_time,
        } = self.timing;
        let accumulators = [
            ("sim_steps_per_second", sim_steps_per_second),
            ("avg_sim_step_time", avg_sim_step_time),
            ("avg_draw_frame_time", avg_draw_frame_time),
            ("avg_frame_time", avg_frame_time),
            ("sim_elapsed_time", sim_elapsed_time),
            ("wall_elapsed_time", wall_elapsed_time),
            ("start_time", start_time),
        ];
        for (name, value) in accumulators {
            if !(value.is_finite() && value >= 0.0) {
                return Err(
                    InvariantViolation::new("UnsyncedState", "timing accumulator out of range")
                        .with_details(format!("{}={}", name, value)),
                );
            }
        }
        self.identity.check()
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
    use crate::setup::{PlayerSetup, TeamSetup};
    use crate::telemetry::CollectingObserver;
    use crate::test_config::proptest_config;
    use crate::{TeamRegistry, UnsyncedStateBuilder};
    use proptest::prelude::*;

    /// Player 0 plays team 0, player 1 spectates on team 1, player 2 plays team 3,
    /// player 3 claims team 99. Teams 0..4 exist; team 2 points at a missing ally-team.
    fn setup() -> GameSetup {
        GameSetup {
            players: vec![
                PlayerSetup::new("alice", TeamId::new(0)),
                PlayerSetup::new("bob", TeamId::new(1)).spectating(),
                PlayerSetup::new("carol", TeamId::new(3)),
                PlayerSetup::new("mallory", TeamId::new(99)),
                PlayerSetup::new("dave", TeamId::new(2)),
            ],
            teams: vec![
                TeamSetup::new(AllyTeamId::new(1)),
                TeamSetup::new(AllyTeamId::new(1)),
                TeamSetup::new(AllyTeamId::new(8)),
                TeamSetup::new(AllyTeamId::new(0)),
            ],
            num_ally_teams: 2,
            my_player_name: "carol".to_owned(),
        }
    }

    fn loaded() -> (UnsyncedState, TeamRegistry, Arc<CollectingObserver>) {
        let observer = Arc::new(CollectingObserver::new());
        let mut state = UnsyncedStateBuilder::new()
            .with_config(UnsyncedConfig::deterministic(5))
            .unwrap()
            .with_violation_observer(observer.clone())
            .build();
        let setup = setup();
        state.load_from_setup(&setup).unwrap();
        (state, TeamRegistry::from_setup(&setup).unwrap(), observer)
    }

    #[test]
    fn new_state_has_documented_defaults() {
        let state = UnsyncedState::new();
        assert_eq!(state.local_player(), PlayerHandle::new(0));
        assert_eq!(state.local_team(), TeamId::new(1));
        assert_eq!(state.local_ally_team(), AllyTeamId::new(1));
        assert_eq!(state.local_playing_team(), TeamId::NONE);
        assert_eq!(state.local_playing_ally_team(), AllyTeamId::NONE);
        assert!(!state.spectating());
        assert!(!state.spectating_full_view());
        assert!(!state.spectating_full_select());
        assert_eq!(state.sim_steps_per_second(), 0.0);
        assert_eq!(state.frame_timings(), FrameTimings::default());
        assert_eq!(state.frame_timings().avg_frame_time, 0.001);
        assert_eq!(state.timing().sim_elapsed_time, 0.0);
        assert!(!state.quit_requested());
        assert!(!state.reload_requested());
        assert!(state.reload_script().is_empty());
        assert!(!state.first_person_control());
        assert_eq!(state.players().num_players(), 0);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn construction_creates_roster_without_resetting_it() {
        let state = UnsyncedState::new();
        assert_eq!(state.players().generation(), 0);
    }

    #[test]
    fn assign_normal_player() {
        let (mut state, teams, observer) = loaded();
        state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();

        assert_eq!(state.local_player(), PlayerHandle::new(2));
        assert_eq!(state.local_team(), TeamId::new(3));
        assert_eq!(state.local_ally_team(), AllyTeamId::new(0));
        assert_eq!(state.local_playing_team(), TeamId::new(3));
        assert_eq!(state.local_playing_ally_team(), AllyTeamId::new(0));
        assert!(!state.spectating());
        assert!(state.controls_team());
        assert!(state.is_playing_team(TeamId::new(3)));
        assert!(observer.is_empty());
    }

    #[test]
    fn assign_spectator() {
        let (mut state, teams, _) = loaded();
        state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();

        assert!(state.spectating());
        assert!(state.spectating_full_view());
        assert!(state.spectating_full_select());
        assert_eq!(state.local_team(), TeamId::new(1));
        assert_eq!(state.local_ally_team(), AllyTeamId::new(1));
        assert_eq!(state.local_playing_team(), TeamId::NONE);
        assert_eq!(state.local_playing_ally_team(), AllyTeamId::NONE);
        assert!(!state.controls_team());
        assert!(!state.is_playing_team(TeamId::NONE));
    }

    #[test]
    fn spectator_after_player_drops_the_playing_team() {
        let (mut state, teams, observer) = loaded();
        state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();
        assert_eq!(state.local_playing_team(), TeamId::new(0));

        state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();
        assert_eq!(state.local_playing_team(), TeamId::NONE);
        assert_eq!(state.local_playing_ally_team(), AllyTeamId::NONE);
        assert!(observer.is_empty());
    }

    #[test]
    fn invalid_team_keeps_index_but_not_identity() {
        let (mut state, teams, _) = loaded();
        state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();
        let before = *state.identity();

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
        assert!(err.is_content_error());

        assert_eq!(state.local_player(), PlayerHandle::new(3));
        let after = state.identity();
        assert_eq!(after.team, before.team);
        assert_eq!(after.ally_team, before.ally_team);
        assert_eq!(after.playing_team, before.playing_team);
        assert_eq!(after.playing_ally_team, before.playing_ally_team);
        assert_eq!(after.spectating, before.spectating);
    }

    #[test]
    fn invalid_ally_team_is_reported_as_such() {
        let (mut state, teams, _) = loaded();
        let err = state
            .assign_local_player(PlayerHandle::new(4), &teams)
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidAllyTeam {
                player: PlayerHandle::new(4),
                team: TeamId::new(2),
                ally_team: AllyTeamId::new(8),
            }
        );
        assert_eq!(state.local_player(), PlayerHandle::new(4));
        assert_eq!(state.local_team(), TeamId::new(1));
    }

    #[test]
    fn unknown_player_is_a_critical_violation() {
        let (mut state, teams, observer) = loaded();
        let err = state
            .assign_local_player(PlayerHandle::new(40), &teams)
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::UnknownPlayer {
                player: PlayerHandle::new(40),
                num_players: 5,
            }
        );
        assert!(!err.is_content_error());
        let violations = observer.violations_of_kind(ViolationKind::PlayerLookup);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, ViolationSeverity::Critical);
        assert_eq!(violations[0].player, Some(PlayerHandle::new(40)));
        assert_eq!(state.local_player(), PlayerHandle::new(40));
        assert!(state.my_player().is_none());
    }

    #[test]
    fn my_player_follows_local_index() {
        let (mut state, teams, _) = loaded();
        assert_eq!(state.my_player().unwrap().name, "alice");
        state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();
        assert_eq!(state.my_player().unwrap().name, "carol");
    }

    #[test]
    fn assign_by_name() {
        let (mut state, teams, _) = loaded();
        let me = state.assign_local_player_by_name("carol", &teams).unwrap();
        assert_eq!(me, PlayerHandle::new(2));
        assert_eq!(state.local_team(), TeamId::new(3));

        let err = state
            .assign_local_player_by_name("nobody", &teams)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSetup { .. }));
        assert_eq!(state.local_player(), PlayerHandle::new(2));
    }

    #[test]
    fn load_from_setup_leaves_own_fields_alone() {
        let mut state = UnsyncedState::new();
        state.request_quit();
        state.load_from_setup(&setup()).unwrap();
        assert!(state.quit_requested());
        assert_eq!(state.local_team(), TeamId::new(1));
        assert_eq!(state.players().num_players(), 5);
    }

    #[test]
    fn load_from_setup_propagates_roster_errors() {
        let mut state = UnsyncedState::new();
        let err = state.load_from_setup(&GameSetup::default()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSetup { .. }));
    }

    #[test]
    fn reset_restores_defaults_and_reuses_roster() {
        let (mut state, teams, _) = loaded();
        state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();
        state.set_sim_steps_per_second(30.0);
        state.advance_time(1.0, 2.0);
        state.request_reload("script.txt");
        state.set_first_person_control(true);
        let generation = state.players().generation();

        state.reset();

        let fresh = UnsyncedState::new();
        assert_eq!(state.identity(), fresh.identity());
        assert_eq!(state.timing(), fresh.timing());
        assert_eq!(state.control(), fresh.control());
        assert_eq!(state.players().num_players(), 0);
        assert_eq!(state.players().generation(), generation + 1);
    }

    #[test]
    fn reset_keeps_rng_sequence() {
        let mut state = UnsyncedStateBuilder::new()
            .with_config(UnsyncedConfig::deterministic(9))
            .unwrap()
            .build();
        let seed = state.rng().seed();
        state.reset();
        assert_eq!(state.rng().seed(), seed);
    }

    #[test]
    fn negative_timings_are_clamped_and_reported() {
        let (mut state, _, observer) = loaded();
        state.set_sim_steps_per_second(-3.0);
        state.update_frame_timings(FrameTimings {
            avg_sim_step_time: 0.016,
            avg_draw_frame_time: f32::NAN,
            avg_frame_time: 0.02,
        });
        state.advance_time(-1.0, 0.5);

        assert_eq!(state.sim_steps_per_second(), 0.0);
        assert_eq!(state.frame_timings().avg_sim_step_time, 0.016);
        assert_eq!(state.frame_timings().avg_draw_frame_time, 0.0);
        assert_eq!(state.timing().sim_elapsed_time, 0.0);
        assert_eq!(state.timing().wall_elapsed_time, 0.5);
        assert_eq!(observer.violations_of_kind(ViolationKind::Timing).len(), 3);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn advance_time_accumulates() {
        let mut state = UnsyncedState::new();
        state.advance_time(0.5, 0.25);
        state.advance_time(0.5, 0.25);
        state.set_start_time(12.0);
        assert_eq!(state.timing().sim_elapsed_time, 1.0);
        assert_eq!(state.timing().wall_elapsed_time, 0.5);
        assert_eq!(state.timing().start_time, 12.0);
    }

    #[test]
    fn reload_request_is_consumed_once() {
        let mut state = UnsyncedState::new();
        assert_eq!(state.take_reload_request(), None);

        state.request_reload("next.txt");
        assert!(state.reload_requested());
        assert_eq!(state.reload_script(), "next.txt");

        assert_eq!(state.take_reload_request(), Some("next.txt".to_owned()));
        assert!(!state.reload_requested());
        assert!(state.reload_script().is_empty());
        assert_eq!(state.take_reload_request(), None);
    }

    #[test]
    fn full_spectator_flags_require_spectating() {
        let (mut state, teams, _) = loaded();
        state.assign_local_player(PlayerHandle::new(0), &teams).unwrap();
        assert!(matches!(
            state.set_spectating_full_view(true),
            Err(SessionError::InvalidRequest { .. })
        ));
        assert!(!state.spectating_full_view());

        state.assign_local_player(PlayerHandle::new(1), &teams).unwrap();
        state.set_spectating_full_view(false).unwrap();
        state.set_spectating_full_select(false).unwrap();
        assert!(state.spectating());
        assert!(!state.spectating_full_view());
        assert!(!state.spectating_full_select());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn restore_rejects_spectator_with_team() {
        let (mut state, _, observer) = loaded();
        let mut snapshot = state.snapshot();
        snapshot.spectating = true;
        snapshot.local_playing_team = TeamId::new(0);

        assert!(state.restore(&snapshot).is_err());
        assert!(!state.spectating());
        assert!(observer.has_violation(ViolationKind::Lifecycle));
    }

    #[test]
    fn restore_applies_persisted_fields_only() {
        let (mut state, teams, _) = loaded();
        state.assign_local_player(PlayerHandle::new(2), &teams).unwrap();
        state.advance_time(3.0, 4.0);
        let snapshot = state.snapshot();

        state.reset();
        state.set_sim_steps_per_second(25.0);
        state.restore(&snapshot).unwrap();

        assert_eq!(state.local_player(), PlayerHandle::new(2));
        assert_eq!(state.local_playing_team(), TeamId::new(3));
        assert_eq!(state.timing().sim_elapsed_time, 3.0);
        assert_eq!(state.timing().wall_elapsed_time, 4.0);
        assert_eq!(state.sim_steps_per_second(), 25.0);
    }

    #[test]
    fn broken_identity_fails_invariant_check() {
        let identity = LocalIdentity {
            spectating: true,
            playing_team: TeamId::new(2),
            ..LocalIdentity::default()
        };
        assert!(identity.check().is_err());

        let identity = LocalIdentity {
            playing_team: TeamId::new(4),
            playing_ally_team: AllyTeamId::new(0),
            ..LocalIdentity::default()
        };
        assert!(identity.check().is_err());

        let identity = LocalIdentity {
            spectating_full_view: true,
            ..LocalIdentity::default()
        };
        assert!(identity.check().is_err());
    }

    proptest! {
        #![proptest_config(proptest_config())]

        #[test]
        fn prop_spectator_invariant_holds_after_every_assignment(
            handles in proptest::collection::vec(0usize..6, 1..12),
        ) {
            let (mut state, teams, _) = loaded();
            for handle in handles {
                let _ = state.assign_local_player(PlayerHandle::new(handle), &teams);
                let identity = state.identity();
                if identity.spectating {
                    prop_assert!(identity.playing_team.is_none());
                    prop_assert!(identity.playing_ally_team.is_none());
                }
                prop_assert!(state.check_invariants().is_ok());
            }
        }

        #[test]
        fn prop_reset_is_idempotent(
            handle in 0usize..6,
            sps in 0.0f32..120.0,
            quit in any::<bool>(),
        ) {
            let (mut state, teams, _) = loaded();
            let _ = state.assign_local_player(PlayerHandle::new(handle), &teams);
            state.set_sim_steps_per_second(sps);
            if quit {
                state.request_quit();
            }

            state.reset();
            let once = (*state.identity(), *state.timing(), state.control().clone());
            state.reset();
            let twice = (*state.identity(), *state.timing(), state.control().clone());
            prop_assert_eq!(once, twice);
        }
    }
}
