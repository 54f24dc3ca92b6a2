//! Roster doubles for driving [`UnsyncedState`] from integration tests.
//!
//! [`UnsyncedState`]: unsynced_state::UnsyncedState

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use unsynced_state::{
    AllyTeamId, GameSetup, PlayerHandle, PlayerRecord, PlayerRegistry, PlayerRoster,
    SessionResult, TeamId, TeamRegistry, TeamRoster,
};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Player roster that delegates to [`PlayerRegistry`] and counts how it is used.
///
/// Every instance gets a unique id, so a test can tell "reset in place" from
/// "replaced with a new roster".
#[derive(Debug)]
pub struct CountingRoster {
    inner: PlayerRegistry,
    instance: u64,
    resets: usize,
    loads: usize,
}

impl Default for CountingRoster {
    fn default() -> Self {
        Self {
            inner: PlayerRegistry::new(),
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            resets: 0,
            loads: 0,
        }
    }
}

#[allow(dead_code)]
impl CountingRoster {
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl PlayerRoster for CountingRoster {
    fn reset(&mut self) {
        self.resets += 1;
        self.inner.reset();
    }

    fn load_from_setup(&mut self, setup: &GameSetup) -> SessionResult<()> {
        self.loads += 1;
        self.inner.load_from_setup(setup)
    }

    fn player(&self, handle: PlayerHandle) -> Option<&PlayerRecord> {
        self.inner.player(handle)
    }

    fn num_players(&self) -> usize {
        self.inner.num_players()
    }
}

/// One query made against [`RecordingTeams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamCall {
    IsValidTeam(TeamId),
    IsValidAllyTeam(AllyTeamId),
    AllyTeamOf(TeamId),
}

/// Team roster that logs every query before answering from a [`TeamRegistry`].
#[derive(Debug)]
pub struct RecordingTeams {
    inner: TeamRegistry,
    calls: RefCell<Vec<TeamCall>>,
}

#[allow(dead_code)]
impl RecordingTeams {
    pub fn new(inner: TeamRegistry) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TeamCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl TeamRoster for RecordingTeams {
    fn is_valid_team(&self, team: TeamId) -> bool {
        self.calls.borrow_mut().push(TeamCall::IsValidTeam(team));
        self.inner.is_valid_team(team)
    }

    fn is_valid_ally_team(&self, ally_team: AllyTeamId) -> bool {
        self.calls
            .borrow_mut()
            .push(TeamCall::IsValidAllyTeam(ally_team));
        self.inner.is_valid_ally_team(ally_team)
    }

    fn ally_team_of(&self, team: TeamId) -> AllyTeamId {
        self.calls.borrow_mut().push(TeamCall::AllyTeamOf(team));
        self.inner.ally_team_of(team)
    }
}
