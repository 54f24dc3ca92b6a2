//! Team and ally-team membership as seen by identity resolution.
//!
//! Team data belongs to the synced simulation; the unsynced side only borrows
//! it through [`TeamRoster`] while resolving the local player's identity.

use crate::error::{SessionError, SessionResult};
use crate::setup::GameSetup;
use crate::{AllyTeamId, TeamId, MAX_TEAMS};

/// Read-only view of team membership.
///
/// All three methods are pure. [`ally_team_of`](Self::ally_team_of) is only meaningful
/// for a team that [`is_valid_team`](Self::is_valid_team) accepted.
pub trait TeamRoster {
    /// Whether `team` is a team of the current session.
    fn is_valid_team(&self, team: TeamId) -> bool;

    /// Whether `ally_team` is an ally-team of the current session.
    fn is_valid_ally_team(&self, ally_team: AllyTeamId) -> bool;

    /// The ally-team `team` belongs to.
    fn ally_team_of(&self, team: TeamId) -> AllyTeamId;
}

/// Team table built from session setup.
///
/// A team id is valid when it indexes into the table; an ally-team id is valid when it
/// is below the setup's ally-team count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamRegistry {
    /// Ally-team of each team, indexed by team id.
    ally_teams: Vec<AllyTeamId>,
    num_ally_teams: usize,
}

impl TeamRegistry {
    /// Builds the table from explicit parts.
    pub fn new(ally_teams: Vec<AllyTeamId>, num_ally_teams: usize) -> SessionResult<Self> {
        if ally_teams.len() > MAX_TEAMS {
            return Err(SessionError::InvalidSetup {
                reason: format!(
                    "setup contains {} teams, at most {} are supported",
                    ally_teams.len(),
                    MAX_TEAMS
                ),
            });
        }
        Ok(Self {
            ally_teams,
            num_ally_teams,
        })
    }

    /// Builds the table from session setup.
    ///
    /// Team-to-ally-team references are copied as-is; a dangling reference surfaces as
    /// [`SessionError::InvalidAllyTeam`] when a player on that team is assigned.
    pub fn from_setup(setup: &GameSetup) -> SessionResult<Self> {
        Self::new(
            setup.teams.iter().map(|t| t.ally_team).collect(),
            setup.num_ally_teams,
        )
    }

    /// Number of teams.
    #[must_use]
    pub fn num_teams(&self) -> usize {
        self.ally_teams.len()
    }

    /// Number of ally-teams.
    #[must_use]
    pub const fn num_ally_teams(&self) -> usize {
        self.num_ally_teams
    }

    /// Teams belonging to `ally_team`, in id order.
    pub fn teams_in(&self, ally_team: AllyTeamId) -> impl Iterator<Item = TeamId> + '_ {
        self.ally_teams
            .iter()
            .enumerate()
            .filter(move |(_, a)| **a == ally_team)
            .map(|(i, _)| TeamId::new(i as i32))
    }
}

impl TeamRoster for TeamRegistry {
    fn is_valid_team(&self, team: TeamId) -> bool {
        team.as_index().is_some_and(|i| i < self.ally_teams.len())
    }

    fn is_valid_ally_team(&self, ally_team: AllyTeamId) -> bool {
        ally_team.as_index().is_some_and(|i| i < self.num_ally_teams)
    }

    fn ally_team_of(&self, team: TeamId) -> AllyTeamId {
        team.as_index()
            .and_then(|i| self.ally_teams.get(i))
            .copied()
            .unwrap_or(AllyTeamId::NONE)
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
    use crate::setup::TeamSetup;

    fn registry() -> TeamRegistry {
        // teams 0 and 2 on ally-team 0, team 1 on ally-team 1
        TeamRegistry::new(
            vec![AllyTeamId::new(0), AllyTeamId::new(1), AllyTeamId::new(0)],
            2,
        )
        .unwrap()
    }

    #[test]
    fn team_validity_is_index_range() {
        let teams = registry();
        assert!(teams.is_valid_team(TeamId::new(0)));
        assert!(teams.is_valid_team(TeamId::new(2)));
        assert!(!teams.is_valid_team(TeamId::new(3)));
        assert!(!teams.is_valid_team(TeamId::NONE));
    }

    #[test]
    fn ally_team_validity_is_count_range() {
        let teams = registry();
        assert!(teams.is_valid_ally_team(AllyTeamId::new(1)));
        assert!(!teams.is_valid_ally_team(AllyTeamId::new(2)));
        assert!(!teams.is_valid_ally_team(AllyTeamId::NONE));
    }

    #[test]
    fn ally_team_of_maps_and_defaults_to_none() {
        let teams = registry();
        assert_eq!(teams.ally_team_of(TeamId::new(1)), AllyTeamId::new(1));
        assert_eq!(teams.ally_team_of(TeamId::new(2)), AllyTeamId::new(0));
        assert_eq!(teams.ally_team_of(TeamId::new(9)), AllyTeamId::NONE);
        assert_eq!(teams.ally_team_of(TeamId::NONE), AllyTeamId::NONE);
    }

    #[test]
    fn teams_in_lists_members() {
        let teams = registry();
        let members: Vec<TeamId> = teams.teams_in(AllyTeamId::new(0)).collect();
        assert_eq!(members, vec![TeamId::new(0), TeamId::new(2)]);
    }

    #[test]
    fn from_setup_copies_dangling_references() {
        let setup = GameSetup {
            players: Vec::new(),
            teams: vec![TeamSetup::new(AllyTeamId::new(5))],
            num_ally_teams: 1,
            my_player_name: String::new(),
        };
        let teams = TeamRegistry::from_setup(&setup).unwrap();
        assert_eq!(teams.num_teams(), 1);
        assert!(teams.is_valid_team(TeamId::new(0)));
        assert!(!teams.is_valid_ally_team(teams.ally_team_of(TeamId::new(0))));
    }

    #[test]
    fn rejects_too_many_teams() {
        let err = TeamRegistry::new(vec![AllyTeamId::new(0); MAX_TEAMS + 1], 1).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSetup { .. }));
    }

    #[test]
    fn default_registry_accepts_nothing() {
        let teams = TeamRegistry::default();
        assert!(!teams.is_valid_team(TeamId::new(0)));
        assert!(!teams.is_valid_ally_team(AllyTeamId::new(0)));
    }
}
