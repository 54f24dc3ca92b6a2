//! Player registry holding one record per session participant.
//!
//! This module provides the [`PlayerRoster`] seam [`UnsyncedState`] talks to, and
//! [`PlayerRegistry`], the registry used in production.
//!
//! [`UnsyncedState`]: crate::UnsyncedState

use crate::error::{SessionError, SessionResult};
use crate::setup::{GameSetup, PlayerSetup};
use crate::{PlayerHandle, TeamId, MAX_PLAYERS};

/// What the session knows about one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Display name.
    pub name: String,
    /// Team the participant belongs to.
    pub team: TeamId,
    /// Whether this participant only watches.
    pub spectator: bool,
    /// Lobby rank.
    pub rank: i32,
    /// Two-letter country code.
    pub country_code: String,
    /// Whether the participant was recorded in the replay being watched.
    pub from_demo: bool,
}

impl PlayerRecord {
    /// Copies a record out of its setup entry.
    #[must_use]
    pub fn from_setup(setup: &PlayerSetup) -> Self {
        Self {
            name: setup.name.clone(),
            team: setup.team,
            spectator: setup.spectator,
            rank: setup.rank,
            country_code: setup.country_code.clone(),
            from_demo: setup.from_demo,
        }
    }
}

/// The player-record store [`UnsyncedState`](crate::UnsyncedState) owns.
///
/// `Default` creates a new, empty roster. The owning state creates exactly one roster
/// and afterwards only ever [`reset`](Self::reset)s it.
pub trait PlayerRoster: Default {
    /// Restores the roster to its empty state in place.
    fn reset(&mut self);

    /// Populates player records from session setup data.
    fn load_from_setup(&mut self, setup: &GameSetup) -> SessionResult<()>;

    /// Returns the record for `handle`, or `None` if no such player was set up.
    fn player(&self, handle: PlayerHandle) -> Option<&PlayerRecord>;

    /// Number of records held.
    fn num_players(&self) -> usize;

    /// Handle of the first participant called `name`.
    fn find_by_name(&self, name: &str) -> Option<PlayerHandle> {
        (0..self.num_players())
            .map(PlayerHandle::new)
            .find(|&handle| self.player(handle).is_some_and(|p| p.name == name))
    }
}

/// Registry of all participants of the current session.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: Vec<PlayerRecord>,
    /// Bumped on every reset and load, so log lines can tell session instances apart.
    generation: u64,
}

impl PlayerRegistry {
    /// Creates a new empty player registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times this registry has been reset or reloaded.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Mutable access to a record, for subsystems that update lobby metadata.
    pub fn player_mut(&mut self, handle: PlayerHandle) -> Option<&mut PlayerRecord> {
        self.players.get_mut(handle.as_usize())
    }

    /// Iterates `(handle, record)` pairs in handle order.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter(&self) -> impl Iterator<Item = (PlayerHandle, &PlayerRecord)> + '_ {
        self.players
            .iter()
            .enumerate()
            .map(|(i, p)| (PlayerHandle::new(i), p))
    }

    /// Returns an iterator over spectator handles.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn spectator_handles_iter(&self) -> impl Iterator<Item = PlayerHandle> + '_ {
        self.iter()
            .filter_map(|(handle, p)| p.spectator.then_some(handle))
    }

    /// Returns the number of spectators.
    #[must_use]
    pub fn num_spectators(&self) -> usize {
        self.spectator_handles_iter().count()
    }

    /// Returns `true` if no participants are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerRoster for PlayerRegistry {
    fn reset(&mut self) {
        self.players.clear();
        self.generation += 1;
    }

    fn load_from_setup(&mut self, setup: &GameSetup) -> SessionResult<()> {
        if setup.players.is_empty() {
            return Err(SessionError::InvalidSetup {
                reason: "setup contains no players".to_owned(),
            });
        }
        if setup.players.len() > MAX_PLAYERS {
            return Err(SessionError::InvalidSetup {
                reason: format!(
                    "setup contains {} players, at most {} are supported",
                    setup.players.len(),
                    MAX_PLAYERS
                ),
            });
        }

        self.players = setup.players.iter().map(PlayerRecord::from_setup).collect();
        self.generation += 1;
        tracing::debug!(
            num_players = self.players.len(),
            num_spectators = self.num_spectators(),
            generation = self.generation,
            "player registry loaded from setup"
        );
        Ok(())
    }

    fn player(&self, handle: PlayerHandle) -> Option<&PlayerRecord> {
        self.players.get(handle.as_usize())
    }

    fn num_players(&self) -> usize {
        self.players.len()
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
    use crate::AllyTeamId;

    fn setup_with(players: Vec<PlayerSetup>) -> GameSetup {
        GameSetup {
            players,
            teams: vec![TeamSetup::new(AllyTeamId::new(0))],
            num_ally_teams: 1,
            my_player_name: String::new(),
        }
    }

    #[test]
    fn player_registry_new_is_empty() {
        let registry = PlayerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.num_players(), 0);
        assert_eq!(registry.num_spectators(), 0);
        assert_eq!(registry.generation(), 0);
        assert!(registry.player(PlayerHandle::new(0)).is_none());
    }

    #[test]
    fn player_registry_loads_records_in_order() {
        let mut registry = PlayerRegistry::new();
        registry
            .load_from_setup(&setup_with(vec![
                PlayerSetup::new("alice", TeamId::new(0)),
                PlayerSetup::new("bob", TeamId::new(0)).spectating(),
            ]))
            .unwrap();

        assert_eq!(registry.num_players(), 2);
        let bob = registry.player(PlayerHandle::new(1)).unwrap();
        assert_eq!(bob.name, "bob");
        assert!(bob.spectator);
        assert_eq!(registry.num_spectators(), 1);
        assert_eq!(
            registry.spectator_handles_iter().collect::<Vec<_>>(),
            vec![PlayerHandle::new(1)]
        );
    }

    #[test]
    fn player_registry_rejects_empty_setup() {
        let mut registry = PlayerRegistry::new();
        let err = registry.load_from_setup(&setup_with(Vec::new())).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSetup { .. }));
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn player_registry_rejects_oversized_setup() {
        let mut registry = PlayerRegistry::new();
        let players = (0..=MAX_PLAYERS)
            .map(|i| PlayerSetup::new(format!("p{i}"), TeamId::new(0)))
            .collect();
        assert!(registry.load_from_setup(&setup_with(players)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn player_registry_reload_replaces_records() {
        let mut registry = PlayerRegistry::new();
        registry
            .load_from_setup(&setup_with(vec![
                PlayerSetup::new("a", TeamId::new(0)),
                PlayerSetup::new("b", TeamId::new(0)),
            ]))
            .unwrap();
        registry
            .load_from_setup(&setup_with(vec![PlayerSetup::new("c", TeamId::new(0))]))
            .unwrap();

        assert_eq!(registry.num_players(), 1);
        assert_eq!(registry.player(PlayerHandle::new(0)).unwrap().name, "c");
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn player_registry_reset_clears_in_place() {
        let mut registry = PlayerRegistry::new();
        registry
            .load_from_setup(&setup_with(vec![PlayerSetup::new("a", TeamId::new(0))]))
            .unwrap();
        registry.reset();

        assert!(registry.is_empty());
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn find_by_name_uses_first_match() {
        let mut registry = PlayerRegistry::new();
        registry
            .load_from_setup(&setup_with(vec![
                PlayerSetup::new("dup", TeamId::new(0)),
                PlayerSetup::new("dup", TeamId::new(0)),
            ]))
            .unwrap();
        assert_eq!(registry.find_by_name("dup"), Some(PlayerHandle::new(0)));
        assert_eq!(registry.find_by_name("missing"), None);
    }

    #[test]
    fn player_mut_updates_metadata() {
        let mut registry = PlayerRegistry::new();
        registry
            .load_from_setup(&setup_with(vec![PlayerSetup::new("a", TeamId::new(0))]))
            .unwrap();
        registry.player_mut(PlayerHandle::new(0)).unwrap().rank = 7;
        assert_eq!(registry.player(PlayerHandle::new(0)).unwrap().rank, 7);
        assert!(registry.player_mut(PlayerHandle::new(3)).is_none());
    }
}
