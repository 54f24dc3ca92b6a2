//! Session setup data handed to the registries at session start.
//!
//! The setup is already parsed and validated by whoever produced it (lobby,
//! replay header, start script); the registries only copy what they need out of it.

use serde::{Deserialize, Serialize};

use crate::{AllyTeamId, PlayerHandle, TeamId};

/// One participant as described by the session setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Display name; also how the local client finds itself.
    pub name: String,
    /// Team the player belongs to. Spectators still carry one.
    pub team: TeamId,
    /// Whether this participant only watches.
    #[serde(default)]
    pub spectator: bool,
    /// Lobby rank, informational.
    #[serde(default)]
    pub rank: i32,
    /// Two-letter country code, informational.
    #[serde(default)]
    pub country_code: String,
    /// Whether this participant was recorded in the replay being watched.
    #[serde(default)]
    pub from_demo: bool,
}

impl PlayerSetup {
    /// A playing participant on `team` with no lobby metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, team: TeamId) -> Self {
        Self {
            name: name.into(),
            team,
            spectator: false,
            rank: 0,
            country_code: String::new(),
            from_demo: false,
        }
    }

    /// Marks the participant as a spectator.
    #[must_use]
    pub fn spectating(mut self) -> Self {
        self.spectator = true;
        self
    }
}

/// One team as described by the session setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSetup {
    /// The ally-team this team fights for.
    pub ally_team: AllyTeamId,
}

impl TeamSetup {
    /// A team belonging to `ally_team`.
    #[must_use]
    pub const fn new(ally_team: AllyTeamId) -> Self {
        Self { ally_team }
    }
}

/// Everything the unsynced side needs from a session's start script.
///
/// Player handles are positions in `players`; team ids are positions in `teams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Participants, indexed by [`PlayerHandle`].
    pub players: Vec<PlayerSetup>,
    /// Teams, indexed by [`TeamId`].
    pub teams: Vec<TeamSetup>,
    /// Number of ally-teams; valid ally-team ids are `0..num_ally_teams`.
    pub num_ally_teams: usize,
    /// Name of the participant this process plays as.
    #[serde(default)]
    pub my_player_name: String,
}

impl GameSetup {
    /// Handle of the first participant called `name`.
    #[must_use]
    pub fn player_handle_by_name(&self, name: &str) -> Option<PlayerHandle> {
        self.players
            .iter()
            .position(|p| p.name == name)
            .map(PlayerHandle::new)
    }

    /// Handle of the participant named by [`my_player_name`](Self::my_player_name).
    #[must_use]
    pub fn my_player_handle(&self) -> Option<PlayerHandle> {
        self.player_handle_by_name(&self.my_player_name)
    }

    /// Parses a setup from its JSON form.
    ///
    /// ```
    /// use unsynced_state::{GameSetup, PlayerHandle};
    ///
    /// let setup = GameSetup::from_json(r#"{
    ///     "players": [{ "name": "alice", "team": 0 }],
    ///     "teams": [{ "ally_team": 0 }],
    ///     "num_ally_teams": 1,
    ///     "my_player_name": "alice"
    /// }"#).unwrap();
    /// assert_eq!(setup.my_player_handle(), Some(PlayerHandle::new(0)));
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json(text: &str) -> crate::SessionResult<Self> {
        serde_json::from_str(text).map_err(|e| crate::SessionError::SerializationError {
            context: format!("session setup: {}", e),
        })
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

    fn two_player_setup() -> GameSetup {
        GameSetup {
            players: vec![
                PlayerSetup::new("alice", TeamId::new(0)),
                PlayerSetup::new("bob", TeamId::new(1)).spectating(),
            ],
            teams: vec![
                TeamSetup::new(AllyTeamId::new(0)),
                TeamSetup::new(AllyTeamId::new(1)),
            ],
            num_ally_teams: 2,
            my_player_name: "bob".to_owned(),
        }
    }

    #[test]
    fn finds_players_by_name() {
        let setup = two_player_setup();
        assert_eq!(
            setup.player_handle_by_name("alice"),
            Some(PlayerHandle::new(0))
        );
        assert_eq!(setup.my_player_handle(), Some(PlayerHandle::new(1)));
        assert_eq!(setup.player_handle_by_name("carol"), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let setup: GameSetup = serde_json::from_str(
            r#"{
                "players": [{ "name": "alice", "team": 3 }],
                "teams": [],
                "num_ally_teams": 0
            }"#,
        )
        .unwrap();
        let alice = &setup.players[0];
        assert_eq!(alice.team, TeamId::new(3));
        assert!(!alice.spectator);
        assert!(alice.country_code.is_empty());
        assert!(setup.my_player_name.is_empty());
    }

    #[test]
    fn spectating_builder_sets_flag() {
        assert!(PlayerSetup::new("x", TeamId::new(0)).spectating().spectator);
    }
}
