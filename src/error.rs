//! Error type returned by unsynced session operations.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{AllyTeamId, PlayerHandle, TeamId};

/// Convenience alias used throughout the crate.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// This enum contains all errors this library can return.
///
/// Two classes exist. [`InvalidTeam`](Self::InvalidTeam) and
/// [`InvalidAllyTeam`](Self::InvalidAllyTeam) are *content* errors: the session setup data
/// is wrong, and the bootstrap layer should abort session start and tell the user (see
/// [`is_content_error`](Self::is_content_error)). [`UnknownPlayer`](Self::UnknownPlayer)
/// means the caller asked for a player that was never part of the setup, which is a bug
/// in the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SessionError {
    /// The local player's team is not a valid team of the current session.
    InvalidTeam {
        /// The player being assigned.
        player: PlayerHandle,
        /// The team read from that player's record.
        team: TeamId,
    },
    /// The ally-team derived from the local player's team is not valid.
    InvalidAllyTeam {
        /// The player being assigned.
        player: PlayerHandle,
        /// The (valid) team read from that player's record.
        team: TeamId,
        /// The ally-team the roster mapped that team to.
        ally_team: AllyTeamId,
    },
    /// No player record exists for the requested handle.
    UnknownPlayer {
        /// The handle that was looked up.
        player: PlayerHandle,
        /// Number of records the registry holds.
        num_players: usize,
    },
    /// Session setup data could not be loaded.
    InvalidSetup {
        /// Further specifies what was wrong with the setup.
        reason: String,
    },
    /// You made an invalid request, usually by using wrong parameters for function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        info: String,
    },
    /// Serialization or deserialization of a snapshot or setup document failed.
    SerializationError {
        /// A description of what failed to serialize/deserialize.
        context: String,
    },
}

impl SessionError {
    /// Returns `true` for errors caused by bad session setup content, which the bootstrap
    /// layer is expected to report to the user.
    #[must_use]
    pub const fn is_content_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTeam { .. } | Self::InvalidAllyTeam { .. } | Self::InvalidSetup { .. }
        )
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidTeam { player, team } => {
                write!(
                    f,
                    "Invalid team in player setup (player {}, team {})",
                    player, team
                )
            },
            SessionError::InvalidAllyTeam {
                player,
                team,
                ally_team,
            } => {
                write!(
                    f,
                    "Invalid ally-team in player setup (player {}, team {}, ally-team {})",
                    player, team, ally_team
                )
            },
            SessionError::UnknownPlayer {
                player,
                num_players,
            } => {
                write!(
                    f,
                    "No player record for player {} (registry holds {} players)",
                    player, num_players
                )
            },
            SessionError::InvalidSetup { reason } => {
                write!(f, "Invalid session setup: {}", reason)
            },
            SessionError::InvalidRequest { info } => {
                write!(f, "Invalid Request: {}", info)
            },
            SessionError::SerializationError { context } => {
                write!(f, "Serialization error: {}", context)
            },
        }
    }
}

impl Error for SessionError {}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn invalid_team_message_names_the_field() {
        let err = SessionError::InvalidTeam {
            player: PlayerHandle::new(2),
            team: TeamId::new(99),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid team in player setup"));
        assert!(msg.contains("99"));
    }

    #[test]
    fn invalid_ally_team_message_names_the_field() {
        let err = SessionError::InvalidAllyTeam {
            player: PlayerHandle::new(0),
            team: TeamId::new(1),
            ally_team: AllyTeamId::new(7),
        };
        assert!(err
            .to_string()
            .starts_with("Invalid ally-team in player setup"));
    }

    #[test]
    fn content_errors_are_classified() {
        assert!(SessionError::InvalidTeam {
            player: PlayerHandle::new(0),
            team: TeamId::NONE,
        }
        .is_content_error());
        assert!(SessionError::InvalidSetup {
            reason: "empty".to_owned()
        }
        .is_content_error());
        assert!(!SessionError::UnknownPlayer {
            player: PlayerHandle::new(5),
            num_players: 2,
        }
        .is_content_error());
        assert!(!SessionError::InvalidRequest {
            info: "x".to_owned()
        }
        .is_content_error());
    }

    #[test]
    fn errors_are_std_errors() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&SessionError::SerializationError {
            context: "bad bytes".to_owned(),
        });
    }
}
