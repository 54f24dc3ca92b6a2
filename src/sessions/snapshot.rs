//! Persisted view of the unsynced state, used by save/restore.
//!
//! Only the fields in [`UnsyncedSnapshot::PERSISTED_FIELDS`] survive a save. The frame
//! averages, steps-per-second, quit/reload flags and first-person mode are runtime-only
//! and are never written.

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::sessions::unsynced_state::{LocalIdentity, TimingStats};
use crate::{AllyTeamId, PlayerHandle, TeamId};

/// The persisted subset of [`UnsyncedState`](crate::UnsyncedState).
///
/// Produced by [`UnsyncedState::snapshot`](crate::UnsyncedState::snapshot) and applied
/// with [`UnsyncedState::restore`](crate::UnsyncedState::restore).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnsyncedSnapshot {
    /// Simulation time elapsed since session start.
    pub sim_elapsed_time: f32,
    /// Wall-clock time elapsed since session start.
    pub wall_elapsed_time: f32,
    /// Session start timestamp.
    pub start_time: f32,
    /// Index of the local player record.
    pub local_player: PlayerHandle,
    /// The local player's team.
    pub local_team: TeamId,
    /// The local player's ally-team.
    pub local_ally_team: AllyTeamId,
    /// The team the local player controls.
    pub local_playing_team: TeamId,
    /// The ally-team the local player controls.
    pub local_playing_ally_team: AllyTeamId,
    /// Whether the local player only watches.
    pub spectating: bool,
    /// Whether the spectator sees everything.
    pub spectating_full_view: bool,
    /// Whether the spectator may select anything.
    pub spectating_full_select: bool,
}

impl UnsyncedSnapshot {
    /// Names of the fields that are persisted, in encoding order.
    pub const PERSISTED_FIELDS: [&'static str; 11] = [
        "sim_elapsed_time",
        "wall_elapsed_time",
        "start_time",
        "local_player",
        "local_team",
        "local_ally_team",
        "local_playing_team",
        "local_playing_ally_team",
        "spectating",
        "spectating_full_view",
        "spectating_full_select",
    ];

    pub(crate) fn capture(identity: &LocalIdentity, timing: &TimingStats) -> Self {
        Self {
            sim_elapsed_time: timing.sim_elapsed_time,
            wall_elapsed_time: timing.wall_elapsed_time,
            start_time: timing.start_time,
            local_player: identity.player,
            local_team: identity.team,
            local_ally_team: identity.ally_team,
            local_playing_team: identity.playing_team,
            local_playing_ally_team: identity.playing_ally_team,
            spectating: identity.spectating,
            spectating_full_view: identity.spectating_full_view,
            spectating_full_select: identity.spectating_full_select,
        }
    }

    pub(crate) fn identity(&self) -> LocalIdentity {
        LocalIdentity {
            player: self.local_player,
            team: self.local_team,
            ally_team: self.local_ally_team,
            playing_team: self.local_playing_team,
            playing_ally_team: self.local_playing_ally_team,
            spectating: self.spectating,
            spectating_full_view: self.spectating_full_view,
            spectating_full_select: self.spectating_full_select,
        }
    }

    /// Encodes the snapshot with fixed-width integers.
    pub fn encode(&self) -> SessionResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode_config()).map_err(|e| {
            SessionError::SerializationError {
                context: format!("encoding unsynced snapshot: {}", e),
            }
        })
    }

    /// Decodes a snapshot produced by [`encode`](Self::encode).
    ///
    /// Trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> SessionResult<Self> {
        let (snapshot, read): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, bincode_config()).map_err(|e| {
                SessionError::SerializationError {
                    context: format!("decoding unsynced snapshot: {}", e),
                }
            })?;
        if read != bytes.len() {
            return Err(SessionError::SerializationError {
                context: format!(
                    "decoding unsynced snapshot: {} trailing bytes",
                    bytes.len() - read
                ),
            });
        }
        Ok(snapshot)
    }
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
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
    use crate::{UnsyncedState, UnsyncedStateBuilder};

    fn sample() -> UnsyncedSnapshot {
        UnsyncedSnapshot {
            sim_elapsed_time: 12.5,
            wall_elapsed_time: 13.0,
            start_time: 100.0,
            local_player: PlayerHandle::new(3),
            local_team: TeamId::new(2),
            local_ally_team: AllyTeamId::new(1),
            local_playing_team: TeamId::NONE,
            local_playing_ally_team: AllyTeamId::NONE,
            spectating: true,
            spectating_full_view: true,
            spectating_full_select: false,
        }
    }

    #[test]
    fn encoded_snapshot_decodes_to_same_value() {
        let bytes = sample().encode().unwrap();
        assert_eq!(UnsyncedSnapshot::decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn encoding_has_fixed_width() {
        // three f32, one u64 handle, four i32 ids, three bools
        let bytes = sample().encode().unwrap();
        assert_eq!(bytes.len(), 3 * 4 + 8 + 4 * 4 + 3);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let bytes = sample().encode().unwrap();
        let err = UnsyncedSnapshot::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, SessionError::SerializationError { .. }));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = sample().encode().unwrap();
        bytes.push(0);
        let err = UnsyncedSnapshot::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn snapshot_of_fresh_state_has_defaults() {
        let state = UnsyncedState::new();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.local_player, PlayerHandle::new(0));
        assert_eq!(snapshot.local_team, TeamId::new(1));
        assert_eq!(snapshot.local_playing_team, TeamId::NONE);
        assert!(!snapshot.spectating);
        assert_eq!(snapshot.sim_elapsed_time, 0.0);
    }

    #[test]
    fn restore_through_bytes() {
        let mut state = UnsyncedStateBuilder::new().build();
        let bytes = sample().encode().unwrap();
        state
            .restore(&UnsyncedSnapshot::decode(&bytes).unwrap())
            .unwrap();
        assert!(state.spectating());
        assert!(!state.spectating_full_select());
        assert_eq!(state.local_player(), PlayerHandle::new(3));
        assert_eq!(state.timing().start_time, 100.0);
    }

    #[test]
    fn persisted_field_table_is_complete() {
        let json = serde_json::to_value(sample()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), UnsyncedSnapshot::PERSISTED_FIELDS.len());
        for name in UnsyncedSnapshot::PERSISTED_FIELDS {
            assert!(object.contains_key(name), "missing field {name}");
        }
    }
}
