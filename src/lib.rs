//! # unsynced-state
//!
//! Client-local ("unsynced") session state for deterministic lockstep multiplayer games.
//!
//! In a lockstep game every participant replays the same simulation bit for bit. Some
//! values legitimately differ per client though: which player *this* process is, whether
//! it is spectating, how fast frames are being drawn, whether the user asked to quit or
//! reload. [`UnsyncedState`] owns exactly those values, and nothing stored here may feed
//! back into the simulation.
//!
//! The interesting part is identity resolution: [`UnsyncedState::assign_local_player`]
//! looks up the local player's record, validates its team and ally-team against the
//! (synced) team roster, and derives the spectator flags and the controllable team.
//!
//! # Example
//!
//! ```
//! use unsynced_state::prelude::*;
//!
//! let setup = GameSetup {
//!     players: vec![
//!         PlayerSetup::new("alice", TeamId::new(0)),
//!         PlayerSetup::new("bob", TeamId::new(1)).spectating(),
//!     ],
//!     teams: vec![TeamSetup::new(AllyTeamId::new(0)), TeamSetup::new(AllyTeamId::new(1))],
//!     num_ally_teams: 2,
//!     my_player_name: "alice".to_owned(),
//! };
//!
//! let mut state = UnsyncedState::new();
//! state.load_from_setup(&setup)?;
//! let teams = TeamRegistry::from_setup(&setup)?;
//!
//! let me = state.players().find_by_name(&setup.my_player_name).unwrap();
//! state.assign_local_player(me, &teams)?;
//!
//! assert_eq!(state.local_team(), TeamId::new(0));
//! assert_eq!(state.local_playing_team(), TeamId::new(0));
//! assert!(!state.spectating());
//! # Ok::<(), SessionError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use error::{SessionError, SessionResult};
pub use rng::{Pcg32, Rng, SeedableRng, UnsyncedRng};
pub use sessions::builder::UnsyncedStateBuilder;
pub use sessions::config::UnsyncedConfig;
pub use sessions::player_registry::{PlayerRecord, PlayerRegistry, PlayerRoster};
pub use sessions::snapshot::UnsyncedSnapshot;
pub use sessions::team_registry::{TeamRegistry, TeamRoster};
pub use sessions::unsynced_state::{
    FrameTimings, LocalIdentity, SessionControl, TimingStats, UnsyncedState,
};
pub use setup::{GameSetup, PlayerSetup, TeamSetup};
pub use time_source::{Clock, ManualClock, SystemClock};

pub mod error;
pub mod prelude;
/// Unsynced random number generation based on PCG32.
///
/// Seeded from the clock at construction; only client-local cosmetic code may draw from it.
pub mod rng;
pub mod setup;
pub mod telemetry;
pub mod time_source;
/// Session-scoped state and the registries it collaborates with.
pub mod sessions {
    pub mod builder;
    pub mod config;
    pub mod player_registry;
    pub mod snapshot;
    pub mod team_registry;
    pub mod unsynced_state;
}

#[cfg(test)]
pub(crate) mod test_config;

// #############
// # CONSTANTS #
// #############

/// Internally, -1 represents "no team" / "no ally-team".
pub const NO_TEAM: i32 = -1;

/// Maximum number of player records a session setup may carry.
pub const MAX_PLAYERS: usize = 251;

/// Maximum number of teams a session setup may carry.
pub const MAX_TEAMS: usize = 255;

/// Fraction of the frame budget handed to the simulation while a reconnecting client
/// catches up. Stored here for the timing driver; this crate never consumes it itself.
pub const RECONNECT_SIM_DRAW_BALANCE: f32 = 0.15;

/// A unique identifier for a participant in a session: the index of its player record.
///
/// # Examples
///
/// ```
/// use unsynced_state::PlayerHandle;
///
/// let handle = PlayerHandle::new(2);
/// assert_eq!(handle.as_usize(), 2);
/// assert!(handle.is_valid_player_for(3));
/// assert!(!handle.is_valid_player_for(2));
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PlayerHandle(usize);

impl PlayerHandle {
    /// Creates a new `PlayerHandle` from a `usize` value.
    ///
    /// Note: This does not validate the handle against a roster.
    #[inline]
    #[must_use]
    pub const fn new(handle: usize) -> Self {
        PlayerHandle(handle)
    }

    /// Returns the underlying `usize` value.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns `true` if this handle indexes into a roster of `num_players` records.
    #[inline]
    #[must_use]
    pub const fn is_valid_player_for(self, num_players: usize) -> bool {
        self.0 < num_players
    }
}

impl std::fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for PlayerHandle {
    #[inline]
    fn from(value: usize) -> Self {
        PlayerHandle(value)
    }
}

impl From<PlayerHandle> for usize {
    #[inline]
    fn from(handle: PlayerHandle) -> Self {
        handle.0
    }
}

/// Identifier of a team in the synced simulation.
///
/// The special value [`TeamId::NONE`] (-1) means "no team". Whether any other value is
/// valid is decided by a [`TeamRoster`], not by this type.
///
/// # Examples
///
/// ```
/// use unsynced_state::TeamId;
///
/// assert!(TeamId::NONE.is_none());
/// assert!(!TeamId::new(0).is_none());
/// assert_eq!(TeamId::new(3).to_string(), "3");
/// assert_eq!(TeamId::NONE.to_string(), "NONE");
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TeamId(i32);

impl TeamId {
    /// "No team": the playing team of a spectator.
    pub const NONE: TeamId = TeamId(NO_TEAM);

    /// Creates a new `TeamId`. Does not validate it.
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        TeamId(id)
    }

    /// Returns the underlying `i32` value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` for [`TeamId::NONE`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == NO_TEAM
    }

    /// Returns the id as an index if it is non-negative.
    #[inline]
    #[must_use]
    pub const fn as_index(self) -> Option<usize> {
        if self.0 >= 0 {
            Some(self.0 as usize)
        } else {
            None
        }
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<i32> for TeamId {
    #[inline]
    fn from(value: i32) -> Self {
        TeamId(value)
    }
}

impl From<TeamId> for i32 {
    #[inline]
    fn from(team: TeamId) -> Self {
        team.0
    }
}

/// Identifier of an ally-team (a group of allied teams) in the synced simulation.
///
/// Like [`TeamId`], [`AllyTeamId::NONE`] (-1) means "none".
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct AllyTeamId(i32);

impl AllyTeamId {
    /// "No ally-team": the playing ally-team of a spectator.
    pub const NONE: AllyTeamId = AllyTeamId(NO_TEAM);

    /// Creates a new `AllyTeamId`. Does not validate it.
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        AllyTeamId(id)
    }

    /// Returns the underlying `i32` value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` for [`AllyTeamId::NONE`].
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == NO_TEAM
    }

    /// Returns the id as an index if it is non-negative.
    #[inline]
    #[must_use]
    pub const fn as_index(self) -> Option<usize> {
        if self.0 >= 0 {
            Some(self.0 as usize)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AllyTeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<i32> for AllyTeamId {
    #[inline]
    fn from(value: i32) -> Self {
        AllyTeamId(value)
    }
}

impl From<AllyTeamId> for i32 {
    #[inline]
    fn from(ally_team: AllyTeamId) -> Self {
        ally_team.0
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

    #[test]
    fn team_id_none_is_minus_one() {
        assert_eq!(TeamId::NONE.as_i32(), -1);
        assert_eq!(AllyTeamId::NONE.as_i32(), -1);
        assert!(TeamId::NONE.is_none());
        assert!(AllyTeamId::NONE.is_none());
    }

    #[test]
    fn negative_ids_have_no_index() {
        assert_eq!(TeamId::NONE.as_index(), None);
        assert_eq!(TeamId::new(-7).as_index(), None);
        assert_eq!(TeamId::new(4).as_index(), Some(4));
        assert_eq!(AllyTeamId::new(0).as_index(), Some(0));
    }

    #[test]
    fn display_renders_none() {
        assert_eq!(AllyTeamId::NONE.to_string(), "NONE");
        assert_eq!(AllyTeamId::new(2).to_string(), "2");
        assert_eq!(PlayerHandle::new(9).to_string(), "9");
    }

    #[test]
    fn conversions_round_trip() {
        let team: TeamId = 5.into();
        assert_eq!(i32::from(team), 5);
        let ally: AllyTeamId = 1.into();
        assert_eq!(i32::from(ally), 1);
        let handle: PlayerHandle = 3usize.into();
        assert_eq!(usize::from(handle), 3);
    }

    #[test]
    fn player_handle_bounds() {
        assert!(PlayerHandle::new(0).is_valid_player_for(1));
        assert!(!PlayerHandle::new(1).is_valid_player_for(1));
        assert!(!PlayerHandle::default().is_valid_player_for(0));
    }
}
