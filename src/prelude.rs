//! Convenient re-exports for common usage.
//!
//! ```rust
//! use unsynced_state::prelude::*;
//!
//! let mut state = UnsyncedState::new();
//! state.reset();
//! assert_eq!(state.local_playing_team(), TeamId::NONE);
//! ```

// State and construction
pub use crate::sessions::builder::UnsyncedStateBuilder;
pub use crate::sessions::config::UnsyncedConfig;
pub use crate::sessions::unsynced_state::{FrameTimings, UnsyncedState};

// Collaborator seams
pub use crate::sessions::player_registry::{PlayerRecord, PlayerRegistry, PlayerRoster};
pub use crate::sessions::team_registry::{TeamRegistry, TeamRoster};

// Setup input
pub use crate::setup::{GameSetup, PlayerSetup, TeamSetup};

// Fundamental types
pub use crate::{AllyTeamId, PlayerHandle, TeamId};

// Error handling
pub use crate::{SessionError, SessionResult};

// Unsynced randomness
pub use crate::rng::Rng;
