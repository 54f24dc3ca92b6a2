//! Common test infrastructure shared across integration tests.
//!
//! This module provides:
//! - `stubs`: roster doubles that record how the state drives them
//! - `test_utils`: setup fixtures and a log capture for `tracing` output
//!
//! # Usage
//!
//! ```ignore
//! #[path = "common/mod.rs"]
//! mod common;
//! use common::{four_player_setup, CountingRoster, RecordingTeams};
//! ```

pub mod stubs;
pub mod test_utils;

// These are public utilities for integration tests - allow unused until every test adopts them.
#[allow(unused_imports)]
pub use stubs::{CountingRoster, RecordingTeams, TeamCall};
#[allow(unused_imports)]
pub use test_utils::{capture_logs, four_player_setup, loaded_state, LogCapture};
