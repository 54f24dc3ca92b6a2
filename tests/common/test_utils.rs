//! Shared fixtures and helpers for integration tests.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use unsynced_state::{
    AllyTeamId, GameSetup, PlayerSetup, TeamId, TeamRegistry, TeamSetup, UnsyncedConfig,
    UnsyncedState, UnsyncedStateBuilder,
};

/// Four teams on two ally-teams, plus one team pointing at a missing ally-team.
///
/// | handle | name    | team | ally-team | spectator |
/// |--------|---------|------|-----------|-----------|
/// | 0      | alice   | 0    | 0         | no        |
/// | 1      | bob     | 1    | 1         | no        |
/// | 2      | eve     | 2    | 0         | yes       |
/// | 3      | mallory | 99   | -         | no        |
/// | 4      | trent   | 4    | 7 (bad)   | no        |
#[allow(dead_code)]
pub fn four_player_setup() -> GameSetup {
    GameSetup {
        players: vec![
            PlayerSetup::new("alice", TeamId::new(0)),
            PlayerSetup::new("bob", TeamId::new(1)),
            PlayerSetup::new("eve", TeamId::new(2)).spectating(),
            PlayerSetup::new("mallory", TeamId::new(99)),
            PlayerSetup::new("trent", TeamId::new(4)),
        ],
        teams: vec![
            TeamSetup::new(AllyTeamId::new(0)),
            TeamSetup::new(AllyTeamId::new(1)),
            TeamSetup::new(AllyTeamId::new(0)),
            TeamSetup::new(AllyTeamId::new(1)),
            TeamSetup::new(AllyTeamId::new(7)),
        ],
        num_ally_teams: 2,
        my_player_name: "bob".to_owned(),
    }
}

/// A deterministic state loaded with [`four_player_setup`], plus its team table.
#[allow(dead_code)]
pub fn loaded_state() -> (UnsyncedState, TeamRegistry) {
    let setup = four_player_setup();
    let mut state = UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::deterministic(42))
        .unwrap()
        .build();
    state.load_from_setup(&setup).unwrap();
    let teams = TeamRegistry::from_setup(&setup).unwrap();
    (state, teams)
}

/// In-memory sink for formatted `tracing` output.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a debug-level subscriber installed for the current thread and
/// returns its result together with everything that was logged.
#[allow(dead_code)]
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(capture.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}
