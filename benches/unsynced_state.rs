//! Benchmarks for session lifecycle operations
//!
//! Run with: cargo bench --bench unsynced_state

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use unsynced_state::{
    AllyTeamId, GameSetup, PlayerHandle, PlayerSetup, TeamId, TeamRegistry, TeamSetup,
    UnsyncedConfig, UnsyncedState, UnsyncedStateBuilder, MAX_PLAYERS,
};

fn setup_with_players(num_players: usize) -> GameSetup {
    let num_teams = num_players.min(16);
    GameSetup {
        players: (0..num_players)
            .map(|i| {
                let player = PlayerSetup::new(format!("player{i}"), TeamId::new((i % num_teams) as i32));
                if i % 4 == 3 {
                    player.spectating()
                } else {
                    player
                }
            })
            .collect(),
        teams: (0..num_teams)
            .map(|t| TeamSetup::new(AllyTeamId::new((t % 2) as i32)))
            .collect(),
        num_ally_teams: 2,
        my_player_name: "player0".to_owned(),
    }
}

fn deterministic_state() -> UnsyncedState {
    UnsyncedStateBuilder::new()
        .with_config(UnsyncedConfig::deterministic(1))
        .unwrap()
        .build()
}

fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset");

    for num_players in [2usize, 16, MAX_PLAYERS].iter() {
        let setup = setup_with_players(*num_players);
        group.bench_with_input(
            BenchmarkId::new("after_load", num_players),
            &setup,
            |b, setup| {
                let mut state = deterministic_state();
                b.iter(|| {
                    state.load_from_setup(black_box(setup)).unwrap();
                    state.reset();
                });
            },
        );
    }

    group.finish();
}

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_local_player");

    let setup = setup_with_players(16);
    let teams = TeamRegistry::from_setup(&setup).unwrap();
    let mut state = deterministic_state();
    state.load_from_setup(&setup).unwrap();

    group.bench_function("player", |b| {
        b.iter(|| {
            state
                .assign_local_player(black_box(PlayerHandle::new(0)), &teams)
                .unwrap();
        });
    });

    group.bench_function("spectator", |b| {
        b.iter(|| {
            state
                .assign_local_player(black_box(PlayerHandle::new(3)), &teams)
                .unwrap();
        });
    });

    group.bench_function("by_name", |b| {
        b.iter(|| {
            state
                .assign_local_player_by_name(black_box("player15"), &teams)
                .unwrap()
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let state = deterministic_state();

    c.bench_function("snapshot_encode", |b| {
        b.iter(|| black_box(&state).snapshot().encode().unwrap());
    });
}

criterion_group!(benches, bench_reset, bench_assign, bench_snapshot);
criterion_main!(benches);
