use std::{collections::BTreeSet, time::Duration};

use lane_defence_core::{Command, Event, SimulationConfig, WaveConfig};
use lane_defence_system_waves::WaveDirector;
use lane_defence_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(250);

fn run(config: &SimulationConfig, ticks: u32) -> Vec<Event> {
    let mut world = World::new(config);
    let mut director = WaveDirector::new(config.waves, config.seed);
    let mut log = Vec::new();

    for _ in 0..ticks {
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut log);
        let mut commands = Vec::new();
        director.handle(TICK, &query::open_spawn_rows(&world), &mut commands, &mut log);
        for command in commands {
            world::apply(&mut world, command, &mut log);
        }
    }

    log
}

#[test]
fn stationary_attackers_fill_each_row_once() {
    let config = SimulationConfig::default();
    let log = run(&config, 200);

    let rows: Vec<u32> = log
        .iter()
        .filter_map(|event| match event {
            Event::AttackerSpawned { cell, .. } => Some(cell.row()),
            _ => None,
        })
        .collect();
    let distinct: BTreeSet<u32> = rows.iter().copied().collect();

    assert_eq!(rows.len(), distinct.len(), "a row was spawned twice");
    assert_eq!(distinct, config.grid.band().iter_rows().collect());
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::SpawnRejected { .. })));
}

#[test]
fn later_waves_spawn_tougher_attackers() {
    let config = SimulationConfig {
        waves: WaveConfig {
            wave_duration_ms: 2_000,
            base_spawn_interval_ms: 1_000,
            ..WaveConfig::default()
        },
        ..SimulationConfig::default()
    };
    let log = run(&config, 16);

    let bonuses: Vec<u32> = log
        .iter()
        .filter_map(|event| match event {
            Event::AttackerSpawned { kind, health, .. } => {
                Some(health.get() - config.attackers.stats(*kind).hp)
            }
            _ => None,
        })
        .collect();

    assert_eq!(bonuses, vec![0, 2, 2, 4]);
}

#[test]
fn spawn_schedule_replays_for_fixed_seed() {
    let config = SimulationConfig::default();
    assert_eq!(run(&config, 120), run(&config, 120));
}
