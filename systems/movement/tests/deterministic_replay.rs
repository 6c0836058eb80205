use std::time::Duration;

use lane_defence_core::{
    AttackerKind, CellCoord, Command, DefenderKind, Event, GridConfig, SimulationConfig,
};
use lane_defence_system_movement::Movement;
use lane_defence_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(100);

fn config() -> SimulationConfig {
    SimulationConfig {
        grid: GridConfig {
            columns: 8,
            rows: 5,
            band_start_row: 1,
            band_rows: 3,
            cell_size: 16.0,
        },
        ..SimulationConfig::default()
    }
}

fn replay() -> Vec<Event> {
    let config = config();
    let mut world = World::new(&config);
    let movement = Movement::new(config.movement, config.grid, config.path);
    let mut log = Vec::new();

    world::apply(
        &mut world,
        Command::PlaceDefender {
            kind: DefenderKind::Sentry,
            cell: CellCoord::new(4, 2),
        },
        &mut log,
    );
    world::apply(
        &mut world,
        Command::SpawnAttacker {
            kind: AttackerKind::Grunt,
            row: 2,
            bonus_health: 0,
        },
        &mut log,
    );

    for _ in 0..400 {
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut log);
        let entities = query::entity_view(&world);
        let mut commands = Vec::new();
        movement.handle(TICK, &entities, &query::walkability(&world), &mut commands);
        for command in commands {
            world::apply(&mut world, command, &mut log);
        }
        world::apply(&mut world, Command::SweepRemovals, &mut log);
    }

    log.retain(|event| !matches!(event, Event::TimeAdvanced { .. }));
    log
}

#[test]
fn attacker_detours_around_defender_and_escapes() {
    let first = replay();
    let second = replay();
    assert_eq!(first, second, "replay diverged between runs");

    let visited: Vec<CellCoord> = first
        .iter()
        .filter_map(|event| match event {
            Event::AttackerAdvanced { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert!(!visited.contains(&CellCoord::new(4, 2)));
    assert!(visited.contains(&CellCoord::new(3, 1)));
    assert!(first
        .iter()
        .any(|event| matches!(event, Event::AttackerEscaped { .. })));
}
