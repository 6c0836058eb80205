use std::time::Duration;

use lane_defence_core::{
    AttackerKind, CellCoord, Command, DefenderKind, Event, Side, SimulationConfig,
};
use lane_defence_system_combat::CombatScheduler;
use lane_defence_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(100);

#[test]
fn sentry_kills_grunt_on_fire_interval_cadence() {
    let config = SimulationConfig::default();
    let mut world = World::new(&config);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnAttacker {
            kind: AttackerKind::Grunt,
            row: 3,
            bonus_health: 0,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::PlaceDefender {
            kind: DefenderKind::Sentry,
            cell: CellCoord::new(2, 3),
        },
        &mut events,
    );
    let (grunt, sentry) = match events.as_slice() {
        [Event::AttackerSpawned { attacker, .. }, Event::DefenderPlaced { defender, .. }] => {
            (*attacker, *defender)
        }
        other => panic!("unexpected setup events: {other:?}"),
    };
    world::apply(
        &mut world,
        Command::LockTarget {
            entity: sentry,
            target: grunt,
            lost: Duration::ZERO,
        },
        &mut events,
    );

    let mut scheduler = CombatScheduler::new();
    let mut shots = Vec::new();
    let mut killed_at = None;
    for tick in 1..=40_u32 {
        let view = query::entity_view(&world);
        let mut commands = Vec::new();
        scheduler.handle(TICK, &view, &mut commands);

        let mut tick_events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, &mut tick_events);
        }
        for event in &tick_events {
            match event {
                Event::HitSpark { source, .. } if *source == sentry => shots.push(tick),
                Event::EntityKilled { entity, side, reward } if *entity == grunt => {
                    assert_eq!(*side, Side::Attacker);
                    assert_eq!(*reward, config.attackers.grunt.reward);
                    killed_at = Some(tick);
                }
                _ => {}
            }
        }
        world::apply(&mut world, Command::SweepRemovals, &mut tick_events);
    }

    assert_eq!(shots, vec![8, 16, 24, 32]);
    assert_eq!(killed_at, Some(32));
    assert!(query::entity_view(&world).get(grunt).is_none());
}
