use std::time::Duration;

use lane_defence_core::{CellCoord, Command, DefenderKind, GridConfig, SimulationConfig};
use lane_defence_system_pathfinding::{simplify_path, PathSearch};
use lane_defence_world::{self as world, query, World};

fn config() -> SimulationConfig {
    SimulationConfig {
        grid: GridConfig {
            columns: 10,
            rows: 7,
            band_start_row: 1,
            band_rows: 5,
            cell_size: 32.0,
        },
        ..SimulationConfig::default()
    }
}

fn place_column(world: &mut World, column: u32, rows: impl IntoIterator<Item = u32>) {
    let mut events = Vec::new();
    for row in rows {
        world::apply(
            world,
            Command::PlaceDefender {
                kind: DefenderKind::Sentry,
                cell: CellCoord::new(column, row),
            },
            &mut events,
        );
    }
    world::apply(
        world,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        &mut events,
    );
}

#[test]
fn route_stays_inside_battle_band() {
    let config = config();
    let world = World::new(&config);
    let search = PathSearch::new(config.path);
    let walkability = query::walkability(&world);

    let path = search
        .find_path(&walkability, CellCoord::new(0, 1), CellCoord::new(9, 5))
        .expect("open band");

    assert!(path.iter().all(|cell| config.grid.band().contains(cell.row())));
    assert_eq!(
        search.find_path(&walkability, CellCoord::new(0, 1), CellCoord::new(9, 0)),
        None,
        "boundary rows are never a destination"
    );
}

#[test]
fn defenders_placed_in_world_reroute_search() {
    let config = config();
    let mut world = World::new(&config);
    place_column(&mut world, 4, 1..5);
    let search = PathSearch::new(config.path);

    let path = search
        .find_path(
            &query::walkability(&world),
            CellCoord::new(0, 3),
            CellCoord::new(9, 3),
        )
        .expect("row five remains open");

    assert!(path.contains(&CellCoord::new(4, 5)));
    let turns = simplify_path(&path);
    assert_eq!(turns.first(), Some(&CellCoord::new(0, 3)));
    assert_eq!(turns.last(), Some(&CellCoord::new(9, 3)));
    assert!(turns.len() > 2);
}

#[test]
fn sealed_column_has_no_route() {
    let config = config();
    let mut world = World::new(&config);
    place_column(&mut world, 6, 1..6);
    let search = PathSearch::new(config.path);

    assert_eq!(
        search.find_path(
            &query::walkability(&world),
            CellCoord::new(0, 2),
            CellCoord::new(9, 2),
        ),
        None
    );
}
