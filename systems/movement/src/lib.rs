#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that advances attackers across the lane.
//!
//! Attackers cruise one cell at a time toward the far boundary. Each step is
//! chosen locally: forward when possible, otherwise sideways toward the
//! middle of the battle band. An attacker that cannot make progress for
//! longer than the stuck threshold backs off one cell.

use std::time::Duration;

use lane_defence_core::{
    AttackerMotion, CellCoord, Command, EntitySnapshot, EntityView, Facing, GridConfig,
    MovementConfig, PathConfig, Side, WalkabilityView,
};
use lane_defence_system_pathfinding::PathSearch;
use tracing::debug;

/// Pure system that reads entity snapshots and emits movement commands.
#[derive(Clone, Debug)]
pub struct Movement {
    config: MovementConfig,
    grid: GridConfig,
    search: PathSearch,
}

impl Movement {
    /// Creates a movement system for the provided grid geometry.
    #[must_use]
    pub fn new(config: MovementConfig, grid: GridConfig, path: PathConfig) -> Self {
        Self {
            config,
            grid,
            search: PathSearch::new(path),
        }
    }

    /// Advances every live attacker by `dt`.
    ///
    /// Attackers holding a live target stay in place and turn toward it. A
    /// lock on a dead or removed entity does not hold the attacker. Every
    /// other attacker steps toward its target cell; attackers that pass the
    /// far edge of the battlefield are reported as escaped.
    pub fn handle(
        &self,
        dt: Duration,
        entities: &EntityView,
        walkability: &WalkabilityView<'_>,
        out: &mut Vec<Command>,
    ) {
        for attacker in entities.side(Side::Attacker) {
            if !attacker.alive {
                continue;
            }
            let Some(motion) = attacker.motion else {
                continue;
            };

            let engaged = attacker
                .target
                .and_then(|target| entities.get(target))
                .filter(|target| target.alive);
            if let Some(target) = engaged {
                self.face_target(attacker, motion, target, out);
                continue;
            }

            self.cruise(attacker, motion, dt, walkability, out);
        }
    }

    /// Chooses the cell an attacker standing on `cell` should head to next.
    ///
    /// Forward is preferred. When forward is blocked the attacker moves one
    /// row toward the centre of the battle band, or takes the only open
    /// vertical neighbour. With no option left the current cell is returned.
    #[must_use]
    pub fn select_next_target_cell(
        &self,
        walkability: &WalkabilityView<'_>,
        cell: CellCoord,
    ) -> CellCoord {
        if let Some(forward) = cell
            .offset(1, 0)
            .filter(|next| is_passable(walkability, *next))
        {
            return forward;
        }

        let up = cell
            .offset(0, -1)
            .filter(|next| is_passable(walkability, *next));
        let down = cell
            .offset(0, 1)
            .filter(|next| is_passable(walkability, *next));

        match (up, down) {
            (Some(up), Some(down)) => {
                let center = walkability.band().center_row();
                let row = cell.row() as f32;
                if row < center {
                    down
                } else if row > center {
                    up
                } else {
                    self.break_center_tie(walkability, up, down)
                }
            }
            (Some(up), None) => up,
            (None, Some(down)) => down,
            (None, None) => cell,
        }
    }

    /// Chooses the cell an attacker retreats to after being stuck.
    ///
    /// Tries backward, then up, then down. Returns `cell` itself when every
    /// option is blocked.
    #[must_use]
    pub fn select_retreat_cell(
        &self,
        walkability: &WalkabilityView<'_>,
        cell: CellCoord,
    ) -> CellCoord {
        [(-1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(|(columns, rows)| cell.offset(columns, rows))
            .find(|next| walkability.is_walkable(*next))
            .unwrap_or(cell)
    }

    fn face_target(
        &self,
        attacker: &EntitySnapshot,
        motion: AttackerMotion,
        target: &EntitySnapshot,
        out: &mut Vec<Command>,
    ) {
        let facing = if target.position.x >= attacker.position.x {
            Facing::Forward
        } else {
            Facing::Backward
        };
        if facing == motion.facing {
            return;
        }
        out.push(Command::MoveAttacker {
            attacker: attacker.id,
            position: attacker.position,
            cell: attacker.cell,
            motion: AttackerMotion { facing, ..motion },
        });
    }

    fn cruise(
        &self,
        attacker: &EntitySnapshot,
        mut motion: AttackerMotion,
        dt: Duration,
        walkability: &WalkabilityView<'_>,
        out: &mut Vec<Command>,
    ) {
        let mut cell = attacker.cell;

        if motion.target_cell != cell && !is_passable(walkability, motion.target_cell) {
            motion.target_cell = self.select_next_target_cell(walkability, cell);
        }

        if motion.target_cell == cell {
            let next = self.select_next_target_cell(walkability, cell);
            if next != cell {
                motion.target_cell = next;
            } else {
                motion.stuck = motion.stuck.saturating_add(dt);
                if motion.stuck > self.config.stuck_threshold() {
                    let retreat = self.select_retreat_cell(walkability, cell);
                    if retreat != cell {
                        debug!(attacker = ?attacker.id, ?cell, ?retreat, "attacker retreating");
                        motion.target_cell = retreat;
                        motion.facing = Facing::Backward;
                        motion.stuck = Duration::ZERO;
                    }
                }
            }
        }

        let destination = self.grid.cell_center(motion.target_cell);
        let max_step = attacker.move_speed * dt.as_secs_f32();
        let mut position = attacker.position.step_toward(destination, max_step);
        if motion.target_cell != cell
            && position.distance_to(destination) <= self.config.arrival_epsilon
        {
            position = destination;
            motion.last_cell = cell;
            if motion.target_cell.column() > cell.column() {
                motion.facing = Facing::Forward;
            }
            cell = motion.target_cell;
            motion.stuck = Duration::ZERO;
            motion.target_cell = self.select_next_target_cell(walkability, cell);
        }

        if position.x > self.grid.battlefield_width() {
            debug!(attacker = ?attacker.id, "attacker crossed the far boundary");
            out.push(Command::EscapeAttacker {
                attacker: attacker.id,
            });
            return;
        }

        if position != attacker.position || cell != attacker.cell || Some(motion) != attacker.motion
        {
            out.push(Command::MoveAttacker {
                attacker: attacker.id,
                position,
                cell: clamp_to_grid(walkability, cell, attacker.cell),
                motion,
            });
        }
    }

    /// Prefers the vertical neighbour with the shorter onward route to the
    /// far column. Equal or missing routes fall back to moving up.
    fn break_center_tie(
        &self,
        walkability: &WalkabilityView<'_>,
        up: CellCoord,
        down: CellCoord,
    ) -> CellCoord {
        let (columns, _) = walkability.dimensions();
        let last_column = columns.saturating_sub(1);
        let route_len = |from: CellCoord| {
            self.search
                .find_path(walkability, from, CellCoord::new(last_column, from.row()))
                .map(|path| path.len())
        };

        match (route_len(up), route_len(down)) {
            (Some(up_len), Some(down_len)) if down_len < up_len => down,
            (None, Some(_)) => down,
            _ => up,
        }
    }
}

/// Walkable cells plus the exit lane just past the last column of the band.
fn is_passable(walkability: &WalkabilityView<'_>, cell: CellCoord) -> bool {
    let (columns, _) = walkability.dimensions();
    walkability.is_walkable(cell)
        || (cell.column() == columns && walkability.band().contains(cell.row()))
}

/// Keeps the committed cell inside the grid while an attacker walks the exit lane.
fn clamp_to_grid(
    walkability: &WalkabilityView<'_>,
    cell: CellCoord,
    previous: CellCoord,
) -> CellCoord {
    if walkability.contains(cell) {
        cell
    } else {
        previous
    }
}
