#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! A* route search over the walkability grid.
//!
//! The search expands eight neighbours per cell, prices axis-aligned and
//! diagonal steps from [`PathConfig`], and gives up once the configured
//! expansion budget is spent. A failed search is reported as `None`; callers
//! treat it as "hold position" rather than as an error.

use lane_defence_core::{CellCoord, Heuristic, PathConfig, WalkabilityView};

const STRAIGHT_STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, -1), (-1, 1)];

/// Stateless A* search configured once per simulation.
#[derive(Clone, Copy, Debug)]
pub struct PathSearch {
    config: PathConfig,
}

impl PathSearch {
    /// Creates a search that prices steps according to `config`.
    #[must_use]
    pub const fn new(config: PathConfig) -> Self {
        Self { config }
    }

    /// Finds a route from `start` to `end`, both inclusive.
    ///
    /// Returns `None` when either endpoint lies outside the grid, when `end`
    /// is not walkable, or when the expansion budget runs out. When several
    /// open nodes share the lowest estimate, the one queued first is expanded.
    #[must_use]
    pub fn find_path(
        &self,
        grid: &WalkabilityView<'_>,
        start: CellCoord,
        end: CellCoord,
    ) -> Option<Vec<CellCoord>> {
        let (columns, rows) = grid.dimensions();
        let start_index = node_index(start, columns, rows)?;
        let end_index = node_index(end, columns, rows)?;
        if !grid.is_walkable(end) {
            return None;
        }
        if start == end {
            return Some(vec![start]);
        }

        let node_count = usize::try_from(u64::from(columns) * u64::from(rows)).ok()?;
        let mut closed = vec![false; node_count];
        let mut best_g = vec![u32::MAX; node_count];
        let mut parent: Vec<Option<usize>> = vec![None; node_count];
        let mut open = Vec::new();
        let mut next_insertion = 0_u64;
        let mut expansions = 0_u32;

        best_g[start_index] = 0;
        open.push(OpenNode {
            cell: start,
            f_cost: self.estimate(start, end),
            insertion_order: next_insertion,
        });
        next_insertion = next_insertion.saturating_add(1);

        while !open.is_empty() {
            let best = pick_best_open_node_index(&open);
            let current = open.swap_remove(best);
            let Some(current_index) = node_index(current.cell, columns, rows) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current.cell == end {
                return reconstruct_path(&parent, columns, start_index, end_index);
            }

            expansions = expansions.saturating_add(1);
            if expansions > self.config.max_search_steps {
                return None;
            }

            let current_g = best_g[current_index];
            for (neighbor, step_cost) in self.neighbors(grid, current.cell) {
                let Some(neighbor_index) = node_index(neighbor, columns, rows) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }

                let tentative_g = current_g.saturating_add(step_cost);
                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }

                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(current_index);
                open.push(OpenNode {
                    cell: neighbor,
                    f_cost: tentative_g.saturating_add(self.estimate(neighbor, end)),
                    insertion_order: next_insertion,
                });
                next_insertion = next_insertion.saturating_add(1);
            }
        }

        None
    }

    fn estimate(&self, from: CellCoord, to: CellCoord) -> u32 {
        match self.config.heuristic {
            Heuristic::Manhattan => from
                .manhattan_distance(to)
                .saturating_mul(self.config.straight_cost),
            Heuristic::Octile => {
                let dx = from.column().abs_diff(to.column());
                let dy = from.row().abs_diff(to.row());
                let diagonal = dx.min(dy);
                let straight = dx.max(dy) - diagonal;
                diagonal
                    .saturating_mul(self.config.diagonal_cost)
                    .saturating_add(straight.saturating_mul(self.config.straight_cost))
            }
        }
    }

    /// Walkable neighbours of `cell` with the cost of stepping onto them.
    ///
    /// Unless corner cutting is enabled, a diagonal step also requires both
    /// adjacent orthogonal cells to be open.
    fn neighbors(
        &self,
        grid: &WalkabilityView<'_>,
        cell: CellCoord,
    ) -> impl Iterator<Item = (CellCoord, u32)> {
        let mut found = Vec::with_capacity(8);
        for (dx, dy) in STRAIGHT_STEPS {
            if let Some(next) = cell.offset(dx, dy).filter(|next| grid.is_walkable(*next)) {
                found.push((next, self.config.straight_cost));
            }
        }
        for (dx, dy) in DIAGONAL_STEPS {
            let Some(next) = cell.offset(dx, dy) else {
                continue;
            };
            let horizontal_open = cell
                .offset(dx, 0)
                .is_some_and(|side| grid.is_walkable(side));
            let vertical_open = cell
                .offset(0, dy)
                .is_some_and(|side| grid.is_walkable(side));
            let corner_clear = self.config.cut_corners || (horizontal_open && vertical_open);
            if corner_clear && grid.is_walkable(next) {
                found.push((next, self.config.diagonal_cost));
            }
        }
        found.into_iter()
    }
}

/// Collapses straight runs of a route into their turning points.
///
/// The first and last cells are always kept, as is every cell where the
/// direction of travel changes.
#[must_use]
pub fn simplify_path(path: &[CellCoord]) -> Vec<CellCoord> {
    if path.len() <= 2 {
        return path.to_vec();
    }

    let mut simplified = Vec::with_capacity(path.len());
    simplified.push(path[0]);
    for window in path.windows(3) {
        let incoming = direction(window[0], window[1]);
        let outgoing = direction(window[1], window[2]);
        if incoming != outgoing {
            simplified.push(window[1]);
        }
    }
    if let Some(last) = path.last() {
        simplified.push(*last);
    }
    simplified
}

fn direction(from: CellCoord, to: CellCoord) -> (i64, i64) {
    (
        (i64::from(to.column()) - i64::from(from.column())).signum(),
        (i64::from(to.row()) - i64::from(from.row())).signum(),
    )
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    cell: CellCoord,
    f_cost: u32,
    insertion_order: u64,
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0;
    for index in 1..open.len() {
        if open_node_order_key(open[index]) < open_node_order_key(open[best_index]) {
            best_index = index;
        }
    }
    best_index
}

fn open_node_order_key(node: OpenNode) -> (u32, u64) {
    (node.f_cost, node.insertion_order)
}

fn node_index(cell: CellCoord, columns: u32, rows: u32) -> Option<usize> {
    if cell.column() >= columns || cell.row() >= rows {
        return None;
    }
    let index = u64::from(cell.row()) * u64::from(columns) + u64::from(cell.column());
    usize::try_from(index).ok()
}

fn reconstruct_path(
    parent: &[Option<usize>],
    columns: u32,
    start_index: usize,
    end_index: usize,
) -> Option<Vec<CellCoord>> {
    let width = usize::try_from(columns).ok()?;
    let to_cell = |index: usize| -> Option<CellCoord> {
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row))
    };

    let mut reversed = vec![to_cell(end_index)?];
    let mut cursor = end_index;
    while cursor != start_index {
        cursor = parent.get(cursor).copied().flatten()?;
        reversed.push(to_cell(cursor)?);
    }
    reversed.reverse();
    Some(reversed)
}
