//! Authoritative walkability grid.

use lane_defence_core::{BattleBand, CellCoord, WalkabilityView};

/// Dense walkability grid stored in row-major order.
///
/// Rows outside the battle band are unwalkable from construction onward and
/// no operation can open them.
#[derive(Clone, Debug)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    band: BattleBand,
    walkable: Vec<bool>,
}

impl GridMap {
    /// Creates a grid whose battle band is fully walkable.
    #[must_use]
    pub fn new(columns: u32, rows: u32, band: BattleBand) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut grid = Self {
            columns,
            rows,
            band,
            walkable: vec![false; capacity],
        };
        grid.reset_battle_rows();
        grid
    }

    /// Sets the walkability of a single cell.
    ///
    /// Coordinates outside the grid are ignored, and cells outside the battle
    /// band stay unwalkable.
    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) {
        if walkable && !self.band.contains(cell.row()) {
            return;
        }
        if let Some(index) = self.index(cell) {
            self.walkable[index] = walkable;
        }
    }

    /// Marks every provided cell unwalkable.
    ///
    /// With `reset_battle_rows_first` the whole battle band is opened before
    /// the obstacles are applied, so the call fully replaces the previous
    /// obstacle set. Rows outside the band are never touched.
    pub fn set_obstacles(&mut self, cells: &[CellCoord], reset_battle_rows_first: bool) {
        if reset_battle_rows_first {
            self.reset_battle_rows();
        }
        for &cell in cells {
            self.set_walkable(cell, false);
        }
    }

    /// Reports whether the cell exists and may be traversed.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .is_some_and(|index| self.walkable[index])
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Battle band configured for the grid.
    #[must_use]
    pub const fn band(&self) -> BattleBand {
        self.band
    }

    /// Provides the dimensions of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Captures a read-only view for systems.
    #[must_use]
    pub fn view(&self) -> WalkabilityView<'_> {
        WalkabilityView::new(&self.walkable, self.columns, self.rows, self.band)
    }

    fn reset_battle_rows(&mut self) {
        for row in self.band.iter_rows() {
            for column in 0..self.columns {
                if let Some(index) = self.index(CellCoord::new(column, row)) {
                    self.walkable[index] = true;
                }
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
