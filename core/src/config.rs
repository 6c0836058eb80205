//! Tuning surface for the simulation.
//!
//! Every knob is a plain value so hosts can embed the defaults or load them
//! from a TOML document; missing fields fall back to [`Default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AttackerKind, BattleBand, CellCoord, DefenderKind, FirePattern, WorldPoint};

/// Aggregated configuration for one simulation instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the wave director's random streams.
    pub seed: u64,
    /// Grid dimensions and battle band.
    pub grid: GridConfig,
    /// Wave escalation and spawn cadence.
    pub waves: WaveConfig,
    /// Target lock parameters.
    pub combat: CombatConfig,
    /// Attacker movement parameters.
    pub movement: MovementConfig,
    /// A* parameters.
    pub path: PathConfig,
    /// Attacker archetype table.
    pub attackers: AttackerTable,
    /// Defender archetype table.
    pub defenders: DefenderTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_1a4e_d3fe_4ce5,
            grid: GridConfig::default(),
            waves: WaveConfig::default(),
            combat: CombatConfig::default(),
            movement: MovementConfig::default(),
            path: PathConfig::default(),
            attackers: AttackerTable::default(),
            defenders: DefenderTable::default(),
        }
    }
}

impl SimulationConfig {
    /// Rejects values the simulation cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.columns == 0 || grid.rows == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if grid.band_rows == 0 || grid.band().end_row() > grid.rows {
            return Err(ConfigError::BandOutsideGrid {
                start_row: grid.band_start_row,
                rows: grid.band_rows,
                grid_rows: grid.rows,
            });
        }
        if !grid.cell_size.is_finite() || grid.cell_size <= 0.0 {
            return Err(ConfigError::InvalidCellSize(grid.cell_size));
        }

        let waves = &self.waves;
        if waves.spawn_column >= grid.columns {
            return Err(ConfigError::SpawnColumnOutsideGrid(waves.spawn_column));
        }
        if waves.wave_duration_ms == 0
            || waves.base_spawn_interval_ms == 0
            || waves.min_spawn_interval_ms == 0
        {
            return Err(ConfigError::ZeroInterval);
        }
        let factor = waves.spawn_reduction_factor;
        if !factor.is_finite() || factor <= 0.0 || factor > 1.0 {
            return Err(ConfigError::InvalidReductionFactor(factor));
        }
        for chance in [
            waves.heavy_chance_base,
            waves.heavy_chance_per_wave,
            waves.heavy_chance_cap,
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::InvalidProbability(chance));
            }
        }

        if self.path.max_search_steps == 0 {
            return Err(ConfigError::ZeroSearchBudget);
        }

        let stats = [
            self.attackers.grunt,
            self.attackers.brute,
            self.defenders.sentry,
            self.defenders.mortar,
        ];
        if stats.iter().any(|stats| stats.fire_interval_ms == 0) {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }
}

/// Problems detected by [`SimulationConfig::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid has no cells.
    #[error("grid must have at least one column and one row")]
    EmptyGrid,
    /// The battle band is empty or extends past the last grid row.
    #[error("battle band [{start_row}, {start_row}+{rows}) does not fit a grid of {grid_rows} rows")]
    BandOutsideGrid {
        /// First band row.
        start_row: u32,
        /// Band height.
        rows: u32,
        /// Grid height.
        grid_rows: u32,
    },
    /// Cell size is zero, negative or not finite.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
    /// The spawn column does not exist.
    #[error("spawn column {0} lies outside the grid")]
    SpawnColumnOutsideGrid(u32),
    /// A timer interval is zero.
    #[error("timer intervals must be non-zero")]
    ZeroInterval,
    /// Spawn reduction factor outside `(0, 1]`.
    #[error("spawn reduction factor must lie in (0, 1], got {0}")]
    InvalidReductionFactor(f64),
    /// A probability outside `[0, 1]`.
    #[error("probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),
    /// The A* step budget is zero.
    #[error("path search step budget must be non-zero")]
    ZeroSearchBudget,
}

/// Grid dimensions and the band in which combat takes place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// First row of the battle band.
    pub band_start_row: u32,
    /// Number of rows in the battle band.
    pub band_rows: u32,
    /// Side length of one cell in world units.
    pub cell_size: f32,
}

impl GridConfig {
    /// Battle band described by the configuration.
    #[must_use]
    pub const fn band(&self) -> BattleBand {
        BattleBand::new(self.band_start_row, self.band_rows)
    }

    /// Width of the battlefield in world units.
    #[must_use]
    pub fn battlefield_width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// World-space centre of a cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> WorldPoint {
        WorldPoint::new(
            (cell.column() as f32 + 0.5) * self.cell_size,
            (cell.row() as f32 + 0.5) * self.cell_size,
        )
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 20,
            rows: 10,
            band_start_row: 1,
            band_rows: 8,
            cell_size: 64.0,
        }
    }
}

/// Wave escalation curve and spawn cadence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Length of one wave.
    pub wave_duration_ms: u64,
    /// Health added to spawned attackers per wave beyond the first.
    pub hp_bonus_per_wave: u32,
    /// Spawn interval at wave one.
    pub base_spawn_interval_ms: u64,
    /// Floor for the spawn interval.
    pub min_spawn_interval_ms: u64,
    /// Geometric decay applied to the spawn interval per wave.
    pub spawn_reduction_factor: f64,
    /// Heavy archetype probability at wave one.
    pub heavy_chance_base: f64,
    /// Heavy archetype probability gained per wave.
    pub heavy_chance_per_wave: f64,
    /// Upper bound for the heavy archetype probability.
    pub heavy_chance_cap: f64,
    /// Column in which attackers enter the battlefield.
    pub spawn_column: u32,
}

impl WaveConfig {
    /// Duration of one wave.
    #[must_use]
    pub const fn wave_duration(&self) -> Duration {
        Duration::from_millis(self.wave_duration_ms)
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            wave_duration_ms: 30_000,
            hp_bonus_per_wave: 2,
            base_spawn_interval_ms: 2_000,
            min_spawn_interval_ms: 800,
            spawn_reduction_factor: 0.92,
            heavy_chance_base: 0.1,
            heavy_chance_per_wave: 0.05,
            heavy_chance_cap: 0.5,
            spawn_column: 0,
        }
    }
}

/// Target acquisition parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// How long an out-of-range target stays locked.
    pub lock_grace_ms: u64,
}

impl CombatConfig {
    /// Grace window as a duration.
    #[must_use]
    pub const fn lock_grace(&self) -> Duration {
        Duration::from_millis(self.lock_grace_ms)
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self { lock_grace_ms: 500 }
    }
}

/// Attacker movement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Time without forward progress before a retreat is attempted.
    pub stuck_threshold_ms: u64,
    /// Distance from a cell centre at which the cell counts as reached.
    pub arrival_epsilon: f32,
}

impl MovementConfig {
    /// Stuck threshold as a duration.
    #[must_use]
    pub const fn stuck_threshold(&self) -> Duration {
        Duration::from_millis(self.stuck_threshold_ms)
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            stuck_threshold_ms: 1_000,
            arrival_epsilon: 1.0,
        }
    }
}

/// Distance estimate used by the A* search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Manhattan distance scaled by the straight cost.
    Manhattan,
    /// Octile distance using both straight and diagonal costs.
    Octile,
}

/// A* parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Cost of an axis-aligned step.
    pub straight_cost: u32,
    /// Cost of a diagonal step.
    pub diagonal_cost: u32,
    /// Maximum number of node expansions per search.
    pub max_search_steps: u32,
    /// Distance estimate.
    pub heuristic: Heuristic,
    /// Allows diagonal steps past a blocked orthogonal neighbour.
    ///
    /// When disabled, a diagonal step needs both cells it passes between to
    /// be walkable.
    pub cut_corners: bool,
}

impl PathConfig {
    /// Reports whether the configured costs keep the Manhattan estimate from
    /// exceeding what the search would otherwise treat as cheapest.
    ///
    /// Diagonal steps cheaper than straight ones break that relationship.
    #[must_use]
    pub const fn costs_consistent(&self) -> bool {
        self.diagonal_cost >= self.straight_cost
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            straight_cost: 10,
            diagonal_cost: 14,
            max_search_steps: 2_000,
            heuristic: Heuristic::Manhattan,
            cut_corners: true,
        }
    }
}

/// Combat and movement statistics of one archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Starting health before wave bonuses.
    pub hp: u32,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Targeting range in grid distance.
    pub attack_range_cells: f32,
    /// Minimum time between shots.
    pub fire_interval_ms: u64,
    /// Damage per shot.
    pub damage: u32,
    /// Gold awarded when an entity of this archetype is killed.
    pub reward: u32,
    /// Gold charged when placing an entity of this archetype.
    pub cost: u32,
    /// How shots deliver damage.
    pub pattern: FirePattern,
}

impl ArchetypeStats {
    /// Fire interval as a duration.
    #[must_use]
    pub const fn fire_interval(&self) -> Duration {
        Duration::from_millis(self.fire_interval_ms)
    }
}

/// Statistics for every attacker archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackerTable {
    /// Standard attacker.
    pub grunt: ArchetypeStats,
    /// Heavy attacker.
    pub brute: ArchetypeStats,
}

impl AttackerTable {
    /// Statistics of the provided archetype.
    #[must_use]
    pub const fn stats(&self, kind: AttackerKind) -> ArchetypeStats {
        match kind {
            AttackerKind::Grunt => self.grunt,
            AttackerKind::Brute => self.brute,
        }
    }
}

impl Default for AttackerTable {
    fn default() -> Self {
        Self {
            grunt: ArchetypeStats {
                hp: 10,
                move_speed: 40.0,
                attack_range_cells: 1.5,
                fire_interval_ms: 1_000,
                damage: 1,
                reward: 5,
                cost: 0,
                pattern: FirePattern::Direct,
            },
            brute: ArchetypeStats {
                hp: 30,
                move_speed: 24.0,
                attack_range_cells: 1.5,
                fire_interval_ms: 1_500,
                damage: 3,
                reward: 15,
                cost: 0,
                pattern: FirePattern::Direct,
            },
        }
    }
}

/// Statistics for every defender archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenderTable {
    /// Single-target defender.
    pub sentry: ArchetypeStats,
    /// Splash defender.
    pub mortar: ArchetypeStats,
}

impl DefenderTable {
    /// Statistics of the provided archetype.
    #[must_use]
    pub const fn stats(&self, kind: DefenderKind) -> ArchetypeStats {
        match kind {
            DefenderKind::Sentry => self.sentry,
            DefenderKind::Mortar => self.mortar,
        }
    }
}

impl Default for DefenderTable {
    fn default() -> Self {
        Self {
            sentry: ArchetypeStats {
                hp: 20,
                move_speed: 0.0,
                attack_range_cells: 3.0,
                fire_interval_ms: 800,
                damage: 3,
                reward: 0,
                cost: 50,
                pattern: FirePattern::Direct,
            },
            mortar: ArchetypeStats {
                hp: 25,
                move_speed: 0.0,
                attack_range_cells: 4.0,
                fire_interval_ms: 2_000,
                damage: 5,
                reward: 0,
                cost: 80,
                pattern: FirePattern::Splash { radius_cells: 1.5 },
            },
        }
    }
}
