#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence simulation.
//!
//! This crate defines the message surface that connects the simulation
//! context, the authoritative world, and pure systems. Callers submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems and collaborators to react to deterministically. Systems consume
//! immutable views such as [`EntityView`] and [`WalkabilityView`] and respond
//! exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

pub mod config;

pub use config::{
    ArchetypeStats, AttackerTable, CombatConfig, ConfigError, DefenderTable, GridConfig,
    Heuristic, MovementConfig, PathConfig, SimulationConfig, WaveConfig,
};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock and refreshes obstacles from defender occupancy.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new attacker enter the battlefield at the spawn column.
    SpawnAttacker {
        /// Archetype assigned to the attacker.
        kind: AttackerKind,
        /// Battle row the attacker enters on.
        row: u32,
        /// Health added on top of the archetype's base health.
        bonus_health: u32,
    },
    /// Requests placement of a defender on the provided cell.
    PlaceDefender {
        /// Archetype of the defender to construct.
        kind: DefenderKind,
        /// Cell the defender occupies.
        cell: CellCoord,
    },
    /// Requests removal of an existing defender.
    RemoveDefender {
        /// Identifier of the defender targeted for removal.
        defender: EntityId,
    },
    /// Publishes the outcome of one movement step for an attacker.
    MoveAttacker {
        /// Attacker being advanced.
        attacker: EntityId,
        /// Continuous position after interpolation.
        position: WorldPoint,
        /// Committed grid cell after the step.
        cell: CellCoord,
        /// Local movement state carried into the next tick.
        motion: AttackerMotion,
    },
    /// Marks an attacker that crossed the far boundary as escaped.
    EscapeAttacker {
        /// Attacker leaving the battlefield.
        attacker: EntityId,
    },
    /// Locks or refreshes the current target of an entity.
    LockTarget {
        /// Entity acquiring the target.
        entity: EntityId,
        /// Entity being targeted.
        target: EntityId,
        /// Time accumulated since the target left range.
        lost: Duration,
    },
    /// Drops the current target of an entity and resets its fire timer.
    ReleaseTarget {
        /// Entity losing its target.
        entity: EntityId,
    },
    /// Stores the time accumulated toward the entity's next shot.
    ChargeWeapon {
        /// Entity whose fire timer advanced.
        entity: EntityId,
        /// Total time elapsed since the last shot.
        elapsed: Duration,
    },
    /// Fires the entity's weapon at its target.
    Fire {
        /// Entity firing.
        source: EntityId,
        /// Entity receiving the hit.
        target: EntityId,
    },
    /// Removes every entity marked dead or escaped during the tick.
    SweepRemovals,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an attacker entered the battlefield.
    AttackerSpawned {
        /// Identifier assigned to the attacker.
        attacker: EntityId,
        /// Archetype of the attacker.
        kind: AttackerKind,
        /// Spawn cell.
        cell: CellCoord,
        /// Starting health including the wave bonus.
        health: Health,
    },
    /// Reports that a spawn request targeted a cell that was not free.
    SpawnRejected {
        /// Row of the rejected spawn.
        row: u32,
    },
    /// Confirms that an attacker committed to a new grid cell.
    AttackerAdvanced {
        /// Attacker that moved.
        attacker: EntityId,
        /// Cell occupied before the step.
        from: CellCoord,
        /// Cell occupied after the step.
        to: CellCoord,
    },
    /// Reports that an attacker crossed the far boundary.
    AttackerEscaped {
        /// Attacker that escaped.
        attacker: EntityId,
    },
    /// Confirms that a defender was placed.
    DefenderPlaced {
        /// Identifier assigned to the defender.
        defender: EntityId,
        /// Archetype of the defender.
        kind: DefenderKind,
        /// Cell occupied by the defender.
        cell: CellCoord,
    },
    /// Confirms that a defender was removed on request.
    DefenderRemoved {
        /// Identifier of the removed defender.
        defender: EntityId,
        /// Cell the defender occupied.
        cell: CellCoord,
    },
    /// Reports that a placement request was rejected.
    PlacementRejected {
        /// Archetype requested.
        kind: DefenderKind,
        /// Cell requested.
        cell: CellCoord,
        /// Reason the placement failed.
        reason: PlacementError,
    },
    /// Reports that a removal request was rejected.
    RemovalRejected {
        /// Identifier provided in the request.
        defender: EntityId,
        /// Reason the removal failed.
        reason: RemovalError,
    },
    /// Announces that an entity acquired a new target.
    TargetLocked {
        /// Entity that acquired the target.
        entity: EntityId,
        /// Entity being targeted.
        target: EntityId,
    },
    /// Announces that an entity dropped its target.
    TargetReleased {
        /// Entity that released its target.
        entity: EntityId,
    },
    /// Visual hit notification for rendering and audio collaborators.
    HitSpark {
        /// Entity that fired.
        source: EntityId,
        /// Entity that was hit.
        target: EntityId,
        /// World position of the impact.
        position: WorldPoint,
        /// Colour hint derived from the firing side.
        hint: SparkHint,
    },
    /// Reports that an entity's health reached zero.
    EntityKilled {
        /// Entity that died.
        entity: EntityId,
        /// Side the entity belonged to.
        side: Side,
        /// Gold granted for the kill.
        reward: u32,
    },
    /// Reports that an entity left the world during the removal sweep.
    EntityRemoved {
        /// Entity removed from the world.
        entity: EntityId,
    },
    /// Announces that the wave level increased.
    WaveAdvanced {
        /// New wave level.
        level: u32,
        /// Spawn cadence in effect for the new level.
        spawn_interval: Duration,
        /// Health added to every attacker spawned during the level.
        hp_bonus: u32,
    },
}

/// Colour hint attached to hit notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SparkHint {
    /// A defender landed the hit.
    Friendly,
    /// An attacker landed the hit.
    Hostile,
}

impl SparkHint {
    /// Hint used for hits fired by the provided side.
    #[must_use]
    pub const fn for_side(side: Side) -> Self {
        match side {
            Side::Defender => Self::Friendly,
            Side::Attacker => Self::Hostile,
        }
    }
}

/// Population an entity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Mobile units advancing along the lanes.
    Attacker,
    /// Stationary units placed by the player.
    Defender,
}

impl Side {
    /// The population this side fights against.
    #[must_use]
    pub const fn opposing(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

new_key_type! {
    /// Generation-checked handle into the world's entity storage.
    ///
    /// Once an entity is removed its slot may be reused, but lookups through
    /// the old handle fail instead of aliasing the new occupant.
    pub struct EntityId;
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Euclidean distance between two cells measured in whole cells.
    #[must_use]
    pub fn grid_distance(self, other: CellCoord) -> f32 {
        let dx = self.column().abs_diff(other.column()) as f32;
        let dy = self.row().abs_diff(other.row()) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Offsets the cell, returning `None` when a coordinate would go negative.
    #[must_use]
    pub fn offset(self, columns: i32, rows: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(CellCoord::new(column, row))
    }
}

/// Continuous position expressed in world units.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal coordinate; grows toward the far boundary.
    pub x: f32,
    /// Vertical coordinate; grows with the row index.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new world point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to another point.
    #[must_use]
    pub fn distance_to(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves toward `target` by at most `max_step` world units.
    #[must_use]
    pub fn step_toward(self, target: WorldPoint, max_step: f32) -> WorldPoint {
        let distance = self.distance_to(target);
        if distance <= max_step || distance <= f32::EPSILON {
            return target;
        }
        let ratio = max_step / distance;
        WorldPoint::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }
}

/// Contiguous band of rows in which attackers move and defenders stand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleBand {
    start_row: u32,
    rows: u32,
}

impl BattleBand {
    /// Creates a band spanning `[start_row, start_row + rows)`.
    #[must_use]
    pub const fn new(start_row: u32, rows: u32) -> Self {
        Self { start_row, rows }
    }

    /// First row of the band.
    #[must_use]
    pub const fn start_row(&self) -> u32 {
        self.start_row
    }

    /// Number of rows in the band.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// One past the last row of the band.
    #[must_use]
    pub const fn end_row(&self) -> u32 {
        self.start_row.saturating_add(self.rows)
    }

    /// Reports whether the row lies inside the band.
    #[must_use]
    pub const fn contains(&self, row: u32) -> bool {
        row >= self.start_row && row < self.end_row()
    }

    /// Vertical centre of the band expressed as a fractional row.
    #[must_use]
    pub fn center_row(&self) -> f32 {
        self.start_row as f32 + (self.rows.saturating_sub(1)) as f32 / 2.0
    }

    /// Iterator over every row of the band in ascending order.
    pub fn iter_rows(&self) -> impl Iterator<Item = u32> {
        self.start_row..self.end_row()
    }
}

/// Non-negative hit points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric health value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts damage, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: u32) -> Self {
        Self(self.0.saturating_sub(damage))
    }
}

/// Attacker archetypes the wave director can spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackerKind {
    /// Standard attacker.
    Grunt,
    /// Heavy attacker whose share grows with the wave level.
    Brute,
}

/// Defender archetypes the player can place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenderKind {
    /// Single-target defender.
    Sentry,
    /// Area-damage defender.
    Mortar,
}

/// Archetype of any entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Attacker archetype.
    Attacker(AttackerKind),
    /// Defender archetype.
    Defender(DefenderKind),
}

impl Archetype {
    /// Side the archetype fights for.
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Attacker(_) => Side::Attacker,
            Self::Defender(_) => Side::Defender,
        }
    }
}

/// How an archetype delivers damage when its fire timer elapses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FirePattern {
    /// Damage applies to the locked target only.
    Direct,
    /// Damage applies to every opposing entity near the locked target.
    Splash {
        /// Radius around the target measured in grid distance.
        radius_cells: f32,
    },
}

/// Direction an attacker is facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Facing the far boundary.
    Forward,
    /// Facing the spawn column.
    Backward,
}

/// Local movement state owned by every attacker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackerMotion {
    /// Cell the attacker is currently heading toward.
    pub target_cell: CellCoord,
    /// Time spent without any possible forward progress.
    pub stuck: Duration,
    /// Cell occupied before the most recent committed step.
    pub last_cell: CellCoord,
    /// Direction the attacker faces.
    pub facing: Facing,
}

impl AttackerMotion {
    /// Motion state for an attacker standing still on `cell`.
    #[must_use]
    pub const fn resting_at(cell: CellCoord) -> Self {
        Self {
            target_cell: cell,
            stuck: Duration::ZERO,
            last_cell: cell,
            facing: Facing::Forward,
        }
    }
}

/// Immutable representation of a single entity used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Handle of the entity.
    pub id: EntityId,
    /// Archetype the entity was created with.
    pub archetype: Archetype,
    /// Committed grid cell.
    pub cell: CellCoord,
    /// Continuous world position.
    pub position: WorldPoint,
    /// Remaining health.
    pub health: Health,
    /// Health at creation.
    pub max_health: Health,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Targeting range measured in grid distance.
    pub range_cells: f32,
    /// Minimum time between shots.
    pub fire_interval: Duration,
    /// Time accumulated since the last shot.
    pub since_last_fire: Duration,
    /// Damage applied per shot.
    pub damage: u32,
    /// Strategy used when firing.
    pub pattern: FirePattern,
    /// Currently locked target, if any.
    pub target: Option<EntityId>,
    /// Time the locked target has spent out of range.
    pub target_lost: Duration,
    /// Whether the entity still participates in the simulation.
    pub alive: bool,
    /// Movement state for attackers; `None` for defenders.
    pub motion: Option<AttackerMotion>,
}

impl EntitySnapshot {
    /// Side the entity fights for.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.archetype.side()
    }
}

/// Read-only snapshot describing every entity in the world.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over the snapshots belonging to one side.
    pub fn side(&self, side: Side) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots
            .iter()
            .filter(move |snapshot| snapshot.side() == side)
    }

    /// Looks up the snapshot captured for the provided handle.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Read-only view into the dense walkability grid.
#[derive(Clone, Copy, Debug)]
pub struct WalkabilityView<'a> {
    cells: &'a [bool],
    columns: u32,
    rows: u32,
    band: BattleBand,
}

impl<'a> WalkabilityView<'a> {
    /// Captures a new walkability view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [bool], columns: u32, rows: u32, band: BattleBand) -> Self {
        Self {
            cells,
            columns,
            rows,
            band,
        }
    }

    /// Reports whether the cell exists and may be traversed.
    ///
    /// Cells outside the grid report `false`.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Battle band configured for the grid.
    #[must_use]
    pub const fn band(&self) -> BattleBand {
        self.band
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

/// Reasons a defender placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// The requested cell lies outside the battle band.
    #[error("cell lies outside the battle band")]
    OutsideBattleBand,
    /// The requested cell already holds an entity.
    #[error("cell is already occupied")]
    CellOccupied,
    /// The economy cannot cover the defender's cost.
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Reasons a defender removal request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RemovalError {
    /// No live defender exists for the handle.
    #[error("no defender matches the handle")]
    MissingDefender,
}

/// Gold balance owned by the economy collaborator.
///
/// The simulation never stores currency itself; it awards kill rewards and
/// charges placement costs through this contract.
pub trait Economy {
    /// Credits gold earned from a kill.
    fn add_gold(&mut self, amount: u32);

    /// Reports whether the balance covers `cost`.
    fn affordable(&self, cost: u32) -> bool;

    /// Debits `cost`, returning `false` when the balance is insufficient.
    fn spend(&mut self, cost: u32) -> bool;
}

/// In-memory gold balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Purse {
    gold: u32,
}

impl Purse {
    /// Creates a purse holding `gold`.
    #[must_use]
    pub const fn new(gold: u32) -> Self {
        Self { gold }
    }

    /// Current balance.
    #[must_use]
    pub const fn gold(&self) -> u32 {
        self.gold
    }
}

impl Economy for Purse {
    fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    fn affordable(&self, cost: u32) -> bool {
        self.gold >= cost
    }

    fn spend(&mut self, cost: u32) -> bool {
        if !self.affordable(cost) {
            return false;
        }
        self.gold -= cost;
        true
    }
}
