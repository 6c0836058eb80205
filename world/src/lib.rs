#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Lane Defence.
//!
//! The world owns the walkability grid and every entity. It is mutated only
//! through [`apply`], which validates each [`Command`] and reports the outcome
//! as [`Event`] values. Entities killed or escaped during a tick stay readable
//! until [`Command::SweepRemovals`] runs at the end of that tick.

use std::time::Duration;

use lane_defence_core::{
    Archetype, ArchetypeStats, AttackerKind, AttackerMotion, CellCoord, Command, DefenderKind,
    EntityId, Event, FirePattern, Health, PlacementError, RemovalError, Side, SimulationConfig,
    SparkHint, WorldPoint,
};
use slotmap::SlotMap;
use tracing::debug;

mod grid;

pub use grid::GridMap;

/// Represents the authoritative Lane Defence world state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    grid: GridMap,
    entities: SlotMap<EntityId, Entity>,
}

impl World {
    /// Creates a world laid out according to the provided configuration.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        let grid = GridMap::new(
            config.grid.columns,
            config.grid.rows,
            config.grid.band(),
        );
        Self {
            config: config.clone(),
            grid,
            entities: SlotMap::with_key(),
        }
    }

    fn live_entity_at(&self, cell: CellCoord) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, entity)| entity.alive && entity.cell == cell)
            .map(|(id, _)| id)
    }

    fn defender_cells(&self) -> Vec<CellCoord> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.alive && entity.side() == Side::Defender)
            .map(|(_, entity)| entity.cell)
            .collect()
    }

    fn spawn_attacker(
        &mut self,
        kind: AttackerKind,
        row: u32,
        bonus_health: u32,
        out_events: &mut Vec<Event>,
    ) {
        let cell = CellCoord::new(self.config.waves.spawn_column, row);
        let blocked = !self.grid.band().contains(row)
            || !self.grid.is_walkable(cell)
            || self.live_entity_at(cell).is_some();
        if blocked {
            debug!(row, "spawn rejected, cell not free");
            out_events.push(Event::SpawnRejected { row });
            return;
        }

        let stats = self.config.attackers.stats(kind);
        let health = Health::new(stats.hp.saturating_add(bonus_health));
        let position = self.config.grid.cell_center(cell);
        let attacker = self.entities.insert(Entity::new(
            Archetype::Attacker(kind),
            stats,
            health,
            cell,
            position,
            Some(AttackerMotion::resting_at(cell)),
        ));
        debug!(?attacker, ?kind, row, hp = health.get(), "attacker spawned");
        out_events.push(Event::AttackerSpawned {
            attacker,
            kind,
            cell,
            health,
        });
    }

    fn place_defender(&mut self, kind: DefenderKind, cell: CellCoord, out_events: &mut Vec<Event>) {
        let verdict = if !self.grid.contains(cell) {
            Err(PlacementError::OutOfBounds)
        } else if !self.grid.band().contains(cell.row()) {
            Err(PlacementError::OutsideBattleBand)
        } else if self.live_entity_at(cell).is_some() {
            Err(PlacementError::CellOccupied)
        } else {
            Ok(())
        };

        if let Err(reason) = verdict {
            debug!(?kind, ?cell, %reason, "placement rejected");
            out_events.push(Event::PlacementRejected { kind, cell, reason });
            return;
        }

        let stats = self.config.defenders.stats(kind);
        let position = self.config.grid.cell_center(cell);
        let defender = self.entities.insert(Entity::new(
            Archetype::Defender(kind),
            stats,
            Health::new(stats.hp),
            cell,
            position,
            None,
        ));
        out_events.push(Event::DefenderPlaced {
            defender,
            kind,
            cell,
        });
    }

    fn remove_defender(&mut self, defender: EntityId, out_events: &mut Vec<Event>) {
        let is_defender = self
            .entities
            .get(defender)
            .is_some_and(|entity| entity.alive && entity.side() == Side::Defender);
        if !is_defender {
            out_events.push(Event::RemovalRejected {
                defender,
                reason: RemovalError::MissingDefender,
            });
            return;
        }

        if let Some(entity) = self.entities.remove(defender) {
            out_events.push(Event::DefenderRemoved {
                defender,
                cell: entity.cell,
            });
        }
    }

    fn lock_target(
        &mut self,
        entity_id: EntityId,
        target: EntityId,
        lost: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let target_alive = self.entities.get(target).is_some_and(|entity| entity.alive);
        if !target_alive {
            return;
        }
        let Some(entity) = self.entities.get_mut(entity_id) else {
            return;
        };
        if !entity.alive {
            return;
        }

        if entity.target != Some(target) {
            out_events.push(Event::TargetLocked {
                entity: entity_id,
                target,
            });
        }
        entity.target = Some(target);
        entity.target_lost = lost;
    }

    fn release_target(&mut self, entity_id: EntityId, out_events: &mut Vec<Event>) {
        let Some(entity) = self.entities.get_mut(entity_id) else {
            return;
        };
        if entity.target.take().is_some() {
            out_events.push(Event::TargetReleased { entity: entity_id });
        }
        entity.target_lost = Duration::ZERO;
        entity.since_last_fire = Duration::ZERO;
    }

    fn fire(&mut self, source: EntityId, target: EntityId, out_events: &mut Vec<Event>) {
        let Some(shooter) = self.entities.get(source) else {
            return;
        };
        if !shooter.alive || shooter.target != Some(target) {
            return;
        }
        let side = shooter.side();
        let damage = shooter.stats.damage;
        let pattern = shooter.stats.pattern;

        let Some(impact) = self
            .entities
            .get(target)
            .filter(|entity| entity.alive)
            .map(|entity| entity.cell)
        else {
            debug!(?source, ?target, "shot skipped, target already down");
            return;
        };

        if let Some(shooter) = self.entities.get_mut(source) {
            shooter.since_last_fire = Duration::ZERO;
        }

        let victims: Vec<EntityId> = match pattern {
            FirePattern::Direct => vec![target],
            FirePattern::Splash { radius_cells } => self
                .entities
                .iter()
                .filter(|(_, entity)| {
                    entity.alive
                        && entity.side() == side.opposing()
                        && entity.cell.grid_distance(impact) <= radius_cells
                })
                .map(|(id, _)| id)
                .collect(),
        };

        let hint = SparkHint::for_side(side);
        for victim in victims {
            let Some(entity) = self.entities.get_mut(victim) else {
                continue;
            };
            entity.health = entity.health.saturating_sub(damage);
            out_events.push(Event::HitSpark {
                source,
                target: victim,
                position: entity.position,
                hint,
            });

            if entity.health.is_zero() {
                entity.alive = false;
                let reward = entity.stats.reward;
                let victim_side = entity.side();
                debug!(?victim, ?victim_side, reward, "entity killed");
                out_events.push(Event::EntityKilled {
                    entity: victim,
                    side: victim_side,
                    reward,
                });
            }
        }
    }

    fn sweep_removals(&mut self, out_events: &mut Vec<Event>) {
        let doomed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, entity)| !entity.alive)
            .map(|(id, _)| id)
            .collect();

        for entity in doomed {
            if self.entities.remove(entity).is_some() {
                out_events.push(Event::EntityRemoved { entity });
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            let obstacles = world.defender_cells();
            world.grid.set_obstacles(&obstacles, true);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SpawnAttacker {
            kind,
            row,
            bonus_health,
        } => world.spawn_attacker(kind, row, bonus_health, out_events),
        Command::PlaceDefender { kind, cell } => world.place_defender(kind, cell, out_events),
        Command::RemoveDefender { defender } => world.remove_defender(defender, out_events),
        Command::MoveAttacker {
            attacker,
            position,
            cell,
            motion,
        } => {
            let Some(entity) = world.entities.get_mut(attacker) else {
                return;
            };
            if !entity.alive || entity.motion.is_none() {
                return;
            }
            let from = entity.cell;
            entity.position = position;
            entity.cell = cell;
            entity.motion = Some(motion);
            if from != cell {
                out_events.push(Event::AttackerAdvanced {
                    attacker,
                    from,
                    to: cell,
                });
            }
        }
        Command::EscapeAttacker { attacker } => {
            let Some(entity) = world.entities.get_mut(attacker) else {
                return;
            };
            if !entity.alive || entity.motion.is_none() {
                return;
            }
            entity.alive = false;
            entity.target = None;
            debug!(?attacker, "attacker escaped");
            out_events.push(Event::AttackerEscaped { attacker });
        }
        Command::LockTarget {
            entity,
            target,
            lost,
        } => world.lock_target(entity, target, lost, out_events),
        Command::ReleaseTarget { entity } => world.release_target(entity, out_events),
        Command::ChargeWeapon { entity, elapsed } => {
            if let Some(entity) = world.entities.get_mut(entity) {
                if entity.alive {
                    entity.since_last_fire = elapsed;
                }
            }
        }
        Command::Fire { source, target } => world.fire(source, target, out_events),
        Command::SweepRemovals => world.sweep_removals(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use lane_defence_core::{
        CellCoord, EntitySnapshot, EntityView, GridConfig, Side, SimulationConfig,
        WalkabilityView,
    };

    use super::World;

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Grid geometry used for world-coordinate conversion.
    #[must_use]
    pub fn grid_config(world: &World) -> &GridConfig {
        &world.config.grid
    }

    /// Exposes a read-only view of the walkability grid.
    ///
    /// The grid reflects the obstacle snapshot taken at the start of the
    /// current tick.
    #[must_use]
    pub fn walkability(world: &World) -> WalkabilityView<'_> {
        world.grid.view()
    }

    /// Captures a read-only view of every entity, including those awaiting removal.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        let snapshots: Vec<EntitySnapshot> = world
            .entities
            .iter()
            .map(|(id, entity)| entity.snapshot(id))
            .collect();
        EntityView::from_snapshots(snapshots)
    }

    /// Reports whether a live entity stands on the cell.
    #[must_use]
    pub fn is_occupied(world: &World, cell: CellCoord) -> bool {
        world.live_entity_at(cell).is_some()
    }

    /// Battle rows whose spawn cell is walkable and free of attackers.
    #[must_use]
    pub fn open_spawn_rows(world: &World) -> Vec<u32> {
        let column = world.config.waves.spawn_column;
        world
            .grid
            .band()
            .iter_rows()
            .filter(|row| {
                let cell = CellCoord::new(column, *row);
                world.grid.is_walkable(cell)
                    && !world.entities.iter().any(|(_, entity)| {
                        entity.alive && entity.side() == Side::Attacker && entity.cell == cell
                    })
            })
            .collect()
    }

    /// Number of live entities on the provided side.
    #[must_use]
    pub fn population(world: &World, side: Side) -> usize {
        world
            .entities
            .iter()
            .filter(|(_, entity)| entity.alive && entity.side() == side)
            .count()
    }
}

#[derive(Clone, Debug)]
struct Entity {
    archetype: Archetype,
    stats: ArchetypeStats,
    cell: CellCoord,
    position: WorldPoint,
    health: Health,
    max_health: Health,
    since_last_fire: Duration,
    target: Option<EntityId>,
    target_lost: Duration,
    alive: bool,
    motion: Option<AttackerMotion>,
}

impl Entity {
    fn new(
        archetype: Archetype,
        stats: ArchetypeStats,
        health: Health,
        cell: CellCoord,
        position: WorldPoint,
        motion: Option<AttackerMotion>,
    ) -> Self {
        Self {
            archetype,
            stats,
            cell,
            position,
            health,
            max_health: health,
            since_last_fire: Duration::ZERO,
            target: None,
            target_lost: Duration::ZERO,
            alive: !health.is_zero(),
            motion,
        }
    }

    fn side(&self) -> Side {
        self.archetype.side()
    }

    fn snapshot(&self, id: EntityId) -> lane_defence_core::EntitySnapshot {
        lane_defence_core::EntitySnapshot {
            id,
            archetype: self.archetype,
            cell: self.cell,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            move_speed: self.stats.move_speed,
            range_cells: self.stats.attack_range_cells,
            fire_interval: self.stats.fire_interval(),
            since_last_fire: self.since_last_fire,
            damage: self.stats.damage,
            pattern: self.stats.pattern,
            target: self.target,
            target_lost: self.target_lost,
            alive: self.alive,
            motion: self.motion,
        }
    }
}
