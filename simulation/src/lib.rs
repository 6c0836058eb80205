#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Explicit simulation context that drives one Lane Defence battle.
//!
//! A [`Simulation`] owns the world and every system. The host calls
//! [`Simulation::tick`] once per frame; each tick refreshes obstacles, runs
//! the wave director, movement, targeting and combat in that order, and ends
//! with a removal sweep. Placement and removal requests go through the
//! context as well, so nothing outside it mutates simulation state.

use std::time::Duration;

use lane_defence_core::{
    CellCoord, Command, ConfigError, DefenderKind, Economy, EntityId, EntityView, Event,
    PlacementError, RemovalError, Side, SimulationConfig,
};
use lane_defence_system_combat::CombatScheduler;
use lane_defence_system_movement::Movement;
use lane_defence_system_pathfinding::{simplify_path, PathSearch};
use lane_defence_system_targeting::TargetAcquisition;
use lane_defence_system_waves::{WaveDirector, WaveState};
use lane_defence_world::{self as world, query, World};
use serde::Serialize;
use tracing::{debug, warn};

/// Running totals collected over the lifetime of a simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulationStats {
    /// Number of ticks processed.
    pub ticks: u64,
    /// Attackers that entered the battlefield.
    pub spawned: u32,
    /// Attackers destroyed by defenders.
    pub killed: u32,
    /// Attackers that crossed the far boundary.
    pub escaped: u32,
    /// Defenders destroyed by attackers.
    pub defenders_lost: u32,
    /// Gold credited to the economy for kills.
    pub gold_awarded: u64,
}

/// Simulation context owning the world, the systems and the economy handle.
#[derive(Debug)]
pub struct Simulation<E> {
    world: World,
    economy: E,
    waves: WaveDirector,
    movement: Movement,
    targeting: TargetAcquisition,
    combat: CombatScheduler,
    search: PathSearch,
    commands: Vec<Command>,
    events: Vec<Event>,
    stats: SimulationStats,
}

impl<E: Economy> Simulation<E> {
    /// Builds a simulation from a validated configuration.
    pub fn new(config: &SimulationConfig, economy: E) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.path.costs_consistent() {
            warn!(
                straight_cost = config.path.straight_cost,
                diagonal_cost = config.path.diagonal_cost,
                heuristic = ?config.path.heuristic,
                "diagonal steps are cheaper than straight ones; routes may not be shortest"
            );
        }

        Ok(Self {
            world: World::new(config),
            economy,
            waves: WaveDirector::new(config.waves, config.seed),
            movement: Movement::new(config.movement, config.grid, config.path),
            targeting: TargetAcquisition::new(config.combat.lock_grace()),
            combat: CombatScheduler::new(),
            search: PathSearch::new(config.path),
            commands: Vec::new(),
            events: Vec::new(),
            stats: SimulationStats::default(),
        })
    }

    /// Advances the simulation by `delta_seconds` of simulated time.
    ///
    /// Negative and non-finite deltas are treated as zero. Events left in
    /// the log from earlier calls are discarded first.
    pub fn tick(&mut self, delta_seconds: f32) {
        let dt = duration_from_seconds(delta_seconds);
        self.events.clear();

        world::apply(&mut self.world, Command::Tick { dt }, &mut self.events);

        let open_rows = query::open_spawn_rows(&self.world);
        self.waves
            .handle(dt, &open_rows, &mut self.commands, &mut self.events);
        self.flush_commands();

        let entities = query::entity_view(&self.world);
        self.movement.handle(
            dt,
            &entities,
            &query::walkability(&self.world),
            &mut self.commands,
        );
        self.flush_commands();

        let entities = query::entity_view(&self.world);
        self.targeting.handle(dt, &entities, &mut self.commands);
        self.flush_commands();

        let entities = query::entity_view(&self.world);
        self.combat.handle(dt, &entities, &mut self.commands);
        self.flush_commands();

        world::apply(&mut self.world, Command::SweepRemovals, &mut self.events);

        self.stats.ticks = self.stats.ticks.saturating_add(1);
        self.settle();
    }

    /// Places a defender after checking the cell and the economy.
    ///
    /// The cost is charged only when the placement succeeds. The defender
    /// blocks movement from the next tick onward.
    pub fn place_defender(
        &mut self,
        kind: DefenderKind,
        cell: CellCoord,
    ) -> Result<EntityId, PlacementError> {
        let cost = query::config(&self.world).defenders.stats(kind).cost;
        if !self.economy.affordable(cost) {
            let reason = PlacementError::InsufficientFunds;
            debug!(?kind, ?cell, cost, "placement rejected, not enough gold");
            self.events
                .push(Event::PlacementRejected { kind, cell, reason });
            return Err(reason);
        }

        let first_event = self.events.len();
        world::apply(
            &mut self.world,
            Command::PlaceDefender { kind, cell },
            &mut self.events,
        );

        let outcome = self.events[first_event..]
            .iter()
            .find_map(|event| match event {
                Event::DefenderPlaced { defender, .. } => Some(Ok(*defender)),
                Event::PlacementRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(PlacementError::CellOccupied));

        if outcome.is_ok() && !self.economy.spend(cost) {
            warn!(?kind, cost, "economy refused a charge it reported affordable");
        }
        outcome
    }

    /// Removes a live defender immediately.
    pub fn remove_defender(&mut self, defender: EntityId) -> Result<(), RemovalError> {
        let first_event = self.events.len();
        world::apply(
            &mut self.world,
            Command::RemoveDefender { defender },
            &mut self.events,
        );

        self.events[first_event..]
            .iter()
            .find_map(|event| match event {
                Event::DefenderRemoved { .. } => Some(Ok(())),
                Event::RemovalRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(RemovalError::MissingDefender))
    }

    /// Reports whether a live entity stands on `cell`.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        query::is_occupied(&self.world, cell)
    }

    /// Simplified route from an attacker's cell to the last column of its row.
    ///
    /// Returns `None` for unknown or dead attackers and when no route exists.
    #[must_use]
    pub fn route_preview(&self, attacker: EntityId) -> Option<Vec<CellCoord>> {
        let view = query::entity_view(&self.world);
        let snapshot = view
            .get(attacker)
            .filter(|snapshot| snapshot.alive && snapshot.side() == Side::Attacker)?;
        let walkability = query::walkability(&self.world);
        let (columns, _) = walkability.dimensions();
        let goal = CellCoord::new(columns.checked_sub(1)?, snapshot.cell.row());
        let path = self.search.find_path(&walkability, snapshot.cell, goal)?;
        Some(simplify_path(&path))
    }

    /// Events of the latest tick plus any placement or removal outcomes
    /// recorded after it.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Takes every recorded event, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Snapshot of every entity, sorted by handle.
    #[must_use]
    pub fn entity_view(&self) -> EntityView {
        query::entity_view(&self.world)
    }

    /// Number of live entities fighting for `side`.
    #[must_use]
    pub fn population(&self, side: Side) -> usize {
        query::population(&self.world, side)
    }

    /// Configuration the simulation was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        query::config(&self.world)
    }

    /// Current wave escalation state.
    #[must_use]
    pub fn wave_state(&self) -> WaveState {
        self.waves.state()
    }

    /// Totals collected so far.
    #[must_use]
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Economy collaborator.
    #[must_use]
    pub fn economy(&self) -> &E {
        &self.economy
    }

    /// Mutable access to the economy collaborator.
    pub fn economy_mut(&mut self) -> &mut E {
        &mut self.economy
    }

    fn flush_commands(&mut self) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }

    /// Folds the events of the finished tick into statistics and the economy.
    fn settle(&mut self) {
        for event in &self.events {
            match event {
                Event::AttackerSpawned { .. } => {
                    self.stats.spawned = self.stats.spawned.saturating_add(1);
                }
                Event::AttackerEscaped { .. } => {
                    self.stats.escaped = self.stats.escaped.saturating_add(1);
                }
                Event::EntityKilled {
                    side: Side::Attacker,
                    reward,
                    ..
                } => {
                    self.stats.killed = self.stats.killed.saturating_add(1);
                    self.stats.gold_awarded =
                        self.stats.gold_awarded.saturating_add(u64::from(*reward));
                    self.economy.add_gold(*reward);
                }
                Event::EntityKilled {
                    side: Side::Defender,
                    ..
                } => {
                    self.stats.defenders_lost = self.stats.defenders_lost.saturating_add(1);
                }
                _ => {}
            }
        }
    }
}

fn duration_from_seconds(delta_seconds: f32) -> Duration {
    if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(delta_seconds).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::Purse;

    #[test]
    fn invalid_deltas_clamp_to_zero() {
        assert_eq!(duration_from_seconds(-1.0), Duration::ZERO);
        assert_eq!(duration_from_seconds(f32::NAN), Duration::ZERO);
        assert_eq!(duration_from_seconds(f32::INFINITY), Duration::ZERO);
        assert_eq!(duration_from_seconds(0.5), Duration::from_millis(500));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = SimulationConfig::default();
        config.grid.rows = 0;
        assert!(matches!(
            Simulation::new(&config, Purse::new(0)),
            Err(ConfigError::EmptyGrid)
        ));
    }

    #[test]
    fn cheap_diagonals_are_accepted() {
        let mut config = SimulationConfig::default();
        config.path.diagonal_cost = 5;
        assert!(Simulation::new(&config, Purse::new(0)).is_ok());
    }

    #[test]
    fn placement_charges_only_on_success() {
        let config = SimulationConfig::default();
        let cost = config.defenders.sentry.cost;
        let mut simulation = Simulation::new(&config, Purse::new(cost * 2)).expect("config");

        let cell = CellCoord::new(5, 3);
        let placed = simulation.place_defender(DefenderKind::Sentry, cell);
        assert!(placed.is_ok());
        assert_eq!(simulation.economy().gold(), cost);
        assert!(simulation.is_occupied(cell));

        assert_eq!(
            simulation.place_defender(DefenderKind::Sentry, cell),
            Err(PlacementError::CellOccupied)
        );
        assert_eq!(simulation.economy().gold(), cost);

        assert_eq!(
            simulation.place_defender(DefenderKind::Mortar, CellCoord::new(6, 3)),
            Err(PlacementError::InsufficientFunds)
        );
        assert_eq!(simulation.economy().gold(), cost);

        simulation.economy_mut().add_gold(config.defenders.mortar.cost);
        assert!(simulation
            .place_defender(DefenderKind::Mortar, CellCoord::new(6, 3))
            .is_ok());
        assert_eq!(simulation.economy().gold(), cost);
        assert_eq!(simulation.population(Side::Defender), 2);
    }

    #[test]
    fn removal_of_unknown_defender_fails() {
        let config = SimulationConfig::default();
        let mut simulation = Simulation::new(&config, Purse::new(500)).expect("config");
        let defender = simulation
            .place_defender(DefenderKind::Sentry, CellCoord::new(3, 2))
            .expect("placed");

        assert_eq!(simulation.remove_defender(defender), Ok(()));
        assert_eq!(
            simulation.remove_defender(defender),
            Err(RemovalError::MissingDefender)
        );
    }

    #[test]
    fn event_log_holds_only_the_latest_tick() {
        let config = SimulationConfig::default();
        let mut simulation = Simulation::new(&config, Purse::new(500)).expect("config");
        let _ = simulation
            .place_defender(DefenderKind::Sentry, CellCoord::new(4, 2))
            .expect("placed");
        assert!(matches!(
            simulation.events(),
            [Event::DefenderPlaced { .. }]
        ));

        for _ in 0..50 {
            simulation.tick(0.1);
            assert!(matches!(
                simulation.events().first(),
                Some(Event::TimeAdvanced { .. })
            ));
            assert_eq!(
                simulation
                    .events()
                    .iter()
                    .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
                    .count(),
                1
            );
        }
        assert_eq!(simulation.stats().ticks, 50);
    }
}
