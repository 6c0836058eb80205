#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that keeps target locks for both populations.
//!
//! Attackers search for defenders and defenders search for attackers using
//! the same nearest-in-range rule. A lock, once taken, is held while the
//! target stays alive and in range, and for a short grace window after it
//! leaves range.

use std::time::Duration;

use lane_defence_core::{CellCoord, Command, EntityId, EntitySnapshot, EntityView, Side};
use tracing::debug;

/// Target acquisition system that reuses a scratch buffer of candidates.
#[derive(Debug)]
pub struct TargetAcquisition {
    grace: Duration,
    candidates: Vec<Candidate>,
}

impl TargetAcquisition {
    /// Creates a targeting system that tolerates out-of-range targets for `grace`.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            candidates: Vec::new(),
        }
    }

    /// Finds the nearest live opponent within `seeker`'s range.
    ///
    /// Distance is measured between cell coordinates. When several candidates
    /// sit at the same distance, the first one in view order wins.
    #[must_use]
    pub fn acquire(&self, seeker: &EntitySnapshot, entities: &EntityView) -> Option<EntityId> {
        nearest_in_range(
            seeker.cell,
            seeker.range_cells,
            entities
                .side(seeker.side().opposing())
                .filter(|candidate| candidate.alive)
                .map(|candidate| Candidate {
                    id: candidate.id,
                    cell: candidate.cell,
                }),
        )
    }

    /// Resolves the lock of every live entity for a tick of length `dt`.
    ///
    /// Emits `Command::LockTarget` for locks that are taken or kept and
    /// `Command::ReleaseTarget` for locks that end.
    pub fn handle(&mut self, dt: Duration, entities: &EntityView, out: &mut Vec<Command>) {
        for side in [Side::Attacker, Side::Defender] {
            self.prepare_candidates(entities, side.opposing());

            for seeker in entities.side(side) {
                if !seeker.alive {
                    continue;
                }
                match self.decide(seeker, entities, dt) {
                    Decision::Keep { target, lost } => {
                        if seeker.target != Some(target) || seeker.target_lost != lost {
                            out.push(Command::LockTarget {
                                entity: seeker.id,
                                target,
                                lost,
                            });
                        }
                    }
                    Decision::Release => {
                        debug!(entity = ?seeker.id, "target lock released");
                        out.push(Command::ReleaseTarget { entity: seeker.id });
                    }
                    Decision::Idle => {}
                }
            }
        }
    }

    fn prepare_candidates(&mut self, entities: &EntityView, side: Side) {
        self.candidates.clear();
        self.candidates.extend(
            entities
                .side(side)
                .filter(|candidate| candidate.alive)
                .map(|candidate| Candidate {
                    id: candidate.id,
                    cell: candidate.cell,
                }),
        );
    }

    fn decide(&self, seeker: &EntitySnapshot, entities: &EntityView, dt: Duration) -> Decision {
        let locked = seeker
            .target
            .and_then(|id| entities.get(id))
            .filter(|target| target.alive);

        if seeker.target.is_some() && locked.is_none() {
            return Decision::Release;
        }

        if let Some(target) = locked {
            if in_range(seeker.cell, seeker.range_cells, target.cell) {
                return Decision::Keep {
                    target: target.id,
                    lost: Duration::ZERO,
                };
            }
        }

        let nearest = nearest_in_range(
            seeker.cell,
            seeker.range_cells,
            self.candidates.iter().copied(),
        );
        if let Some(target) = nearest {
            return Decision::Keep {
                target,
                lost: Duration::ZERO,
            };
        }

        match locked {
            Some(target) => {
                let lost = seeker.target_lost.saturating_add(dt);
                if lost <= self.grace {
                    Decision::Keep {
                        target: target.id,
                        lost,
                    }
                } else {
                    Decision::Release
                }
            }
            None => Decision::Idle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    id: EntityId,
    cell: CellCoord,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Decision {
    Keep { target: EntityId, lost: Duration },
    Release,
    Idle,
}

fn in_range(from: CellCoord, range_cells: f32, to: CellCoord) -> bool {
    from.grid_distance(to) <= range_cells
}

fn nearest_in_range(
    from: CellCoord,
    range_cells: f32,
    candidates: impl Iterator<Item = Candidate>,
) -> Option<EntityId> {
    let mut best: Option<(f32, EntityId)> = None;
    for candidate in candidates {
        let distance = from.grid_distance(candidate.cell);
        if distance > range_cells {
            continue;
        }
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, candidate.id)),
        }
    }
    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{
        Archetype, AttackerKind, AttackerMotion, DefenderKind, FirePattern, Health, WorldPoint,
    };
    use slotmap::KeyData;

    fn entity_id(index: u32) -> EntityId {
        EntityId::from(KeyData::from_ffi(u64::from(index)))
    }

    fn snapshot(index: u32, archetype: Archetype, cell: CellCoord) -> EntitySnapshot {
        EntitySnapshot {
            id: entity_id(index),
            archetype,
            cell,
            position: WorldPoint::default(),
            health: Health::new(5),
            max_health: Health::new(5),
            move_speed: 0.0,
            range_cells: 2.0,
            fire_interval: Duration::from_secs(1),
            since_last_fire: Duration::ZERO,
            damage: 1,
            pattern: FirePattern::Direct,
            target: None,
            target_lost: Duration::ZERO,
            alive: true,
            motion: match archetype {
                Archetype::Attacker(_) => Some(AttackerMotion::resting_at(cell)),
                Archetype::Defender(_) => None,
            },
        }
    }

    fn sentry(index: u32, column: u32, row: u32) -> EntitySnapshot {
        snapshot(
            index,
            Archetype::Defender(DefenderKind::Sentry),
            CellCoord::new(column, row),
        )
    }

    fn grunt(index: u32, column: u32, row: u32) -> EntitySnapshot {
        snapshot(
            index,
            Archetype::Attacker(AttackerKind::Grunt),
            CellCoord::new(column, row),
        )
    }

    #[test]
    fn nearest_candidate_in_range_wins() {
        let system = TargetAcquisition::new(Duration::from_millis(500));
        let tower = sentry(0, 5, 2);
        let view = EntityView::from_snapshots(vec![
            tower.clone(),
            grunt(1, 3, 2),
            grunt(2, 4, 3),
            grunt(3, 9, 2),
        ]);

        assert_eq!(system.acquire(&tower, &view), Some(entity_id(2)));
    }

    #[test]
    fn equidistant_candidates_resolve_to_first_in_view() {
        let system = TargetAcquisition::new(Duration::from_millis(500));
        let tower = sentry(0, 5, 2);
        let view =
            EntityView::from_snapshots(vec![tower.clone(), grunt(4, 5, 1), grunt(2, 5, 3)]);

        assert_eq!(system.acquire(&tower, &view), Some(entity_id(2)));
    }

    #[test]
    fn populations_never_target_their_own_side() {
        let system = TargetAcquisition::new(Duration::from_millis(500));
        let tower = sentry(0, 5, 2);
        let view = EntityView::from_snapshots(vec![tower.clone(), sentry(1, 5, 3)]);

        assert_eq!(system.acquire(&tower, &view), None);
    }

    #[test]
    fn existing_lock_outranks_closer_candidate() {
        let mut system = TargetAcquisition::new(Duration::from_millis(500));
        let mut tower = sentry(0, 5, 2);
        tower.target = Some(entity_id(1));
        let view = EntityView::from_snapshots(vec![tower, grunt(1, 3, 2), grunt(2, 5, 3)]);

        let mut out = Vec::new();
        system.handle(Duration::from_millis(16), &view, &mut out);

        assert!(
            out.iter().all(|command| !matches!(
                command,
                Command::LockTarget { entity, .. } | Command::ReleaseTarget { entity }
                    if *entity == entity_id(0)
            )),
            "lock is kept without new commands: {out:?}"
        );
    }

    #[test]
    fn stale_lock_is_released() {
        let mut system = TargetAcquisition::new(Duration::from_millis(500));
        let mut tower = sentry(0, 5, 2);
        tower.target = Some(entity_id(7));
        let view = EntityView::from_snapshots(vec![tower, grunt(1, 9, 3)]);

        let mut out = Vec::new();
        system.handle(Duration::from_millis(16), &view, &mut out);

        assert_eq!(
            out,
            vec![Command::ReleaseTarget {
                entity: entity_id(0)
            }]
        );
    }

    #[test]
    fn dead_entities_neither_seek_nor_get_targeted() {
        let mut system = TargetAcquisition::new(Duration::from_millis(500));
        let mut tower = sentry(0, 5, 2);
        tower.alive = false;
        let view = EntityView::from_snapshots(vec![tower, grunt(1, 5, 3)]);

        let mut out = Vec::new();
        system.handle(Duration::from_millis(16), &view, &mut out);

        assert!(out.is_empty(), "unexpected commands: {out:?}");
    }
}
