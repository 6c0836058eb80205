#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that advances fire timers and emits firing commands.

use std::time::Duration;

use lane_defence_core::{Command, EntityView};

/// Combat scheduler that queues shots for entities whose interval elapsed.
#[derive(Debug, Default)]
pub struct CombatScheduler {
    scratch: Vec<Command>,
}

impl CombatScheduler {
    /// Creates a new combat scheduler with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the fire timer of every live entity holding a target.
    ///
    /// Entities whose accumulated time reaches their fire interval emit
    /// `Command::Fire`; the rest emit `Command::ChargeWeapon` with the new
    /// accumulated time.
    pub fn handle(&mut self, dt: Duration, entities: &EntityView, out: &mut Vec<Command>) {
        self.scratch.clear();

        for entity in entities.iter() {
            if !entity.alive {
                continue;
            }
            let Some(target) = entity.target else {
                continue;
            };

            let elapsed = entity.since_last_fire.saturating_add(dt);
            if elapsed >= entity.fire_interval {
                self.scratch.push(Command::Fire {
                    source: entity.id,
                    target,
                });
            } else {
                self.scratch.push(Command::ChargeWeapon {
                    entity: entity.id,
                    elapsed,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}
