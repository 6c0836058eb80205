#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director that escalates difficulty and requests attacker spawns.
//!
//! Two timers run side by side. The wave timer raises the level at a fixed
//! cadence, which adds health to new attackers and shortens the spawn
//! interval along a geometric curve. The spawn timer requests one attacker
//! per elapsed interval on a random free battle row.

use std::time::Duration;

use lane_defence_core::{AttackerKind, Command, Event, WaveConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

const RNG_STREAM_SPAWN: &str = "waves.spawn";

/// Progress of the wave escalation curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveState {
    level: u32,
    wave_elapsed: Duration,
    spawn_elapsed: Duration,
    spawn_interval: Duration,
    hp_bonus: u32,
}

impl WaveState {
    /// State at the start of wave one.
    #[must_use]
    pub fn initial(config: &WaveConfig) -> Self {
        Self {
            level: 1,
            wave_elapsed: Duration::ZERO,
            spawn_elapsed: Duration::ZERO,
            spawn_interval: spawn_interval_for(config, 1),
            hp_bonus: hp_bonus_for(config, 1),
        }
    }

    /// Current wave level, starting at one.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Time spent in the current wave.
    #[must_use]
    pub const fn wave_elapsed(&self) -> Duration {
        self.wave_elapsed
    }

    /// Time accumulated toward the next spawn attempt.
    #[must_use]
    pub const fn spawn_elapsed(&self) -> Duration {
        self.spawn_elapsed
    }

    /// Interval between spawn attempts at the current level.
    #[must_use]
    pub const fn spawn_interval(&self) -> Duration {
        self.spawn_interval
    }

    /// Health added to attackers spawned at the current level.
    #[must_use]
    pub const fn hp_bonus(&self) -> u32 {
        self.hp_bonus
    }
}

/// Spawn interval for `level`: the base interval decayed geometrically per
/// wave, never below the configured minimum.
#[must_use]
pub fn spawn_interval_for(config: &WaveConfig, level: u32) -> Duration {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    let decayed_ms =
        config.base_spawn_interval_ms as f64 * config.spawn_reduction_factor.powi(exponent);
    if !decayed_ms.is_finite() || decayed_ms <= config.min_spawn_interval_ms as f64 {
        return Duration::from_millis(config.min_spawn_interval_ms);
    }
    Duration::from_secs_f64(decayed_ms / 1_000.0)
}

/// Health bonus granted to attackers spawned during `level`.
#[must_use]
pub fn hp_bonus_for(config: &WaveConfig, level: u32) -> u32 {
    level
        .saturating_sub(1)
        .saturating_mul(config.hp_bonus_per_wave)
}

/// Probability that a spawn during `level` uses the heavy archetype.
#[must_use]
pub fn heavy_chance_for(config: &WaveConfig, level: u32) -> f64 {
    let growth = config.heavy_chance_per_wave * f64::from(level.saturating_sub(1));
    (config.heavy_chance_base + growth)
        .min(config.heavy_chance_cap)
        .clamp(0.0, 1.0)
}

/// Stateful director advancing the wave and spawn timers.
#[derive(Debug)]
pub struct WaveDirector {
    config: WaveConfig,
    state: WaveState,
    rng: ChaCha8Rng,
    free_rows: Vec<u32>,
}

impl WaveDirector {
    /// Creates a director at wave one whose random draws derive from `seed`.
    #[must_use]
    pub fn new(config: WaveConfig, seed: u64) -> Self {
        Self {
            config,
            state: WaveState::initial(&config),
            rng: ChaCha8Rng::seed_from_u64(derive_labeled_seed(seed, RNG_STREAM_SPAWN)),
            free_rows: Vec::new(),
        }
    }

    /// Current escalation state.
    #[must_use]
    pub const fn state(&self) -> WaveState {
        self.state
    }

    /// Advances both timers by `dt`.
    ///
    /// `open_rows` lists the battle rows whose spawn cell is free. Each
    /// elapsed spawn interval draws one of them uniformly and pushes a
    /// `Command::SpawnAttacker`; a draw removes the row from consideration
    /// for the rest of the call. With no free row the attempt is dropped.
    pub fn handle(
        &mut self,
        dt: Duration,
        open_rows: &[u32],
        out: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        self.advance_wave_timer(dt, out_events);

        if self.state.spawn_interval.is_zero() {
            return;
        }

        self.free_rows.clear();
        self.free_rows.extend_from_slice(open_rows);

        self.state.spawn_elapsed = self.state.spawn_elapsed.saturating_add(dt);
        while self.state.spawn_elapsed >= self.state.spawn_interval {
            self.state.spawn_elapsed -= self.state.spawn_interval;

            if self.free_rows.is_empty() {
                debug!(level = self.state.level, "spawn skipped, every row occupied");
                continue;
            }

            let index = self.rng.gen_range(0..self.free_rows.len());
            let row = self.free_rows.swap_remove(index);
            let heavy = self
                .rng
                .gen_bool(heavy_chance_for(&self.config, self.state.level));
            let kind = if heavy {
                AttackerKind::Brute
            } else {
                AttackerKind::Grunt
            };
            out.push(Command::SpawnAttacker {
                kind,
                row,
                bonus_health: self.state.hp_bonus,
            });
        }
    }

    fn advance_wave_timer(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let wave_duration = self.config.wave_duration();
        if wave_duration.is_zero() {
            return;
        }

        self.state.wave_elapsed = self.state.wave_elapsed.saturating_add(dt);
        while self.state.wave_elapsed >= wave_duration {
            self.state.wave_elapsed -= wave_duration;
            self.state.level = self.state.level.saturating_add(1);
            self.state.spawn_interval = spawn_interval_for(&self.config, self.state.level);
            self.state.hp_bonus = hp_bonus_for(&self.config, self.state.level);

            info!(
                level = self.state.level,
                spawn_interval_ms = self.state.spawn_interval.as_millis() as u64,
                hp_bonus = self.state.hp_bonus,
                "wave advanced"
            );
            out_events.push(Event::WaveAdvanced {
                level: self.state.level,
                spawn_interval: self.state.spawn_interval,
                hp_bonus: self.state.hp_bonus,
            });
        }
    }
}

fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(duration: Duration) -> f64 {
        duration.as_secs_f64() * 1_000.0
    }

    #[test]
    fn spawn_interval_decays_geometrically() {
        let config = WaveConfig::default();
        assert!((millis(spawn_interval_for(&config, 1)) - 2_000.0).abs() < 1e-6);

        let expected = 2_000.0 * 0.92_f64.powi(4);
        let wave_five = millis(spawn_interval_for(&config, 5));
        assert!((wave_five - expected).abs() < 1e-6);
        assert!((wave_five - 1_432.78).abs() < 0.01, "got {wave_five}");
    }

    #[test]
    fn spawn_interval_never_drops_below_floor() {
        let config = WaveConfig::default();
        for level in [12, 13, 50, 1_000, u32::MAX] {
            assert!(spawn_interval_for(&config, level) >= Duration::from_millis(800));
        }
        assert_eq!(spawn_interval_for(&config, 100), Duration::from_millis(800));
    }

    #[test]
    fn hp_bonus_grows_per_wave() {
        let config = WaveConfig::default();
        assert_eq!(hp_bonus_for(&config, 1), 0);
        assert_eq!(hp_bonus_for(&config, 4), 6);
    }

    #[test]
    fn heavy_chance_grows_linearly_up_to_cap() {
        let config = WaveConfig::default();
        assert!((heavy_chance_for(&config, 1) - 0.1).abs() < 1e-9);
        assert!((heavy_chance_for(&config, 3) - 0.2).abs() < 1e-9);
        assert!((heavy_chance_for(&config, 40) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn wave_timer_raises_level_and_reports_it() {
        let config = WaveConfig {
            wave_duration_ms: 1_000,
            ..WaveConfig::default()
        };
        let mut director = WaveDirector::new(config, 7);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        director.handle(Duration::from_millis(2_500), &[], &mut commands, &mut events);

        assert_eq!(director.state().level(), 3);
        assert_eq!(director.state().hp_bonus(), 4);
        assert_eq!(director.state().wave_elapsed(), Duration::from_millis(500));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::WaveAdvanced { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn spawn_attempts_without_free_rows_are_dropped() {
        let mut director = WaveDirector::new(WaveConfig::default(), 7);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        director.handle(Duration::from_millis(2_000), &[], &mut commands, &mut events);
        assert!(commands.is_empty());
        assert_eq!(director.state().spawn_elapsed(), Duration::ZERO);

        director.handle(Duration::from_millis(1_999), &[3], &mut commands, &mut events);
        assert!(commands.is_empty(), "missed spawns are not retried early");
    }

    #[test]
    fn rows_are_not_reused_within_one_call() {
        let mut director = WaveDirector::new(WaveConfig::default(), 11);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        director.handle(
            Duration::from_millis(6_000),
            &[2, 5],
            &mut commands,
            &mut events,
        );

        let mut rows: Vec<u32> = commands
            .iter()
            .filter_map(|command| match command {
                Command::SpawnAttacker { row, .. } => Some(*row),
                _ => None,
            })
            .collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![2, 5]);
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let run = |seed| {
            let mut director = WaveDirector::new(WaveConfig::default(), seed);
            let mut commands = Vec::new();
            let mut events = Vec::new();
            for _ in 0..200 {
                director.handle(
                    Duration::from_millis(250),
                    &[1, 2, 3, 4, 5, 6, 7, 8],
                    &mut commands,
                    &mut events,
                );
            }
            commands
        };

        let first = run(42);
        assert!(!first.is_empty());
        assert_eq!(first, run(42));
    }

    #[test]
    fn labeled_seeds_separate_streams() {
        assert_ne!(
            derive_labeled_seed(1, RNG_STREAM_SPAWN),
            derive_labeled_seed(1, "other")
        );
        assert_ne!(
            derive_labeled_seed(1, RNG_STREAM_SPAWN),
            derive_labeled_seed(2, RNG_STREAM_SPAWN)
        );
    }
}
