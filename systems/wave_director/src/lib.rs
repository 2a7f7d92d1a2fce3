#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave director responsible for emitting enemy spawn commands.
//!
//! The director schedules spawns for the running wave from the events the
//! world broadcasts: a `WaveStarted` event spawns the first enemy at once, and
//! every further spawn waits for a full spawn interval of `TimeAdvanced`
//! time. Enemy kinds are drawn from the wave's spawn table with a seeded
//! ChaCha stream so that identical inputs always replay identically.

use std::time::Duration;

use log::{debug, warn};
use path_defence_core::{Command, EnemyKind, Event, GameConfig, SpawnTable};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Debug)]
pub struct Config {
    rules: GameConfig,
}

impl Config {
    /// Creates a configuration from the game rules.
    #[must_use]
    pub fn new(rules: GameConfig) -> Self {
        Self { rules }
    }

    /// Seed of the enemy selection stream.
    #[must_use]
    pub fn rng_seed(&self) -> u64 {
        self.rules.rng_seed
    }
}

/// Weighted sampler over the kinds of a spawn table.
///
/// Sampling performs a binary search over cumulative weights.
#[derive(Clone, Debug)]
pub struct EnemySelector {
    kinds: Vec<EnemyKind>,
    weights: WeightedIndex<u32>,
}

impl EnemySelector {
    /// Builds a sampler for `table`.
    ///
    /// Returns `None` when the table is empty or every weight is zero.
    #[must_use]
    pub fn new(table: &SpawnTable) -> Option<Self> {
        let weights = WeightedIndex::new(table.entries().iter().map(|(_, weight)| *weight)).ok()?;
        let kinds = table.entries().iter().map(|(kind, _)| *kind).collect();
        Some(Self { kinds, weights })
    }

    /// Draws one enemy kind.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> EnemyKind {
        self.kinds[self.weights.sample(rng)]
    }
}

#[derive(Clone, Debug)]
struct SpawnSchedule {
    wave: u32,
    remaining: u32,
    interval: Duration,
    accumulator: Duration,
    selector: EnemySelector,
}

/// Pure system that emits spawn commands for the running wave.
#[derive(Debug)]
pub struct WaveDirector {
    config: Config,
    rng: ChaCha8Rng,
    schedule: Option<SpawnSchedule>,
}

impl WaveDirector {
    /// Creates a new wave director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed()),
            config,
            schedule: None,
        }
    }

    /// Reports whether spawns are still pending for the running wave.
    #[must_use]
    pub fn has_pending_spawns(&self) -> bool {
        self.schedule.is_some()
    }

    /// Consumes world events and emits the spawn commands that fell due.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::WaveStarted { wave, size, .. } => self.schedule_wave(*wave, *size, out),
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                Event::GameReset => {
                    self.schedule = None;
                    self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed());
                }
                Event::WaveCompleted { .. }
                | Event::LevelLoaded { .. }
                | Event::GameOver { .. }
                | Event::AllWavesCleared { .. } => self.schedule = None,
                _ => {}
            }
        }
    }

    fn schedule_wave(&mut self, wave: u32, size: u32, out: &mut Vec<Command>) {
        let Some(selector) = EnemySelector::new(&SpawnTable::for_wave(wave)) else {
            warn!("wave {wave} has no spawnable enemies");
            self.schedule = None;
            return;
        };

        let interval = self.config.rules.spawn_interval(wave);
        debug!("scheduling {size} spawns every {interval:?} for wave {wave}");
        self.schedule = Some(SpawnSchedule {
            wave,
            remaining: size,
            interval,
            accumulator: Duration::ZERO,
            selector,
        });
        self.emit_spawn(out);
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        let Some(schedule) = self.schedule.as_mut() else {
            return;
        };
        schedule.accumulator = schedule.accumulator.saturating_add(dt);

        let mut due = 0;
        while schedule.remaining > due && schedule.accumulator >= schedule.interval {
            schedule.accumulator -= schedule.interval;
            due += 1;
        }
        for _ in 0..due {
            self.emit_spawn(out);
        }
    }

    fn emit_spawn(&mut self, out: &mut Vec<Command>) {
        let Some(schedule) = self.schedule.as_mut() else {
            return;
        };
        if schedule.remaining == 0 {
            self.schedule = None;
            return;
        }

        let kind = schedule.selector.select(&mut self.rng);
        schedule.remaining -= 1;
        out.push(Command::SpawnEnemy {
            wave: schedule.wave,
            kind,
        });
        if schedule.remaining == 0 {
            self.schedule = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_tables_have_no_selector() {
        let table = SpawnTable::new(vec![(EnemyKind::Basic, 0), (EnemyKind::Fast, 0)]);
        assert!(EnemySelector::new(&table).is_none());
        assert!(EnemySelector::new(&SpawnTable::new(Vec::new())).is_none());
    }

    #[test]
    fn empty_wave_schedules_nothing() {
        let mut director = WaveDirector::new(Config::new(GameConfig::default()));
        let mut commands = Vec::new();
        director.handle(
            &[Event::WaveStarted {
                wave: 1,
                size: 0,
                auto: false,
            }],
            &mut commands,
        );
        assert!(commands.is_empty());
        assert!(!director.has_pending_spawns());
    }
}
