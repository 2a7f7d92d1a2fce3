//! Tunable game rules loaded by adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Numeric rules that shape a run.
///
/// Every field has a default matching the classic ruleset, so configuration
/// files only need to list the values they change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Gold available when a run starts.
    pub starting_gold: u32,
    /// Lives available when a run starts.
    pub starting_lives: u32,
    /// Number of enemies in the first wave.
    pub initial_wave_size: u32,
    /// Multiplier applied to the wave size after every cleared wave.
    pub wave_size_growth: f32,
    /// Clearing this many waves wins the run.
    pub max_waves: u32,
    /// Gold granted for clearing a wave.
    pub wave_completion_bonus: u32,
    /// Pause between a cleared wave and the next one, in milliseconds.
    pub countdown_ms: u64,
    /// Fixed simulation ticks per second.
    pub tick_rate: u32,
    /// Distance a projectile covers per tick.
    pub projectile_speed: f32,
    /// How long a slow effect lasts after a hit, in milliseconds.
    pub slow_duration_ms: u64,
    /// How long a chain-lightning segment stays visible, in milliseconds.
    pub lightning_display_ms: u64,
    /// Delay between spawns during the first wave, in milliseconds.
    pub base_spawn_interval_ms: u64,
    /// Fractional reduction of the spawn delay per wave.
    pub spawn_interval_step: f32,
    /// Lower bound of the spawn delay as a fraction of the base delay.
    pub spawn_interval_floor: f32,
    /// Minimum distance between a tower and the path polyline.
    pub path_clearance: f32,
    /// Minimum distance between two towers.
    pub tower_clearance: f32,
    /// Towers must stay this far from the arena edges.
    pub bounds_margin: f32,
    /// Arena width in world units.
    pub arena_width: f32,
    /// Arena height in world units.
    pub arena_height: f32,
    /// Radius used when hit-testing towers under the cursor.
    pub tower_hit_radius: f32,
    /// Seed for the enemy selection stream.
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_gold: 100,
            starting_lives: 20,
            initial_wave_size: 10,
            wave_size_growth: 1.5,
            max_waves: 10,
            wave_completion_bonus: 50,
            countdown_ms: 5_000,
            tick_rate: 60,
            projectile_speed: 5.0,
            slow_duration_ms: 2_000,
            lightning_display_ms: 250,
            base_spawn_interval_ms: 1_000,
            spawn_interval_step: 0.08,
            spawn_interval_floor: 0.2,
            path_clearance: 40.0,
            tower_clearance: 50.0,
            bounds_margin: 30.0,
            arena_width: 800.0,
            arena_height: 600.0,
            tower_hit_radius: 30.0,
            rng_seed: 0x5eed_7d0f_ace5_1a7e,
        }
    }
}

impl GameConfig {
    /// Simulated time covered by one fixed tick.
    ///
    /// Rounded up to whole nanoseconds so that `tick_rate` ticks never fall
    /// short of one second.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        let rate = u64::from(self.tick_rate.max(1));
        Duration::from_nanos(1_000_000_000_u64.div_ceil(rate))
    }

    /// Pause before the next wave starts automatically.
    #[must_use]
    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    /// Lifetime of a slow effect.
    #[must_use]
    pub fn slow_duration(&self) -> Duration {
        Duration::from_millis(self.slow_duration_ms)
    }

    /// Lifetime of a chain-lightning segment.
    #[must_use]
    pub fn lightning_display(&self) -> Duration {
        Duration::from_millis(self.lightning_display_ms)
    }

    /// Delay between consecutive spawns of the given wave.
    ///
    /// Shrinks by `spawn_interval_step` per wave down to
    /// `spawn_interval_floor` of the base delay.
    #[must_use]
    pub fn spawn_interval(&self, wave: u32) -> Duration {
        let elapsed = f64::from(wave.saturating_sub(1));
        let factor = (1.0 - f64::from(self.spawn_interval_step) * elapsed)
            .max(f64::from(self.spawn_interval_floor));
        let millis = (self.base_spawn_interval_ms as f64 * factor).round();
        Duration::from_millis(millis.max(0.0) as u64)
    }

    /// Enemy count of the wave following one of `size` enemies.
    #[must_use]
    pub fn next_wave_size(&self, size: u32) -> u32 {
        (size as f32 * self.wave_size_growth).round() as u32
    }

    /// Reports whether `point` lies inside the arena minus the margin.
    #[must_use]
    pub fn within_bounds(&self, point: Point) -> bool {
        let margin = self.bounds_margin;
        point.x >= margin
            && point.x <= self.arena_width - margin
            && point.y >= margin
            && point.y <= self.arena_height - margin
    }
}
