//! Static tower, enemy and spawn-table definitions.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Highest level a tower can be upgraded to.
pub const MAX_TOWER_LEVEL: u8 = 3;

/// Fraction of the total investment refunded when a tower is sold.
pub const SELL_REFUND_RATIO: f32 = 0.7;

const UPGRADE_COST_FACTOR: f32 = 0.8;
const UPGRADE_DAMAGE_FACTOR: f32 = 1.5;
const UPGRADE_RANGE_FACTOR: f32 = 1.2;
const UPGRADE_INTERVAL_FACTOR: f64 = 0.8;
const UPGRADE_SLOW_FACTOR: f32 = 0.8;
const MIN_SLOW_FACTOR: f32 = 0.2;
const MAX_CHAIN_COUNT: u32 = 5;
const UPGRADE_CHAIN_RANGE_FACTOR: f32 = 1.15;
const CHAIN_DECAY_STEP: f32 = 0.05;
const MIN_CHAIN_DECAY: f32 = 0.5;

const HEALTH_GROWTH_PER_WAVE: f32 = 0.25;
const REWARD_GROWTH_PER_WAVE: f32 = 0.10;
const SPEED_GROWTH_PER_WAVE: f32 = 0.25;

/// Types of towers that can be purchased.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    /// Cheap single-target tower.
    Archer,
    /// Slow, hard-hitting tower with short reach.
    Cannon,
    /// Long-range, fast-firing tower.
    Magic,
    /// Tower whose hits slow enemies down.
    Ice,
    /// Tower that strikes instantly and chains between enemies.
    Lightning,
}

impl TowerKind {
    /// Every tower kind in catalog order.
    pub const ALL: [TowerKind; 5] = [
        TowerKind::Archer,
        TowerKind::Cannon,
        TowerKind::Magic,
        TowerKind::Ice,
        TowerKind::Lightning,
    ];

    /// Lowercase identifier used in configuration and layouts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Archer => "archer",
            Self::Cannon => "cannon",
            Self::Magic => "magic",
            Self::Ice => "ice",
            Self::Lightning => "lightning",
        }
    }

    /// Purchase price of a fresh level-one tower.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Archer => 20,
            Self::Cannon => 40,
            Self::Magic => 60,
            Self::Ice => 50,
            Self::Lightning => 80,
        }
    }

    /// Glyph a renderer may draw for the tower's projectile.
    #[must_use]
    pub const fn projectile_glyph(self) -> &'static str {
        match self {
            Self::Archer => "🏹",
            Self::Cannon => "💥",
            Self::Magic => "✨",
            Self::Ice => "🧊",
            Self::Lightning => "⚡",
        }
    }

    /// Combat statistics of a level-one tower.
    #[must_use]
    pub const fn base_stats(self) -> TowerStats {
        match self {
            Self::Archer => TowerStats::new(15.0, 100.0, 1_000, TowerSpecial::None),
            Self::Cannon => TowerStats::new(30.0, 80.0, 1_500, TowerSpecial::None),
            Self::Magic => TowerStats::new(25.0, 120.0, 800, TowerSpecial::None),
            Self::Ice => TowerStats::new(10.0, 90.0, 1_200, TowerSpecial::Slow { factor: 0.5 }),
            Self::Lightning => TowerStats::new(
                20.0,
                110.0,
                1_800,
                TowerSpecial::Chain {
                    count: 2,
                    range: 80.0,
                    decay: 0.7,
                },
            ),
        }
    }

    /// Price of upgrading a tower currently at `level`.
    ///
    /// Computed as `round(cost * 0.8 * level)`.
    #[must_use]
    pub fn upgrade_cost(self, level: u8) -> u32 {
        (self.cost() as f32 * UPGRADE_COST_FACTOR * f32::from(level)).round() as u32
    }
}

impl fmt::Display for TowerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TowerKind {
    type Err = UnknownTowerKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| UnknownTowerKind(value.to_owned()))
    }
}

/// Returned when a tower name does not match the catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown tower kind `{0}`")]
pub struct UnknownTowerKind(String);

/// Per-kind special behaviour carried by a tower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TowerSpecial {
    /// Plain damage, nothing else.
    None,
    /// Hits multiply the enemy's speed by `factor` for a limited time.
    Slow {
        /// Speed multiplier applied to the enemy, in `(0, 1]`.
        factor: f32,
    },
    /// Fires instant lightning that hops between nearby enemies.
    Chain {
        /// Number of additional enemies reached after the first target.
        count: u32,
        /// Maximum hop distance between consecutive targets.
        range: f32,
        /// Damage multiplier applied on every hop.
        decay: f32,
    },
}

/// Mutable combat statistics of a placed tower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerStats {
    /// Damage dealt to the primary target.
    pub damage: f32,
    /// Targeting radius in world units.
    pub range: f32,
    /// Minimum simulated time between two shots.
    pub fire_interval: Duration,
    /// Kind-specific behaviour.
    pub special: TowerSpecial,
}

impl TowerStats {
    const fn new(damage: f32, range: f32, fire_interval_ms: u64, special: TowerSpecial) -> Self {
        Self {
            damage,
            range,
            fire_interval: Duration::from_millis(fire_interval_ms),
            special,
        }
    }

    /// Statistics after one upgrade step.
    #[must_use]
    pub fn upgraded(self) -> Self {
        let interval_ms = self.fire_interval.as_millis() as f64 * UPGRADE_INTERVAL_FACTOR;
        let special = match self.special {
            TowerSpecial::None => TowerSpecial::None,
            TowerSpecial::Slow { factor } => TowerSpecial::Slow {
                factor: (factor * UPGRADE_SLOW_FACTOR).max(MIN_SLOW_FACTOR),
            },
            TowerSpecial::Chain {
                count,
                range,
                decay,
            } => TowerSpecial::Chain {
                count: (count + 1).min(MAX_CHAIN_COUNT),
                range: (range * UPGRADE_CHAIN_RANGE_FACTOR).round(),
                decay: (decay - CHAIN_DECAY_STEP).max(MIN_CHAIN_DECAY),
            },
        };

        Self {
            damage: (self.damage * UPGRADE_DAMAGE_FACTOR).round(),
            range: (self.range * UPGRADE_RANGE_FACTOR).round(),
            fire_interval: Duration::from_millis(interval_ms.round() as u64),
            special,
        }
    }
}

/// Refund granted when selling a tower with the given total investment.
#[must_use]
pub fn sell_value(total_invested: u32) -> u32 {
    (total_invested as f32 * SELL_REFUND_RATIO).round() as u32
}

/// Types of enemies that walk the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    /// Baseline enemy.
    Basic,
    /// Fragile but quick.
    Fast,
    /// Sturdy and slow.
    Tank,
    /// Heavier tank variant.
    Heavy,
    /// Armoured mid-game enemy.
    Armored,
    /// Very durable late-game enemy.
    Giant,
    /// Final-wave boss.
    Boss,
}

impl EnemyKind {
    /// Lowercase identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Fast => "fast",
            Self::Tank => "tank",
            Self::Heavy => "heavy",
            Self::Armored => "armored",
            Self::Giant => "giant",
            Self::Boss => "boss",
        }
    }

    /// Unscaled statistics from the catalog.
    #[must_use]
    pub const fn blueprint(self) -> EnemyBlueprint {
        match self {
            Self::Basic => EnemyBlueprint::new(50.0, 1.0, 10, 30.0),
            Self::Fast => EnemyBlueprint::new(30.0, 2.0, 15, 30.0),
            Self::Tank => EnemyBlueprint::new(100.0, 0.5, 25, 35.0),
            Self::Heavy => EnemyBlueprint::new(200.0, 0.4, 40, 40.0),
            Self::Armored => EnemyBlueprint::new(300.0, 0.6, 60, 45.0),
            Self::Giant => EnemyBlueprint::new(500.0, 0.3, 100, 50.0),
            Self::Boss => EnemyBlueprint::new(800.0, 0.4, 150, 55.0),
        }
    }

    /// Statistics scaled for the given wave number (1-based).
    #[must_use]
    pub fn stats_for_wave(self, wave: u32) -> EnemyStats {
        let blueprint = self.blueprint();
        let elapsed = wave.saturating_sub(1) as f32;
        EnemyStats {
            health: (blueprint.health * (1.0 + HEALTH_GROWTH_PER_WAVE * elapsed)).round(),
            speed: blueprint.speed * (1.0 + SPEED_GROWTH_PER_WAVE * elapsed),
            reward: (blueprint.reward as f32 * (1.0 + REWARD_GROWTH_PER_WAVE * elapsed)).round()
                as u32,
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog entry describing an enemy before wave scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyBlueprint {
    /// Hit points at wave one.
    pub health: f32,
    /// Path distance covered per tick at wave one.
    pub speed: f32,
    /// Gold granted on kill at wave one.
    pub reward: u32,
    /// Visual footprint for renderers.
    pub size: f32,
}

impl EnemyBlueprint {
    const fn new(health: f32, speed: f32, reward: u32, size: f32) -> Self {
        Self {
            health,
            speed,
            reward,
            size,
        }
    }
}

/// Wave-scaled enemy statistics assigned at spawn time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Starting (and maximum) hit points.
    pub health: f32,
    /// Path distance covered per tick before slow effects.
    pub speed: f32,
    /// Gold granted on kill.
    pub reward: u32,
}

/// Integer-weighted distribution of enemy kinds for a wave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnTable {
    entries: Vec<(EnemyKind, u32)>,
}

impl SpawnTable {
    /// Creates a table from explicit weights.
    #[must_use]
    pub fn new(entries: Vec<(EnemyKind, u32)>) -> Self {
        Self { entries }
    }

    /// Catalog table for the given wave; waves past ten reuse the tenth.
    #[must_use]
    pub fn for_wave(wave: u32) -> Self {
        use EnemyKind::{Armored, Basic, Boss, Fast, Giant, Heavy, Tank};

        let entries: &[(EnemyKind, u32)] = match wave.clamp(1, 10) {
            1 => &[(Basic, 70), (Fast, 20), (Tank, 10)],
            2 => &[(Basic, 60), (Fast, 25), (Tank, 15)],
            3 => &[(Basic, 50), (Fast, 30), (Tank, 15), (Heavy, 5)],
            4 => &[(Basic, 40), (Fast, 25), (Tank, 20), (Heavy, 15)],
            5 => &[(Basic, 30), (Fast, 20), (Tank, 25), (Heavy, 20), (Armored, 5)],
            6 => &[(Basic, 25), (Fast, 15), (Tank, 20), (Heavy, 25), (Armored, 15)],
            7 => &[
                (Basic, 20),
                (Fast, 10),
                (Tank, 15),
                (Heavy, 25),
                (Armored, 25),
                (Giant, 5),
            ],
            8 => &[
                (Basic, 15),
                (Fast, 10),
                (Tank, 10),
                (Heavy, 20),
                (Armored, 30),
                (Giant, 15),
            ],
            9 => &[
                (Basic, 10),
                (Fast, 5),
                (Tank, 10),
                (Heavy, 15),
                (Armored, 25),
                (Giant, 30),
                (Boss, 5),
            ],
            _ => &[
                (Basic, 5),
                (Fast, 5),
                (Tank, 5),
                (Heavy, 10),
                (Armored, 20),
                (Giant, 35),
                (Boss, 20),
            ],
        };
        Self::new(entries.to_vec())
    }

    /// Kinds and weights in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[(EnemyKind, u32)] {
        &self.entries
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }
}
