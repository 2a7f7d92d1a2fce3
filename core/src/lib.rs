#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Path Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

mod catalog;
mod config;
mod geometry;
mod levels;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use catalog::{
    sell_value, EnemyBlueprint, EnemyKind, EnemyStats, SpawnTable, TowerKind, TowerSpecial,
    TowerStats, UnknownTowerKind, MAX_TOWER_LEVEL, SELL_REFUND_RATIO,
};
pub use config::GameConfig;
pub use geometry::{
    advance_along_path, distance_to_polyline, distance_to_segment, step_towards, PathProgress,
    PathStep, Point,
};
pub use levels::{LevelId, LevelLayout, Obstacle, UnknownLevel};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Path Defence.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the active level, clearing every entity and pending wave.
    LoadLevel {
        /// Layout that becomes active.
        layout: LevelLayout,
    },
    /// Restores the configured economy and wave counters and reloads the level.
    ResetGame,
    /// Advances the clock, moves enemies and settles escapes and deaths.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the current wave begins.
    StartWave,
    /// Requests that an enemy of the given kind enters the path.
    SpawnEnemy {
        /// Wave the spawn was scheduled for; stale waves are rejected.
        wave: u32,
        /// Kind of enemy to create.
        kind: EnemyKind,
    },
    /// Requests purchase of a tower at the given position.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Centre of the new tower.
        position: Point,
    },
    /// Requests that a tower is upgraded by one level.
    UpgradeTower {
        /// Tower to upgrade.
        tower: TowerId,
    },
    /// Requests that a tower is sold for part of its investment.
    SellTower {
        /// Tower to sell.
        tower: TowerId,
    },
    /// Requests that a tower launches a homing projectile.
    FireProjectile {
        /// Firing tower.
        tower: TowerId,
        /// Enemy the projectile homes on.
        target: EnemyId,
    },
    /// Requests that a lightning tower strikes the listed hops.
    StrikeChain {
        /// Firing tower.
        tower: TowerId,
        /// Enemies hit in order, with the damage each receives.
        hops: Vec<ChainHop>,
    },
    /// Moves projectiles and resolves the ones that reached their targets.
    ResolveProjectiles,
    /// Ages transient visual effects.
    DecayEffects {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Checks wave completion and runs the inter-wave countdown.
    AdvanceWave {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a level became active.
    LevelLoaded {
        /// Name of the level layout.
        name: String,
    },
    /// Announces that the run was reset to its starting state.
    GameReset,
    /// Confirms that a wave started.
    WaveStarted {
        /// Number of the wave, starting at one.
        wave: u32,
        /// Number of enemies the wave will spawn.
        size: u32,
        /// Indicates whether the countdown started the wave.
        auto: bool,
    },
    /// Reports that a wave start request was rejected.
    WaveStartRejected {
        /// Specific reason the start failed.
        reason: WaveStartError,
    },
    /// Confirms that an enemy entered the path.
    EnemySpawned {
        /// Handle assigned to the enemy.
        enemy: EnemyId,
        /// Kind of enemy spawned.
        kind: EnemyKind,
        /// Wave the enemy belongs to.
        wave: u32,
    },
    /// Reports that a spawn request did not match the running wave.
    EnemySpawnRejected {
        /// Wave the request was scheduled for.
        wave: u32,
        /// Kind of enemy requested.
        kind: EnemyKind,
    },
    /// Confirms that an enemy reached the end of the path.
    EnemyEscaped {
        /// Handle of the escaped enemy.
        enemy: EnemyId,
        /// Lives left after the escape.
        lives_remaining: u32,
    },
    /// Confirms that an enemy was destroyed.
    EnemyKilled {
        /// Handle of the destroyed enemy.
        enemy: EnemyId,
        /// Kind of the destroyed enemy.
        kind: EnemyKind,
        /// Gold granted for the kill.
        reward: u32,
    },
    /// Confirms that a tower was purchased.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Centre of the tower.
        position: Point,
        /// Gold spent.
        cost: u32,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Position provided in the placement request.
        position: Point,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was upgraded.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached by the upgrade.
        level: u8,
        /// Gold spent.
        cost: u32,
    },
    /// Reports that a tower upgrade request was rejected.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted for upgrade.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Gold refunded.
        refund: u32,
    },
    /// Reports that a tower sale request was rejected.
    TowerSaleRejected {
        /// Identifier of the tower targeted for sale.
        tower: TowerId,
        /// Specific reason the sale failed.
        reason: SellError,
    },
    /// Confirms that a tower launched a projectile.
    ProjectileLaunched {
        /// Firing tower.
        tower: TowerId,
        /// Enemy the projectile homes on.
        target: EnemyId,
    },
    /// Confirms that a projectile struck its target.
    ProjectileHit {
        /// Enemy that was struck.
        target: EnemyId,
        /// Damage dealt.
        damage: f32,
        /// Slow factor applied, if the projectile carried one.
        slow: Option<f32>,
    },
    /// Confirms that a lightning tower struck one or more enemies.
    ChainLightningStruck {
        /// Firing tower.
        tower: TowerId,
        /// Enemies hit in order, with the unrounded damage of every hop.
        hops: Vec<ChainHop>,
    },
    /// Announces that the running wave was cleared.
    WaveCompleted {
        /// Number of the cleared wave.
        wave: u32,
        /// Gold granted for clearing it.
        bonus: u32,
    },
    /// Announces that the countdown to the next wave started.
    CountdownStarted {
        /// Wave that starts when the countdown ends.
        wave: u32,
        /// Length of the countdown.
        duration: Duration,
    },
    /// Announces that the final wave was cleared.
    AllWavesCleared {
        /// Result of the run.
        summary: RunSummary,
    },
    /// Announces that the last life was lost.
    GameOver {
        /// Result of the run.
        summary: RunSummary,
    },
}

/// Generation-checked handle into the world's enemy arena.
///
/// A handle whose enemy was removed never resolves again, even after its slot
/// is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId {
    slot: u32,
    generation: u32,
}

impl EnemyId {
    /// Creates a handle from its raw parts.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Arena slot addressed by the handle.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Single hop of a chain-lightning strike.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainHop {
    /// Enemy struck by the hop.
    pub enemy: EnemyId,
    /// Damage carried by the hop before rounding.
    pub damage: f32,
}

/// Lifecycle of the wave state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// No wave running and no countdown pending.
    Idle,
    /// Enemies of the current wave are spawning or alive.
    Running,
    /// The next wave starts automatically once `remaining` elapses.
    Countdown {
        /// Time left before the next wave starts.
        remaining: Duration,
    },
    /// Every wave was cleared.
    Victory,
    /// All lives were lost.
    Defeat,
}

impl WavePhase {
    /// Reports whether the run ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }
}

/// How a run ended, if it has.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run is still being played.
    InProgress,
    /// Every wave was cleared.
    Victory,
    /// All lives were lost.
    Defeat,
}

impl RunOutcome {
    /// Reports whether the run has ended.
    #[must_use]
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Final statistics reported when a run ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Waves the player survived.
    pub waves_survived: u32,
    /// Gold left at the end.
    pub gold: u32,
    /// Lives left at the end.
    pub lives: u32,
    /// Enemies destroyed across the whole run.
    pub enemies_killed: u32,
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum PlacementError {
    /// The player cannot afford the tower.
    #[error("not enough gold: {required} required, {available} available")]
    InsufficientGold {
        /// Price of the tower.
        required: u32,
        /// Gold currently held.
        available: u32,
    },
    /// The position lies outside the arena or inside its margin.
    #[error("position is outside the buildable area")]
    OutOfBounds,
    /// The position is too close to the enemy path.
    #[error("position is too close to the path")]
    TooCloseToPath,
    /// The position is too close to another tower.
    #[error("position is too close to another tower")]
    TooCloseToTower,
    /// The position lies inside a level obstacle.
    #[error("position is blocked by a level obstacle")]
    BlockedByObstacle,
}

/// Reasons a wave start request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum WaveStartError {
    /// The active level has no usable path.
    #[error("no path available")]
    NoPathConfigured,
    /// A wave is already in progress.
    #[error("wave is already in progress")]
    WaveAlreadyRunning,
    /// The next wave will start on its own when the countdown ends.
    #[error("next wave starts automatically in {} seconds", remaining.as_secs_f32().ceil())]
    WaveAutoStartPending {
        /// Time left on the countdown.
        remaining: Duration,
    },
    /// The run was lost; reset before starting again.
    #[error("the game is over")]
    GameOver,
    /// The run was won; reset before starting again.
    #[error("all waves have been cleared")]
    AllWavesCleared,
}

/// Reasons a tower upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("tower does not exist")]
    MissingTower,
    /// The tower already reached the highest level.
    #[error("tower is already at maximum level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("not enough gold to upgrade: {required} required, {available} available")]
    InsufficientGold {
        /// Price of the upgrade.
        required: u32,
        /// Gold currently held.
        available: u32,
    },
}

/// Reasons a tower sale request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum SellError {
    /// No tower with the provided identifier exists.
    #[error("tower does not exist")]
    MissingTower,
}

/// Reasons a level change may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum LevelChangeError {
    /// Levels cannot change while enemies are on the field.
    #[error("cannot change levels during a wave")]
    WaveRunning,
}

/// Reasons an operation on the current selection may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum SelectionError {
    /// No tower type or placed tower is selected.
    #[error("nothing is selected")]
    NothingSelected,
    /// The tower to select is not on the field.
    #[error("tower does not exist")]
    MissingTower,
    /// The selected tower type costs more gold than the player holds.
    #[error("not enough gold: {required} required, {available} available")]
    InsufficientGold {
        /// Price of the tower type.
        required: u32,
        /// Gold currently held.
        available: u32,
    },
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Current position.
    pub position: Point,
    /// Remaining hit points.
    pub health: f32,
    /// Hit points at spawn.
    pub max_health: f32,
    /// Base path distance covered per tick.
    pub speed: f32,
    /// Active speed multiplier; `1.0` when not slowed.
    pub slow_factor: f32,
    /// Gold granted on kill.
    pub reward: u32,
}

impl EnemySnapshot {
    /// Reports whether the enemy still has hit points left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Read-only snapshot describing all enemies on the field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single enemy by handle.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of enemies captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no enemies were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Centre of the tower.
    pub position: Point,
    /// Current combat statistics.
    pub stats: TowerStats,
    /// Current level, starting at one.
    pub level: u8,
    /// Gold spent on purchase and upgrades.
    pub total_invested: u32,
}

impl TowerSnapshot {
    /// Price of the next upgrade, or `None` at maximum level.
    #[must_use]
    pub fn upgrade_cost(&self) -> Option<u32> {
        (self.level < MAX_TOWER_LEVEL).then(|| self.kind.upgrade_cost(self.level))
    }

    /// Gold refunded if the tower is sold now.
    #[must_use]
    pub fn sell_value(&self) -> u32 {
        sell_value(self.total_invested)
    }
}

/// Read-only snapshot describing all towers placed on the field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single tower by identifier.
    #[must_use]
    pub fn get(&self, id: TowerId) -> Option<&TowerSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Cooldown state of a single tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerCooldownSnapshot {
    /// Identifier of the tower.
    pub tower: TowerId,
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Current combat statistics.
    pub stats: TowerStats,
    /// Time left before the tower may fire; zero when ready.
    pub ready_in: Duration,
}

/// Read-only snapshot of every tower's cooldown, sorted by tower.
#[derive(Clone, Debug, Default)]
pub struct TowerCooldownView {
    snapshots: Vec<TowerCooldownSnapshot>,
}

impl TowerCooldownView {
    /// Creates a new cooldown view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerCooldownSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.tower);
        Self { snapshots }
    }

    /// Iterator over the captured cooldowns in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerCooldownSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerCooldownSnapshot> {
        self.snapshots
    }
}

/// Target assignment produced by the targeting system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that acquired the target.
    pub tower: TowerId,
    /// Enemy selected as the target.
    pub enemy: EnemyId,
    /// Centre of the tower.
    pub tower_position: Point,
    /// Position of the enemy when targeted.
    pub enemy_position: Point,
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Current position.
    pub position: Point,
    /// Enemy the projectile homes on.
    pub target: EnemyId,
    /// Damage delivered on impact.
    pub damage: f32,
    /// Glyph a renderer may draw.
    pub glyph: &'static str,
}

/// Fading visual record of one chain-lightning hop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightningSegment {
    /// Start of the bolt.
    pub from: Point,
    /// End of the bolt.
    pub to: Point,
    /// Time left before the segment disappears.
    pub remaining: Duration,
}

/// Progress of the current wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveSnapshot {
    /// Current wave number, starting at one.
    pub number: u32,
    /// Enemies the wave spawns in total.
    pub size: u32,
    /// Enemies spawned so far.
    pub spawned: u32,
    /// Enemies of this wave destroyed so far.
    pub killed: u32,
    /// Current state of the wave machine.
    pub phase: WavePhase,
}

/// Process-wide resources of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EconomySnapshot {
    /// Gold available for purchases.
    pub gold: u32,
    /// Lives left before the run is lost.
    pub lives: u32,
}
