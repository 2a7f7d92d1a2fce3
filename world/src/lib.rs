#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Path Defence.

mod enemies;
mod towers;

use std::time::Duration;

use log::{debug, info, warn};
use path_defence_core::{
    advance_along_path, distance_to_polyline, sell_value, step_towards, ChainHop, Command,
    EnemyId, EnemyKind, Event, GameConfig, LevelLayout, LightningSegment, PlacementError, Point,
    RunOutcome, RunSummary, SellError, TowerId, TowerKind, TowerSpecial, UpgradeError,
    WaveStartError, WavePhase, MAX_TOWER_LEVEL, WELCOME_BANNER,
};

use crate::{
    enemies::{EnemyArena, EnemyState},
    towers::TowerRegistry,
};

/// Represents the authoritative Path Defence world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: GameConfig,
    level: LevelLayout,
    clock: Duration,
    enemies: EnemyArena,
    towers: TowerRegistry,
    projectiles: Vec<Projectile>,
    lightning: Vec<LightningSegment>,
    wave: WaveState,
    gold: u32,
    lives: u32,
    enemies_killed: u32,
}

impl World {
    /// Creates a world with the default rules on the default level.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GameConfig::default(), LevelLayout::default())
    }

    /// Creates a world governed by `config` on the provided level.
    #[must_use]
    pub fn with_config(config: GameConfig, level: LevelLayout) -> Self {
        Self {
            banner: WELCOME_BANNER,
            level,
            clock: Duration::ZERO,
            enemies: EnemyArena::new(),
            towers: TowerRegistry::new(),
            projectiles: Vec::new(),
            lightning: Vec::new(),
            wave: WaveState::first(&config),
            gold: config.starting_gold,
            lives: config.starting_lives,
            enemies_killed: 0,
            config,
        }
    }

    fn clear_field(&mut self) {
        self.enemies.clear();
        self.towers.clear();
        self.projectiles.clear();
        self.lightning.clear();
        self.wave.spawned = 0;
        self.wave.killed = 0;
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        let waves_survived = match outcome {
            RunOutcome::Victory => self.wave.number,
            RunOutcome::Defeat | RunOutcome::InProgress => self.wave.number.saturating_sub(1),
        };
        RunSummary {
            outcome,
            waves_survived,
            gold: self.gold,
            lives: self.lives,
            enemies_killed: self.enemies_killed,
        }
    }

    fn wave_start_error(&self) -> Option<WaveStartError> {
        if !self.level.has_path() {
            return Some(WaveStartError::NoPathConfigured);
        }
        match self.wave.phase {
            WavePhase::Defeat => Some(WaveStartError::GameOver),
            WavePhase::Victory => Some(WaveStartError::AllWavesCleared),
            WavePhase::Countdown { remaining } if self.wave.number > 1 => {
                Some(WaveStartError::WaveAutoStartPending { remaining })
            }
            WavePhase::Running => Some(WaveStartError::WaveAlreadyRunning),
            WavePhase::Idle | WavePhase::Countdown { .. } => None,
        }
    }

    fn begin_wave(&mut self, auto: bool, out_events: &mut Vec<Event>) {
        self.wave.spawned = 0;
        self.wave.killed = 0;
        self.wave.phase = WavePhase::Running;
        info!(
            "wave {} started with {} enemies",
            self.wave.number, self.wave.size
        );
        out_events.push(Event::WaveStarted {
            wave: self.wave.number,
            size: self.wave.size,
            auto,
        });
    }

    fn placement_error(&self, kind: TowerKind, position: Point) -> Option<PlacementError> {
        let cost = kind.cost();
        if self.gold < cost {
            return Some(PlacementError::InsufficientGold {
                required: cost,
                available: self.gold,
            });
        }
        if !self.config.within_bounds(position) {
            return Some(PlacementError::OutOfBounds);
        }
        if distance_to_polyline(position, self.level.path())
            .is_some_and(|distance| distance < self.config.path_clearance)
        {
            return Some(PlacementError::TooCloseToPath);
        }
        if self.towers.crowds(position, self.config.tower_clearance) {
            return Some(PlacementError::TooCloseToTower);
        }
        if self
            .level
            .obstacles()
            .iter()
            .any(|obstacle| obstacle.blocks(position))
        {
            return Some(PlacementError::BlockedByObstacle);
        }
        None
    }

    fn spawn_enemy(&mut self, wave: u32, kind: EnemyKind, out_events: &mut Vec<Event>) {
        let stale = self.wave.phase != WavePhase::Running
            || wave != self.wave.number
            || self.wave.spawned >= self.wave.size;
        let origin = self.level.path().first().copied();
        let Some(origin) = origin.filter(|_| !stale) else {
            warn!("discarding stale spawn of {kind} for wave {wave}");
            out_events.push(Event::EnemySpawnRejected { wave, kind });
            return;
        };

        let enemy = self.enemies.insert(EnemyState::spawn(
            kind,
            kind.stats_for_wave(wave),
            origin,
        ));
        self.wave.spawned += 1;
        debug!("spawned {kind} as {enemy:?}");
        out_events.push(Event::EnemySpawned { enemy, kind, wave });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.wave.phase.is_terminal() {
            return;
        }

        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let path = self.level.path();
        let mut escaped = Vec::new();
        for (id, enemy) in self.enemies.iter_mut() {
            enemy.decay_slow(dt);
            let step = advance_along_path(
                &mut enemy.progress,
                path,
                enemy.speed * enemy.slow_factor,
            );
            enemy.position = step.position;
            if step.reached_end {
                escaped.push(id);
            }
        }

        for enemy in escaped {
            let _ = self.enemies.remove(enemy);
            self.lives = self.lives.saturating_sub(1);
            debug!("{enemy:?} escaped, {} lives left", self.lives);
            out_events.push(Event::EnemyEscaped {
                enemy,
                lives_remaining: self.lives,
            });

            if self.lives == 0 {
                self.wave.phase = WavePhase::Defeat;
                self.projectiles.clear();
                let summary = self.summary(RunOutcome::Defeat);
                info!(
                    "game over after surviving {} waves",
                    summary.waves_survived
                );
                out_events.push(Event::GameOver { summary });
                return;
            }
        }

        let dead: Vec<EnemyId> = self
            .enemies
            .iter()
            .filter(|(_, enemy)| !enemy.is_alive())
            .map(|(id, _)| id)
            .collect();
        for enemy in dead {
            let Some(state) = self.enemies.remove(enemy) else {
                continue;
            };
            self.gold = self.gold.saturating_add(state.reward);
            self.wave.killed += 1;
            self.enemies_killed += 1;
            debug!("{enemy:?} killed for {} gold", state.reward);
            out_events.push(Event::EnemyKilled {
                enemy,
                kind: state.kind,
                reward: state.reward,
            });
        }
    }

    fn fire_projectile(&mut self, tower: TowerId, target: EnemyId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let target_alive = self.enemies.get(target).is_some_and(EnemyState::is_alive);
        let Some(state) = self.towers.get_mut(tower) else {
            warn!("fire requested by missing tower {tower:?}");
            return;
        };
        if !state.is_ready(now) || !target_alive {
            warn!("{tower:?} cannot fire at {target:?} yet");
            return;
        }

        let slow = match state.stats.special {
            TowerSpecial::Slow { factor } => Some(factor),
            TowerSpecial::Chain { .. } => {
                warn!("{tower:?} fires chain lightning, not projectiles");
                return;
            }
            TowerSpecial::None => None,
        };

        state.last_fired_at = Some(now);
        self.projectiles.push(Projectile {
            position: state.position,
            target,
            damage: state.stats.damage,
            speed: self.config.projectile_speed,
            slow,
            glyph: state.kind.projectile_glyph(),
        });
        out_events.push(Event::ProjectileLaunched { tower, target });
    }

    fn strike_chain(&mut self, tower: TowerId, hops: Vec<ChainHop>, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let display = self.config.lightning_display();
        let Some(state) = self.towers.get_mut(tower) else {
            warn!("chain requested by missing tower {tower:?}");
            return;
        };
        let first_alive = hops
            .first()
            .and_then(|hop| self.enemies.get(hop.enemy))
            .is_some_and(EnemyState::is_alive);
        if !state.is_ready(now) || !first_alive {
            warn!("{tower:?} cannot strike yet");
            return;
        }
        if !matches!(state.stats.special, TowerSpecial::Chain { .. }) {
            warn!("{tower:?} cannot strike chain lightning");
            return;
        }

        state.last_fired_at = Some(now);
        let mut from = state.position;
        let enemies = &self.enemies;
        let hops: Vec<ChainHop> = hops
            .into_iter()
            .filter(|hop| enemies.get(hop.enemy).is_some_and(EnemyState::is_alive))
            .collect();
        for hop in &hops {
            let Some(enemy) = self.enemies.get_mut(hop.enemy) else {
                continue;
            };
            enemy.take_damage(hop.damage.round());
            self.lightning.push(LightningSegment {
                from,
                to: enemy.position,
                remaining: display,
            });
            from = enemy.position;
        }
        out_events.push(Event::ChainLightningStruck { tower, hops });
    }

    fn resolve_projectiles(&mut self, out_events: &mut Vec<Event>) {
        let slow_duration = self.config.slow_duration();
        let projectiles = std::mem::take(&mut self.projectiles);
        for mut projectile in projectiles {
            let Some(enemy) = self.enemies.get_mut(projectile.target) else {
                continue;
            };

            let distance = projectile.position.distance(enemy.position);
            if distance < projectile.speed {
                enemy.take_damage(projectile.damage);
                if let Some(factor) = projectile.slow {
                    enemy.apply_slow(factor, slow_duration);
                }
                out_events.push(Event::ProjectileHit {
                    target: projectile.target,
                    damage: projectile.damage,
                    slow: projectile.slow,
                });
                continue;
            }

            projectile.position =
                step_towards(projectile.position, enemy.position, projectile.speed);
            self.projectiles.push(projectile);
        }
    }

    fn advance_wave(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        match self.wave.phase {
            WavePhase::Running => {
                if !self.enemies.is_empty() || self.wave.spawned < self.wave.size {
                    return;
                }

                let bonus = self.config.wave_completion_bonus;
                self.gold = self.gold.saturating_add(bonus);
                info!("wave {} cleared", self.wave.number);
                out_events.push(Event::WaveCompleted {
                    wave: self.wave.number,
                    bonus,
                });

                if self.wave.number >= self.config.max_waves {
                    self.wave.phase = WavePhase::Victory;
                    let summary = self.summary(RunOutcome::Victory);
                    info!("all {} waves cleared", self.wave.number);
                    out_events.push(Event::AllWavesCleared { summary });
                    return;
                }

                self.wave.number += 1;
                self.wave.size = self.config.next_wave_size(self.wave.size);
                let duration = self.config.countdown();
                self.wave.phase = WavePhase::Countdown {
                    remaining: duration,
                };
                out_events.push(Event::CountdownStarted {
                    wave: self.wave.number,
                    duration,
                });
            }
            WavePhase::Countdown { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.begin_wave(true, out_events);
                } else {
                    self.wave.phase = WavePhase::Countdown { remaining };
                }
            }
            WavePhase::Idle | WavePhase::Victory | WavePhase::Defeat => {}
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
struct Projectile {
    position: Point,
    target: EnemyId,
    damage: f32,
    speed: f32,
    slow: Option<f32>,
    glyph: &'static str,
}

#[derive(Clone, Copy, Debug)]
struct WaveState {
    number: u32,
    size: u32,
    spawned: u32,
    killed: u32,
    phase: WavePhase,
}

impl WaveState {
    fn first(config: &GameConfig) -> Self {
        Self {
            number: 1,
            size: config.initial_wave_size,
            spawned: 0,
            killed: 0,
            phase: WavePhase::Idle,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { layout } => {
            world.clear_field();
            if !world.wave.phase.is_terminal() {
                world.wave.phase = WavePhase::Idle;
            }
            info!("loaded level {}", layout.name());
            out_events.push(Event::LevelLoaded {
                name: layout.name().to_owned(),
            });
            world.level = layout;
        }
        Command::ResetGame => {
            world.clear_field();
            world.wave = WaveState::first(&world.config);
            world.gold = world.config.starting_gold;
            world.lives = world.config.starting_lives;
            world.enemies_killed = 0;
            info!("game reset on level {}", world.level.name());
            out_events.push(Event::GameReset);
            out_events.push(Event::LevelLoaded {
                name: world.level.name().to_owned(),
            });
        }
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::StartWave => match world.wave_start_error() {
            Some(reason) => {
                debug!("wave start rejected: {reason}");
                out_events.push(Event::WaveStartRejected { reason });
            }
            None => world.begin_wave(false, out_events),
        },
        Command::SpawnEnemy { wave, kind } => world.spawn_enemy(wave, kind, out_events),
        Command::PlaceTower { kind, position } => {
            if let Some(reason) = world.placement_error(kind, position) {
                out_events.push(Event::TowerPlacementRejected {
                    kind,
                    position,
                    reason,
                });
                return;
            }

            let cost = kind.cost();
            world.gold -= cost;
            let tower = world.towers.insert(kind, position);
            debug!("placed {kind} tower {tower:?} at {position:?}");
            out_events.push(Event::TowerPlaced {
                tower,
                kind,
                position,
                cost,
            });
        }
        Command::UpgradeTower { tower } => {
            let gold = world.gold;
            let Some(state) = world.towers.get_mut(tower) else {
                out_events.push(Event::TowerUpgradeRejected {
                    tower,
                    reason: UpgradeError::MissingTower,
                });
                return;
            };
            if state.level >= MAX_TOWER_LEVEL {
                out_events.push(Event::TowerUpgradeRejected {
                    tower,
                    reason: UpgradeError::MaxLevel,
                });
                return;
            }
            let cost = state.kind.upgrade_cost(state.level);
            if gold < cost {
                out_events.push(Event::TowerUpgradeRejected {
                    tower,
                    reason: UpgradeError::InsufficientGold {
                        required: cost,
                        available: gold,
                    },
                });
                return;
            }

            state.level += 1;
            state.stats = state.stats.upgraded();
            state.total_invested += cost;
            let level = state.level;
            world.gold -= cost;
            debug!("upgraded {tower:?} to level {level}");
            out_events.push(Event::TowerUpgraded { tower, level, cost });
        }
        Command::SellTower { tower } => {
            let Some(state) = world.towers.remove(tower) else {
                out_events.push(Event::TowerSaleRejected {
                    tower,
                    reason: SellError::MissingTower,
                });
                return;
            };
            let refund = sell_value(state.total_invested);
            world.gold = world.gold.saturating_add(refund);
            debug!("sold {tower:?} for {refund} gold");
            out_events.push(Event::TowerSold { tower, refund });
        }
        Command::FireProjectile { tower, target } => {
            world.fire_projectile(tower, target, out_events);
        }
        Command::StrikeChain { tower, hops } => world.strike_chain(tower, hops, out_events),
        Command::ResolveProjectiles => world.resolve_projectiles(out_events),
        Command::DecayEffects { dt } => {
            for segment in &mut world.lightning {
                segment.remaining = segment.remaining.saturating_sub(dt);
            }
            world.lightning.retain(|segment| !segment.remaining.is_zero());
        }
        Command::AdvanceWave { dt } => world.advance_wave(dt, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{RunOutcome, World};
    use path_defence_core::{
        EconomySnapshot, EnemyView, GameConfig, LevelLayout, LightningSegment, PlacementError,
        Point, ProjectileSnapshot, RunSummary, TowerCooldownView, TowerId, TowerKind, TowerView,
        WavePhase, WaveSnapshot,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Rules governing the world.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Provides read-only access to the active level.
    #[must_use]
    pub fn level(world: &World) -> &LevelLayout {
        &world.level
    }

    /// Total simulated time elapsed.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Captures a read-only view of the enemies on the field.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .map(|(id, enemy)| enemy.snapshot(id))
                .collect(),
        )
    }

    /// Number of enemies currently stored, alive or awaiting removal.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Captures a read-only view of the towers on the field.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Captures the cooldown of every tower at the current time.
    #[must_use]
    pub fn tower_cooldowns(world: &World) -> TowerCooldownView {
        TowerCooldownView::from_snapshots(
            world
                .towers
                .iter()
                .map(|tower| tower.cooldown(world.clock))
                .collect(),
        )
    }

    /// Finds the tower whose centre lies within the hit radius of `point`.
    ///
    /// The nearest tower wins when several overlap.
    #[must_use]
    pub fn tower_at(world: &World, point: Point) -> Option<TowerId> {
        world
            .towers
            .iter()
            .map(|tower| (tower.position.distance(point), tower.id))
            .filter(|(distance, _)| *distance < world.config.tower_hit_radius)
            .min_by(|left, right| left.0.total_cmp(&right.0).then(left.1.cmp(&right.1)))
            .map(|(_, id)| id)
    }

    /// Captures every in-flight projectile.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                position: projectile.position,
                target: projectile.target,
                damage: projectile.damage,
                glyph: projectile.glyph,
            })
            .collect()
    }

    /// Chain-lightning segments that are still visible.
    #[must_use]
    pub fn lightning(world: &World) -> &[LightningSegment] {
        &world.lightning
    }

    /// Progress of the current wave.
    #[must_use]
    pub fn wave(world: &World) -> WaveSnapshot {
        WaveSnapshot {
            number: world.wave.number,
            size: world.wave.size,
            spawned: world.wave.spawned,
            killed: world.wave.killed,
            phase: world.wave.phase,
        }
    }

    /// Gold and lives held by the player.
    #[must_use]
    pub fn economy(world: &World) -> EconomySnapshot {
        EconomySnapshot {
            gold: world.gold,
            lives: world.lives,
        }
    }

    /// Validates a tower placement without mutating the world.
    pub fn placement(
        world: &World,
        kind: TowerKind,
        position: Point,
    ) -> Result<(), PlacementError> {
        match world.placement_error(kind, position) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Statistics of the run so far.
    ///
    /// Runs that have not ended count the waves completed so far.
    #[must_use]
    pub fn summary(world: &World) -> RunSummary {
        let outcome = match world.wave.phase {
            WavePhase::Victory => RunOutcome::Victory,
            WavePhase::Defeat => RunOutcome::Defeat,
            WavePhase::Idle | WavePhase::Running | WavePhase::Countdown { .. } => {
                RunOutcome::InProgress
            }
        };
        world.summary(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use path_defence_core::{LevelId, Obstacle};

    fn straight_level() -> LevelLayout {
        LevelLayout::custom(
            "straight",
            vec![Point::new(0.0, 300.0), Point::new(800.0, 300.0)],
            vec![Obstacle::new(Point::new(600.0, 100.0), 40.0)],
        )
    }

    fn world_on(level: LevelLayout) -> World {
        World::with_config(GameConfig::default(), level)
    }

    fn run(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events);
        events
    }

    fn tick(world: &mut World) -> Vec<Event> {
        let dt = world.config.tick_duration();
        run(world, Command::Tick { dt })
    }

    #[test]
    fn new_world_starts_idle_with_configured_economy() {
        let world = World::new();
        assert_eq!(query::welcome_banner(&world), WELCOME_BANNER);
        assert_eq!(query::level(&world).name(), LevelId::Grass.name());
        assert_eq!(query::economy(&world).gold, 100);
        assert_eq!(query::economy(&world).lives, 20);
        assert_eq!(query::wave(&world).phase, WavePhase::Idle);
    }

    #[test]
    fn unfinished_runs_report_in_progress() {
        let mut world = world_on(straight_level());
        assert_eq!(query::summary(&world).outcome, RunOutcome::InProgress);

        let _ = run(&mut world, Command::StartWave);
        let summary = query::summary(&world);
        assert_eq!(summary.outcome, RunOutcome::InProgress);
        assert_eq!(summary.waves_survived, 0);
        assert!(!summary.outcome.is_final());
    }

    #[test]
    fn placement_rejections_leave_gold_untouched() {
        let mut world = world_on(straight_level());
        let cases = [
            (Point::new(10.0, 100.0), PlacementError::OutOfBounds),
            (Point::new(400.0, 330.0), PlacementError::TooCloseToPath),
            (Point::new(600.0, 110.0), PlacementError::BlockedByObstacle),
        ];
        for (position, expected) in cases {
            let events = run(
                &mut world,
                Command::PlaceTower {
                    kind: TowerKind::Archer,
                    position,
                },
            );
            assert_eq!(
                events,
                vec![Event::TowerPlacementRejected {
                    kind: TowerKind::Archer,
                    position,
                    reason: expected,
                }]
            );
        }
        assert_eq!(query::economy(&world).gold, 100);
        assert!(query::tower_view(&world).into_vec().is_empty());
    }

    #[test]
    fn placing_towers_spends_gold_and_blocks_neighbours() {
        let mut world = world_on(straight_level());
        let events = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Cannon,
                position: Point::new(200.0, 200.0),
            },
        );
        assert!(matches!(events[..], [Event::TowerPlaced { cost: 40, .. }]));
        assert_eq!(query::economy(&world).gold, 60);

        let crowded = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(230.0, 200.0),
            },
        );
        assert!(matches!(
            crowded[..],
            [Event::TowerPlacementRejected {
                reason: PlacementError::TooCloseToTower,
                ..
            }]
        ));

        let broke = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Lightning,
                position: Point::new(400.0, 150.0),
            },
        );
        assert!(matches!(
            broke[..],
            [Event::TowerPlacementRejected {
                reason: PlacementError::InsufficientGold {
                    required: 80,
                    available: 60
                },
                ..
            }]
        ));
    }

    #[test]
    fn upgrade_and_sell_follow_cost_curves() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(200.0, 200.0),
            },
        );
        let tower = TowerId::new(0);

        let events = run(&mut world, Command::UpgradeTower { tower });
        assert_eq!(
            events,
            vec![Event::TowerUpgraded {
                tower,
                level: 2,
                cost: 16
            }]
        );
        assert_eq!(query::economy(&world).gold, 64);
        let snapshot = *query::tower_view(&world).get(tower).expect("tower");
        assert_eq!(snapshot.upgrade_cost(), Some(32));
        assert_eq!(snapshot.sell_value(), 25);

        let events = run(&mut world, Command::SellTower { tower });
        assert_eq!(events, vec![Event::TowerSold { tower, refund: 25 }]);
        assert_eq!(query::economy(&world).gold, 89);

        let events = run(&mut world, Command::UpgradeTower { tower });
        assert_eq!(
            events,
            vec![Event::TowerUpgradeRejected {
                tower,
                reason: UpgradeError::MissingTower
            }]
        );
    }

    #[test]
    fn upgrades_stop_at_maximum_level() {
        let mut config = GameConfig::default();
        config.starting_gold = 1_000;
        let mut world = World::with_config(config, straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(200.0, 200.0),
            },
        );
        let tower = TowerId::new(0);
        let _ = run(&mut world, Command::UpgradeTower { tower });
        let _ = run(&mut world, Command::UpgradeTower { tower });
        let events = run(&mut world, Command::UpgradeTower { tower });

        assert_eq!(
            events,
            vec![Event::TowerUpgradeRejected {
                tower,
                reason: UpgradeError::MaxLevel
            }]
        );
        assert_eq!(query::economy(&world).gold, 1_000 - 20 - 16 - 32);
    }

    #[test]
    fn wave_start_requires_a_path() {
        let mut world = world_on(LevelLayout::custom("empty", Vec::new(), Vec::new()));
        let events = run(&mut world, Command::StartWave);
        assert_eq!(
            events,
            vec![Event::WaveStartRejected {
                reason: WaveStartError::NoPathConfigured
            }]
        );
    }

    #[test]
    fn running_wave_rejects_second_start_and_stale_spawns() {
        let mut world = world_on(straight_level());
        let events = run(&mut world, Command::StartWave);
        assert_eq!(
            events,
            vec![Event::WaveStarted {
                wave: 1,
                size: 10,
                auto: false
            }]
        );

        let events = run(&mut world, Command::StartWave);
        assert_eq!(
            events,
            vec![Event::WaveStartRejected {
                reason: WaveStartError::WaveAlreadyRunning
            }]
        );

        let events = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 2,
                kind: EnemyKind::Basic,
            },
        );
        assert_eq!(
            events,
            vec![Event::EnemySpawnRejected {
                wave: 2,
                kind: EnemyKind::Basic
            }]
        );
        assert_eq!(query::enemy_count(&world), 0);
    }

    #[test]
    fn spawns_beyond_wave_size_are_rejected() {
        let mut config = GameConfig::default();
        config.initial_wave_size = 1;
        let mut world = World::with_config(config, straight_level());
        let _ = run(&mut world, Command::StartWave);
        let spawn = Command::SpawnEnemy {
            wave: 1,
            kind: EnemyKind::Fast,
        };

        assert!(matches!(
            run(&mut world, spawn.clone())[..],
            [Event::EnemySpawned { .. }]
        ));
        assert!(matches!(
            run(&mut world, spawn)[..],
            [Event::EnemySpawnRejected { .. }]
        ));
        assert_eq!(query::wave(&world).spawned, 1);
    }

    #[test]
    fn escaping_enemy_costs_a_life() {
        let level = LevelLayout::custom(
            "short",
            vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)],
            Vec::new(),
        );
        let mut world = world_on(level);
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );

        let mut escaped = Vec::new();
        for _ in 0..3 {
            escaped.extend(
                tick(&mut world)
                    .into_iter()
                    .filter(|event| matches!(event, Event::EnemyEscaped { .. })),
            );
        }
        assert_eq!(escaped.len(), 1);
        assert_eq!(query::economy(&world).lives, 19);
        assert_eq!(query::enemy_count(&world), 0);
    }

    #[test]
    fn losing_last_life_ends_the_run() {
        let mut config = GameConfig::default();
        config.starting_lives = 1;
        let level = LevelLayout::custom(
            "short",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            Vec::new(),
        );
        let mut world = World::with_config(config, level);
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );

        let events = tick(&mut world);
        let summary = events
            .iter()
            .find_map(|event| match event {
                Event::GameOver { summary } => Some(*summary),
                _ => None,
            })
            .expect("game over");
        assert_eq!(summary.outcome, RunOutcome::Defeat);
        assert_eq!(summary.waves_survived, 0);
        assert_eq!(query::wave(&world).phase, WavePhase::Defeat);

        assert!(tick(&mut world).is_empty());
        assert_eq!(
            run(&mut world, Command::StartWave),
            vec![Event::WaveStartRejected {
                reason: WaveStartError::GameOver
            }]
        );
    }

    #[test]
    fn projectile_homes_on_live_target_and_slows_it() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Ice,
                position: Point::new(100.0, 250.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );
        let enemy = query::enemy_view(&world).iter().next().expect("enemy").id;
        let tower = TowerId::new(0);

        let _ = tick(&mut world);
        let events = run(&mut world, Command::FireProjectile { tower, target: enemy });
        assert_eq!(events, vec![Event::ProjectileLaunched { tower, target: enemy }]);

        let mut hit = None;
        for _ in 0..100 {
            let _ = tick(&mut world);
            hit = run(&mut world, Command::ResolveProjectiles)
                .into_iter()
                .find(|event| matches!(event, Event::ProjectileHit { .. }));
            if hit.is_some() {
                break;
            }
        }

        assert_eq!(
            hit,
            Some(Event::ProjectileHit {
                target: enemy,
                damage: 10.0,
                slow: Some(0.5)
            })
        );
        let snapshot = *query::enemy_view(&world).get(enemy).expect("alive");
        assert_eq!(snapshot.health, 40.0);
        assert_eq!(snapshot.slow_factor, 0.5);
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn second_ice_hit_restarts_slow_instead_of_stacking() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Ice,
                position: Point::new(100.0, 250.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );
        let enemy = query::enemy_view(&world).iter().next().expect("enemy").id;
        let tower = TowerId::new(0);
        let slow_duration = world.config.slow_duration();

        let hit_with_ice = |world: &mut World| {
            let events = run(world, Command::FireProjectile { tower, target: enemy });
            assert_eq!(events, vec![Event::ProjectileLaunched { tower, target: enemy }]);
            for _ in 0..100 {
                let _ = tick(world);
                let hit = run(world, Command::ResolveProjectiles)
                    .into_iter()
                    .any(|event| matches!(event, Event::ProjectileHit { .. }));
                if hit {
                    return;
                }
            }
            panic!("projectile never arrived");
        };

        hit_with_ice(&mut world);
        for _ in 0..90 {
            let _ = tick(&mut world);
        }
        let state = world.enemies.get(enemy).expect("alive");
        assert_eq!(state.slow_factor, 0.5);
        assert!(state.slow_remaining < Duration::from_millis(600));
        assert!(!state.slow_remaining.is_zero());

        hit_with_ice(&mut world);
        let state = world.enemies.get(enemy).expect("alive");
        assert_eq!(state.slow_factor, 0.5);
        assert_eq!(state.slow_remaining, slow_duration);
        assert_eq!(state.health, 30.0);
    }

    #[test]
    fn projectile_without_target_is_discarded() {
        let level = LevelLayout::custom(
            "short",
            vec![Point::new(0.0, 300.0), Point::new(2.0, 300.0)],
            Vec::new(),
        );
        let mut world = world_on(level);
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(700.0, 200.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );
        let enemy = query::enemy_view(&world).iter().next().expect("enemy").id;
        let _ = run(
            &mut world,
            Command::FireProjectile {
                tower: TowerId::new(0),
                target: enemy,
            },
        );
        assert_eq!(query::projectiles(&world).len(), 1);

        let _ = tick(&mut world);
        let escaped = tick(&mut world);
        assert!(escaped
            .iter()
            .any(|event| matches!(event, Event::EnemyEscaped { enemy: id, .. } if *id == enemy)));

        let events = run(&mut world, Command::ResolveProjectiles);
        assert!(events.is_empty());
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn tower_cannot_fire_before_interval_elapses() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(100.0, 250.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Tank,
            },
        );
        let target = query::enemy_view(&world).iter().next().expect("enemy").id;
        let tower = TowerId::new(0);

        let fire = Command::FireProjectile { tower, target };
        assert_eq!(run(&mut world, fire.clone()).len(), 1);
        assert!(run(&mut world, fire.clone()).is_empty());

        let cooldown = query::tower_cooldowns(&world).into_vec()[0].ready_in;
        assert_eq!(cooldown, Duration::from_secs(1));
    }

    #[test]
    fn chain_damage_is_rounded_and_drawn_per_hop() {
        let mut config = GameConfig::default();
        config.starting_gold = 200;
        let mut world = World::with_config(config, straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Lightning,
                position: Point::new(100.0, 220.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let mut ids = Vec::new();
        for _ in 0..2 {
            let events = run(
                &mut world,
                Command::SpawnEnemy {
                    wave: 1,
                    kind: EnemyKind::Basic,
                },
            );
            if let [Event::EnemySpawned { enemy, .. }] = events[..] {
                ids.push(enemy);
            }
        }

        let hops = vec![
            ChainHop {
                enemy: ids[0],
                damage: 20.0,
            },
            ChainHop {
                enemy: ids[1],
                damage: 9.8,
            },
        ];
        let events = run(
            &mut world,
            Command::StrikeChain {
                tower: TowerId::new(0),
                hops: hops.clone(),
            },
        );
        assert_eq!(
            events,
            vec![Event::ChainLightningStruck {
                tower: TowerId::new(0),
                hops
            }]
        );

        let view = query::enemy_view(&world);
        assert_eq!(view.get(ids[0]).expect("first").health, 30.0);
        assert_eq!(view.get(ids[1]).expect("second").health, 40.0);
        assert_eq!(query::lightning(&world).len(), 2);
        assert_eq!(query::lightning(&world)[0].from, Point::new(100.0, 220.0));

        let _ = run(
            &mut world,
            Command::DecayEffects {
                dt: Duration::from_millis(250),
            },
        );
        assert!(query::lightning(&world).is_empty());
    }

    #[test]
    fn chain_passes_over_enemies_killed_earlier_in_the_tick() {
        let mut config = GameConfig::default();
        config.starting_gold = 200;
        let mut world = World::with_config(config, straight_level());
        for x in [100.0, 160.0] {
            let _ = run(
                &mut world,
                Command::PlaceTower {
                    kind: TowerKind::Lightning,
                    position: Point::new(x, 220.0),
                },
            );
        }
        let _ = run(&mut world, Command::StartWave);
        let mut ids = Vec::new();
        for _ in 0..2 {
            let events = run(
                &mut world,
                Command::SpawnEnemy {
                    wave: 1,
                    kind: EnemyKind::Basic,
                },
            );
            if let [Event::EnemySpawned { enemy, .. }] = events[..] {
                ids.push(enemy);
            }
        }

        let _ = run(
            &mut world,
            Command::StrikeChain {
                tower: TowerId::new(0),
                hops: vec![ChainHop {
                    enemy: ids[0],
                    damage: 60.0,
                }],
            },
        );
        let events = run(
            &mut world,
            Command::StrikeChain {
                tower: TowerId::new(1),
                hops: vec![
                    ChainHop {
                        enemy: ids[1],
                        damage: 20.0,
                    },
                    ChainHop {
                        enemy: ids[0],
                        damage: 14.0,
                    },
                ],
            },
        );

        assert_eq!(
            events,
            vec![Event::ChainLightningStruck {
                tower: TowerId::new(1),
                hops: vec![ChainHop {
                    enemy: ids[1],
                    damage: 20.0,
                }],
            }]
        );
        let view = query::enemy_view(&world);
        assert_eq!(view.get(ids[0]).expect("dead enemy").health, -10.0);
        assert_eq!(view.get(ids[1]).expect("live enemy").health, 30.0);
        assert_eq!(query::lightning(&world).len(), 2);
    }

    #[test]
    fn wave_completion_grants_bonus_and_starts_countdown() {
        let mut config = GameConfig::default();
        config.initial_wave_size = 0;
        let mut world = World::with_config(config, straight_level());
        let _ = run(&mut world, Command::StartWave);

        let dt = world.config.tick_duration();
        let events = run(&mut world, Command::AdvanceWave { dt });
        assert_eq!(
            events,
            vec![
                Event::WaveCompleted { wave: 1, bonus: 50 },
                Event::CountdownStarted {
                    wave: 2,
                    duration: Duration::from_secs(5)
                },
            ]
        );
        assert_eq!(query::economy(&world).gold, 150);

        let events = run(&mut world, Command::StartWave);
        assert!(matches!(
            events[..],
            [Event::WaveStartRejected {
                reason: WaveStartError::WaveAutoStartPending { .. }
            }]
        ));

        let events = run(
            &mut world,
            Command::AdvanceWave {
                dt: Duration::from_secs(5),
            },
        );
        assert_eq!(
            events,
            vec![Event::WaveStarted {
                wave: 2,
                size: 0,
                auto: true
            }]
        );
    }

    #[test]
    fn clearing_final_wave_is_a_victory() {
        let mut config = GameConfig::default();
        config.initial_wave_size = 0;
        config.max_waves = 1;
        let mut world = World::with_config(config, straight_level());
        let _ = run(&mut world, Command::StartWave);
        let events = run(
            &mut world,
            Command::AdvanceWave {
                dt: Duration::from_millis(16),
            },
        );

        let summary = RunSummary {
            outcome: RunOutcome::Victory,
            waves_survived: 1,
            gold: 150,
            lives: 20,
            enemies_killed: 0,
        };
        assert_eq!(
            events,
            vec![
                Event::WaveCompleted { wave: 1, bonus: 50 },
                Event::AllWavesCleared { summary },
            ]
        );
        assert_eq!(query::summary(&world), summary);
        assert_eq!(
            run(&mut world, Command::StartWave),
            vec![Event::WaveStartRejected {
                reason: WaveStartError::AllWavesCleared
            }]
        );
    }

    #[test]
    fn loading_level_cancels_countdown_and_clears_field() {
        let mut config = GameConfig::default();
        config.initial_wave_size = 0;
        let mut world = World::with_config(config, straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(200.0, 200.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::AdvanceWave {
                dt: Duration::ZERO,
            },
        );
        assert!(matches!(
            query::wave(&world).phase,
            WavePhase::Countdown { .. }
        ));

        let events = run(
            &mut world,
            Command::LoadLevel {
                layout: LevelId::Desert.layout(),
            },
        );
        assert_eq!(
            events,
            vec![Event::LevelLoaded {
                name: "desert".to_owned()
            }]
        );
        assert_eq!(query::wave(&world).phase, WavePhase::Idle);
        assert_eq!(query::wave(&world).number, 2);
        assert!(query::tower_view(&world).into_vec().is_empty());
        assert!(run(
            &mut world,
            Command::AdvanceWave {
                dt: Duration::from_secs(10)
            }
        )
        .is_empty());
    }

    #[test]
    fn reset_restores_configured_state() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(200.0, 200.0),
            },
        );
        let _ = run(&mut world, Command::StartWave);
        let _ = run(
            &mut world,
            Command::SpawnEnemy {
                wave: 1,
                kind: EnemyKind::Basic,
            },
        );

        let events = run(&mut world, Command::ResetGame);
        assert_eq!(
            events,
            vec![
                Event::GameReset,
                Event::LevelLoaded {
                    name: "straight".to_owned()
                }
            ]
        );
        assert_eq!(query::economy(&world).gold, 100);
        assert_eq!(query::enemy_count(&world), 0);
        assert_eq!(query::wave(&world).phase, WavePhase::Idle);
        assert!(matches!(
            run(
                &mut world,
                Command::SpawnEnemy {
                    wave: 1,
                    kind: EnemyKind::Basic
                }
            )[..],
            [Event::EnemySpawnRejected { .. }]
        ));
    }

    #[test]
    fn tower_hit_test_prefers_nearest() {
        let mut world = world_on(straight_level());
        let _ = run(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Archer,
                position: Point::new(200.0, 200.0),
            },
        );
        assert_eq!(
            query::tower_at(&world, Point::new(210.0, 210.0)),
            Some(TowerId::new(0))
        );
        assert_eq!(query::tower_at(&world, Point::new(240.0, 200.0)), None);
        assert_eq!(
            query::placement(&world, TowerKind::Archer, Point::new(200.0, 200.0)),
            Err(PlacementError::TooCloseToTower)
        );
    }
}
