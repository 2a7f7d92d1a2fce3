#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step controller that wires the world to its systems.
//!
//! Every tick runs the same order: the world advances time (moving enemies,
//! charging escapes and paying out kills), the wave director issues due
//! spawns, towers pick targets and fire, projectiles resolve, lightning
//! decays and finally the wave machine checks for completion.
//!
//! The controller also owns the input-layer state a front end needs: the
//! selected tower type or placed tower, and the translation of world
//! rejection events into `Result`s.

use std::time::Duration;

use log::{debug, info, warn};
use path_defence_core::{
    Command, EconomySnapshot, EnemyView, Event, GameConfig, LevelChangeError, LevelLayout,
    LightningSegment, PlacementError, Point, ProjectileSnapshot, RunSummary, SelectionError,
    SellError, TowerId, TowerKind, TowerTarget, TowerView, UpgradeError, WavePhase,
    WaveSnapshot, WaveStartError,
};
use path_defence_system_tower_combat::TowerCombat;
use path_defence_system_tower_targeting::TowerTargeting;
use path_defence_system_wave_director::{Config as DirectorConfig, WaveDirector};
use path_defence_world::{self as world, query, World};

/// Upper bound on fixed ticks run for a single frame.
pub const MAX_SUBSTEPS: u32 = 8;

/// Frame durations above this are clamped before entering the accumulator.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(100);

/// What the player currently has selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing is selected.
    #[default]
    None,
    /// A tower type from the shop, ready to be placed.
    TowerType(TowerKind),
    /// A tower already standing on the field.
    Tower(TowerId),
}

/// Failures of the input-layer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// The selection does not allow the operation.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The world refused to place the tower.
    #[error(transparent)]
    Placement(#[from] PlacementError),
    /// The world refused to upgrade the tower.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
    /// The world refused to sell the tower.
    #[error(transparent)]
    Sale(#[from] SellError),
    /// The world produced no answer to the request.
    #[error("the request went unanswered")]
    Unanswered,
}

/// Result of a click on the playing field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A placed tower was under the cursor and is now selected.
    SelectedTower(TowerId),
    /// The selected tower type was placed.
    Placed(TowerId),
    /// The selected tower type cannot be placed there; the selection is kept.
    PlacementRejected(InputError),
    /// Nothing actionable was clicked and the selection was cleared.
    Deselected,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    /// Name of the active level.
    pub level: String,
    /// Enemies on the field.
    pub enemies: EnemyView,
    /// Towers on the field.
    pub towers: TowerView,
    /// Projectiles in flight.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Lightning bolts still visible.
    pub lightning: Vec<LightningSegment>,
    /// Progress of the current wave.
    pub wave: WaveSnapshot,
    /// Set while the current wave still has enemies left to send.
    pub spawning: bool,
    /// Gold and lives.
    pub economy: EconomySnapshot,
    /// Current player selection.
    pub selection: Selection,
}

/// Drives a [`World`] one fixed tick at a time.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    wave_director: WaveDirector,
    targeting: TowerTargeting,
    combat: TowerCombat,
    targets: Vec<TowerTarget>,
    commands: Vec<Command>,
    fired: Vec<TowerId>,
    selection: Selection,
    accumulator: Duration,
    tick_duration: Duration,
    ticks: u64,
    journal: Vec<Event>,
}

impl Simulation {
    /// Creates a simulation governed by `config` on the provided level.
    #[must_use]
    pub fn new(config: GameConfig, level: LevelLayout) -> Self {
        let tick_duration = config.tick_duration();
        let wave_director = WaveDirector::new(DirectorConfig::new(config.clone()));
        Self {
            world: World::with_config(config, level),
            wave_director,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            targets: Vec::new(),
            commands: Vec::new(),
            fired: Vec::new(),
            selection: Selection::None,
            accumulator: Duration::ZERO,
            tick_duration,
            ticks: 0,
            journal: Vec::new(),
        }
    }

    /// Read-only access to the underlying world for [`query`] functions.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Simulated time covered by one call to [`Simulation::step`].
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Number of ticks simulated since creation or the last reset.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current player selection.
    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Current state of the wave machine.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        query::wave(&self.world).phase
    }

    /// Gold and lives held by the player.
    #[must_use]
    pub fn economy(&self) -> EconomySnapshot {
        query::economy(&self.world)
    }

    /// Reports whether the run ended in victory or defeat.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Takes every event recorded since the previous call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.journal)
    }

    /// Runs one fixed tick. Does nothing once the run has ended.
    pub fn step(&mut self) {
        if self.is_over() {
            return;
        }

        let dt = self.tick_duration;
        let _ = self.execute(Command::Tick { dt });
        self.ticks += 1;
        if self.is_over() {
            return;
        }

        self.fire_towers();

        let _ = self.execute(Command::ResolveProjectiles);
        let _ = self.execute(Command::DecayEffects { dt });
        let _ = self.execute(Command::AdvanceWave { dt });
    }

    /// Feeds a frame's worth of wall time into the fixed-step accumulator.
    ///
    /// Returns the number of ticks that ran. Frame times are clamped to
    /// [`MAX_FRAME_TIME`] and at most [`MAX_SUBSTEPS`] ticks run per call.
    pub fn advance(&mut self, frame_dt: Duration) -> u32 {
        self.accumulator = self
            .accumulator
            .saturating_add(frame_dt.min(MAX_FRAME_TIME));

        let mut substeps = 0;
        while self.accumulator >= self.tick_duration && substeps < MAX_SUBSTEPS {
            if self.is_over() {
                self.accumulator = Duration::ZERO;
                break;
            }
            self.step();
            self.accumulator -= self.tick_duration;
            substeps += 1;
        }
        substeps
    }

    /// Picks a tower type from the shop.
    ///
    /// Clears any placed-tower selection.
    pub fn select_tower_type(&mut self, kind: TowerKind) -> Result<(), SelectionError> {
        let available = self.economy().gold;
        let required = kind.cost();
        if available < required {
            return Err(SelectionError::InsufficientGold {
                required,
                available,
            });
        }
        self.selection = Selection::TowerType(kind);
        Ok(())
    }

    /// Selects a tower standing on the field.
    pub fn select_existing_tower(&mut self, tower: TowerId) -> Result<(), SelectionError> {
        if query::tower_view(&self.world).get(tower).is_none() {
            return Err(SelectionError::MissingTower);
        }
        self.selection = Selection::Tower(tower);
        Ok(())
    }

    /// Clears the current selection.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// Places the selected tower type at `position`.
    ///
    /// The selection is cleared on success and kept on rejection.
    pub fn place_tower(&mut self, position: Point) -> Result<TowerId, InputError> {
        let Selection::TowerType(kind) = self.selection else {
            return Err(SelectionError::NothingSelected.into());
        };
        let tower = self.place_tower_of(kind, position)?;
        self.selection = Selection::None;
        Ok(tower)
    }

    /// Places a tower of `kind` at `position` regardless of the selection.
    pub fn place_tower_of(
        &mut self,
        kind: TowerKind,
        position: Point,
    ) -> Result<TowerId, InputError> {
        let events = self.execute(Command::PlaceTower { kind, position });
        answer(&events, |event| match event {
            Event::TowerPlaced { tower, .. } => Some(Ok(*tower)),
            Event::TowerPlacementRejected { reason, .. } => Some(Err((*reason).into())),
            _ => None,
        })
    }

    /// Checks whether the selected tower type could be placed at `position`.
    ///
    /// Returns `None` when no tower type is selected.
    #[must_use]
    pub fn preview_placement(&self, position: Point) -> Option<Result<(), PlacementError>> {
        match self.selection {
            Selection::TowerType(kind) => Some(query::placement(&self.world, kind, position)),
            Selection::None | Selection::Tower(_) => None,
        }
    }

    /// Handles a click on the playing field.
    ///
    /// Towers under the cursor take precedence over placing the selected
    /// type; clicking empty ground with nothing to place deselects.
    pub fn click(&mut self, position: Point) -> ClickOutcome {
        if let Some(tower) = query::tower_at(&self.world, position) {
            self.selection = Selection::Tower(tower);
            return ClickOutcome::SelectedTower(tower);
        }

        match self.selection {
            Selection::TowerType(kind) => match self.place_tower_of(kind, position) {
                Ok(tower) => {
                    self.selection = Selection::None;
                    ClickOutcome::Placed(tower)
                }
                Err(reason) => ClickOutcome::PlacementRejected(reason),
            },
            Selection::None | Selection::Tower(_) => {
                self.selection = Selection::None;
                ClickOutcome::Deselected
            }
        }
    }

    /// Upgrades the selected tower and returns its new level.
    pub fn upgrade_selected_tower(&mut self) -> Result<u8, InputError> {
        let Selection::Tower(tower) = self.selection else {
            return Err(SelectionError::NothingSelected.into());
        };
        let events = self.execute(Command::UpgradeTower { tower });
        answer(&events, |event| match event {
            Event::TowerUpgraded { level, .. } => Some(Ok(*level)),
            Event::TowerUpgradeRejected { reason, .. } => Some(Err((*reason).into())),
            _ => None,
        })
    }

    /// Sells the selected tower and returns the refund.
    ///
    /// The selection is cleared on success.
    pub fn sell_selected_tower(&mut self) -> Result<u32, InputError> {
        let Selection::Tower(tower) = self.selection else {
            return Err(SelectionError::NothingSelected.into());
        };
        let events = self.execute(Command::SellTower { tower });
        let refund = answer(&events, |event| match event {
            Event::TowerSold { refund, .. } => Some(Ok(*refund)),
            Event::TowerSaleRejected { reason, .. } => Some(Err((*reason).into())),
            _ => None,
        })?;
        self.selection = Selection::None;
        Ok(refund)
    }

    /// Starts the current wave by hand.
    pub fn start_wave(&mut self) -> Result<(), WaveStartError> {
        let events = self.execute(Command::StartWave);
        match events.iter().find_map(|event| match event {
            Event::WaveStartRejected { reason } => Some(*reason),
            _ => None,
        }) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Switches to another level, clearing the field.
    ///
    /// Gold, lives and the wave counter carry over. Any countdown is
    /// cancelled and pending spawns are dropped.
    pub fn change_level(&mut self, layout: LevelLayout) -> Result<(), LevelChangeError> {
        if self.phase() == WavePhase::Running {
            debug!("level change to {} refused during a wave", layout.name());
            return Err(LevelChangeError::WaveRunning);
        }
        self.selection = Selection::None;
        let _ = self.execute(Command::LoadLevel { layout });
        Ok(())
    }

    /// Restores the starting economy and wave on the current level.
    pub fn reset(&mut self) {
        self.selection = Selection::None;
        self.accumulator = Duration::ZERO;
        self.ticks = 0;
        self.targets.clear();
        let _ = self.execute(Command::ResetGame);
        info!("simulation reset");
    }

    /// Captures a read-only snapshot for renderers.
    #[must_use]
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            level: query::level(&self.world).name().to_owned(),
            enemies: query::enemy_view(&self.world),
            towers: query::tower_view(&self.world),
            projectiles: query::projectiles(&self.world),
            lightning: query::lightning(&self.world).to_vec(),
            wave: query::wave(&self.world),
            spawning: self.wave_director.has_pending_spawns(),
            economy: query::economy(&self.world),
            selection: self.selection,
        }
    }

    /// Statistics of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        query::summary(&self.world)
    }

    /// Applies `command` and lets the wave director react until quiet.
    ///
    /// Returns every event produced, which is also appended to the journal.
    /// Lets every ready tower fire once, in tower order.
    ///
    /// Chain strikes damage enemies immediately, so targets are recomputed
    /// for the towers that have not fired yet after each strike.
    fn fire_towers(&mut self) {
        self.fired.clear();
        let mut commands = std::mem::take(&mut self.commands);
        loop {
            let towers = query::tower_view(&self.world);
            let enemies = query::enemy_view(&self.world);
            self.targeting.handle(&towers, &enemies, &mut self.targets);
            let fired = &self.fired;
            self.targets.retain(|target| !fired.contains(&target.tower));

            let cooldowns = query::tower_cooldowns(&self.world);
            commands.clear();
            self.combat
                .handle(cooldowns, &self.targets, &enemies, &mut commands);

            let mut struck = false;
            for command in commands.drain(..) {
                let (tower, chain) = match command {
                    Command::FireProjectile { tower, .. } => (tower, false),
                    Command::StrikeChain { tower, .. } => (tower, true),
                    _ => continue,
                };
                self.fired.push(tower);
                let _ = self.execute(command);
                if chain {
                    struck = true;
                    break;
                }
            }
            if !struck {
                break;
            }
        }
        self.commands = commands;
    }

    fn execute(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        let mut cursor = 0;
        let mut spawns = Vec::new();
        while cursor < events.len() {
            self.wave_director.handle(&events[cursor..], &mut spawns);
            cursor = events.len();
            for spawn in spawns.drain(..) {
                world::apply(&mut self.world, spawn, &mut events);
            }
        }

        self.journal.extend(events.iter().cloned());
        events
    }
}

/// Picks the world's answer to a request out of the events it produced.
fn answer<T>(
    events: &[Event],
    pick: impl Fn(&Event) -> Option<Result<T, InputError>>,
) -> Result<T, InputError> {
    events.iter().find_map(pick).unwrap_or_else(|| {
        warn!("request produced no answer among {} events", events.len());
        Err(InputError::Unanswered)
    })
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(GameConfig::default(), LevelLayout::default())
    }
}
