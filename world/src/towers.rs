//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use path_defence_core::{
    Point, TowerCooldownSnapshot, TowerId, TowerKind, TowerSnapshot, TowerStats,
};

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Centre of the tower.
    pub(crate) position: Point,
    /// Current combat statistics, compounded by upgrades.
    pub(crate) stats: TowerStats,
    /// Current level, starting at one.
    pub(crate) level: u8,
    /// Gold spent on purchase and upgrades.
    pub(crate) total_invested: u32,
    /// Simulation time of the most recent shot.
    pub(crate) last_fired_at: Option<Duration>,
}

impl TowerState {
    /// Time left before the tower may fire again at `now`.
    pub(crate) fn ready_in(&self, now: Duration) -> Duration {
        match self.last_fired_at {
            Some(fired_at) => fired_at
                .saturating_add(self.stats.fire_interval)
                .saturating_sub(now),
            None => Duration::ZERO,
        }
    }

    pub(crate) fn is_ready(&self, now: Duration) -> bool {
        self.ready_in(now).is_zero()
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            stats: self.stats,
            level: self.level,
            total_invested: self.total_invested,
        }
    }

    pub(crate) fn cooldown(&self, now: Duration) -> TowerCooldownSnapshot {
        TowerCooldownSnapshot {
            tower: self.id,
            kind: self.kind,
            stats: self.stats,
            ready_in: self.ready_in(now),
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Stores a fresh level-one tower and returns its identifier.
    pub(crate) fn insert(&mut self, kind: TowerKind, position: Point) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                kind,
                position,
                stats: kind.base_stats(),
                level: 1,
                total_invested: kind.cost(),
                last_fired_at: None,
            },
        );
        id
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    /// Drops every tower; identifiers are never reused.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Towers in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    /// Reports whether any tower lies strictly closer than `clearance` to `position`.
    pub(crate) fn crowds(&self, position: Point, clearance: f32) -> bool {
        self.iter()
            .any(|tower| tower.position.distance(position) < clearance)
    }
}
