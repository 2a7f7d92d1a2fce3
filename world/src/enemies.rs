//! Generation-checked storage for enemies walking the path.

use std::time::Duration;

use path_defence_core::{EnemyId, EnemyKind, EnemySnapshot, EnemyStats, PathProgress, Point};

/// Mutable state of a single enemy stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct EnemyState {
    pub(crate) kind: EnemyKind,
    pub(crate) position: Point,
    pub(crate) progress: PathProgress,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) speed: f32,
    pub(crate) reward: u32,
    pub(crate) slow_factor: f32,
    pub(crate) slow_remaining: Duration,
}

impl EnemyState {
    pub(crate) fn spawn(kind: EnemyKind, stats: EnemyStats, origin: Point) -> Self {
        Self {
            kind,
            position: origin,
            progress: PathProgress::start(),
            health: stats.health,
            max_health: stats.health,
            speed: stats.speed,
            reward: stats.reward,
            slow_factor: 1.0,
            slow_remaining: Duration::ZERO,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Ages the slow effect, restoring full speed once it expires.
    pub(crate) fn decay_slow(&mut self, dt: Duration) {
        if self.slow_remaining.is_zero() {
            return;
        }
        self.slow_remaining = self.slow_remaining.saturating_sub(dt);
        if self.slow_remaining.is_zero() {
            self.slow_factor = 1.0;
        }
    }

    /// Applies non-negative damage; health never increases.
    pub(crate) fn take_damage(&mut self, damage: f32) {
        self.health -= damage.max(0.0);
    }

    /// Replaces any active slow with a fresh one.
    pub(crate) fn apply_slow(&mut self, factor: f32, duration: Duration) {
        self.slow_factor = factor;
        self.slow_remaining = duration;
    }

    pub(crate) fn snapshot(&self, id: EnemyId) -> EnemySnapshot {
        EnemySnapshot {
            id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            speed: self.speed,
            slow_factor: self.slow_factor,
            reward: self.reward,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    enemy: Option<EnemyState>,
}

/// Arena that hands out [`EnemyId`] handles and invalidates them on removal.
#[derive(Debug, Default)]
pub(crate) struct EnemyArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl EnemyArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, enemy: EnemyState) -> EnemyId {
        self.len += 1;
        if let Some(slot_index) = self.free.pop() {
            let slot = &mut self.slots[slot_index as usize];
            slot.enemy = Some(enemy);
            return EnemyId::new(slot_index, slot.generation);
        }

        let slot_index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            enemy: Some(enemy),
        });
        EnemyId::new(slot_index, 0)
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&EnemyState> {
        self.slots
            .get(id.slot() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.enemy.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut EnemyState> {
        self.slots
            .get_mut(id.slot() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.enemy.as_mut())
    }

    /// Removes the enemy and bumps the slot generation so `id` never resolves again.
    pub(crate) fn remove(&mut self, id: EnemyId) -> Option<EnemyState> {
        let slot = self
            .slots
            .get_mut(id.slot() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let enemy = slot.enemy.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot());
        self.len -= 1;
        Some(enemy)
    }

    /// Removes every enemy while keeping outstanding handles stale.
    pub(crate) fn clear(&mut self) {
        let ids: Vec<EnemyId> = self.iter().map(|(id, _)| id).collect();
        for id in ids {
            let _ = self.remove(id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live enemies in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (EnemyId, &EnemyState)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.enemy
                .as_ref()
                .map(|enemy| (EnemyId::new(index as u32, slot.generation), enemy))
        })
    }

    /// Live enemies in slot order, mutably.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (EnemyId, &mut EnemyState)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.enemy
                .as_mut()
                .map(|enemy| (EnemyId::new(index as u32, generation), enemy))
        })
    }
}
