#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits firing commands from targeting data.
//!
//! Projectile towers fire homing projectiles; lightning towers resolve their
//! whole chain up front and hand the world a list of hops to apply.

use path_defence_core::{
    ChainHop, Command, EnemyId, EnemyView, TowerCooldownSnapshot, TowerCooldownView, TowerId,
    TowerSpecial, TowerTarget,
};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits firing commands for targeted towers whose cooldown elapsed.
    ///
    /// Towers without a target keep their cooldown untouched.
    pub fn handle(
        &mut self,
        tower_cooldowns: TowerCooldownView,
        tower_targets: &[TowerTarget],
        enemies: &EnemyView,
        out: &mut Vec<Command>,
    ) {
        if tower_targets.is_empty() {
            return;
        }

        let cooldowns = tower_cooldowns.into_vec();
        if cooldowns.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            let Some(snapshot) = find_cooldown(&cooldowns, target.tower) else {
                continue;
            };
            if !snapshot.ready_in.is_zero() {
                continue;
            }

            let command = match snapshot.stats.special {
                TowerSpecial::Chain {
                    count,
                    range,
                    decay,
                } => Command::StrikeChain {
                    tower: target.tower,
                    hops: chain_hops(
                        target.enemy,
                        snapshot.stats.damage,
                        count,
                        range,
                        decay,
                        enemies,
                    ),
                },
                TowerSpecial::None | TowerSpecial::Slow { .. } => Command::FireProjectile {
                    tower: target.tower,
                    target: target.enemy,
                },
            };
            self.scratch.push(command);
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

/// Resolves the hops of a chain-lightning strike starting at `first`.
///
/// The first hop carries `damage`. Each further hop jumps to the nearest
/// living enemy not yet struck that lies strictly within `range` of the
/// previous hop, multiplying the damage by `decay`. The chain stops after
/// `count` extra hops or when no enemy qualifies.
#[must_use]
pub fn chain_hops(
    first: EnemyId,
    damage: f32,
    count: u32,
    range: f32,
    decay: f32,
    enemies: &EnemyView,
) -> Vec<ChainHop> {
    let Some(origin) = enemies.get(first) else {
        return Vec::new();
    };

    let mut hops = vec![ChainHop {
        enemy: first,
        damage,
    }];
    let mut from = origin.position;
    let mut hop_damage = damage;

    for _ in 0..count {
        let next = enemies
            .iter()
            .filter(|candidate| candidate.is_alive())
            .filter(|candidate| hops.iter().all(|hop| hop.enemy != candidate.id))
            .map(|candidate| (from.distance(candidate.position), candidate))
            .filter(|(distance, _)| *distance < range)
            .min_by(|left, right| {
                left.0
                    .total_cmp(&right.0)
                    .then(left.1.id.cmp(&right.1.id))
            });
        let Some((_, candidate)) = next else {
            break;
        };

        hop_damage *= decay;
        hops.push(ChainHop {
            enemy: candidate.id,
            damage: hop_damage,
        });
        from = candidate.position;
    }

    hops
}

fn find_cooldown(
    cooldowns: &[TowerCooldownSnapshot],
    tower: TowerId,
) -> Option<&TowerCooldownSnapshot> {
    cooldowns
        .binary_search_by_key(&tower, |snapshot| snapshot.tower)
        .ok()
        .map(|index| &cooldowns[index])
}
