use std::time::Duration;

use path_defence_core::{
    Command, EnemyId, EnemyKind, Event, GameConfig, LevelLayout, Point, TowerKind, TowerTarget,
};
use path_defence_system_tower_targeting::TowerTargeting;
use path_defence_world::{self as world, query, World};

#[test]
fn deterministic_replay_prefers_oldest_enemy_and_clears_on_reset() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");

    let spawned: Vec<EnemyId> = first
        .events
        .iter()
        .filter_map(|event| match event {
            Event::EnemySpawned { enemy, .. } => Some(*enemy),
            _ => None,
        })
        .collect();
    assert_eq!(spawned.len(), 2, "expected exactly two spawn events");
    let expected_enemy = spawned.iter().copied().min().expect("spawned enemies");

    let after_second_spawn = &first.assignments[4];
    assert_eq!(after_second_spawn.len(), 1);
    assert_eq!(after_second_spawn[0].enemy, expected_enemy);

    let after_tick = &first.assignments[5];
    assert_eq!(after_tick.len(), 1);
    assert_eq!(after_tick[0].enemy, expected_enemy);
    assert_eq!(after_tick[0].enemy_position, Point::new(1.0, 300.0));

    let after_reset = first.assignments.last().expect("assignments recorded");
    assert!(after_reset.is_empty(), "reset must clear targets");
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    events: Vec<Event>,
    assignments: Vec<Vec<TowerTarget>>,
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let level = LevelLayout::custom(
        "lane",
        vec![Point::new(0.0, 300.0), Point::new(800.0, 300.0)],
        Vec::new(),
    );
    let mut world = World::with_config(GameConfig::default(), level);
    let mut targeting = TowerTargeting::new();
    let mut current_targets = Vec::new();
    let mut assignments = Vec::new();
    let mut events = Vec::new();

    for command in commands {
        world::apply(&mut world, command, &mut events);

        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(&towers, &enemies, &mut current_targets);
        assignments.push(current_targets.clone());
    }

    ReplayOutcome {
        events,
        assignments,
    }
}

fn scripted_commands() -> Vec<Command> {
    let spawn = Command::SpawnEnemy {
        wave: 1,
        kind: EnemyKind::Basic,
    };

    vec![
        Command::PlaceTower {
            kind: TowerKind::Archer,
            position: Point::new(40.0, 240.0),
        },
        Command::StartWave,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        spawn.clone(),
        spawn,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        Command::ResetGame,
    ]
}
