use std::time::Duration;

use mazegame_core::{Direction, Enemy, Tile};
use mazegame_runtime::{Config, RunReport, Simulation};
use mazegame_world::World;

const SCRIPT: [Direction; 12] = [
    Direction::Right,
    Direction::Right,
    Direction::Halt,
    Direction::Down,
    Direction::Down,
    Direction::Right,
    Direction::Halt,
    Direction::Halt,
    Direction::Right,
    Direction::Down,
    Direction::Right,
    Direction::Right,
];

fn patrol_maze() -> Vec<Vec<Option<Tile>>> {
    let patrol = || {
        let mut path = vec![Direction::Down; 3];
        path.extend([Direction::Up; 3]);
        Some(Tile::Enemy(Enemy::with_chance(path, 0.6)))
    };
    vec![
        vec![Some(Tile::player()), None, None, patrol(), None, None],
        vec![None, Some(Tile::wall()), None, None, None, patrol()],
        vec![None, None, None, None, Some(Tile::wall()), None],
        vec![None, Some(Tile::Spike), None, None, None, None],
        vec![None, None, None, None, None, Some(Tile::Exit)],
    ]
}

fn replay(seed: u64) -> RunReport {
    let world = World::new(patrol_maze(), seed).expect("valid layout");
    let mut simulation = Simulation::new(
        world,
        Config {
            seed,
            tick_interval: Duration::ZERO,
            max_ticks: Some(40),
        },
    );
    simulation
        .run(|mut context| {
            for direction in SCRIPT {
                if context.step(direction)?.result.is_some() {
                    break;
                }
            }
            Ok(())
        })
        .expect("run")
}

#[test]
fn identical_seeds_produce_identical_runs() {
    for seed in [0, 7, 1234] {
        assert_eq!(replay(seed), replay(seed));
    }
}

#[test]
fn run_reports_survive_json() {
    let report = replay(7);
    let json = serde_json::to_string(&report).expect("serialize report");
    let restored: RunReport = serde_json::from_str(&json).expect("deserialize report");
    assert_eq!(restored, report);
}
