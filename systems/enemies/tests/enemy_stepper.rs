use mazegame_core::{CellCoord, Command, Direction, Enemy, Event, Tile};
use mazegame_system_enemies::{Config, EnemyStepper};
use mazegame_world::{self as world, query, World};

fn run_ticks(world: &mut World, stepper: &mut EnemyStepper, ticks: usize) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..ticks {
        let mut events = Vec::new();
        world::apply(world, Command::Tick, &mut events);

        let mut commands = Vec::new();
        stepper.handle(&events, &query::enemy_view(world), &mut commands);
        for command in commands {
            world::apply(world, command, &mut events);
        }
        log.extend(events);
    }
    log
}

fn column(height: u32, enemy: Enemy) -> World {
    let rows = (0..height)
        .map(|row| {
            if row == 0 {
                vec![Some(Tile::Enemy(enemy.clone()))]
            } else {
                vec![None]
            }
        })
        .collect();
    World::new(rows, 0).expect("valid column")
}

#[test]
fn certain_enemy_closes_its_cycle() {
    let path = vec![Direction::Down, Direction::Down, Direction::Up, Direction::Up];
    let mut world = column(3, Enemy::with_chance(path, 1.0));
    let mut stepper = EnemyStepper::new(Config::new(11));

    let _ = run_ticks(&mut world, &mut stepper, 2);
    let midway = query::enemy_view(&world).into_vec();
    assert_eq!(midway[0].cell, CellCoord::new(2, 0));
    assert_eq!(midway[0].index, 2);

    let _ = run_ticks(&mut world, &mut stepper, 2);
    let back = query::enemy_view(&world).into_vec();
    assert_eq!(back[0].cell, CellCoord::new(0, 0));
    assert_eq!(back[0].index, 0);
}

#[test]
fn index_advances_every_tick_even_when_the_enemy_stays() {
    let path = vec![Direction::Down, Direction::Up, Direction::Halt];
    let mut world = column(2, Enemy::with_chance(path, 0.0));
    let mut stepper = EnemyStepper::new(Config::new(5));

    for tick in 1..=7usize {
        let _ = run_ticks(&mut world, &mut stepper, 1);
        let enemy = &query::enemy_view(&world).into_vec()[0];
        assert_eq!(enemy.cell, CellCoord::new(0, 0));
        assert_eq!(enemy.index, tick % 3);
    }
}

#[test]
fn blocked_steps_still_advance_the_path() {
    let path = vec![Direction::Up, Direction::Down];
    let mut world = column(2, Enemy::with_chance(path, 1.0));
    let mut stepper = EnemyStepper::new(Config::new(5));

    let _ = run_ticks(&mut world, &mut stepper, 1);
    let enemy = &query::enemy_view(&world).into_vec()[0];
    assert_eq!(enemy.cell, CellCoord::new(0, 0));
    assert_eq!(enemy.index, 1);
}

#[test]
fn same_seed_replays_identically() {
    let path = vec![Direction::Down, Direction::Down, Direction::Up, Direction::Up];
    let replay = |seed| {
        let mut world = column(3, Enemy::with_chance(path.clone(), 0.5));
        let mut stepper = EnemyStepper::new(Config::new(seed));
        run_ticks(&mut world, &mut stepper, 32)
    };

    assert_eq!(replay(42), replay(42));
}
