#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the maze game.

pub mod grid;
pub mod interaction;

use mazegame_core::{
    CellCoord, Color, Command, Direction, EnemyId, Event, LossCause, MalformedMapError, PlayerId,
    RunResult, Tile, TileKind,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::{
    grid::Grid,
    interaction::{Entry, KeyRing, Mover},
};

const HAZARD_FLAVOR: [&str; 4] = [
    "The spikes were sharper than they looked.",
    "Watch your step next time.",
    "That floor was not a floor.",
    "Impaled, and a little embarrassed.",
];

const COLLISION_FLAVOR: [&str; 4] = [
    "It saw you first.",
    "Wrong place, wrong tick.",
    "The patrol was right on schedule.",
    "You walked straight into its arms.",
];

/// Represents the authoritative maze world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    keys: KeyRing,
    result: Option<RunResult>,
    tick_index: u64,
    player_count: usize,
    flavor_rng: ChaCha8Rng,
}

impl World {
    /// Creates a world from row-major initial placements.
    ///
    /// Player and enemy identifiers are reassigned in scan order, so the first
    /// player found becomes player `0`. The seed drives the flavor text chosen
    /// for lost runs.
    pub fn new(rows: Vec<Vec<Option<Tile>>>, seed: u64) -> Result<Self, MalformedMapError> {
        let mut grid = Grid::from_rows(rows)?;

        let mut players = 0u32;
        let mut enemies = 0u32;
        for tile in grid.iter_mut() {
            match tile {
                Tile::Player(id) => {
                    *id = PlayerId::new(players);
                    players += 1;
                }
                Tile::Enemy(enemy) => {
                    enemy.id = EnemyId::new(enemies);
                    enemies += 1;
                }
                _ => {}
            }
        }

        Ok(Self {
            grid,
            keys: KeyRing::default(),
            result: None,
            tick_index: 0,
            player_count: players as usize,
            flavor_rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Tries to move whatever tile occupies `origin` one step.
    ///
    /// Returns `true` when the mover changed cells. A rejected attempt leaves
    /// every tile where it was. Entering an enemy (or being entered by one)
    /// ends the run without moving anything.
    pub fn attempt_move(
        &mut self,
        origin: CellCoord,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if self.result.is_some() || direction == Direction::Halt {
            return false;
        }

        let Some(mover) = self.grid.get(origin).and_then(Mover::of) else {
            out_events.push(Event::MoveRejected { origin, direction });
            return false;
        };
        let Some(target) = origin.step(direction).filter(|cell| self.grid.contains(*cell)) else {
            out_events.push(Event::MoveRejected { origin, direction });
            return false;
        };

        let entry = interaction::entry(self.grid.get(target), mover, &self.keys);
        match entry {
            Entry::Blocked => {
                out_events.push(Event::MoveRejected { origin, direction });
                return false;
            }
            Entry::Collide => {
                self.lose(LossCause::EnemyCollision, out_events);
                return false;
            }
            _ => {}
        }

        let kind = match mover {
            Mover::Player => TileKind::Player,
            Mover::Enemy => TileKind::Enemy,
        };
        let _ = self.grid.relocate(origin, target);
        out_events.push(Event::TileMoved {
            kind,
            from: origin,
            to: target,
        });

        match entry {
            Entry::CollectKey(color) => {
                self.keys.collect(color);
                out_events.push(Event::KeyCollected {
                    color,
                    cell: target,
                });
                self.open_doors(color, out_events);
            }
            Entry::Unlock(color) => {
                debug!(%color, cell = %target, "lock opened");
                out_events.push(Event::LockOpened {
                    color,
                    cell: target,
                });
            }
            Entry::Win => self.finish(RunResult::Won, out_events),
            Entry::Hazard => self.lose(LossCause::HazardContact, out_events),
            Entry::Occupy | Entry::Blocked | Entry::Collide => {}
        }

        true
    }

    fn step_enemy(&mut self, enemy: EnemyId, permitted: bool, out_events: &mut Vec<Event>) {
        let Some((cell, direction)) = self.locate_enemy(enemy) else {
            return;
        };

        let mut position = cell;
        if let Some(direction) = direction.filter(|_| permitted) {
            if self.attempt_move(cell, direction, out_events) {
                position = cell.step(direction).unwrap_or(cell);
            }
        }

        if let Some(Tile::Enemy(state)) = self.grid.get_mut(position) {
            state.advance();
            out_events.push(Event::EnemyPathAdvanced {
                enemy,
                index: state.index,
            });
        }
    }

    fn locate_enemy(&self, enemy: EnemyId) -> Option<(CellCoord, Option<Direction>)> {
        self.grid.iter().find_map(|(cell, tile)| match tile {
            Tile::Enemy(state) if state.id == enemy => Some((cell, state.next_direction())),
            _ => None,
        })
    }

    fn open_doors(&mut self, color: Color, out_events: &mut Vec<Event>) {
        let doors: Vec<CellCoord> = self
            .grid
            .find_all(TileKind::Door)
            .into_iter()
            .filter(|(_, tile)| tile.color() == Some(color))
            .map(|(cell, _)| cell)
            .collect();

        for cell in doors {
            let _ = self.grid.remove(cell);
            debug!(%color, %cell, "door opened");
            out_events.push(Event::DoorOpened { color, cell });
        }
    }

    fn lose(&mut self, cause: LossCause, out_events: &mut Vec<Event>) {
        if self.result.is_some() {
            return;
        }
        let lines: &[&str] = match cause {
            LossCause::HazardContact => &HAZARD_FLAVOR,
            LossCause::EnemyCollision => &COLLISION_FLAVOR,
        };
        let flavor = lines
            .choose(&mut self.flavor_rng)
            .copied()
            .unwrap_or_default()
            .to_owned();
        self.finish(RunResult::Lost { cause, flavor }, out_events);
    }

    fn finish(&mut self, result: RunResult, out_events: &mut Vec<Event>) {
        if self.result.is_some() {
            return;
        }
        info!(tick = self.tick_index, %result, "run ended");
        self.result = Some(result.clone());
        out_events.push(Event::RunEnded { result });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once the run has a result every command is ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.result.is_some() {
        return;
    }

    match command {
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
        }
        Command::MoveTile { origin, direction } => {
            let _ = world.attempt_move(origin, direction, out_events);
        }
        Command::StepEnemy { enemy, permitted } => {
            world.step_enemy(enemy, permitted, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use mazegame_core::{
        CellCoord, Color, EnemySnapshot, EnemyView, GridSnapshot, RunResult, SnapshotTile, Tile,
        TileKind,
    };

    use super::{grid::Grid, World};

    /// Provides read-only access to the world's tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Returns the occupant of the provided cell, if any.
    #[must_use]
    pub fn tile_at(world: &World, cell: CellCoord) -> Option<&Tile> {
        world.grid.get(cell)
    }

    /// Number of players placed on the board.
    #[must_use]
    pub fn player_count(world: &World) -> usize {
        world.player_count
    }

    /// Positions of every player in player-index order.
    #[must_use]
    pub fn player_positions(world: &World) -> Vec<CellCoord> {
        let mut players: Vec<_> = world
            .grid
            .find_all(TileKind::Player)
            .into_iter()
            .filter_map(|(cell, tile)| match tile {
                Tile::Player(id) => Some((*id, cell)),
                _ => None,
            })
            .collect();
        players.sort_by_key(|(id, _)| *id);
        players.into_iter().map(|(_, cell)| cell).collect()
    }

    /// Captures every enemy in row-major scan order.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .grid
            .find_all(TileKind::Enemy)
            .into_iter()
            .filter_map(|(cell, tile)| match tile {
                Tile::Enemy(enemy) => Some(EnemySnapshot {
                    id: enemy.id,
                    cell,
                    path: enemy.path.clone(),
                    chance_to_move: enemy.chance_to_move,
                    index: enemy.index,
                }),
                _ => None,
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Terminal outcome of the run, once set.
    #[must_use]
    pub fn run_result(world: &World) -> Option<&RunResult> {
        world.result.as_ref()
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of keys of the provided color collected so far.
    #[must_use]
    pub fn keys_collected(world: &World, color: Color) -> u32 {
        world.keys.count(color)
    }

    /// Copies the board into a read-only snapshot.
    #[must_use]
    pub fn snapshot(world: &World) -> GridSnapshot {
        let (rows, columns) = world.grid.dimensions();
        let mut cells = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                let cell = CellCoord::new(row, column);
                cells.push(world.grid.get(cell).map(|tile| SnapshotTile {
                    tile: tile.clone(),
                    previous: world.grid.previous_position(cell).unwrap_or(cell),
                }));
            }
        }
        GridSnapshot::new(rows, columns, cells, player_positions(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazegame_core::Enemy;

    fn world(rows: Vec<Vec<Option<Tile>>>) -> World {
        World::new(rows, 7).expect("valid layout")
    }

    #[test]
    fn identifiers_follow_scan_order() {
        let world = world(vec![
            vec![None, Some(Tile::player())],
            vec![Some(Tile::player()), Some(Tile::Enemy(Enemy::new(Vec::new())))],
        ]);
        assert_eq!(query::player_count(&world), 2);
        assert_eq!(
            query::player_positions(&world),
            vec![CellCoord::new(0, 1), CellCoord::new(1, 0)]
        );
        assert_eq!(
            query::tile_at(&world, CellCoord::new(1, 0)),
            Some(&Tile::Player(PlayerId::new(1)))
        );
    }

    #[test]
    fn tick_advances_counter() {
        let mut world = world(vec![vec![Some(Tile::player())]]);
        let mut events = Vec::new();
        apply(&mut world, Command::Tick, &mut events);
        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(query::tick_index(&world), 2);
        assert_eq!(events.last(), Some(&Event::TimeAdvanced { tick: 2 }));
    }

    #[test]
    fn halt_is_a_silent_no_op() {
        let mut world = world(vec![vec![Some(Tile::player()), None]]);
        let mut events = Vec::new();
        assert!(!world.attempt_move(CellCoord::new(0, 0), Direction::Halt, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn static_tiles_cannot_move() {
        let mut world = world(vec![vec![Some(Tile::Exit), None]]);
        let mut events = Vec::new();
        assert!(!world.attempt_move(CellCoord::new(0, 0), Direction::Right, &mut events));
        assert_eq!(query::tile_at(&world, CellCoord::new(0, 0)), Some(&Tile::Exit));
    }

    #[test]
    fn lost_run_carries_flavor_text() {
        let mut world = world(vec![vec![Some(Tile::player()), Some(Tile::Spike)]]);
        let mut events = Vec::new();
        assert!(world.attempt_move(CellCoord::new(0, 0), Direction::Right, &mut events));
        match query::run_result(&world) {
            Some(RunResult::Lost { cause, flavor }) => {
                assert_eq!(*cause, LossCause::HazardContact);
                assert!(HAZARD_FLAVOR.contains(&flavor.as_str()));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn commands_after_the_end_are_ignored() {
        let mut world = world(vec![vec![Some(Tile::player()), Some(Tile::Exit), None]]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MoveTile {
                origin: CellCoord::new(0, 0),
                direction: Direction::Right,
            },
            &mut events,
        );
        assert_eq!(query::run_result(&world), Some(&RunResult::Won));

        events.clear();
        apply(&mut world, Command::Tick, &mut events);
        assert!(events.is_empty());
        assert_eq!(query::tick_index(&world), 0);
    }

    #[test]
    fn snapshot_reports_colors_around_players() {
        let world = world(vec![vec![
            Some(Tile::Wall {
                color: Some(Color::Red),
            }),
            Some(Tile::player()),
            Some(Tile::ColoredFloor {
                color: Color::Green,
            }),
        ]]);
        let snapshot = query::snapshot(&world);
        assert_eq!(snapshot.color_from(0, Direction::Left), Ok(Some(Color::Red)));
        assert_eq!(
            snapshot.color_from(0, Direction::Right),
            Ok(Some(Color::Green))
        );
        assert_eq!(snapshot.color_from(0, Direction::Halt), Ok(None));
    }
}
