use mazegame_core::{CellCoord, Color, Command, Direction, Event, Tile, TileKind};
use mazegame_world::{self as world, query, World};
use proptest::prelude::*;

const ROWS: u32 = 5;
const COLUMNS: u32 = 6;

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

fn open_board(player: CellCoord, ground: &Tile) -> World {
    let rows = (0..ROWS)
        .map(|row| {
            (0..COLUMNS)
                .map(|column| {
                    if CellCoord::new(row, column) == player {
                        Some(Tile::player())
                    } else {
                        Some(ground.clone())
                    }
                })
                .collect()
        })
        .collect();
    World::new(rows, 1).expect("rectangular board")
}

fn occupied(world: &World) -> Vec<(CellCoord, Tile)> {
    query::grid(world)
        .iter()
        .map(|(cell, tile)| (cell, tile.clone()))
        .collect()
}

proptest! {
    #[test]
    fn passable_moves_shift_by_exactly_one_step(
        row in 0..ROWS,
        column in 0..COLUMNS,
        directions in prop::collection::vec(direction(), 1..24),
        frames in any::<bool>(),
    ) {
        let ground = if frames { Tile::DoorFrame } else { Tile::Floor };
        let mut world = open_board(CellCoord::new(row, column), &ground);

        for direction in directions {
            let origin = query::player_positions(&world)[0];
            let mut events = Vec::new();
            world::apply(&mut world, Command::MoveTile { origin, direction }, &mut events);

            let position = query::player_positions(&world)[0];
            match origin.step(direction).filter(|cell| query::grid(&world).contains(*cell)) {
                Some(target) => {
                    prop_assert_eq!(position, target);
                    prop_assert!(query::tile_at(&world, origin).is_none());
                }
                None => prop_assert_eq!(position, origin),
            }
        }
    }

    #[test]
    fn walls_and_edges_never_move_anything(
        row in 0..ROWS,
        column in 0..COLUMNS,
        direction in direction(),
    ) {
        let mut world = open_board(CellCoord::new(row, column), &Tile::wall());
        let before = occupied(&world);

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::MoveTile { origin: CellCoord::new(row, column), direction },
            &mut events,
        );

        prop_assert_eq!(occupied(&world), before);
        let rejected = matches!(events.as_slice(), [Event::MoveRejected { .. }]);
        prop_assert!(rejected);
    }

    #[test]
    fn a_key_opens_every_door_of_its_color(
        doors in prop::collection::vec(prop::sample::select(vec![Color::Red, Color::Green, Color::Blue]), 0..10),
    ) {
        let mut row = vec![Some(Tile::player()), Some(Tile::Key { color: Color::Blue })];
        row.extend(doors.iter().map(|color| Some(Tile::door(*color))));
        let mut world = World::new(vec![row], 3).expect("single row");

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::MoveTile { origin: CellCoord::new(0, 0), direction: Direction::Right },
            &mut events,
        );

        for (offset, color) in doors.iter().enumerate() {
            let cell = CellCoord::new(0, offset as u32 + 2);
            let tile = query::tile_at(&world, cell).cloned();
            if *color == Color::Blue {
                prop_assert_eq!(tile, Some(Tile::DoorFrame));
            } else {
                prop_assert_eq!(tile.map(|tile| tile.kind()), Some(TileKind::Door));
            }
        }
        let opened = events
            .iter()
            .filter(|event| matches!(event, Event::DoorOpened { .. }))
            .count();
        prop_assert_eq!(opened, doors.iter().filter(|color| **color == Color::Blue).count());
    }
}
