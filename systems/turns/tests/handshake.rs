use std::thread;

use mazegame_core::{
    CellCoord, Direction, GridSnapshot, PendingMove, ProtocolError, RunResult, SnapshotTile, Tile,
};
use mazegame_system_turns::{TurnReport, TurnState, TurnSynchronizer};

fn corridor(player_column: u32) -> GridSnapshot {
    let cells = (0..4)
        .map(|column| {
            (column == player_column).then(|| SnapshotTile {
                tile: Tile::player(),
                previous: CellCoord::new(0, column),
            })
        })
        .collect();
    GridSnapshot::new(1, 4, cells, vec![CellCoord::new(0, player_column)])
}

fn report(tick: u64, moves: &[PendingMove], result: Option<RunResult>) -> TurnReport {
    let column = moves
        .first()
        .and_then(|pending| pending.origin.step(pending.direction))
        .map_or(0, |cell| cell.column());
    TurnReport {
        tick,
        positions: vec![CellCoord::new(0, column)],
        moved: vec![moves.iter().any(|pending| pending.direction != Direction::Halt)],
        result,
        snapshot: corridor(column),
    }
}

#[test]
fn first_step_proceeds_and_reports_back() {
    let mut sync = TurnSynchronizer::new();
    let mut context = sync.attach(corridor(0)).expect("attach");

    let script = thread::spawn(move || {
        let first = context.step(Direction::Right).expect("first step");
        let second = context.step(Direction::Right).expect("second step");
        (first, second, context.players().to_vec())
    });

    for tick in 1..=2 {
        let moves = sync.await_moves();
        assert_eq!(sync.state(), TurnState::WaitingForSim);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].player.get(), 0);
        sync.complete_turn(report(tick, &moves, None));
    }

    let (first, second, players) = script.join().expect("script thread");
    assert_eq!(first.tick, 1);
    assert_eq!(first.positions, vec![CellCoord::new(0, 1)]);
    assert_eq!(second.positions, vec![CellCoord::new(0, 2)]);
    assert_eq!(players, vec![CellCoord::new(0, 2)]);

    assert!(sync.await_moves().is_empty());
    assert_eq!(sync.state(), TurnState::Ended);
}

#[test]
fn terminal_report_ends_both_sides() {
    let mut sync = TurnSynchronizer::new();
    let mut context = sync.attach(corridor(2)).expect("attach");

    let script = thread::spawn(move || {
        let last = context.step(Direction::Right).expect("winning step");
        let after = context.wait();
        (last, after, context.has_ended())
    });

    let moves = sync.await_moves();
    sync.complete_turn(report(1, &moves, Some(RunResult::Won)));
    assert_eq!(sync.state(), TurnState::Ended);
    assert!(!sync.is_script_alive());

    let (last, after, ended) = script.join().expect("script thread");
    assert_eq!(last.result, Some(RunResult::Won));
    assert_eq!(after, Err(ProtocolError::StepAfterEnd));
    assert!(ended);
}

#[test]
fn ending_the_run_wakes_a_blocked_script() {
    let mut sync = TurnSynchronizer::new();
    let mut context = sync.attach(corridor(0)).expect("attach");

    let script = thread::spawn(move || (context.wait(), context.wait()));

    let moves = sync.await_moves();
    assert_eq!(moves[0].direction, Direction::Halt);
    sync.end();

    let (blocked, retried) = script.join().expect("script thread");
    assert_eq!(blocked, Err(ProtocolError::RunEnded));
    assert_eq!(retried, Err(ProtocolError::RunEnded));
}

#[test]
fn a_panicking_script_releases_the_tick_loop() {
    let mut sync = TurnSynchronizer::new();
    let context = sync.attach(corridor(0)).expect("attach");

    let script = thread::spawn(move || {
        let _held = context;
        panic!("script failed");
    });

    assert!(sync.await_moves().is_empty());
    assert_eq!(sync.state(), TurnState::Ended);
    assert!(script.join().is_err());
}
