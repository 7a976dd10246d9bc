#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Handshake that alternates control between the script actor and the
//! simulation actor.
//!
//! Two single-slot channels carry the turn: the script submits a batch of
//! pending moves on the intent channel and blocks on the report channel until
//! the simulation has resolved the tick. The intent channel starts with a free
//! slot, so the first script call never waits for a tick boundary.

use crossbeam_channel::{bounded, Receiver, Sender};
use mazegame_core::{
    CellCoord, Color, Direction, GridSnapshot, PendingMove, PlayerId, ProtocolError, RunResult,
    Tile,
};
use tracing::{debug, trace};

/// Outcome of one tick as seen by the script actor.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    /// Index of the tick that resolved the submitted moves.
    pub tick: u64,
    /// Player positions after the tick, in player-index order.
    pub positions: Vec<CellCoord>,
    /// Whether each submitted move relocated its player.
    pub moved: Vec<bool>,
    /// Terminal outcome, once the run has one.
    pub result: Option<RunResult>,
    /// Board state after the tick.
    pub snapshot: GridSnapshot,
}

impl TurnReport {
    /// Reports whether any submitted move relocated a player.
    #[must_use]
    pub fn any_moved(&self) -> bool {
        self.moved.iter().any(|moved| *moved)
    }
}

/// Phase of the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// No script has attached yet.
    Detached,
    /// The simulation is waiting for the script to submit its moves.
    WaitingForScript,
    /// The script is blocked until the simulation reports back.
    WaitingForSim,
    /// The run finished or the script went away.
    Ended,
}

#[derive(Debug)]
enum Intent {
    Moves(Vec<PendingMove>),
    Detach,
}

/// Simulation-side end of the handshake.
#[derive(Debug)]
pub struct TurnSynchronizer {
    state: TurnState,
    attached: bool,
    intents: Option<Receiver<Intent>>,
    reports: Option<Sender<TurnReport>>,
}

impl TurnSynchronizer {
    /// Creates a synchronizer with no script attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TurnState::Detached,
            attached: false,
            intents: None,
            reports: None,
        }
    }

    /// Current phase of the handshake.
    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Reports whether a script is attached and still taking turns.
    #[must_use]
    pub fn is_script_alive(&self) -> bool {
        matches!(
            self.state,
            TurnState::WaitingForScript | TurnState::WaitingForSim
        )
    }

    /// Registers the single script actor of this run.
    ///
    /// The returned context starts from `snapshot`. Attaching twice fails with
    /// [`ProtocolError::AlreadyAttached`]; attaching after [`Self::end`] fails
    /// with [`ProtocolError::RunEnded`].
    pub fn attach(&mut self, snapshot: GridSnapshot) -> Result<ScriptContext, ProtocolError> {
        if self.attached {
            return Err(ProtocolError::AlreadyAttached);
        }
        if self.state == TurnState::Ended {
            return Err(ProtocolError::RunEnded);
        }

        let (intent_tx, intent_rx) = bounded(1);
        let (report_tx, report_rx) = bounded(1);
        self.attached = true;
        self.intents = Some(intent_rx);
        self.reports = Some(report_tx);
        self.state = TurnState::WaitingForScript;
        debug!(players = snapshot.players().len(), "script attached");

        Ok(ScriptContext {
            intents: intent_tx,
            reports: report_rx,
            snapshot,
            ended: None,
        })
    }

    /// Blocks until the script submits its moves for this tick.
    ///
    /// Returns an empty batch without blocking when no script is waiting to
    /// act. A script that detaches or disconnects ends the handshake.
    pub fn await_moves(&mut self) -> Vec<PendingMove> {
        if self.state != TurnState::WaitingForScript {
            return Vec::new();
        }
        let Some(intents) = self.intents.as_ref() else {
            return Vec::new();
        };

        match intents.recv() {
            Ok(Intent::Moves(moves)) => {
                trace!(count = moves.len(), "script submitted moves");
                self.state = TurnState::WaitingForSim;
                moves
            }
            Ok(Intent::Detach) | Err(_) => {
                debug!("script detached");
                self.close();
                Vec::new()
            }
        }
    }

    /// Releases the script with the outcome of the tick it waited on.
    ///
    /// A report carrying a result ends the handshake after delivery.
    pub fn complete_turn(&mut self, report: TurnReport) {
        if self.state != TurnState::WaitingForSim {
            return;
        }
        let Some(reports) = self.reports.as_ref() else {
            return;
        };

        let terminal = report.result.is_some();
        trace!(tick = report.tick, terminal, "turn completed");
        if reports.send(report).is_err() || terminal {
            self.close();
        } else {
            self.state = TurnState::WaitingForScript;
        }
    }

    /// Tears down the handshake, waking any script blocked on it.
    pub fn end(&mut self) {
        if self.state != TurnState::Ended {
            debug!("handshake ended");
        }
        self.close();
    }

    fn close(&mut self) {
        self.intents = None;
        self.reports = None;
        self.state = TurnState::Ended;
    }
}

impl Default for TurnSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Script-side end of the handshake, handed to the script actor on attach.
///
/// Dropping the context detaches the script, so a finished or panicking
/// script never leaves the tick loop waiting.
#[derive(Debug)]
pub struct ScriptContext {
    intents: Sender<Intent>,
    reports: Receiver<TurnReport>,
    snapshot: GridSnapshot,
    ended: Option<Ending>,
}

/// Why a script context stopped accepting moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ending {
    /// A turn report carried the run's result.
    Reported,
    /// The simulation side hung up.
    Disconnected,
}

impl ScriptContext {
    /// Moves every player one cell in `direction` and waits for the tick.
    ///
    /// Blocked moves are not errors; they show up as `false` in
    /// [`TurnReport::moved`]. Calling this after the run ended fails without
    /// blocking: with [`ProtocolError::StepAfterEnd`] once a report carried the
    /// result, and with [`ProtocolError::RunEnded`] after a teardown.
    pub fn step(&mut self, direction: Direction) -> Result<TurnReport, ProtocolError> {
        match self.ended {
            Some(Ending::Reported) => return Err(ProtocolError::StepAfterEnd),
            Some(Ending::Disconnected) => return Err(ProtocolError::RunEnded),
            None => {}
        }

        let moves = self
            .snapshot
            .players()
            .iter()
            .zip(0u32..)
            .map(|(origin, id)| PendingMove {
                player: PlayerId::new(id),
                origin: *origin,
                direction,
            })
            .collect();

        if self.intents.send(Intent::Moves(moves)).is_err() {
            self.ended = Some(Ending::Disconnected);
            return Err(ProtocolError::RunEnded);
        }

        match self.reports.recv() {
            Ok(report) => {
                if report.result.is_some() {
                    self.ended = Some(Ending::Reported);
                }
                self.snapshot = report.snapshot.clone();
                Ok(report)
            }
            Err(_) => {
                self.ended = Some(Ending::Disconnected);
                Err(ProtocolError::RunEnded)
            }
        }
    }

    /// Lets one tick pass without moving.
    pub fn wait(&mut self) -> Result<TurnReport, ProtocolError> {
        self.step(Direction::Halt)
    }

    /// Tile next to a player, as of the last completed tick.
    pub fn get_tile(
        &self,
        direction: Direction,
        player_index: usize,
    ) -> Result<Option<&Tile>, ProtocolError> {
        self.snapshot.tile_from(player_index, direction)
    }

    /// Color of the tile next to a player, as of the last completed tick.
    pub fn get_color(
        &self,
        direction: Direction,
        player_index: usize,
    ) -> Result<Option<Color>, ProtocolError> {
        self.snapshot.color_from(player_index, direction)
    }

    /// Player positions in index order.
    #[must_use]
    pub fn players(&self) -> &[CellCoord] {
        self.snapshot.players()
    }

    /// Board state as of the last completed tick.
    #[must_use]
    pub fn snapshot(&self) -> &GridSnapshot {
        &self.snapshot
    }

    /// Reports whether the run has ended from the script's point of view.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended.is_some()
    }

    /// Detaches the script from the run.
    pub fn detach(self) {}
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        if self.ended.is_none() {
            let _ = self.intents.try_send(Intent::Detach);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazegame_core::SnapshotTile;

    fn single_player() -> GridSnapshot {
        GridSnapshot::new(
            1,
            2,
            vec![
                Some(SnapshotTile {
                    tile: Tile::player(),
                    previous: CellCoord::new(0, 0),
                }),
                Some(SnapshotTile {
                    tile: Tile::Wall {
                        color: Some(Color::Green),
                    },
                    previous: CellCoord::new(0, 1),
                }),
            ],
            vec![CellCoord::new(0, 0)],
        )
    }

    #[test]
    fn starts_detached_and_idle() {
        let mut sync = TurnSynchronizer::new();
        assert_eq!(sync.state(), TurnState::Detached);
        assert!(!sync.is_script_alive());
        assert!(sync.await_moves().is_empty());
    }

    #[test]
    fn second_attach_is_rejected() {
        let mut sync = TurnSynchronizer::new();
        let _context = sync.attach(single_player()).expect("first attach");
        assert_eq!(
            sync.attach(single_player()).unwrap_err(),
            ProtocolError::AlreadyAttached
        );
    }

    #[test]
    fn attach_after_end_is_rejected() {
        let mut sync = TurnSynchronizer::new();
        sync.end();
        assert_eq!(
            sync.attach(single_player()).unwrap_err(),
            ProtocolError::RunEnded
        );
    }

    #[test]
    fn queries_read_the_latest_snapshot() {
        let mut sync = TurnSynchronizer::new();
        let context = sync.attach(single_player()).expect("attach");

        assert_eq!(context.get_tile(Direction::Halt, 0), Ok(Some(&Tile::player())));
        assert_eq!(context.get_color(Direction::Right, 0), Ok(Some(Color::Green)));
        assert_eq!(context.get_tile(Direction::Up, 0), Ok(None));
        assert_eq!(
            context.get_color(Direction::Up, 3),
            Err(ProtocolError::UnknownPlayer { index: 3 })
        );
    }

    #[test]
    fn dropping_the_context_ends_the_handshake() {
        let mut sync = TurnSynchronizer::new();
        let context = sync.attach(single_player()).expect("attach");
        context.detach();

        assert!(sync.await_moves().is_empty());
        assert_eq!(sync.state(), TurnState::Ended);
    }
}
