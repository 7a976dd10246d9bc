#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick resolver that drives a maze run against a script actor.

use std::{any::Any, io, thread, time::Duration};

use mazegame_core::{CellCoord, Command, Event, PendingMove, ProtocolError, RunResult};
use mazegame_system_enemies::{self as enemies, EnemyStepper};
use mazegame_system_turns::{ScriptContext, TurnReport, TurnState, TurnSynchronizer};
use mazegame_world::{self as world, query, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Milliseconds between ticks when running at presentation speed.
pub const DEFAULT_TICK_MILLIS: u64 = 500;

/// Parameters shared by every run of a simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Seed for the enemy stepper's random source.
    pub seed: u64,
    /// Pause between ticks. Zero runs headless as fast as the script allows.
    pub tick_interval: Duration,
    /// Tick at which the run stops even without a result.
    pub max_ticks: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MILLIS),
            max_ticks: None,
        }
    }
}

/// Failures that abort a run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The script thread could not be started.
    #[error("failed to spawn the script thread")]
    Spawn(#[source] io::Error),
    /// The script thread panicked.
    #[error("script panicked: {message}")]
    ScriptPanicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The script misused the turn protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Terminal outcome, if the run reached one.
    pub result: Option<RunResult>,
    /// Number of ticks resolved.
    pub ticks: u64,
    /// Player positions after each tick's player moves.
    pub history: Vec<Vec<CellCoord>>,
}

/// Owns the world and alternates turns with the script actor.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: Config,
    stepper: EnemyStepper,
    turns: TurnSynchronizer,
    history: Vec<Vec<CellCoord>>,
}

impl Simulation {
    /// Creates a simulation over an already validated world.
    #[must_use]
    pub fn new(world: World, config: Config) -> Self {
        Self {
            world,
            stepper: EnemyStepper::new(enemies::Config::new(config.seed)),
            config,
            turns: TurnSynchronizer::new(),
            history: Vec::new(),
        }
    }

    /// Attaches the single script actor of this run.
    pub fn attach_script(&mut self) -> Result<ScriptContext, ProtocolError> {
        self.turns.attach(query::snapshot(&self.world))
    }

    /// Resolves one tick, waiting for the attached script's moves first.
    ///
    /// Returns every event the tick produced. Nothing happens once the run
    /// has a result.
    pub fn tick(&mut self) -> Vec<Event> {
        let moves = self.turns.await_moves();
        self.resolve(&moves)
    }

    /// Runs `script` on its own thread until the run is over.
    ///
    /// The loop stops when the run has a result, when `max_ticks` is reached,
    /// or when the script has finished and no further ticks are owed. A
    /// script that returns [`ProtocolError::RunEnded`] because the run
    /// stopped under it is not treated as a failure. Moving again after a
    /// report carried the result surfaces as
    /// [`ProtocolError::StepAfterEnd`].
    pub fn run<F>(&mut self, script: F) -> Result<RunReport, RuntimeError>
    where
        F: FnOnce(ScriptContext) -> Result<(), ProtocolError> + Send + 'static,
    {
        let context = self.attach_script()?;
        let handle = thread::Builder::new()
            .name("script".to_owned())
            .spawn(move || script(context))
            .map_err(RuntimeError::Spawn)?;
        info!(seed = self.config.seed, "run started");

        while query::run_result(&self.world).is_none() && !self.tick_limit_reached() {
            let moves = self.turns.await_moves();
            if !self.turns.is_script_alive() && self.config.max_ticks.is_none() {
                break;
            }
            let _ = self.resolve(&moves);
            if !self.config.tick_interval.is_zero() {
                thread::sleep(self.config.tick_interval);
            }
        }
        self.turns.end();

        let outcome = handle.join();
        let report = RunReport {
            result: query::run_result(&self.world).cloned(),
            ticks: query::tick_index(&self.world),
            history: self.history.clone(),
        };
        match &report.result {
            Some(result) => info!(ticks = report.ticks, %result, "run finished"),
            None => info!(ticks = report.ticks, "run stopped without a result"),
        }

        match outcome {
            Ok(Ok(()) | Err(ProtocolError::RunEnded)) => Ok(report),
            Ok(Err(error)) => Err(error.into()),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "script panicked");
                Err(RuntimeError::ScriptPanicked { message })
            }
        }
    }

    /// Read-only access to the world being simulated.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Player positions recorded after each tick's player moves.
    #[must_use]
    pub fn history(&self) -> &[Vec<CellCoord>] {
        &self.history
    }

    /// Terminal outcome, once set.
    #[must_use]
    pub fn result(&self) -> Option<&RunResult> {
        query::run_result(&self.world)
    }

    fn tick_limit_reached(&self) -> bool {
        self.config
            .max_ticks
            .is_some_and(|max| query::tick_index(&self.world) >= max)
    }

    fn resolve(&mut self, moves: &[PendingMove]) -> Vec<Event> {
        let mut events = Vec::new();
        if query::run_result(&self.world).is_some() {
            return events;
        }

        world::apply(&mut self.world, Command::Tick, &mut events);
        let tick = query::tick_index(&self.world);

        let mut moved = Vec::with_capacity(moves.len());
        for pending in moves {
            if query::run_result(&self.world).is_some() {
                moved.push(false);
                continue;
            }
            moved.push(
                self.world
                    .attempt_move(pending.origin, pending.direction, &mut events),
            );
        }
        self.history.push(query::player_positions(&self.world));

        if query::run_result(&self.world).is_none() {
            let mut commands = Vec::new();
            self.stepper
                .handle(&events, &query::enemy_view(&self.world), &mut commands);
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }
        debug!(tick, events = events.len(), "tick resolved");

        if self.turns.state() == TurnState::WaitingForSim {
            self.turns.complete_turn(TurnReport {
                tick,
                positions: query::player_positions(&self.world),
                moved,
                result: query::run_result(&self.world).cloned(),
                snapshot: query::snapshot(&self.world),
            });
        }
        if query::run_result(&self.world).is_some() {
            self.turns.end();
        }

        events
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazegame_core::Tile;

    #[test]
    fn default_config_matches_presentation_speed() {
        let config = Config::default();
        assert_eq!(config.tick_interval, Duration::from_millis(500));
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn detached_ticks_only_move_enemies() {
        let world = World::new(vec![vec![Some(Tile::player()), None]], 0).expect("layout");
        let mut simulation = Simulation::new(world, Config::default());

        let events = simulation.tick();
        assert_eq!(events, vec![Event::TimeAdvanced { tick: 1 }]);
        assert_eq!(simulation.history(), &[vec![CellCoord::new(0, 0)]]);
    }

    #[test]
    fn panic_payloads_render_as_text() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&3_u8), "unknown panic");
    }
}
