#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded stepping system that decides which enemies move each tick.

use mazegame_core::{Command, EnemyView, Event};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Configuration parameters required to construct the enemy stepper.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that emits one step command per enemy for every tick.
///
/// Each enemy draws a uniform sample in `[0, 1)`; it attempts to move only
/// when the sample is below its move chance. A command is emitted either way
/// so the world advances the enemy's path index on every tick.
#[derive(Debug)]
pub struct EnemyStepper {
    rng: ChaCha8Rng,
}

impl EnemyStepper {
    /// Creates a new stepper using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes world events and the enemy view to emit step commands.
    ///
    /// Nothing is emitted unless the events contain a tick. Commands follow
    /// the view's row-major order.
    pub fn handle(&mut self, events: &[Event], enemies: &EnemyView, out: &mut Vec<Command>) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        out.reserve(enemies.len());
        for enemy in enemies.iter() {
            let sample: f64 = self.rng.gen();
            let permitted = sample < enemy.chance_to_move;
            trace!(enemy = enemy.id.get(), sample, permitted, "enemy step drawn");
            out.push(Command::StepEnemy {
                enemy: enemy.id,
                permitted,
            });
        }
    }
}

impl Default for EnemyStepper {
    fn default() -> Self {
        Self::new(Config::new(0))
    }
}
