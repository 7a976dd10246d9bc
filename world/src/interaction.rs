//! Reaction rules applied when a mover tries to enter a cell.
//!
//! Only the target tile decides what happens. The mover's role is passed in
//! so targets can ignore enemies.

use std::collections::BTreeMap;

use mazegame_core::{Color, Tile};

/// Role of the tile attempting to relocate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mover {
    /// A scripted player.
    Player,
    /// An enemy taking its scheduled step.
    Enemy,
}

impl Mover {
    /// Role played by the tile, if it is able to move at all.
    #[must_use]
    pub fn of(tile: &Tile) -> Option<Self> {
        match tile {
            Tile::Player(_) => Some(Self::Player),
            Tile::Enemy(_) => Some(Self::Enemy),
            _ => None,
        }
    }
}

/// Outcome of entering a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    /// The target cannot be entered by this mover; nothing changes.
    Blocked,
    /// The mover takes the cell without side effects.
    Occupy,
    /// The mover takes the cell, consuming a key and opening matching doors.
    CollectKey(Color),
    /// The mover takes the cell, passing through a satisfied lock.
    Unlock(Color),
    /// The mover takes the cell and the run is won.
    Win,
    /// The mover takes the cell and the run is lost to a hazard.
    Hazard,
    /// The mover stays put and the run is lost to an enemy collision.
    Collide,
}

/// Keys collected so far, counted per color.
#[derive(Clone, Debug, Default)]
pub struct KeyRing {
    counts: BTreeMap<Color, u32>,
}

impl KeyRing {
    /// Number of keys of the provided color collected so far.
    #[must_use]
    pub fn count(&self, color: Color) -> u32 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub(crate) fn collect(&mut self, color: Color) {
        *self.counts.entry(color).or_insert(0) += 1;
    }
}

/// Decides how `target` reacts to `mover` trying to enter it.
///
/// Enemies only walk onto open ground or into players; keys, spikes, exits
/// and locks stay where they are.
#[must_use]
pub fn entry(target: Option<&Tile>, mover: Mover, keys: &KeyRing) -> Entry {
    let Some(target) = target else {
        return Entry::Occupy;
    };

    match (target, mover) {
        (Tile::Floor | Tile::ColoredFloor { .. } | Tile::DoorFrame, _) => Entry::Occupy,
        (Tile::Key { color }, Mover::Player) => Entry::CollectKey(*color),
        (Tile::Lock { color, rule }, Mover::Player) if rule.is_satisfied(keys.count(*color)) => {
            Entry::Unlock(*color)
        }
        (Tile::Spike, Mover::Player) => Entry::Hazard,
        (Tile::Exit, Mover::Player) => Entry::Win,
        (Tile::Enemy(_), Mover::Player) | (Tile::Player(_), Mover::Enemy) => Entry::Collide,
        _ => Entry::Blocked,
    }
}
