//! Text preview of enemy patrols.

use std::fmt::Write as _;

use mazegame_core::{Direction, EnemyView};

/// Describes a path with consecutive repeats grouped, e.g. `up x10, down x10`.
pub(crate) fn describe_path(path: &[Direction]) -> String {
    let mut groups: Vec<(Direction, usize)> = Vec::new();
    for direction in path {
        match groups.last_mut() {
            Some((last, count)) if last == direction => *count += 1,
            _ => groups.push((*direction, 1)),
        }
    }

    groups
        .iter()
        .map(|(direction, count)| {
            if *count == 1 {
                direction.name().to_owned()
            } else {
                format!("{} x{count}", direction.name())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per enemy with its cell, grouped path and move chance.
pub(crate) fn render(enemies: &EnemyView) -> String {
    let mut out = String::new();
    for enemy in enemies.iter() {
        let path = if enemy.path.is_empty() {
            "stays put".to_owned()
        } else {
            describe_path(&enemy.path)
        };
        let _ = writeln!(
            out,
            "enemy {} at {}: {} (moves {:.0}% of ticks)",
            enemy.id.get(),
            enemy.cell,
            path,
            enemy.chance_to_move * 100.0
        );
    }
    out
}
