#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the maze game engine.
//!
//! This crate defines the vocabulary that connects the script actor, the
//! authoritative world, and the pure systems. The tick resolver submits
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. The script actor never touches
//! the world: it submits [`PendingMove`] batches and reads [`GridSnapshot`]
//! copies handed back after each completed tick.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Returns the neighbouring cell in the provided direction.
    ///
    /// Yields `None` when the step would leave the grid through row or column
    /// zero. The far edges are unknown here and are checked by the grid.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (row_delta, column_delta) = direction.delta();
        let row = self.row.checked_add_signed(row_delta)?;
        let column = self.column.checked_add_signed(column_delta)?;
        Some(Self::new(row, column))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Movement directions available to players and enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
    /// Zero-length move that consumes a turn.
    Halt,
}

impl Direction {
    /// Row and column delta applied by a step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
            Self::Halt => (0, 0),
        }
    }

    /// Lowercase name used by scenario files and previews.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Halt => "halt",
        }
    }
}

/// Color identity shared by doors, keys, locks, colored floors and walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
        };
        f.write_str(name)
    }
}

/// Unique identifier assigned to a player.
///
/// Identifiers follow row-major order of the initial layout, so player `0` is
/// the default actor for single-argument queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Cyclic, probabilistic walker placed on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Identifier assigned by the world when the map is loaded.
    pub id: EnemyId,
    /// Ordered cycle of intended directions.
    pub path: Vec<Direction>,
    /// Probability in `[0, 1]` that the enemy attempts its step on a tick.
    pub chance_to_move: f64,
    /// Position within `path` consulted on the next tick.
    pub index: usize,
}

impl Enemy {
    /// Creates an enemy that always attempts to move.
    #[must_use]
    pub fn new(path: Vec<Direction>) -> Self {
        Self::with_chance(path, 1.0)
    }

    /// Creates an enemy that attempts to move with the provided probability.
    #[must_use]
    pub fn with_chance(path: Vec<Direction>, chance_to_move: f64) -> Self {
        Self {
            id: EnemyId::new(0),
            path,
            chance_to_move,
            index: 0,
        }
    }

    /// Direction the enemy intends to take on its next step, if it has a path.
    #[must_use]
    pub fn next_direction(&self) -> Option<Direction> {
        self.path.get(self.index).copied()
    }

    /// Advances the cyclic path index by one.
    pub fn advance(&mut self) {
        if !self.path.is_empty() {
            self.index = (self.index + 1) % self.path.len();
        }
    }
}

/// Predicate a player must satisfy to pass through a lock.
///
/// Locks never let enemies through, whatever the rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockRule {
    /// Any player may pass.
    #[default]
    Open,
    /// At least one key of the lock's color has been collected.
    KeyOfColor,
    /// At least the given number of keys of the lock's color have been collected.
    KeysOfColor(u32),
}

impl LockRule {
    /// Reports whether the rule holds for the number of keys collected so far.
    #[must_use]
    pub const fn is_satisfied(self, collected: u32) -> bool {
        match self {
            Self::Open => true,
            Self::KeyOfColor => collected >= 1,
            Self::KeysOfColor(required) => collected >= required,
        }
    }
}

/// Every kind of tile that can occupy a grid cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    /// Impassable block, optionally carrying a color.
    Wall {
        /// Color reported to scripts, if any.
        color: Option<Color>,
    },
    /// Plain floor marker.
    Floor,
    /// Floor marker carrying a color readable by scripts.
    ColoredFloor {
        /// Color reported to scripts.
        color: Color,
    },
    /// A scripted player.
    Player(PlayerId),
    /// Closed door, impassable until a key of the same color is collected.
    Door {
        /// Color shared with the key that opens the door.
        color: Color,
        /// Tile revealed when the door opens.
        under: Box<Tile>,
    },
    /// Open passage left behind by a door.
    DoorFrame,
    /// Key that opens every door of its color when collected by a player.
    Key {
        /// Color of the doors opened by the key.
        color: Color,
    },
    /// Lock passable only by players satisfying its rule.
    Lock {
        /// Color of the keys counted by the rule.
        color: Color,
        /// Condition required to pass.
        #[serde(default)]
        rule: LockRule,
    },
    /// Hazard that ends the run when a player enters it.
    Spike,
    /// Goal that wins the run when a player enters it.
    Exit,
    /// A wandering enemy.
    Enemy(Enemy),
}

impl Tile {
    /// Creates an uncolored wall.
    #[must_use]
    pub const fn wall() -> Self {
        Self::Wall { color: None }
    }

    /// Creates a player placeholder; the world assigns the identifier on load.
    #[must_use]
    pub const fn player() -> Self {
        Self::Player(PlayerId::new(0))
    }

    /// Creates a closed door of the provided color standing over a door frame.
    #[must_use]
    pub fn door(color: Color) -> Self {
        Self::Door {
            color,
            under: Box::new(Self::DoorFrame),
        }
    }

    /// Creates a lock of the provided color using the default rule.
    #[must_use]
    pub fn lock(color: Color) -> Self {
        Self::Lock {
            color,
            rule: LockRule::default(),
        }
    }

    /// Fieldless discriminant of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        match self {
            Self::Wall { .. } => TileKind::Wall,
            Self::Floor => TileKind::Floor,
            Self::ColoredFloor { .. } => TileKind::ColoredFloor,
            Self::Player(_) => TileKind::Player,
            Self::Door { .. } => TileKind::Door,
            Self::DoorFrame => TileKind::DoorFrame,
            Self::Key { .. } => TileKind::Key,
            Self::Lock { .. } => TileKind::Lock,
            Self::Spike => TileKind::Spike,
            Self::Exit => TileKind::Exit,
            Self::Enemy(_) => TileKind::Enemy,
        }
    }

    /// Color carried by the tile, if it has one.
    #[must_use]
    pub const fn color(&self) -> Option<Color> {
        match self {
            Self::Wall { color } => *color,
            Self::ColoredFloor { color }
            | Self::Door { color, .. }
            | Self::Key { color }
            | Self::Lock { color, .. } => Some(*color),
            _ => None,
        }
    }

    /// Single character used by text renderings of the board.
    #[must_use]
    pub const fn symbol(&self) -> char {
        match self {
            Self::Wall { color: None } => 'X',
            Self::Wall { color: Some(_) } => 'x',
            Self::Floor => '.',
            Self::ColoredFloor { .. } => '~',
            Self::Player(_) => 'P',
            Self::Door { .. } => 'D',
            Self::DoorFrame => '_',
            Self::Key { .. } => 'K',
            Self::Lock { .. } => 'L',
            Self::Spike => 'S',
            Self::Exit => 'E',
            Self::Enemy(_) => 'M',
        }
    }
}

/// Fieldless discriminant of [`Tile`], used for lookups and events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// See [`Tile::Wall`].
    Wall,
    /// See [`Tile::Floor`].
    Floor,
    /// See [`Tile::ColoredFloor`].
    ColoredFloor,
    /// See [`Tile::Player`].
    Player,
    /// See [`Tile::Door`].
    Door,
    /// See [`Tile::DoorFrame`].
    DoorFrame,
    /// See [`Tile::Key`].
    Key,
    /// See [`Tile::Lock`].
    Lock,
    /// See [`Tile::Spike`].
    Spike,
    /// See [`Tile::Exit`].
    Exit,
    /// See [`Tile::Enemy`].
    Enemy,
}

/// Reason a run was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    /// A player stepped onto a spike.
    HazardContact,
    /// A player and an enemy met.
    EnemyCollision,
}

impl LossCause {
    /// Human readable reason string.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::HazardContact => "hazard contact",
            Self::EnemyCollision => "enemy collision",
        }
    }
}

/// Terminal outcome of a run. Set at most once.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    /// A player reached an exit.
    Won,
    /// A player died.
    Lost {
        /// What ended the run.
        cause: LossCause,
        /// Flavor message shown alongside the reason.
        flavor: String,
    },
}

impl RunResult {
    /// Short reason string suitable for presentation.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Won => "exit reached",
            Self::Lost { cause, .. } => cause.reason(),
        }
    }

    /// Flavor text attached to the outcome, if any.
    #[must_use]
    pub fn flavor(&self) -> Option<&str> {
        match self {
            Self::Won => None,
            Self::Lost { flavor, .. } => Some(flavor),
        }
    }

    /// Reports whether the run was won.
    #[must_use]
    pub const fn is_won(&self) -> bool {
        matches!(self, Self::Won)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won => write!(f, "won: {}", self.reason()),
            Self::Lost { cause, flavor } => write!(f, "lost: {} ({flavor})", cause.reason()),
        }
    }
}

/// Move requested by the script actor and consumed once by the tick resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingMove {
    /// Player the move belongs to.
    pub player: PlayerId,
    /// Cell the player occupied when the move was requested.
    pub origin: CellCoord,
    /// Requested direction.
    pub direction: Direction,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by one tick.
    Tick,
    /// Attempts to move whatever tile occupies `origin` one step.
    MoveTile {
        /// Cell holding the mover.
        origin: CellCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// Runs one scheduled enemy step.
    StepEnemy {
        /// Enemy to step.
        enemy: EnemyId,
        /// Whether the probabilistic check allowed movement this tick.
        permitted: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that started.
        tick: u64,
    },
    /// Confirms that a tile moved between two cells.
    TileMoved {
        /// Kind of the tile that moved.
        kind: TileKind,
        /// Cell the tile occupied before moving.
        from: CellCoord,
        /// Cell the tile occupies after moving.
        to: CellCoord,
    },
    /// Reports that a move attempt left the world unchanged.
    MoveRejected {
        /// Cell the attempt started from.
        origin: CellCoord,
        /// Requested direction.
        direction: Direction,
    },
    /// A player picked up a key.
    KeyCollected {
        /// Color of the key.
        color: Color,
        /// Cell the key occupied.
        cell: CellCoord,
    },
    /// A door was replaced by its under-layer.
    DoorOpened {
        /// Color of the door.
        color: Color,
        /// Cell of the door.
        cell: CellCoord,
    },
    /// A player passed through a lock.
    LockOpened {
        /// Color of the lock.
        color: Color,
        /// Cell of the lock.
        cell: CellCoord,
    },
    /// An enemy's path index moved on.
    EnemyPathAdvanced {
        /// Enemy whose path advanced.
        enemy: EnemyId,
        /// Index consulted on the next tick.
        index: usize,
    },
    /// The run reached its terminal outcome.
    RunEnded {
        /// Outcome of the run.
        result: RunResult,
    },
}

/// Immutable representation of a single enemy used by systems and previews.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier assigned to the enemy.
    pub id: EnemyId,
    /// Cell currently occupied by the enemy.
    pub cell: CellCoord,
    /// Cyclic path followed by the enemy.
    pub path: Vec<Direction>,
    /// Probability that the enemy attempts its step on a tick.
    pub chance_to_move: f64,
    /// Path index consulted on the next tick.
    pub index: usize,
}

/// Read-only snapshot of every enemy in row-major scan order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new view; snapshots must already be in row-major order.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<EnemySnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// A tile captured in a [`GridSnapshot`] together with its previous position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTile {
    /// Captured tile.
    pub tile: Tile,
    /// Cell the tile occupied before its last move, used for interpolation.
    pub previous: CellCoord,
}

/// Read-only copy of the board handed to scripts and presentation layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    rows: u32,
    columns: u32,
    cells: Vec<Option<SnapshotTile>>,
    players: Vec<CellCoord>,
}

impl GridSnapshot {
    /// Builds a snapshot from row-major cells and player positions in index order.
    #[must_use]
    pub fn new(
        rows: u32,
        columns: u32,
        cells: Vec<Option<SnapshotTile>>,
        players: Vec<CellCoord>,
    ) -> Self {
        Self {
            rows,
            columns,
            cells,
            players,
        }
    }

    /// Provides the `(rows, columns)` dimensions of the board.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    /// Positions of every player in index order.
    #[must_use]
    pub fn players(&self) -> &[CellCoord] {
        &self.players
    }

    /// Returns the tile at the provided cell. Out-of-bounds cells hold no tile.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<&Tile> {
        self.entry(cell).map(|entry| &entry.tile)
    }

    /// Cell the tile at `cell` occupied before its last move.
    #[must_use]
    pub fn previous_position(&self, cell: CellCoord) -> Option<CellCoord> {
        self.entry(cell).map(|entry| entry.previous)
    }

    /// Tile next to a player in the given direction; `Halt` looks at the
    /// player's own cell.
    pub fn tile_from(
        &self,
        player_index: usize,
        direction: Direction,
    ) -> Result<Option<&Tile>, ProtocolError> {
        let origin = self
            .players
            .get(player_index)
            .copied()
            .ok_or(ProtocolError::UnknownPlayer {
                index: player_index,
            })?;
        Ok(origin.step(direction).and_then(|cell| self.tile(cell)))
    }

    /// Color of the tile next to a player, or `None` when it has none.
    pub fn color_from(
        &self,
        player_index: usize,
        direction: Direction,
    ) -> Result<Option<Color>, ProtocolError> {
        Ok(self
            .tile_from(player_index, direction)?
            .and_then(Tile::color))
    }

    fn entry(&self, cell: CellCoord) -> Option<&SnapshotTile> {
        if cell.row() >= self.rows || cell.column() >= self.columns {
            return None;
        }
        let index = usize::try_from(cell.row()).ok()? * usize::try_from(self.columns).ok()?
            + usize::try_from(cell.column()).ok()?;
        self.cells.get(index).and_then(Option::as_ref)
    }
}

impl fmt::Display for GridSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for column in 0..self.columns {
                let symbol = self
                    .tile(CellCoord::new(row, column))
                    .map_or(' ', Tile::symbol);
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Reasons an initial layout is rejected before a run starts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedMapError {
    /// The layout had no rows or no columns.
    #[error("map has no cells")]
    Empty,
    /// A row's length differed from the first row's.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
}

/// Misuse of the script-facing protocol. These indicate caller bugs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A second script actor tried to attach to the same run.
    #[error("a script is already attached to this run")]
    AlreadyAttached,
    /// The run stopped before the script's move could be resolved.
    #[error("the run has ended")]
    RunEnded,
    /// The script moved again after a turn report already carried the result.
    #[error("a move was submitted after the run's result was reported")]
    StepAfterEnd,
    /// A query named a player that does not exist.
    #[error("no player with index {index}")]
    UnknownPlayer {
        /// Requested player index.
        index: usize,
    },
}
