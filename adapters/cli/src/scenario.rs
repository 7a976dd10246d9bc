use std::collections::{BTreeMap, VecDeque};

use mazegame_core::{Color, Direction, Enemy, LockRule, MalformedMapError, Tile};
use mazegame_world::World;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

/// Layout symbols with a fixed meaning; anything else comes from the legend.
const BUILTIN_SYMBOLS: [char; 6] = ['X', 'E', ' ', '.', 'S', 'P'];

/// Maze description loaded from a TOML scenario file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Name printed before the run.
    pub(crate) title: String,
    /// Hints shown by `preview`.
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// Seed used when none is given on the command line.
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    /// One string per row, one symbol per cell. Empty when variants are used.
    #[serde(default)]
    layout: Vec<String>,
    /// Tiles for custom symbols, consumed left to right, top to bottom.
    #[serde(default)]
    legend: BTreeMap<String, Vec<LegendTile>>,
    /// Alternative layouts; one is picked per run.
    #[serde(default, rename = "variant")]
    variants: Vec<Variant>,
    /// Directions the script submits, one per tick.
    #[serde(default)]
    script: Vec<Segment>,
}

/// One alternative layout. Its legend entries replace top-level entries with the same symbol.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Variant {
    layout: Vec<String>,
    #[serde(default)]
    legend: BTreeMap<String, Vec<LegendTile>>,
}

/// Tile description used by legend entries.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LegendTile {
    Wall {
        #[serde(default)]
        color: Option<Color>,
    },
    Floor,
    ColoredFloor {
        color: Color,
    },
    Door {
        color: Color,
        #[serde(default)]
        open: bool,
    },
    DoorFrame,
    Key {
        color: Color,
    },
    Lock {
        color: Color,
        #[serde(default)]
        keys: Option<u32>,
    },
    Spike,
    Exit,
    Player,
    Enemy {
        path: Vec<Segment>,
        #[serde(default = "certain")]
        chance: f64,
    },
}

fn certain() -> f64 {
    1.0
}

impl LegendTile {
    fn into_tile(self) -> Tile {
        match self {
            Self::Wall { color } => Tile::Wall { color },
            Self::Floor => Tile::Floor,
            Self::ColoredFloor { color } => Tile::ColoredFloor { color },
            Self::Door { open: true, .. } | Self::DoorFrame => Tile::DoorFrame,
            Self::Door { color, open: false } => Tile::door(color),
            Self::Key { color } => Tile::Key { color },
            Self::Lock { color, keys } => Tile::Lock {
                color,
                rule: keys.map_or(LockRule::Open, LockRule::KeysOfColor),
            },
            Self::Spike => Tile::Spike,
            Self::Exit => Tile::Exit,
            Self::Player => Tile::player(),
            Self::Enemy { path, chance } => Tile::Enemy(Enemy::with_chance(expand(&path), chance)),
        }
    }
}

/// A direction, optionally repeated: `"up"` or `{ direction = "up", times = 10 }`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
enum Segment {
    Single(Direction),
    Repeated { direction: Direction, times: usize },
}

fn expand(segments: &[Segment]) -> Vec<Direction> {
    segments
        .iter()
        .flat_map(|segment| match *segment {
            Segment::Single(direction) => std::iter::repeat(direction).take(1),
            Segment::Repeated { direction, times } => std::iter::repeat(direction).take(times),
        })
        .collect()
}

/// Errors raised while turning a scenario file into a world.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The file was not valid scenario TOML.
    #[error("could not parse scenario")]
    Parse(#[from] toml::de::Error),
    /// A legend key was not a single character.
    #[error("legend key {key:?} must be a single character")]
    LegendKey {
        /// Offending key.
        key: String,
    },
    /// A legend key shadowed a built-in layout symbol.
    #[error("legend key {symbol:?} is a built-in layout symbol")]
    ReservedSymbol {
        /// Offending symbol.
        symbol: char,
    },
    /// The layout used a symbol without a legend entry.
    #[error("unknown symbol {symbol:?} at row {row}, column {column}")]
    UnknownSymbol {
        /// Offending symbol.
        symbol: char,
        /// Row of the symbol.
        row: usize,
        /// Column of the symbol.
        column: usize,
    },
    /// The layout used a symbol more often than its legend entry allows.
    #[error("legend entry {symbol:?} ran out of tiles")]
    LegendExhausted {
        /// Offending symbol.
        symbol: char,
    },
    /// Legend tiles were left over after the layout was read.
    #[error("unused items in legend entry {symbol:?} ({remaining} left unused)")]
    UnusedLegend {
        /// Symbol with leftovers.
        symbol: char,
        /// Number of unused tiles.
        remaining: usize,
    },
    /// Neither a layout nor any variant was given.
    #[error("scenario needs a layout or at least one variant")]
    NoLayout,
    /// Both a top-level layout and variants were given.
    #[error("scenario sets both a layout and variants")]
    LayoutAndVariants,
    /// A variant index past the last variant was requested.
    #[error("variant {index} does not exist ({count} available)")]
    UnknownVariant {
        /// Requested index.
        index: usize,
        /// Number of layouts in the scenario.
        count: usize,
    },
    /// The layout was not a non-empty rectangle.
    #[error(transparent)]
    Malformed(#[from] MalformedMapError),
}

impl Scenario {
    /// Parses a scenario from TOML source.
    pub(crate) fn parse(source: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(source)?;
        match (scenario.layout.is_empty(), scenario.variants.is_empty()) {
            (true, true) => Err(ScenarioError::NoLayout),
            (false, false) => Err(ScenarioError::LayoutAndVariants),
            _ => Ok(scenario),
        }
    }

    /// Number of layouts the scenario can be played on.
    pub(crate) fn variant_count(&self) -> usize {
        self.variants.len().max(1)
    }

    /// Picks the layout for a run from the seed.
    pub(crate) fn choose_variant(&self, seed: u64) -> usize {
        match self.variant_count() {
            1 => 0,
            count => ChaCha8Rng::seed_from_u64(seed).gen_range(0..count),
        }
    }

    /// Resolves one layout into rows of initial placements.
    pub(crate) fn rows(&self, variant: usize) -> Result<Vec<Vec<Option<Tile>>>, ScenarioError> {
        let (layout, legend) = self.layout_of(variant)?;

        let mut queues = BTreeMap::new();
        for (key, tiles) in legend {
            let mut chars = key.chars();
            let (Some(symbol), None) = (chars.next(), chars.next()) else {
                return Err(ScenarioError::LegendKey { key: key.clone() });
            };
            if BUILTIN_SYMBOLS.contains(&symbol) {
                return Err(ScenarioError::ReservedSymbol { symbol });
            }
            let queue: VecDeque<Tile> = tiles.iter().cloned().map(LegendTile::into_tile).collect();
            let _ = queues.insert(symbol, queue);
        }

        let mut rows = Vec::with_capacity(layout.len());
        for (row, line) in layout.iter().enumerate() {
            let mut cells = Vec::with_capacity(line.len());
            for (column, symbol) in line.chars().enumerate() {
                let tile = match symbol {
                    'X' => Some(Tile::wall()),
                    'E' => Some(Tile::Exit),
                    ' ' => None,
                    '.' => Some(Tile::Floor),
                    'S' => Some(Tile::Spike),
                    'P' => Some(Tile::player()),
                    other => {
                        let queue = queues.get_mut(&other).ok_or(ScenarioError::UnknownSymbol {
                            symbol: other,
                            row,
                            column,
                        })?;
                        Some(
                            queue
                                .pop_front()
                                .ok_or(ScenarioError::LegendExhausted { symbol: other })?,
                        )
                    }
                };
                cells.push(tile);
            }
            rows.push(cells);
        }

        if let Some((symbol, queue)) = queues.iter().find(|(_, queue)| !queue.is_empty()) {
            return Err(ScenarioError::UnusedLegend {
                symbol: *symbol,
                remaining: queue.len(),
            });
        }
        Ok(rows)
    }

    /// Builds the world for one layout of the scenario.
    pub(crate) fn world(&self, variant: usize, seed: u64) -> Result<World, ScenarioError> {
        Ok(World::new(self.rows(variant)?, seed)?)
    }

    /// Directions the script submits, with repeats expanded.
    pub(crate) fn script(&self) -> Vec<Direction> {
        expand(&self.script)
    }

    fn layout_of(
        &self,
        variant: usize,
    ) -> Result<(&[String], BTreeMap<&String, &Vec<LegendTile>>), ScenarioError> {
        let mut legend: BTreeMap<_, _> = self.legend.iter().collect();
        if self.variants.is_empty() && variant == 0 {
            return Ok((self.layout.as_slice(), legend));
        }
        let chosen = self
            .variants
            .get(variant)
            .ok_or(ScenarioError::UnknownVariant {
                index: variant,
                count: self.variant_count(),
            })?;
        legend.extend(chosen.legend.iter());
        Ok((chosen.layout.as_slice(), legend))
    }
}
