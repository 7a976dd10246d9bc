//! Dense rectangular tile grid that owns occupant placement.

use mazegame_core::{CellCoord, MalformedMapError, Tile, TileKind};

#[derive(Clone, Debug)]
struct Placement {
    tile: Tile,
    previous: CellCoord,
}

/// Rectangular matrix of cells, each holding at most one tile.
///
/// The grid is the only authority on where a tile is. Out-of-bounds lookups
/// report "no tile" rather than failing.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: u32,
    columns: u32,
    cells: Vec<Option<Placement>>,
}

impl Grid {
    /// Builds a grid from row-major tile placements.
    ///
    /// Every row must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<Option<Tile>>>) -> Result<Self, MalformedMapError> {
        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(MalformedMapError::Empty);
        }
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(MalformedMapError::Ragged {
                row,
                expected,
                found,
            });
        }

        let row_count = u32::try_from(rows.len()).map_err(|_| MalformedMapError::Empty)?;
        let column_count = u32::try_from(expected).map_err(|_| MalformedMapError::Empty)?;
        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (row, tiles) in (0..row_count).zip(rows) {
            for (column, tile) in (0..column_count).zip(tiles) {
                cells.push(tile.map(|tile| Placement {
                    tile,
                    previous: CellCoord::new(row, column),
                }));
            }
        }

        Ok(Self {
            rows: row_count,
            columns: column_count,
            cells,
        })
    }

    /// Provides the `(rows, columns)` dimensions of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Returns the occupant of the cell, if any.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<&Tile> {
        self.placement(cell).map(|placement| &placement.tile)
    }

    pub(crate) fn get_mut(&mut self, cell: CellCoord) -> Option<&mut Tile> {
        let index = self.index(cell)?;
        self.cells[index]
            .as_mut()
            .map(|placement| &mut placement.tile)
    }

    /// Cell the occupant of `cell` held before its last move.
    ///
    /// Only presentation layers care about this; tiles that never moved report
    /// their own cell.
    #[must_use]
    pub fn previous_position(&self, cell: CellCoord) -> Option<CellCoord> {
        self.placement(cell).map(|placement| placement.previous)
    }

    /// Places a tile, returning whatever the cell held before.
    ///
    /// A cell outside the grid cannot hold anything, so the provided tile is
    /// handed straight back.
    pub fn place(&mut self, cell: CellCoord, tile: Tile) -> Option<Tile> {
        let Some(index) = self.index(cell) else {
            return Some(tile);
        };
        self.cells[index]
            .replace(Placement {
                tile,
                previous: cell,
            })
            .map(|placement| placement.tile)
    }

    /// Removes and returns the occupant of the cell.
    ///
    /// A door never leaves its cell empty: the tile stored beneath it takes
    /// its place.
    pub fn remove(&mut self, cell: CellCoord) -> Option<Tile> {
        let index = self.index(cell)?;
        let removed = self.cells[index].take()?.tile;
        if let Tile::Door { under, .. } = &removed {
            self.cells[index] = Some(Placement {
                tile: (**under).clone(),
                previous: cell,
            });
        }
        Some(removed)
    }

    /// Moves the occupant of `from` into `to`, returning the tile it displaced.
    ///
    /// `from` is left empty. Nothing changes when `from` is empty or either
    /// cell lies outside the grid.
    pub(crate) fn relocate(&mut self, from: CellCoord, to: CellCoord) -> Option<Tile> {
        let from_index = self.index(from)?;
        let to_index = self.index(to)?;
        let moving = self.cells[from_index].take()?;
        self.cells[to_index]
            .replace(Placement {
                tile: moving.tile,
                previous: from,
            })
            .map(|placement| placement.tile)
    }

    /// Every tile of the provided kind in row-major scan order.
    #[must_use]
    pub fn find_all(&self, kind: TileKind) -> Vec<(CellCoord, &Tile)> {
        self.iter().filter(|(_, tile)| tile.kind() == kind).collect()
    }

    /// Iterates over occupied cells in row-major scan order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Tile)> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .zip(0u32..)
            .filter_map(move |(placement, index)| {
                placement.as_ref().map(|placement| {
                    (
                        CellCoord::new(index / columns, index % columns),
                        &placement.tile,
                    )
                })
            })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> + '_ {
        self.cells
            .iter_mut()
            .filter_map(|placement| placement.as_mut().map(|placement| &mut placement.tile))
    }

    fn placement(&self, cell: CellCoord) -> Option<&Placement> {
        let index = self.index(cell)?;
        self.cells.get(index).and_then(Option::as_ref)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
