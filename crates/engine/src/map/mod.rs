//! Immutable board description: cell kinds, regions, hallway markers and
//! the corner-wall flags used to keep pursuers from cutting wall corners.

mod graph;
mod spawn;

use thiserror::Error;

pub use graph::{GraphNode, GridGraph, WallSides};
pub use spawn::{plan_spawns, SpawnPlan};

/// Number of spawn regions a board is split into.
pub const REGION_COUNT: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// World-space center of the cell. Columns run along X, rows along Z.
    pub fn center(self) -> (f32, f32) {
        (self.col as f32 + 0.5, self.row as f32 + 0.5)
    }

    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.row
            .abs_diff(other.row)
            .max(self.col.abs_diff(other.col))
    }

    pub fn is_diagonal_to(self, other: CellCoord) -> bool {
        self.row != other.row && self.col != other.col
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Open,
    Wall,
    Obstacle,
    Exit,
}

impl CellKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, CellKind::Open | CellKind::Exit)
    }
}

/// Which diagonal neighbours of a cell are walls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CornerWalls {
    pub north_east: bool,
    pub north_west: bool,
    pub south_west: bool,
    pub south_east: bool,
}

impl CornerWalls {
    pub fn any(self) -> bool {
        self.north_east || self.north_west || self.south_west || self.south_east
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    pub hallway: bool,
    pub region: u8,
    pub movement_cost: u32,
    pub corners: CornerWalls,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board dimensions must be non-zero (got {width}x{height})")]
    EmptyBoard { width: u32, height: u32 },
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("map row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("unknown map glyph {glyph:?} at row {row}, col {col}")]
    UnknownGlyph { glyph: char, row: usize, col: usize },
    #[error("map declares more than one avatar spawn (second at row {row}, col {col})")]
    DuplicateSpawn { row: usize, col: usize },
    #[error("map has no walkable cell for the avatar")]
    NoWalkableCell,
}

/// Rectangular grid of cells plus the avatar's start cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    avatar_spawn: CellCoord,
}

impl Board {
    /// Builds a board from raw cell kinds in row-major order. Regions are
    /// assigned by quadrant and corner flags derived from diagonal walls.
    pub fn new(width: u32, height: u32, kinds: Vec<CellKind>) -> Result<Self, BoardError> {
        let hallways = vec![false; kinds.len()];
        Self::build(width, height, kinds, hallways, None)
    }

    /// Parses an ASCII map: `#` wall, `o` obstacle, `E` exit, `.` open,
    /// `h` open hallway, `@` open avatar spawn. Blank lines are ignored.
    pub fn from_ascii(text: &str) -> Result<Self, BoardError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);

        let mut kinds = Vec::with_capacity(width * rows.len());
        let mut hallways = Vec::with_capacity(width * rows.len());
        let mut spawn = None;
        for (row, line) in rows.iter().enumerate() {
            let actual = line.chars().count();
            if actual != width {
                return Err(BoardError::RaggedRow {
                    row,
                    expected: width,
                    actual,
                });
            }
            for (col, glyph) in line.chars().enumerate() {
                let (kind, hallway) = match glyph {
                    '#' => (CellKind::Wall, false),
                    'o' => (CellKind::Obstacle, false),
                    'E' => (CellKind::Exit, false),
                    '.' => (CellKind::Open, false),
                    'h' => (CellKind::Open, true),
                    '@' => {
                        if spawn.is_some() {
                            return Err(BoardError::DuplicateSpawn { row, col });
                        }
                        spawn = Some(CellCoord::new(row as u32, col as u32));
                        (CellKind::Open, false)
                    }
                    glyph => return Err(BoardError::UnknownGlyph { glyph, row, col }),
                };
                kinds.push(kind);
                hallways.push(hallway);
            }
        }

        Self::build(width as u32, rows.len() as u32, kinds, hallways, spawn)
    }

    fn build(
        width: u32,
        height: u32,
        kinds: Vec<CellKind>,
        hallways: Vec<bool>,
        avatar_spawn: Option<CellCoord>,
    ) -> Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::EmptyBoard { width, height });
        }
        let expected = width as usize * height as usize;
        if kinds.len() != expected {
            return Err(BoardError::CellCountMismatch {
                expected,
                actual: kinds.len(),
            });
        }

        let is_wall = |row: i64, col: i64| -> bool {
            if row < 0 || col < 0 || row >= height as i64 || col >= width as i64 {
                return false;
            }
            kinds[row as usize * width as usize + col as usize] == CellKind::Wall
        };

        let mut cells = Vec::with_capacity(expected);
        for (index, kind) in kinds.iter().enumerate() {
            let row = (index / width as usize) as u32;
            let col = (index % width as usize) as u32;
            let (r, c) = (row as i64, col as i64);
            cells.push(Cell {
                kind: *kind,
                hallway: hallways.get(index).copied().unwrap_or(false),
                region: quadrant_region(width, height, row, col),
                movement_cost: 1,
                corners: CornerWalls {
                    north_east: is_wall(r - 1, c + 1),
                    north_west: is_wall(r - 1, c - 1),
                    south_west: is_wall(r + 1, c - 1),
                    south_east: is_wall(r + 1, c + 1),
                },
            });
        }

        let avatar_spawn = match avatar_spawn {
            Some(spawn) => spawn,
            None => cells
                .iter()
                .position(|cell| cell.kind == CellKind::Open)
                .map(|index| {
                    CellCoord::new(
                        (index / width as usize) as u32,
                        (index % width as usize) as u32,
                    )
                })
                .ok_or(BoardError::NoWalkableCell)?,
        };

        Ok(Self {
            width,
            height,
            cells,
            avatar_spawn,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn avatar_spawn(&self) -> CellCoord {
        self.avatar_spawn
    }

    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if coord.row >= self.height || coord.col >= self.width {
            return None;
        }
        Some(coord.row as usize * self.width as usize + coord.col as usize)
    }

    pub fn coord_of(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cells.len() {
            return None;
        }
        Some(CellCoord::new(
            (index / self.width as usize) as u32,
            (index % self.width as usize) as u32,
        ))
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index_of(coord).and_then(|index| self.cells.get(index))
    }

    pub fn kind_at(&self, coord: CellCoord) -> Option<CellKind> {
        self.cell(coord).map(|cell| cell.kind)
    }

    pub fn is_walkable(&self, coord: CellCoord) -> bool {
        self.kind_at(coord).is_some_and(CellKind::is_walkable)
    }

    /// Overrides the cost a search pays to enter `coord`.
    pub fn set_movement_cost(&mut self, coord: CellCoord, cost: u32) -> bool {
        match self.index_of(coord) {
            Some(index) => {
                self.cells[index].movement_cost = cost.max(1);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                CellCoord::new((index / width) as u32, (index % width) as u32),
                cell,
            )
        })
    }

    /// Cell containing a world position, if it lies on the board.
    pub fn cell_at_world(&self, x: f32, z: f32) -> Option<CellCoord> {
        if !x.is_finite() || !z.is_finite() || x < 0.0 || z < 0.0 {
            return None;
        }
        let coord = CellCoord::new(z.floor() as u32, x.floor() as u32);
        self.index_of(coord).map(|_| coord)
    }

    /// Clamps signed row/col into the board.
    pub fn clamp(&self, row: i64, col: i64) -> CellCoord {
        CellCoord::new(
            row.clamp(0, self.height as i64 - 1) as u32,
            col.clamp(0, self.width as i64 - 1) as u32,
        )
    }
}

fn quadrant_region(width: u32, height: u32, row: u32, col: u32) -> u8 {
    let south = row >= height / 2;
    let east = col >= width / 2;
    match (south, east) {
        (false, false) => 1,
        (false, true) => 2,
        (true, false) => 3,
        (true, true) => 4,
    }
}
