use super::{Board, CellCoord};

/// Sides of a cell that border a non-walkable cell. Top is the row above
/// (north), right is the next column (east).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallSides {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    cell: CellCoord,
    walkable: bool,
    movement_cost: u32,
    walls: WallSides,
    neighbors: Vec<CellCoord>,
}

impl GraphNode {
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn movement_cost(&self) -> u32 {
        self.movement_cost
    }

    pub fn walls(&self) -> WallSides {
        self.walls
    }

    pub fn neighbors(&self) -> &[CellCoord] {
        &self.neighbors
    }

    /// True when stepping to the diagonal `to` would cut across a wall
    /// bordering this cell.
    pub fn prunes(&self, to: CellCoord) -> bool {
        if !self.cell.is_diagonal_to(to) {
            return false;
        }
        let south = to.row > self.cell.row;
        let east = to.col > self.cell.col;
        (south && self.walls.bottom)
            || (!south && self.walls.top)
            || (east && self.walls.right)
            || (!east && self.walls.left)
    }
}

/// Read-only adjacency over a board. Built once and shared behind an `Arc`
/// by every pathfinder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGraph {
    width: u32,
    height: u32,
    nodes: Vec<GraphNode>,
}

impl GridGraph {
    pub fn from_board(board: &Board) -> Self {
        let width = board.width();
        let height = board.height();
        let blocked = |row: i64, col: i64| -> bool {
            if row < 0 || col < 0 || row >= height as i64 || col >= width as i64 {
                return false;
            }
            !board.is_walkable(CellCoord::new(row as u32, col as u32))
        };

        let nodes = board
            .iter()
            .map(|(coord, cell)| {
                let (row, col) = (coord.row as i64, coord.col as i64);
                GraphNode {
                    cell: coord,
                    walkable: cell.kind.is_walkable(),
                    movement_cost: cell.movement_cost,
                    walls: WallSides {
                        top: blocked(row - 1, col),
                        bottom: blocked(row + 1, col),
                        left: blocked(row, col - 1),
                        right: blocked(row, col + 1),
                    },
                    neighbors: neighbor_cells(width, height, coord),
                }
            })
            .collect();

        Self {
            width,
            height,
            nodes,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, cell: CellCoord) -> Option<usize> {
        if cell.row >= self.height || cell.col >= self.width {
            return None;
        }
        Some(cell.row as usize * self.width as usize + cell.col as usize)
    }

    pub fn node(&self, cell: CellCoord) -> Option<&GraphNode> {
        self.index_of(cell).and_then(|index| self.nodes.get(index))
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }
}

// Orthogonal moves first, then diagonals. Search order depends on this.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

fn neighbor_cells(width: u32, height: u32, cell: CellCoord) -> Vec<CellCoord> {
    NEIGHBOR_OFFSETS
        .iter()
        .filter_map(|(dr, dc)| {
            let row = cell.row as i64 + dr;
            let col = cell.col as i64 + dc;
            if row < 0 || col < 0 || row >= height as i64 || col >= width as i64 {
                None
            } else {
                Some(CellCoord::new(row as u32, col as u32))
            }
        })
        .collect()
}
