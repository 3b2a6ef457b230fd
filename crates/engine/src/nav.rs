use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::map::{Board, CellCoord, GridGraph};

/// Distance reported when no path exists or the target is out of scent range.
pub const OUT_OF_RANGE_DISTANCE: u32 = 30;

/// Result of one search: the path length in steps and the compass heading
/// of the first step, when the path has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOutcome {
    pub distance: u32,
    pub first_step: Option<CellCoord>,
    pub heading: Option<f32>,
}

impl PathOutcome {
    pub const NOT_FOUND: PathOutcome = PathOutcome {
        distance: OUT_OF_RANGE_DISTANCE,
        first_step: None,
        heading: None,
    };

    pub fn found(&self) -> bool {
        self.distance != OUT_OF_RANGE_DISTANCE || self.first_step.is_some()
    }
}

/// Best-first search over a shared [`GridGraph`]. Per-node search state
/// lives in scratch buffers owned by the pathfinder and is reset at the
/// start of every search.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    graph: Arc<GridGraph>,
    closed: Vec<bool>,
    best_g: Vec<u32>,
    parent: Vec<Option<usize>>,
    open: BinaryHeap<Reverse<OpenNode>>,
}

impl Pathfinder {
    pub fn new(graph: Arc<GridGraph>) -> Self {
        let node_count = graph.len();
        Self {
            graph,
            closed: vec![false; node_count],
            best_g: vec![u32::MAX; node_count],
            parent: vec![None; node_count],
            open: BinaryHeap::new(),
        }
    }

    pub fn graph(&self) -> &Arc<GridGraph> {
        &self.graph
    }

    /// Searches from `source` to `goal`. Returns `None` when `source` has no
    /// graph node, which callers treat as "skip this tick". A search that
    /// exhausts its queue reports [`PathOutcome::NOT_FOUND`].
    pub fn search(&mut self, source: CellCoord, goal: CellCoord) -> Option<PathOutcome> {
        self.graph.node(source)?;
        let Some(path) = self.find_path(source, goal) else {
            return Some(PathOutcome::NOT_FOUND);
        };
        let first_step = path.get(1).copied();
        Some(PathOutcome {
            distance: path.len().saturating_sub(1) as u32,
            first_step,
            heading: first_step.and_then(|next| heading_between(source, next)),
        })
    }

    /// Full cell path from `source` to `goal`, both ends included.
    pub fn find_path(&mut self, source: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
        let start_index = self.graph.index_of(source)?;
        let goal_index = self.graph.index_of(goal)?;
        let start_node = self.graph.node_at(start_index)?;
        if !start_node.is_walkable() {
            return None;
        }
        if source == goal {
            return Some(vec![source]);
        }

        self.reset_scratch();
        let mut next_insertion = 0u64;
        let start_h = source.manhattan_distance(goal);
        self.best_g[start_index] = 0;
        self.open.push(Reverse(OpenNode {
            coord: source,
            h_cost: start_h,
            f_cost: start_h,
            insertion_order: next_insertion,
        }));
        next_insertion = next_insertion.saturating_add(1);

        while let Some(Reverse(current)) = self.open.pop() {
            let Some(current_index) = self.graph.index_of(current.coord) else {
                continue;
            };
            if self.closed[current_index] {
                continue;
            }
            self.closed[current_index] = true;

            if current_index == goal_index {
                return reconstruct_path(&self.graph, &self.parent, start_index, goal_index);
            }

            let Some(current_node) = self.graph.node_at(current_index) else {
                continue;
            };
            let current_g = self.best_g[current_index];
            for &neighbor in current_node.neighbors() {
                if current_node.prunes(neighbor) {
                    continue;
                }
                let Some(neighbor_index) = self.graph.index_of(neighbor) else {
                    continue;
                };
                let Some(neighbor_node) = self.graph.node_at(neighbor_index) else {
                    continue;
                };
                if self.closed[neighbor_index] || !neighbor_node.is_walkable() {
                    continue;
                }

                let tentative_g = current_g.saturating_add(neighbor_node.movement_cost());
                if tentative_g >= self.best_g[neighbor_index] {
                    continue;
                }

                self.best_g[neighbor_index] = tentative_g;
                self.parent[neighbor_index] = Some(current_index);
                let h_cost = neighbor.manhattan_distance(goal);
                self.open.push(Reverse(OpenNode {
                    coord: neighbor,
                    h_cost,
                    f_cost: tentative_g.saturating_add(h_cost),
                    insertion_order: next_insertion,
                }));
                next_insertion = next_insertion.saturating_add(1);
            }
        }

        None
    }

    fn reset_scratch(&mut self) {
        self.closed.fill(false);
        self.best_g.fill(u32::MAX);
        self.parent.fill(None);
        self.open.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    coord: CellCoord,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

impl OpenNode {
    fn order_key(&self) -> (u32, u32, u64) {
        (self.f_cost, self.h_cost, self.insertion_order)
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct_path(
    graph: &GridGraph,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Option<Vec<CellCoord>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];

    while cursor != start_index {
        let next = parent.get(cursor).and_then(|value| *value)?;
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();
    indices
        .into_iter()
        .map(|index| graph.node_at(index).map(|node| node.cell()))
        .collect()
}

/// Compass heading in degrees for a single step between adjacent cells:
/// 0 is +row (south), 90 is +col (east), 180 north, 270 west.
pub fn heading_between(from: CellCoord, to: CellCoord) -> Option<f32> {
    let dr = to.row as i64 - from.row as i64;
    let dc = to.col as i64 - from.col as i64;
    let heading = match (dr, dc) {
        (1, 0) => 0.0,
        (1, 1) => 45.0,
        (0, 1) => 90.0,
        (-1, 1) => 135.0,
        (-1, 0) => 180.0,
        (-1, -1) => 225.0,
        (0, -1) => 270.0,
        (1, -1) => 315.0,
        _ => return None,
    };
    Some(heading)
}

/// Cell a moving actor searches from. An actor that has not yet crossed the
/// center of the cell it occupies still counts as being in the cell it came
/// from, judged along each axis its heading moves on.
pub fn nav_cell(board: &Board, x: f32, z: f32, heading: f32) -> CellCoord {
    let col = x.floor() as i64;
    let row = z.floor() as i64;
    let center_x = col as f32 + 0.5;
    let center_z = row as f32 + 0.5;
    let a = crate::sim::normalize_degrees(heading);

    // Signs of the per-axis motion along the heading.
    let (moves_x, moves_z): (i8, i8) = if a == 0.0 {
        (0, 1)
    } else if a == 90.0 {
        (1, 0)
    } else if a == 180.0 {
        (0, -1)
    } else if a == 270.0 {
        (-1, 0)
    } else if a < 90.0 {
        (1, 1)
    } else if a < 180.0 {
        (1, -1)
    } else if a < 270.0 {
        (-1, -1)
    } else {
        (-1, 1)
    };

    let lag_col = match moves_x {
        1 if x < center_x => col - 1,
        -1 if x > center_x => col + 1,
        _ => col,
    };
    let lag_row = match moves_z {
        1 if z < center_z => row - 1,
        -1 if z > center_z => row + 1,
        _ => row,
    };
    board.clamp(lag_row, lag_col)
}

/// Whether a pursuer at `from` should run a search toward `target` at all.
/// The scent boundary is inclusive.
pub fn within_scent(from: CellCoord, target: CellCoord, scent_radius: u32, forced: bool) -> bool {
    forced || from.manhattan_distance(target) <= scent_radius
}
