use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use super::{Board, CellCoord, CellKind, REGION_COUNT};
use crate::config::PopulationConfig;

/// Cells that start a life with a pursuer, plus the one promoted to elite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnPlan {
    pub cells: Vec<CellCoord>,
    pub elite: Option<CellCoord>,
}

/// Marks spawn cells in repeated passes over the board until the minimum
/// is met, capping each region at a quarter of the maximum so pursuers
/// spread over all four quadrants. The avatar's spawn cell is never used.
pub fn plan_spawns<R: Rng + ?Sized>(
    board: &Board,
    population: &PopulationConfig,
    rng: &mut R,
) -> SpawnPlan {
    let region_cap = population
        .max_pursuers
        .div_ceil(u32::from(REGION_COUNT))
        .max(1);
    let eligible = |coord: CellCoord, kind: CellKind, hallway: bool| {
        kind == CellKind::Open && !hallway && coord != board.avatar_spawn()
    };

    let mut marked = vec![false; board.len()];
    let mut region_counts: HashMap<u8, u32> = HashMap::new();
    let mut total = 0u32;
    let mut passes = 0u32;

    while total < population.min_pursuers && passes < population.max_spawn_passes {
        passes = passes.saturating_add(1);
        for (index, (coord, cell)) in board.iter().enumerate() {
            if marked[index] || !eligible(coord, cell.kind, cell.hallway) {
                continue;
            }
            if !rng.random_bool(population.spawn_chance) {
                continue;
            }
            let count = region_counts.entry(cell.region).or_insert(0);
            if *count >= region_cap {
                continue;
            }
            marked[index] = true;
            *count = count.saturating_add(1);
            total = total.saturating_add(1);
        }

        let capacity_left = board.iter().enumerate().any(|(index, (coord, cell))| {
            !marked[index]
                && eligible(coord, cell.kind, cell.hallway)
                && region_counts.get(&cell.region).copied().unwrap_or(0) < region_cap
        });
        if !capacity_left {
            break;
        }
    }

    if total < population.min_pursuers {
        warn!(
            marked = total,
            minimum = population.min_pursuers,
            passes,
            "spawn_minimum_not_reached"
        );
    }

    let cells: Vec<CellCoord> = marked
        .iter()
        .enumerate()
        .filter(|(_, is_marked)| **is_marked)
        .filter_map(|(index, _)| board.coord_of(index))
        .take(population.max_pursuers as usize)
        .collect();
    let elite = if cells.is_empty() {
        None
    } else {
        Some(cells[rng.random_range(0..cells.len())])
    };

    debug!(pursuers = cells.len(), passes, elite = ?elite, "spawn_planned");
    SpawnPlan { cells, elite }
}
