//! Axis-aligned overlap tests against the static board and against other
//! actors. Nothing here mutates the volumes it tests.

use crate::map::{Board, CellCoord, CellKind};

/// Axis-aligned box on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

impl Aabb {
    pub fn centered(x: f32, z: f32, half_extent: f32) -> Self {
        Self {
            min_x: x - half_extent,
            min_z: z - half_extent,
            max_x: x + half_extent,
            max_z: z + half_extent,
        }
    }

    pub fn cell(coord: CellCoord) -> Self {
        let min_x = coord.col as f32;
        let min_z = coord.row as f32;
        Self {
            min_x,
            min_z,
            max_x: min_x + 1.0,
            max_z: min_z + 1.0,
        }
    }

    /// Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_z < other.max_z
            && other.min_z < self.max_z
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_z + self.max_z) * 0.5,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Wall,
    Obstacle,
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHit {
    pub kind: StaticKind,
    pub cell: Option<CellCoord>,
}

/// Wall, obstacle and exit volumes of a board, indexed by cell so a test
/// only looks at the cells a volume covers.
#[derive(Debug, Clone)]
pub struct StaticGeometry {
    width: u32,
    height: u32,
    kinds: Vec<CellKind>,
}

impl StaticGeometry {
    pub fn from_board(board: &Board) -> Self {
        Self {
            width: board.width(),
            height: board.height(),
            kinds: board.iter().map(|(_, cell)| cell.kind).collect(),
        }
    }

    /// First wall or obstacle the volume overlaps, scanning covered cells in
    /// row-major order. Leaving the board reports a boundary hit.
    pub fn first_static_hit(&self, volume: &Aabb) -> Option<StaticHit> {
        if volume.min_x < 0.0
            || volume.min_z < 0.0
            || volume.max_x > self.width as f32
            || volume.max_z > self.height as f32
        {
            return Some(StaticHit {
                kind: StaticKind::Boundary,
                cell: None,
            });
        }

        for coord in self.covered_cells(volume) {
            let kind = match self.kind_at(coord) {
                Some(CellKind::Wall) => StaticKind::Wall,
                Some(CellKind::Obstacle) => StaticKind::Obstacle,
                _ => continue,
            };
            return Some(StaticHit {
                kind,
                cell: Some(coord),
            });
        }
        None
    }

    pub fn touches_exit(&self, volume: &Aabb) -> bool {
        self.covered_cells(volume)
            .any(|coord| self.kind_at(coord) == Some(CellKind::Exit))
    }

    fn kind_at(&self, coord: CellCoord) -> Option<CellKind> {
        if coord.row >= self.height || coord.col >= self.width {
            return None;
        }
        self.kinds
            .get(coord.row as usize * self.width as usize + coord.col as usize)
            .copied()
    }

    fn covered_cells(&self, volume: &Aabb) -> impl Iterator<Item = CellCoord> {
        // Upper bounds use ceil - 1 so a box ending exactly on a cell edge
        // does not cover the next cell.
        let clamp_col = |value: f32| value.clamp(0.0, self.width as f32 - 1.0) as u32;
        let clamp_row = |value: f32| value.clamp(0.0, self.height as f32 - 1.0) as u32;
        let col_lo = clamp_col(volume.min_x.floor());
        let col_hi = clamp_col(volume.max_x.ceil() - 1.0);
        let row_lo = clamp_row(volume.min_z.floor());
        let row_hi = clamp_row(volume.max_z.ceil() - 1.0);
        (row_lo..=row_hi).flat_map(move |row| (col_lo..=col_hi).map(move |col| CellCoord::new(row, col)))
    }
}

/// True when `volume` overlaps any of `others`.
pub fn overlaps_any<'a>(volume: &Aabb, others: impl IntoIterator<Item = &'a Aabb>) -> bool {
    others.into_iter().any(|other| volume.overlaps(other))
}

/// A move into contact with another actor is refused. Moving while already
/// in contact is allowed only when it increases separation, so overlapping
/// actors can always part.
pub fn dynamic_blocks(current: &Aabb, prospective: &Aabb, others: &[Aabb]) -> bool {
    let (cx, cz) = current.center();
    let (px, pz) = prospective.center();
    others.iter().any(|other| {
        if !prospective.overlaps(other) {
            return false;
        }
        if !current.overlaps(other) {
            return true;
        }
        let (ox, oz) = other.center();
        let before = (cx - ox).powi(2) + (cz - oz).powi(2);
        let after = (px - ox).powi(2) + (pz - oz).powi(2);
        after < before
    })
}

/// Outcome of a per-axis gated move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMove {
    pub x: f32,
    pub z: f32,
    pub x_committed: bool,
    pub z_committed: bool,
    pub static_hit: Option<StaticHit>,
    pub dynamic_hit: bool,
}

impl AxisMove {
    /// No axis with a non-zero delta was committed.
    pub fn fully_blocked(&self, dx: f32, dz: f32) -> bool {
        let moved_x = self.x_committed && dx != 0.0;
        let moved_z = self.z_committed && dz != 0.0;
        !(moved_x || moved_z) && (dx != 0.0 || dz != 0.0)
    }
}

/// Tests X then Z independently, committing each axis only when neither
/// the static nor the dynamic test reports a hit, so a blocked actor can
/// still slide along a wall.
pub fn move_per_axis(
    x: f32,
    z: f32,
    dx: f32,
    dz: f32,
    half_extent: f32,
    geometry: &StaticGeometry,
    others: &[Aabb],
) -> AxisMove {
    let mut result = AxisMove {
        x,
        z,
        x_committed: false,
        z_committed: false,
        static_hit: None,
        dynamic_hit: false,
    };

    for (delta, along_x) in [(dx, true), (dz, false)] {
        if delta == 0.0 {
            continue;
        }
        let current = Aabb::centered(result.x, result.z, half_extent);
        let (next_x, next_z) = if along_x {
            (result.x + delta, result.z)
        } else {
            (result.x, result.z + delta)
        };
        let prospective = Aabb::centered(next_x, next_z, half_extent);

        if let Some(hit) = geometry.first_static_hit(&prospective) {
            result.static_hit.get_or_insert(hit);
            continue;
        }
        if dynamic_blocks(&current, &prospective, others) {
            result.dynamic_hit = true;
            continue;
        }
        result.x = next_x;
        result.z = next_z;
        if along_x {
            result.x_committed = true;
        } else {
            result.z_committed = true;
        }
    }
    result
}
