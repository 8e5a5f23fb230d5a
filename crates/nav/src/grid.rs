use crate::{NavError, NavMesh, Region};
use glam::Vec3;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

/// A 2D cell coordinate on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    fn neighbors(self) -> [CellCoord; 4] {
        [
            CellCoord::new(self.x + 1, self.z),
            CellCoord::new(self.x - 1, self.z),
            CellCoord::new(self.x, self.z + 1),
            CellCoord::new(self.x, self.z - 1),
        ]
    }
}

/// On-disk shape of a grid mesh: one string per row along +Z, one char per
/// cell along +X. `.` is walkable, `#` is blocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavMeshFile {
    pub cell_size: f32,
    /// World XZ of the minimum corner of cell (0, 0).
    #[serde(default)]
    pub origin: [f32; 2],
    pub rows: Vec<String>,
}

/// Flat walkable surface made of square cells.
///
/// Cells are the regions handed out by `random_region`; their centroids are
/// the waypoints produced by `find_path`.
#[derive(Debug, Clone)]
pub struct GridNavMesh {
    cell_size: f32,
    origin: [f32; 2],
    walkable: HashSet<CellCoord>,
    /// Sorted copy of `walkable` so random picks are reproducible.
    regions: Vec<CellCoord>,
}

impl GridNavMesh {
    /// Build a mesh from ASCII rows.
    pub fn from_rows(cell_size: f32, origin: [f32; 2], rows: &[&str]) -> Result<Self, NavError> {
        if cell_size <= 0.0 {
            return Err(NavError::Malformed("cell_size must be positive".into()));
        }
        let mut walkable = HashSet::new();
        for (z, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                match c {
                    '.' => {
                        walkable.insert(CellCoord::new(x as i32, z as i32));
                    }
                    '#' => {}
                    other => {
                        return Err(NavError::Malformed(format!(
                            "unexpected cell {other:?} at row {z} column {x}"
                        )));
                    }
                }
            }
        }
        Ok(Self::from_cells(cell_size, origin, walkable))
    }

    /// A square of walkable cells centred on the world origin.
    pub fn open_field(half_extent_cells: i32, cell_size: f32) -> Self {
        let mut walkable = HashSet::new();
        for x in 0..half_extent_cells * 2 {
            for z in 0..half_extent_cells * 2 {
                walkable.insert(CellCoord::new(x, z));
            }
        }
        let corner = -(half_extent_cells as f32) * cell_size;
        Self::from_cells(cell_size, [corner, corner], walkable)
    }

    fn from_cells(cell_size: f32, origin: [f32; 2], walkable: HashSet<CellCoord>) -> Self {
        let mut regions: Vec<CellCoord> = walkable.iter().copied().collect();
        regions.sort();
        Self {
            cell_size,
            origin,
            walkable,
            regions,
        }
    }

    /// Load a mesh from a JSON [`NavMeshFile`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let file: NavMeshFile = serde_json::from_reader(std::fs::File::open(path)?)?;
        let rows: Vec<&str> = file.rows.iter().map(String::as_str).collect();
        Self::from_rows(file.cell_size, file.origin, &rows)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of walkable cells.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Convert a world position to a cell coordinate.
    pub fn position_to_cell(&self, pos: Vec3) -> CellCoord {
        CellCoord {
            x: ((pos.x - self.origin[0]) / self.cell_size).floor() as i32,
            z: ((pos.z - self.origin[1]) / self.cell_size).floor() as i32,
        }
    }

    /// World-space centre of a cell, on the ground plane.
    pub fn cell_center(&self, cell: CellCoord) -> Vec3 {
        Vec3::new(
            self.origin[0] + (cell.x as f32 + 0.5) * self.cell_size,
            0.0,
            self.origin[1] + (cell.z as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn is_walkable(&self, pos: Vec3) -> bool {
        self.walkable.contains(&self.position_to_cell(pos))
    }

    fn bfs(&self, start: CellCoord, goal: CellCoord) -> Option<Vec<CellCoord>> {
        let mut came_from: HashMap<CellCoord, CellCoord> = HashMap::new();
        let mut frontier = VecDeque::from([start]);
        came_from.insert(start, start);
        while let Some(cell) = frontier.pop_front() {
            if cell == goal {
                let mut cells = vec![goal];
                let mut cur = goal;
                while cur != start {
                    cur = came_from[&cur];
                    cells.push(cur);
                }
                cells.reverse();
                return Some(cells);
            }
            for next in cell.neighbors() {
                if self.walkable.contains(&next) && !came_from.contains_key(&next) {
                    came_from.insert(next, cell);
                    frontier.push_back(next);
                }
            }
        }
        None
    }

    /// Drop waypoints that are visible from an earlier anchor.
    fn shortcut(&self, from: Vec3, points: Vec<Vec3>) -> Vec<Vec3> {
        let mut out = Vec::with_capacity(points.len());
        let mut anchor = from;
        let mut i = 0;
        while i < points.len() {
            let mut j = points.len() - 1;
            while j > i && !self.check_path(anchor, points[j]) {
                j -= 1;
            }
            out.push(points[j]);
            anchor = points[j];
            i = j + 1;
        }
        out
    }
}

impl NavMesh for GridNavMesh {
    fn find_path(&self, from: Vec3, to: Vec3) -> Vec<Vec3> {
        if !self.is_walkable(from) || !self.is_walkable(to) {
            return Vec::new();
        }
        if self.check_path(from, to) {
            return vec![to];
        }
        let start = self.position_to_cell(from);
        let goal = self.position_to_cell(to);
        let Some(cells) = self.bfs(start, goal) else {
            tracing::trace!(?start, ?goal, "no route between cells");
            return Vec::new();
        };
        let mut points: Vec<Vec3> = cells
            .into_iter()
            .skip(1)
            .map(|c| self.cell_center(c))
            .collect();
        match points.last_mut() {
            Some(last) => *last = to,
            None => points.push(to),
        }
        self.shortcut(from, points)
    }

    fn check_path(&self, from: Vec3, to: Vec3) -> bool {
        if !self.is_walkable(from) || !self.is_walkable(to) {
            return false;
        }
        let dx = to.x - from.x;
        let dz = to.z - from.z;
        let dist = (dx * dx + dz * dz).sqrt();
        let steps = (dist / (self.cell_size * 0.25)).ceil().max(1.0) as u32;
        (1..steps).all(|i| self.is_walkable(from.lerp(to, i as f32 / steps as f32)))
    }

    fn random_region(&self, rng: &mut dyn RngCore) -> Option<Region> {
        if self.regions.is_empty() {
            return None;
        }
        let cell = self.regions[rng.random_range(0..self.regions.len())];
        Some(Region {
            centroid: self.cell_center(cell),
        })
    }
}
