//! Navigation: the oracle the simulation asks for reachability and paths.
//!
//! The simulation only sees the [`NavMesh`] trait. [`GridNavMesh`] is a
//! walkable-cell implementation used by the server binary and tests; any
//! other mesh library can be plugged in behind the same trait.
//!
//! # Invariants
//! - `check_path(a, b)` is true only if both endpoints and the segment
//!   between them are walkable.
//! - `find_path` returns an empty path when no route exists, never panics.

mod grid;

pub use grid::{CellCoord, GridNavMesh, NavMeshFile};

use glam::Vec3;
use rand::RngCore;
use std::path::Path;

/// A walkable area a random destination can be picked from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub centroid: Vec3,
}

/// Reachability and pathfinding queries over one location's walkable surface.
pub trait NavMesh: Send + Sync {
    /// Ordered waypoints from `from` to `to`, ending at `to`. Empty if unreachable.
    fn find_path(&self, from: Vec3, to: Vec3) -> Vec<Vec3>;

    /// Whether an entity may move in a straight line from `from` to `to`.
    fn check_path(&self, from: Vec3, to: Vec3) -> bool;

    /// A uniformly chosen walkable region, `None` for an empty mesh.
    fn random_region(&self, rng: &mut dyn RngCore) -> Option<Region>;
}

/// Errors from loading navigation meshes.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed nav mesh: {0}")]
    Malformed(String),
}

/// Load the mesh for a location from `<dir>/<key>.navmesh.json`.
pub fn load_nav_mesh(dir: impl AsRef<Path>, location_key: &str) -> Result<GridNavMesh, NavError> {
    let path = dir.as_ref().join(format!("{location_key}.navmesh.json"));
    let mesh = GridNavMesh::load(&path)?;
    tracing::info!(
        location = location_key,
        regions = mesh.region_count(),
        path = %path.display(),
        "nav mesh loaded"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_by_location_key() {
        let tmp = tempfile::tempdir().unwrap();
        let file = NavMeshFile {
            cell_size: 1.0,
            origin: [0.0, 0.0],
            rows: vec!["...".into(), ".#.".into()],
        };
        std::fs::write(
            tmp.path().join("lh_town.navmesh.json"),
            serde_json::to_string(&file).unwrap(),
        )
        .unwrap();

        let mesh = load_nav_mesh(tmp.path(), "lh_town").unwrap();
        assert_eq!(mesh.region_count(), 5);
    }

    #[test]
    fn missing_location_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_nav_mesh(tmp.path(), "nowhere"),
            Err(NavError::Io(_))
        ));
    }
}
