//! Spatial partitioning for efficient neighbor queries.
//!
//! Provides O(1) cell lookup and O(k) neighbor queries where k is the number
//! of bodies in nearby cells, rather than O(n) for brute force. Bot perception
//! and area strikes read this grid instead of scanning every entity.

use crate::components::{BodyKind, Collider, Damageable, Health, Position};
use crate::geometry::Vec2;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Grid-based spatial partitioning structure.
///
/// Divides the arena into cells and tracks which bodies are in each cell.
/// Rebuilt from scratch every tick.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    /// Cell size in world units.
    pub cell_size: f32,
    cells: HashMap<(i32, i32), Vec<SpatialEntry>>,
    count: usize,
}

/// Entry in a spatial cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub kind: BodyKind,
}

impl SpatialEntry {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            count: 0,
        }
    }

    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.count = 0;
    }

    pub fn insert(&mut self, entity: Entity, x: f32, y: f32, kind: BodyKind) {
        let cell = self.world_to_cell(x, y);
        self.cells
            .entry(cell)
            .or_default()
            .push(SpatialEntry { entity, x, y, kind });
        self.count += 1;
    }

    /// All bodies within `radius` of a point, closest first.
    pub fn query_radius(&self, x: f32, y: f32, radius: f32) -> Vec<SpatialEntry> {
        let radius_sq = radius * radius;
        let (min_cx, min_cy) = self.world_to_cell(x - radius, y - radius);
        let (max_cx, max_cy) = self.world_to_cell(x + radius, y + radius);

        let mut results = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(entries) = self.cells.get(&(cx, cy)) {
                    for entry in entries {
                        let dist_sq = (entry.x - x).powi(2) + (entry.y - y).powi(2);
                        if dist_sq <= radius_sq {
                            results.push(*entry);
                        }
                    }
                }
            }
        }

        // Cell iteration order is arbitrary; sort by distance, then entity
        // index so results are reproducible.
        results.sort_by(|a, b| {
            let dist_a = (a.x - x).powi(2) + (a.y - y).powi(2);
            let dist_b = (b.x - x).powi(2) + (b.y - y).powi(2);
            dist_a
                .partial_cmp(&dist_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.entity.cmp(&b.entity))
        });
        results
    }

    /// Bodies of one kind within a radius, closest first.
    pub fn query_kind(&self, x: f32, y: f32, radius: f32, kind: BodyKind) -> Vec<SpatialEntry> {
        let mut results = self.query_radius(x, y, radius);
        results.retain(|e| e.kind == kind);
        results
    }

    pub fn nearest_of_kind(
        &self,
        x: f32,
        y: f32,
        max_radius: f32,
        kind: BodyKind,
    ) -> Option<SpatialEntry> {
        self.query_kind(x, y, max_radius, kind).into_iter().next()
    }

    pub fn cell_count(&self, cell: (i32, i32)) -> usize {
        self.cells.get(&cell).map(|v| v.len()).unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.count
    }
}

/// System that rebuilds the spatial grid each tick from living bodies and
/// items lying on the floor.
pub fn spatial_grid_update_system(
    mut grid: ResMut<SpatialGrid>,
    query: Query<(Entity, &Position, &Collider, Option<&Health>)>,
) {
    grid.clear();

    for (entity, pos, collider, health) in query.iter() {
        if health.is_some_and(|h| !h.is_alive()) {
            continue;
        }
        grid.insert(entity, pos.x, pos.y, collider.kind);
    }
}
