use crate::catalog::AssetCatalog;
use crate::config::ComposerSettings;
use crate::data::{Actor, AssetCategory, BuildingSpec, CellRect, GridCell, Transform};
use crate::error::{ComposeError, Resource};
use crate::grid::OccupancyGrid;
use tracing::{debug, warn};

/// Wall placements around an anchor: (x sign, y sign, yaw) so each wall faces outward
const WALL_SIDES: [(f64, f64, f64); 4] = [
    (1.0, 0.0, 90.0),
    (-1.0, 0.0, 270.0),
    (0.0, 1.0, 0.0),
    (0.0, -1.0, 180.0),
];

/// A building that has been given a footprint on the grid
#[derive(Debug, Clone)]
pub struct PlacedBuilding {
    pub index: usize,
    pub anchor: GridCell,
    pub footprint: CellRect,
    pub actors: Vec<Actor>,
}

/// Finds free anchors and emits floor/wall/ceiling stacks.
///
/// The search is a concentric spiral around the previous anchor, so the
/// result depends only on the input order and the grid contents.
pub struct BuildingPlacer<'a> {
    settings: &'a ComposerSettings,
    catalog: &'a AssetCatalog,
    cursor: GridCell,
}

impl<'a> BuildingPlacer<'a> {
    pub fn new(settings: &'a ComposerSettings, catalog: &'a AssetCatalog) -> Self {
        Self {
            settings,
            catalog,
            cursor: GridCell::ORIGIN,
        }
    }

    pub fn cursor(&self) -> GridCell {
        self.cursor
    }

    pub fn place_all(
        &mut self,
        grid: &mut OccupancyGrid,
        specs: &[BuildingSpec],
    ) -> Result<Vec<PlacedBuilding>, ComposeError> {
        if specs.len() > self.settings.max_buildings {
            return Err(ComposeError::capacity(
                Resource::Buildings,
                specs.len(),
                self.settings.max_buildings,
                "building placement",
            ));
        }

        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| self.place(grid, index, spec))
            .collect()
    }

    pub fn place(
        &mut self,
        grid: &mut OccupancyGrid,
        index: usize,
        spec: &BuildingSpec,
    ) -> Result<PlacedBuilding, ComposeError> {
        if spec.floor_count == 0 {
            return Err(ComposeError::InvalidInput(format!(
                "building {} must have at least one floor",
                index
            )));
        }
        if spec.floor_count > self.settings.max_floors_per_building {
            return Err(ComposeError::capacity(
                Resource::Floors,
                spec.floor_count as usize,
                self.settings.max_floors_per_building as usize,
                format!("building {}", index),
            ));
        }

        let anchor = self.find_anchor(grid, index)?;
        grid.reserve(anchor, self.settings.building_clearance);
        self.cursor = anchor;

        debug!(
            "Building {} anchored at {} with {} floor(s)",
            index, anchor, spec.floor_count
        );

        Ok(PlacedBuilding {
            index,
            anchor,
            footprint: CellRect::around(anchor, self.settings.building_clearance),
            actors: self.stack_actors(index, anchor, spec),
        })
    }

    fn find_anchor(&self, grid: &OccupancyGrid, index: usize) -> Result<GridCell, ComposeError> {
        let required_free = self.settings.building_clearance + self.settings.building_gap;

        for ring in 0..=self.settings.anchor_search_radius {
            if let Some(cell) = ring_cells(self.cursor, ring as i32)
                .into_iter()
                .find(|&cell| grid.is_region_free(cell, required_free))
            {
                return Ok(cell);
            }
        }

        Err(ComposeError::PlacementExhausted {
            building_index: index,
            searched_rings: self.settings.anchor_search_radius,
            origin: self.cursor,
        })
    }

    fn stack_actors(&self, index: usize, anchor: GridCell, spec: &BuildingSpec) -> Vec<Actor> {
        let (base_x, base_y) = anchor.to_world(self.settings.grid_unit);
        let offset = self.settings.wall_offset;
        let mut actors = Vec::with_capacity(spec.floor_count as usize * 5 + 2);

        let mut push = |category: AssetCategory, variant: usize, transform: Transform| {
            match self.catalog.variant(category, variant) {
                Some(asset) => actors.push(Actor::new(asset, transform)),
                None => warn!("No '{}' asset available for building {}", category, index),
            }
        };

        for level in 0..spec.floor_count {
            let z = level as f64 * self.settings.floor_height;

            push(AssetCategory::Floor, index, Transform::at(base_x, base_y, z, 0.0));

            for (side, &(sx, sy, yaw)) in WALL_SIDES.iter().enumerate() {
                push(
                    AssetCategory::Wall,
                    index * WALL_SIDES.len() + side,
                    Transform::at(base_x + sx * offset, base_y + sy * offset, z, yaw),
                );
            }
        }

        if spec.door {
            let (sx, sy, yaw) = WALL_SIDES[0];
            push(
                AssetCategory::Door,
                index,
                Transform::at(base_x + sx * offset, base_y + sy * offset, 0.0, yaw),
            );
        }

        let roof_z = spec.floor_count as f64 * self.settings.floor_height;
        push(AssetCategory::Ceiling, index, Transform::at(base_x, base_y, roof_z, 0.0));

        actors
    }
}

/// Cells at Chebyshev distance `radius`, counter-clockwise from due east
pub fn ring_cells(center: GridCell, radius: i32) -> Vec<GridCell> {
    if radius <= 0 {
        return vec![center];
    }

    let r = radius;
    let mut cells = Vec::with_capacity(8 * r as usize);

    // East edge going north
    for dy in 0..=r {
        cells.push(center.offset(r, dy));
    }
    // North edge going west
    for dx in (-r..r).rev() {
        cells.push(center.offset(dx, r));
    }
    // West edge going south
    for dy in (-r..r).rev() {
        cells.push(center.offset(-r, dy));
    }
    // South edge going east
    for dx in (-r + 1)..=r {
        cells.push(center.offset(dx, -r));
    }
    // East edge below the start
    for dy in (-r + 1)..0 {
        cells.push(center.offset(r, dy));
    }

    cells
}
