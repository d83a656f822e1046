use crate::catalog::AssetCatalog;
use crate::config::ComposerSettings;
use crate::data::{Actor, CellRect, GridCell, Transform};
use crate::error::{ComposeError, Resource};
use crate::grid::OccupancyGrid;
use rand::Rng;
use tracing::debug;

/// Rectangle scanned by the scatter: everything reserved so far plus a margin
pub fn scatter_area(grid: &OccupancyGrid, margin: i32) -> CellRect {
    match grid.bounds() {
        Some(bounds) => bounds.expand(margin),
        None => CellRect::around(GridCell::ORIGIN, margin),
    }
}

/// Per-cell probabilistic placement of decor into free cells.
///
/// This is the only stochastic stage of a composition; the random source is
/// supplied by the caller.
pub struct FoliageScatter<'a> {
    settings: &'a ComposerSettings,
    catalog: &'a AssetCatalog,
}

impl<'a> FoliageScatter<'a> {
    pub fn new(settings: &'a ComposerSettings, catalog: &'a AssetCatalog) -> Self {
        Self { settings, catalog }
    }

    /// Scatter into `area`, failing once `existing` plus new actors would pass the actor cap
    pub fn scatter<R: Rng>(
        &self,
        grid: &OccupancyGrid,
        area: CellRect,
        density: f64,
        existing: usize,
        rng: &mut R,
    ) -> Result<Vec<Actor>, ComposeError> {
        if !(density.is_finite() && (0.0..=1.0).contains(&density)) {
            return Err(ComposeError::InvalidInput(format!(
                "forest density must be within [0, 1], got {}",
                density
            )));
        }

        // No trials run, so the area bound does not apply
        let palette = self.catalog.foliage_palette();
        if density == 0.0 || palette.is_empty() {
            return Ok(Vec::new());
        }

        let area_cells = area.cell_count();
        if area_cells > self.settings.max_foliage_cells {
            return Err(ComposeError::CapacityExceeded {
                resource: Resource::FoliageCells,
                requested: area_cells,
                limit: self.settings.max_foliage_cells,
                context: format!("foliage area {}x{}", area.width(), area.height()),
            });
        }

        let unit = self.settings.grid_unit;
        let jitter = self.settings.foliage_jitter;
        let mut actors = Vec::new();

        for cell in area.cells() {
            if grid.is_occupied(cell) || !rng.gen_bool(density) {
                continue;
            }

            let total = existing + actors.len() + 1;
            if total > self.settings.max_actors {
                return Err(ComposeError::capacity(
                    Resource::Actors,
                    total,
                    self.settings.max_actors,
                    format!("foliage scatter at cell {}", cell),
                ));
            }

            let (cx, cy) = cell.to_world(unit);
            let (ox, oy) = if jitter > 0.0 {
                (
                    rng.gen_range(-jitter..jitter) * unit,
                    rng.gen_range(-jitter..jitter) * unit,
                )
            } else {
                (0.0, 0.0)
            };
            let yaw = rng.gen_range(0.0..360.0);
            let asset = palette[rng.gen_range(0..palette.len())].clone();

            actors.push(Actor::new(asset, Transform::at(cx + ox, cy + oy, 0.0, yaw)));
        }

        debug!(
            "Foliage scatter placed {} actor(s) over {} cell(s) at density {:.2}",
            actors.len(),
            area_cells,
            density
        );

        Ok(actors)
    }
}
