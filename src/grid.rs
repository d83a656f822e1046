use crate::data::{CellRect, GridCell};
use std::collections::HashSet;

/// Set of reserved cells shared by the producers of one composition pass.
///
/// Occupancy only grows: there is no way to release a cell.
#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    cells: HashSet<GridCell>,
    bounds: Option<CellRect>,
}

impl OccupancyGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every cell of the square `[c - radius, c + radius]` on both axes
    pub fn reserve(&mut self, center: GridCell, radius: i32) {
        let region = CellRect::around(center, radius.max(0));
        for cell in region.cells() {
            self.cells.insert(cell);
        }

        match self.bounds.as_mut() {
            Some(bounds) => {
                bounds.include(GridCell::new(region.min_x, region.min_y));
                bounds.include(GridCell::new(region.max_x, region.max_y));
            }
            None => self.bounds = Some(region),
        }
    }

    pub fn is_occupied(&self, cell: GridCell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn is_region_free(&self, center: GridCell, radius: i32) -> bool {
        let region = CellRect::around(center, radius.max(0));
        match self.bounds {
            Some(bounds) if bounds.intersects(&region) => {
                region.cells().all(|cell| !self.cells.contains(&cell))
            }
            _ => true,
        }
    }

    /// Smallest rectangle covering every reserved cell
    pub fn bounds(&self) -> Option<CellRect> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }
}
