use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// --- Connectors ---

/// Socket compatibility tag carried by every road piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorType {
    Solid,
    Pin,
}

impl Default for ConnectorType {
    fn default() -> Self {
        ConnectorType::Solid
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorType::Solid => write!(f, "Solid"),
            ConnectorType::Pin => write!(f, "Pin"),
        }
    }
}

// --- Asset Categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Floor,
    Wall,
    Ceiling,
    Door,
    Track,
    Decor,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 6] = [
        AssetCategory::Floor,
        AssetCategory::Wall,
        AssetCategory::Ceiling,
        AssetCategory::Door,
        AssetCategory::Track,
        AssetCategory::Decor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Floor => "floor",
            AssetCategory::Wall => "wall",
            AssetCategory::Ceiling => "ceiling",
            AssetCategory::Door => "door",
            AssetCategory::Track => "track",
            AssetCategory::Decor => "decor",
        }
    }

    /// Engine behaviour observed for each category
    pub fn rule(&self) -> CategoryRule {
        match self {
            AssetCategory::Floor | AssetCategory::Wall | AssetCategory::Ceiling => CategoryRule {
                snap: true,
                collides: true,
                allow_physics: false,
                casts_shadow: true,
            },
            // Doors ignore blockers
            AssetCategory::Door => CategoryRule {
                snap: true,
                collides: false,
                allow_physics: false,
                casts_shadow: true,
            },
            AssetCategory::Track => CategoryRule {
                snap: true,
                collides: true,
                allow_physics: false,
                casts_shadow: true,
            },
            AssetCategory::Decor => CategoryRule {
                snap: false,
                collides: false,
                allow_physics: false,
                casts_shadow: true,
            },
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub snap: bool,
    pub collides: bool,
    pub allow_physics: bool,
    pub casts_shadow: bool,
}

impl CategoryRule {
    pub fn collision_profile(&self) -> &'static str {
        if self.collides {
            "BlockAllDynamic"
        } else {
            "NoCollision"
        }
    }
}

// --- Asset Descriptors (Static / Shared) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub category: AssetCategory,
    pub display_class: String,
    pub import_path: String,
    pub snap_to_grid: bool,
    #[serde(default)]
    pub connector_type: Option<ConnectorType>,
}

/// Descriptors are loaded once and referenced by many actors.
pub type SharedAsset = Arc<AssetDescriptor>;

/// One authoritative record per road-piece kind.
#[derive(Debug, Clone)]
pub struct RoadPieceSpec {
    pub key: String,
    pub connector_type: ConnectorType,
    pub length_units: f64,
    pub curve_degrees: f64,
    pub elevation_delta: f64,
    pub tags: Vec<String>,
    pub asset: SharedAsset,
}

impl RoadPieceSpec {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingSpec {
    pub floor_count: u32,
    pub door: bool,
}

impl BuildingSpec {
    pub fn new(floor_count: u32) -> Self {
        Self {
            floor_count,
            door: false,
        }
    }

    pub fn with_door(mut self, door: bool) -> Self {
        self.door = door;
        self
    }
}

// --- Grid ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const ORIGIN: GridCell = GridCell { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Nearest cell centre for a world position
    pub fn from_world(x: f64, y: f64, grid_unit: f64) -> Self {
        Self {
            x: (x / grid_unit).round() as i32,
            y: (y / grid_unit).round() as i32,
        }
    }

    pub fn to_world(&self, grid_unit: f64) -> (f64, f64) {
        (self.x as f64 * grid_unit, self.y as f64 * grid_unit)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn chebyshev_distance(&self, other: &GridCell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl CellRect {
    pub fn around(center: GridCell, radius: i32) -> Self {
        Self {
            min_x: center.x - radius,
            min_y: center.y - radius,
            max_x: center.x + radius,
            max_y: center.y + radius,
        }
    }

    pub fn expand(&self, margin: i32) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn include(&mut self, cell: GridCell) {
        self.min_x = self.min_x.min(cell.x);
        self.min_y = self.min_y.min(cell.y);
        self.max_x = self.max_x.max(cell.x);
        self.max_y = self.max_y.max(cell.y);
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.y >= self.min_y && cell.y <= self.max_y
    }

    pub fn intersects(&self, other: &CellRect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn width(&self) -> u64 {
        (self.max_x as i64 - self.min_x as i64 + 1).max(0) as u64
    }

    pub fn height(&self) -> u64 {
        (self.max_y as i64 - self.min_y as i64 + 1).max(0) as u64
    }

    pub fn cell_count(&self) -> u64 {
        self.width() * self.height()
    }

    /// Row-major walk over every cell
    pub fn cells(&self) -> impl Iterator<Item = GridCell> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y).flat_map(move |y| (min_x..=max_x).map(move |x| GridCell { x, y }))
    }
}

// --- Transforms ---

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ONE: Vec3 = Vec3 {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotator {
    pub fn yaw(yaw: f64) -> Self {
        Self {
            pitch: 0.0,
            yaw,
            roll: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Rotator,
    pub scale: Vec3,
}

impl Transform {
    /// Unit-scale transform facing `yaw` degrees
    pub fn at(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            location: Vec3::new(x, y, z),
            rotation: Rotator::yaw(yaw),
            scale: Vec3::ONE,
        }
    }
}

// --- Actors & Scene ---

/// Atomic output unit of a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub category: AssetCategory,
    pub asset: SharedAsset,
    pub transform: Transform,
}

impl Actor {
    pub fn new(asset: SharedAsset, transform: Transform) -> Self {
        Self {
            category: asset.category,
            asset,
            transform,
        }
    }

    pub fn cell(&self, grid_unit: f64) -> GridCell {
        GridCell::from_world(self.transform.location.x, self.transform.location.y, grid_unit)
    }

    pub fn connector_type(&self) -> Option<ConnectorType> {
        self.asset.connector_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lighting {
    pub brightness: f64,
    pub temperature: f64,
    pub time_of_day: f64,
    pub sun_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub density: f64,
    pub ray_density: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFlags {
    #[serde(default)]
    pub allow_physics: bool,
    #[serde(default)]
    pub allow_ai_agents: bool,
    #[serde(default)]
    pub allow_multiplayer: bool,
}

/// Root artifact of one composition.
#[derive(Debug, Clone)]
pub struct Scene {
    pub actors: Vec<Actor>,
    pub lighting: Lighting,
    pub fog: Fog,
    pub rule_flags: RuleFlags,
    /// Seed that drove foliage scatter
    pub seed: u64,
}

impl Scene {
    pub fn count(&self, category: AssetCategory) -> usize {
        self.actors.iter().filter(|a| a.category == category).count()
    }

    pub fn actors_of(&self, category: AssetCategory) -> impl Iterator<Item = &Actor> {
        self.actors.iter().filter(move |a| a.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_cell_world_round_trip() {
        let cell = GridCell::new(3, -2);
        let (x, y) = cell.to_world(400.0);
        assert_eq!((x, y), (1200.0, -800.0));
        assert_eq!(GridCell::from_world(x + 150.0, y - 199.0, 400.0), cell);
    }

    #[test]
    fn test_cell_rect_iteration_order() {
        let rect = CellRect::around(GridCell::ORIGIN, 1);
        let cells: Vec<GridCell> = rect.cells().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(rect.cell_count(), 9);
        assert_eq!(cells[0], GridCell::new(-1, -1));
        assert_eq!(cells[1], GridCell::new(0, -1));
        assert_eq!(cells[8], GridCell::new(1, 1));
    }

    #[test]
    fn test_cell_rect_intersection() {
        let a = CellRect::around(GridCell::new(0, 0), 1);
        let b = CellRect::around(GridCell::new(2, 0), 1);
        let c = CellRect::around(GridCell::new(3, 0), 1);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_category_rules() {
        assert_eq!(AssetCategory::Wall.rule().collision_profile(), "BlockAllDynamic");
        assert_eq!(AssetCategory::Door.rule().collision_profile(), "NoCollision");
        assert!(!AssetCategory::Decor.rule().snap);
        assert!(AssetCategory::ALL.iter().all(|c| !c.rule().allow_physics));
    }
}
