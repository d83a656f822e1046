use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub composer: ComposerSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub max_retained_jobs: usize,
    pub max_body_bytes: usize,
}

/// Tunable constants for one composition pass.
///
/// Distances are world units, radii and margins are grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    pub grid_unit: f64,
    pub wall_offset: f64,
    pub floor_height: f64,
    pub max_actors: usize,
    pub max_buildings: usize,
    pub max_floors_per_building: u32,
    /// Reserved radius around a building anchor (footprint plus wall overhang)
    pub building_clearance: i32,
    /// Extra free cells required between neighbouring buildings
    pub building_gap: i32,
    pub anchor_search_radius: u32,
    pub road_clearance: i32,
    pub road_start_margin: i32,
    pub foliage_margin: i32,
    /// Max jitter as a fraction of `grid_unit`
    pub foliage_jitter: f64,
    pub max_foliage_cells: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// External JSON/YAML catalog; the embedded table is used when unset
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_retained_jobs: 256,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            grid_unit: 400.0,
            wall_offset: 400.0,
            floor_height: 400.0,
            max_actors: 5000,
            max_buildings: 20,
            max_floors_per_building: 6,
            building_clearance: 1,
            building_gap: 1,
            anchor_search_radius: 64,
            road_clearance: 1,
            road_start_margin: 2,
            foliage_margin: 4,
            foliage_jitter: 0.35,
            max_foliage_cells: 250_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ComposerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.grid_unit.is_finite() && self.grid_unit > 0.0) {
            return Err(format!("grid_unit must be positive, got {}", self.grid_unit));
        }
        if !(self.floor_height.is_finite() && self.floor_height > 0.0) {
            return Err(format!("floor_height must be positive, got {}", self.floor_height));
        }
        if !self.wall_offset.is_finite() {
            return Err("wall_offset must be finite".to_string());
        }
        if self.max_actors == 0 || self.max_buildings == 0 || self.max_floors_per_building == 0 {
            return Err("actor, building and floor caps must be non-zero".to_string());
        }
        if self.building_clearance < 0
            || self.building_gap < 0
            || self.road_clearance < 0
            || self.road_start_margin < 0
            || self.foliage_margin < 0
        {
            return Err("cell radii and margins must not be negative".to_string());
        }
        if !(0.0..0.5).contains(&self.foliage_jitter) {
            return Err(format!(
                "foliage_jitter must be within [0, 0.5), got {}",
                self.foliage_jitter
            ));
        }
        Ok(())
    }
}

impl ServiceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&contents)?;
        config.composer.validate()?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}, using defaults", e);
            Self::default()
        })
    }
}
