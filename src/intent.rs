use crate::config::ComposerSettings;
use crate::data::{BuildingSpec, RuleFlags};
use crate::environment::EnvironmentOverrides;
use crate::error::{ComposeError, Resource};
use serde::{Deserialize, Serialize};

/// Road used when the caller asks for none
pub const DEFAULT_ROAD_SEQUENCE: [&str; 1] = ["straight"];

/// Structured request handed to the composer.
///
/// Every field is optional on the wire. Counts are read as signed integers so
/// that negative values surface as `InvalidInput` instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneIntent {
    #[serde(default)]
    pub buildings: Vec<BuildingIntent>,
    #[serde(default)]
    pub road_sequence: Vec<String>,
    #[serde(default)]
    pub forest_density: f64,
    #[serde(default)]
    pub environment: EnvironmentOverrides,
    #[serde(default)]
    pub rules: RuleFlags,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingIntent {
    #[serde(default = "default_floors")]
    pub floors: i64,
    #[serde(default)]
    pub door: bool,
}

fn default_floors() -> i64 {
    1
}

impl BuildingIntent {
    pub fn new(floors: i64) -> Self {
        Self { floors, door: false }
    }
}

impl SceneIntent {
    /// Parse an intent document, JSON when it starts with `{`, YAML otherwise
    pub fn load_from_string(content: &str) -> Result<Self, ComposeError> {
        let trimmed = content.trim_start();
        let parsed: Result<SceneIntent, String> = if trimmed.starts_with('{') {
            serde_json::from_str(trimmed).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(trimmed).map_err(|e| e.to_string())
        };
        parsed.map_err(|e| ComposeError::InvalidInput(format!("malformed intent document: {}", e)))
    }

    /// Reject malformed or over-cap intents before any placement work
    pub fn validate(&self, settings: &ComposerSettings) -> Result<(), ComposeError> {
        if self.buildings.len() > settings.max_buildings {
            return Err(ComposeError::capacity(
                Resource::Buildings,
                self.buildings.len(),
                settings.max_buildings,
                "intent validation",
            ));
        }

        for (index, building) in self.buildings.iter().enumerate() {
            if building.floors <= 0 {
                return Err(ComposeError::InvalidInput(format!(
                    "building {} has non-positive floor count {}",
                    index, building.floors
                )));
            }
            if building.floors > settings.max_floors_per_building as i64 {
                return Err(ComposeError::CapacityExceeded {
                    resource: Resource::Floors,
                    requested: building.floors as u64,
                    limit: settings.max_floors_per_building as u64,
                    context: format!("building {}", index),
                });
            }
        }

        if !(self.forest_density.is_finite() && (0.0..=1.0).contains(&self.forest_density)) {
            return Err(ComposeError::InvalidInput(format!(
                "forestDensity must be within [0, 1], got {}",
                self.forest_density
            )));
        }

        // Every requested key yields at least one actor
        if self.road_sequence.len() > settings.max_actors {
            return Err(ComposeError::capacity(
                Resource::Actors,
                self.road_sequence.len(),
                settings.max_actors,
                "road sequence length",
            ));
        }

        self.environment.validate()
    }

    /// Building specs in request order. Call after `validate`.
    pub fn building_specs(&self) -> Vec<BuildingSpec> {
        self.buildings
            .iter()
            .map(|b| BuildingSpec::new(b.floors.max(0) as u32).with_door(b.door))
            .collect()
    }

    /// Requested road keys, or the minimal default road when none were given
    pub fn road_keys(&self) -> Vec<String> {
        if self.road_sequence.is_empty() {
            DEFAULT_ROAD_SEQUENCE.iter().map(|k| k.to_string()).collect()
        } else {
            self.road_sequence.clone()
        }
    }
}
