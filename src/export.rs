use crate::data::{Actor, AssetCategory, Scene, Transform};
use serde::{Deserialize, Serialize};

/// Engine light intensity per authoring brightness unit
pub const BRIGHTNESS_SCALE: f64 = 9.3;
/// Authoring temperature per engine temperature unit
pub const TEMPERATURE_DIVISOR: f64 = 1.6;

/// Document consumed by the engine importer. Field names are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDocument {
    pub placeable_assets: Vec<PlaceableAsset>,
    pub foliage: Vec<FoliageGroup>,
    pub default_properties: DefaultProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceableAsset {
    pub asset_class: String,
    pub asset_class_path: String,
    pub transform: Transform,
    pub collision_profile: String,
    pub physics_enabled: bool,
    pub shadow_enabled: bool,
}

/// Instances sharing one static mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoliageGroup {
    pub static_mesh: String,
    pub static_mesh_path: String,
    pub instances: Vec<Transform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultProperties {
    pub brightness: f64,
    pub temperature: f64,
    pub time_of_day: f64,
    pub sun_angle: f64,
    pub density: f64,
    pub height: f64,
}

impl EngineDocument {
    pub fn from_scene(scene: &Scene) -> Self {
        let mut placeable_assets = Vec::new();
        let mut foliage: Vec<FoliageGroup> = Vec::new();

        for actor in &scene.actors {
            if actor.category == AssetCategory::Decor {
                let path = &actor.asset.import_path;
                match foliage.iter_mut().find(|g| &g.static_mesh_path == path) {
                    Some(group) => group.instances.push(actor.transform),
                    None => foliage.push(FoliageGroup {
                        static_mesh: actor.asset.display_class.clone(),
                        static_mesh_path: path.clone(),
                        instances: vec![actor.transform],
                    }),
                }
            } else {
                placeable_assets.push(placeable(actor, scene.rule_flags.allow_physics));
            }
        }

        Self {
            placeable_assets,
            foliage,
            default_properties: DefaultProperties {
                brightness: scene.lighting.brightness * BRIGHTNESS_SCALE,
                temperature: scene.lighting.temperature / TEMPERATURE_DIVISOR,
                time_of_day: scene.lighting.time_of_day,
                sun_angle: scene.lighting.sun_angle,
                density: scene.fog.density,
                height: scene.fog.height,
            },
        }
    }

    pub fn foliage_instance_count(&self) -> usize {
        self.foliage.iter().map(|g| g.instances.len()).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn placeable(actor: &Actor, allow_physics: bool) -> PlaceableAsset {
    let rule = actor.category.rule();
    PlaceableAsset {
        asset_class: actor.asset.display_class.clone(),
        asset_class_path: actor.asset.import_path.clone(),
        transform: actor.transform,
        collision_profile: rule.collision_profile().to_string(),
        physics_enabled: rule.allow_physics && allow_physics,
        shadow_enabled: rule.casts_shadow,
    }
}
