use crate::data::{AssetCategory, AssetDescriptor, ConnectorType, RoadPieceSpec, SharedAsset};
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const LIBRARY_ROOT: &str = "/WorldBuilder/Core/Actors/Placeable/Library";

/// Road pieces of the track kit: (key, kit number, connector, length, curve, elevation, tags)
const ROAD_KIT: &[(&str, u32, ConnectorType, f64, f64, f64, &[&str])] = &[
    // Solid straights
    ("straight", 2, ConnectorType::Solid, 900.0, 0.0, 0.0, &["straight", "basic"]),
    ("straight_bump", 3, ConnectorType::Solid, 900.0, 0.0, 0.0, &["straight", "bump"]),
    ("straight_wide", 5, ConnectorType::Solid, 900.0, 0.0, 0.0, &["straight", "wide"]),
    ("straight_gap", 6, ConnectorType::Solid, 900.0, 0.0, 0.0, &["straight", "gap"]),
    ("s_bend", 7, ConnectorType::Solid, 1200.0, 0.0, 0.0, &["straight", "s_bend"]),
    ("straight_long_bump", 17, ConnectorType::Solid, 1200.0, 0.0, 0.0, &["straight", "long_bump"]),
    // Solid turns
    ("turn_90", 4, ConnectorType::Solid, 900.0, 90.0, 0.0, &["turn", "90"]),
    ("turn_slight", 12, ConnectorType::Solid, 900.0, 15.0, 0.0, &["turn", "slight"]),
    ("turn_sharp", 13, ConnectorType::Solid, 900.0, 90.0, 0.0, &["turn", "sharp"]),
    ("u_turn", 18, ConnectorType::Solid, 900.0, 180.0, 0.0, &["turn", "u_turn"]),
    // Ramps and hills
    ("ramp_gentle", 8, ConnectorType::Solid, 900.0, 0.0, 200.0, &["ramp", "gentle"]),
    ("ramp_steep", 9, ConnectorType::Solid, 900.0, 0.0, 400.0, &["ramp", "steep"]),
    ("ramp_spiral", 15, ConnectorType::Solid, 1200.0, 45.0, 300.0, &["ramp", "spiral"]),
    ("ramp_spiral_steep", 16, ConnectorType::Solid, 1200.0, 90.0, 600.0, &["ramp", "spiral_steep"]),
    ("ramp_down", 19, ConnectorType::Solid, 1200.0, 90.0, -400.0, &["ramp", "down"]),
    ("loop", 20, ConnectorType::Solid, 2000.0, 0.0, 800.0, &["loop"]),
    ("hill_down", 21, ConnectorType::Solid, 1200.0, 0.0, -200.0, &["hill", "down"]),
    // Bridges and specials
    ("bridge_start", 10, ConnectorType::Solid, 1200.0, 0.0, 100.0, &["bridge", "start"]),
    ("bridge_segment", 25, ConnectorType::Solid, 1200.0, 0.0, 0.0, &["bridge", "segment"]),
    ("split", 22, ConnectorType::Solid, 1200.0, 0.0, 0.0, &["split"]),
    ("junction_mercedes", 23, ConnectorType::Solid, 1200.0, 0.0, 0.0, &["junction", "mercedes"]),
    // Pin sockets
    ("pin_connector", 11, ConnectorType::Pin, 600.0, 0.0, 0.0, &["connector"]),
    ("pin_t_junction", 14, ConnectorType::Pin, 900.0, 90.0, 0.0, &["turn", "t_junction"]),
    // Caps
    ("cap_dead_end", 1, ConnectorType::Solid, 300.0, 0.0, 0.0, &["cap", "dead_end"]),
    ("cap_return", 24, ConnectorType::Solid, 900.0, 180.0, 0.0, &["cap", "return"]),
];

/// Decor indices that read as trees and shrubs
const NATURE_DECOR: &[usize] = &[1, 2, 5, 8, 12, 15];

// --- File Format ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFileFormat {
    pub assets: BTreeMap<AssetCategory, Vec<AssetEntry>>,
    pub road_pieces: Vec<RoadPieceEntry>,
    pub default_piece: String,
    pub adapter_piece: String,
    #[serde(default)]
    pub foliage_palette: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub display_class: String,
    pub import_path: String,
    #[serde(default)]
    pub snap_to_grid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadPieceEntry {
    pub key: String,
    pub display_class: String,
    pub import_path: String,
    pub connector: ConnectorType,
    pub length_units: f64,
    #[serde(default)]
    pub curve_degrees: f64,
    #[serde(default)]
    pub elevation_delta: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

// --- Catalog ---

/// Read-only table of asset descriptors and road pieces.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    assets: HashMap<AssetCategory, Vec<SharedAsset>>,
    road_pieces: Vec<RoadPieceSpec>,
    piece_index: HashMap<String, usize>,
    default_piece: usize,
    adapter_piece: usize,
    foliage_palette: Vec<SharedAsset>,
}

impl AssetCatalog {
    /// The built-in world builder library
    pub fn embedded() -> Self {
        Self::build(Self::embedded_file_format())
    }

    pub fn embedded_file_format() -> CatalogFileFormat {
        let mut assets = BTreeMap::new();
        assets.insert(AssetCategory::Floor, library_entries("Floor", "BP_FloorAsset", 1..=11));
        assets.insert(AssetCategory::Wall, library_entries("Wall", "BP_WallAsset", 1..=12));
        // Ceilings reuse the floor slabs, doors use the doorway wall
        assets.insert(AssetCategory::Ceiling, library_entries("Floor", "BP_FloorAsset", 1..=11));
        assets.insert(AssetCategory::Door, library_entries("Wall", "BP_WallAsset", 12..=12));
        assets.insert(AssetCategory::Decor, library_entries("Decors", "BP_DecorAsset", 1..=33));

        let road_pieces = ROAD_KIT
            .iter()
            .map(|&(key, number, connector, length, curve, elevation, tags)| {
                let (display_class, import_path) = library_path("Tracks", "BP_RaceTrack", number);
                RoadPieceEntry {
                    key: key.to_string(),
                    display_class,
                    import_path,
                    connector,
                    length_units: length,
                    curve_degrees: curve,
                    elevation_delta: elevation,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                }
            })
            .collect();

        CatalogFileFormat {
            assets,
            road_pieces,
            default_piece: "straight".to_string(),
            adapter_piece: "pin_connector".to_string(),
            foliage_palette: NATURE_DECOR.to_vec(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::load_from_string(&content)?;
        info!(
            "Loaded catalog from {:?}: {} road pieces, {} decor assets",
            path,
            catalog.road_pieces.len(),
            catalog.variants(AssetCategory::Decor).len()
        );
        Ok(catalog)
    }

    pub fn load_from_string(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFileFormat = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)
                .map_err(|e| CatalogError::Parse(format!("JSON parse error: {}", e)))?
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| CatalogError::Parse(format!("YAML parse error: {}", e)))?
        };

        Self::from_file_format(file)
    }

    pub fn from_file_format(file: CatalogFileFormat) -> Result<Self, CatalogError> {
        Self::validate(&file)?;
        Ok(Self::build(file))
    }

    fn build(file: CatalogFileFormat) -> Self {
        let assets: HashMap<AssetCategory, Vec<SharedAsset>> = file
            .assets
            .iter()
            .map(|(&category, entries)| {
                let descriptors = entries
                    .iter()
                    .map(|entry| {
                        Arc::new(AssetDescriptor {
                            category,
                            display_class: entry.display_class.clone(),
                            import_path: entry.import_path.clone(),
                            snap_to_grid: entry.snap_to_grid.unwrap_or(category.rule().snap),
                            connector_type: None,
                        })
                    })
                    .collect();
                (category, descriptors)
            })
            .collect();

        let road_pieces: Vec<RoadPieceSpec> = file
            .road_pieces
            .into_iter()
            .map(|entry| RoadPieceSpec {
                asset: Arc::new(AssetDescriptor {
                    category: AssetCategory::Track,
                    display_class: entry.display_class,
                    import_path: entry.import_path,
                    snap_to_grid: AssetCategory::Track.rule().snap,
                    connector_type: Some(entry.connector),
                }),
                key: normalize_key(&entry.key),
                connector_type: entry.connector,
                length_units: entry.length_units,
                curve_degrees: entry.curve_degrees,
                elevation_delta: entry.elevation_delta,
                tags: entry.tags.iter().map(|t| normalize_key(t)).collect(),
            })
            .collect();

        let piece_index: HashMap<String, usize> = road_pieces
            .iter()
            .enumerate()
            .map(|(idx, piece)| (piece.key.clone(), idx))
            .collect();

        let decor = assets.get(&AssetCategory::Decor).cloned().unwrap_or_default();
        let foliage_palette = if file.foliage_palette.is_empty() {
            decor
        } else {
            file.foliage_palette
                .iter()
                .filter_map(|&idx| decor.get(idx).cloned())
                .collect()
        };

        let default_piece = piece_index
            .get(&normalize_key(&file.default_piece))
            .copied()
            .unwrap_or(0);
        let adapter_piece = piece_index
            .get(&normalize_key(&file.adapter_piece))
            .copied()
            .unwrap_or(0);

        Self {
            assets,
            road_pieces,
            piece_index,
            default_piece,
            adapter_piece,
            foliage_palette,
        }
    }

    fn validate(file: &CatalogFileFormat) -> Result<(), CatalogError> {
        for category in [
            AssetCategory::Floor,
            AssetCategory::Wall,
            AssetCategory::Ceiling,
            AssetCategory::Door,
            AssetCategory::Decor,
        ] {
            if file.assets.get(&category).map_or(true, |v| v.is_empty()) {
                return Err(CatalogError::InvalidData(format!(
                    "Catalog must define at least one '{}' asset",
                    category
                )));
            }
        }

        if file.assets.contains_key(&AssetCategory::Track) {
            return Err(CatalogError::InvalidData(
                "Track assets are declared through road_pieces".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for piece in &file.road_pieces {
            if piece.key.trim().is_empty() {
                return Err(CatalogError::InvalidData("Road piece key must not be empty".to_string()));
            }
            if !seen.insert(normalize_key(&piece.key)) {
                return Err(CatalogError::InvalidData(format!(
                    "Duplicate road piece key: {}",
                    piece.key
                )));
            }
            if !(piece.length_units.is_finite() && piece.length_units > 0.0) {
                return Err(CatalogError::InvalidData(format!(
                    "Road piece {} must have a positive length, got {}",
                    piece.key, piece.length_units
                )));
            }
            if !piece.curve_degrees.is_finite() || !piece.elevation_delta.is_finite() {
                return Err(CatalogError::InvalidData(format!(
                    "Road piece {} has non-finite geometry",
                    piece.key
                )));
            }
        }

        let find = |key: &str| {
            let key = normalize_key(key);
            file.road_pieces.iter().find(|p| normalize_key(&p.key) == key)
        };

        match find(&file.default_piece) {
            Some(p) if p.connector == ConnectorType::Solid => {}
            Some(p) => {
                return Err(CatalogError::InvalidData(format!(
                    "Default piece {} must be Solid, got {}",
                    p.key, p.connector
                )))
            }
            None => {
                return Err(CatalogError::InvalidData(format!(
                    "Default piece {} not found",
                    file.default_piece
                )))
            }
        }

        match find(&file.adapter_piece) {
            Some(p) if p.connector == ConnectorType::Pin => {}
            Some(p) => {
                return Err(CatalogError::InvalidData(format!(
                    "Adapter piece {} must be Pin, got {}",
                    p.key, p.connector
                )))
            }
            None => {
                return Err(CatalogError::InvalidData(format!(
                    "Adapter piece {} not found",
                    file.adapter_piece
                )))
            }
        }

        let decor_count = file.assets.get(&AssetCategory::Decor).map_or(0, |v| v.len());
        if let Some(&idx) = file.foliage_palette.iter().find(|&&idx| idx >= decor_count) {
            return Err(CatalogError::InvalidData(format!(
                "Foliage palette index {} out of bounds ({} decor assets)",
                idx, decor_count
            )));
        }

        Ok(())
    }

    pub fn variants(&self, category: AssetCategory) -> &[SharedAsset] {
        if category == AssetCategory::Track {
            return &[];
        }
        self.assets.get(&category).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Deterministic variant pick, wrapping around the category list
    pub fn variant(&self, category: AssetCategory, index: usize) -> Option<SharedAsset> {
        let list = self.variants(category);
        if list.is_empty() {
            None
        } else {
            Some(list[index % list.len()].clone())
        }
    }

    pub fn road_pieces(&self) -> &[RoadPieceSpec] {
        &self.road_pieces
    }

    /// Lookup by key; keys are stored trimmed and lowercase
    pub fn road_piece(&self, key: &str) -> Option<&RoadPieceSpec> {
        self.piece_index
            .get(&normalize_key(key))
            .map(|&idx| &self.road_pieces[idx])
    }

    /// Case-insensitive lookup by asset class, with or without the `_C` suffix
    pub fn road_piece_by_class(&self, class_name: &str) -> Option<&RoadPieceSpec> {
        let wanted = class_name.trim_end_matches("_c").trim_end_matches("_C");
        self.road_pieces.iter().find(|piece| {
            let class = piece.asset.display_class.trim_end_matches("_C");
            class.eq_ignore_ascii_case(wanted)
        })
    }

    pub fn default_piece(&self) -> &RoadPieceSpec {
        &self.road_pieces[self.default_piece]
    }

    pub fn adapter_piece(&self) -> &RoadPieceSpec {
        &self.road_pieces[self.adapter_piece]
    }

    pub fn foliage_palette(&self) -> &[SharedAsset] {
        &self.foliage_palette
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::embedded()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn library_path(folder: &str, prefix: &str, number: u32) -> (String, String) {
    let name = format!("{}_Wb_{:02}", prefix, number);
    let class = format!("{}_C", name);
    let path = format!("{}/{}/{}.{}", LIBRARY_ROOT, folder, name, class);
    (class, path)
}

fn library_entries(folder: &str, prefix: &str, numbers: std::ops::RangeInclusive<u32>) -> Vec<AssetEntry> {
    numbers
        .map(|n| {
            let (display_class, import_path) = library_path(folder, prefix, n);
            AssetEntry {
                display_class,
                import_path,
                snap_to_grid: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_is_valid() {
        assert!(AssetCatalog::from_file_format(AssetCatalog::embedded_file_format()).is_ok());

        let catalog = AssetCatalog::embedded();
        assert_eq!(catalog.road_pieces().len(), 25);
        assert_eq!(catalog.variants(AssetCategory::Floor).len(), 11);
        assert_eq!(catalog.variants(AssetCategory::Wall).len(), 12);
        assert_eq!(catalog.variants(AssetCategory::Decor).len(), 33);
        assert_eq!(catalog.foliage_palette().len(), 6);
        assert_eq!(catalog.default_piece().key, "straight");
        assert_eq!(catalog.default_piece().connector_type, ConnectorType::Solid);
        assert_eq!(catalog.adapter_piece().key, "pin_connector");
        assert_eq!(catalog.adapter_piece().connector_type, ConnectorType::Pin);
    }

    #[test]
    fn test_library_paths() {
        let catalog = AssetCatalog::embedded();
        let floor = catalog.variant(AssetCategory::Floor, 0).unwrap();
        assert_eq!(floor.display_class, "BP_FloorAsset_Wb_01_C");
        assert_eq!(
            floor.import_path,
            "/WorldBuilder/Core/Actors/Placeable/Library/Floor/BP_FloorAsset_Wb_01.BP_FloorAsset_Wb_01_C"
        );
        assert!(floor.snap_to_grid);

        let straight = catalog.road_piece("straight").unwrap();
        assert_eq!(straight.asset.display_class, "BP_RaceTrack_Wb_02_C");
        assert_eq!(straight.asset.connector_type, Some(ConnectorType::Solid));
        assert_eq!(straight.asset.category, AssetCategory::Track);
    }

    #[test]
    fn test_variant_wraps_around() {
        let catalog = AssetCatalog::embedded();
        let first = catalog.variant(AssetCategory::Wall, 0).unwrap();
        let wrapped = catalog.variant(AssetCategory::Wall, 12).unwrap();
        assert_eq!(first, wrapped);
        assert!(catalog.variant(AssetCategory::Track, 0).is_none());
    }

    #[test]
    fn test_road_piece_by_class() {
        let catalog = AssetCatalog::embedded();
        assert_eq!(catalog.road_piece_by_class("BP_RaceTrack_Wb_14").unwrap().key, "pin_t_junction");
        assert_eq!(catalog.road_piece_by_class("bp_racetrack_wb_04_c").unwrap().key, "turn_90");
        assert!(catalog.road_piece_by_class("BP_RaceTrack_Wb_99").is_none());
    }

    #[test]
    fn test_yaml_round_trip_preserves_catalog() {
        let yaml = serde_yaml::to_string(&AssetCatalog::embedded_file_format()).unwrap();
        let loaded = AssetCatalog::load_from_string(&yaml).unwrap();
        let embedded = AssetCatalog::embedded();

        assert_eq!(loaded.road_pieces().len(), embedded.road_pieces().len());
        assert_eq!(loaded.foliage_palette(), embedded.foliage_palette());
        assert_eq!(
            loaded.road_piece("ramp_spiral").unwrap().elevation_delta,
            embedded.road_piece("ramp_spiral").unwrap().elevation_delta
        );
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::to_string_pretty(&AssetCatalog::embedded_file_format()).unwrap();
        std::fs::write(&path, json).unwrap();

        let catalog = AssetCatalog::load_from_file(&path).unwrap();
        assert_eq!(catalog.adapter_piece().key, "pin_connector");
    }

    #[test]
    fn test_rejects_missing_adapter() {
        let mut file = AssetCatalog::embedded_file_format();
        file.adapter_piece = "missing".to_string();
        assert!(matches!(
            AssetCatalog::from_file_format(file),
            Err(CatalogError::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_solid_adapter() {
        let mut file = AssetCatalog::embedded_file_format();
        file.adapter_piece = "straight".to_string();
        assert!(AssetCatalog::from_file_format(file).is_err());
    }

    #[test]
    fn test_rejects_duplicate_keys_and_bad_lengths() {
        let mut file = AssetCatalog::embedded_file_format();
        let dup = file.road_pieces[0].clone();
        file.road_pieces.push(dup);
        assert!(AssetCatalog::from_file_format(file).is_err());

        let mut file = AssetCatalog::embedded_file_format();
        file.road_pieces[3].length_units = 0.0;
        assert!(AssetCatalog::from_file_format(file).is_err());
    }

    #[test]
    fn test_rejects_empty_category_and_bad_palette() {
        let mut file = AssetCatalog::embedded_file_format();
        file.assets.insert(AssetCategory::Ceiling, Vec::new());
        assert!(AssetCatalog::from_file_format(file).is_err());

        let mut file = AssetCatalog::embedded_file_format();
        file.foliage_palette = vec![40];
        assert!(AssetCatalog::from_file_format(file).is_err());
    }

    #[test]
    fn test_mixed_case_keys_resolve_like_lowercase() {
        let mut file = AssetCatalog::embedded_file_format();
        for piece in &mut file.road_pieces {
            piece.key = piece.key.to_uppercase();
            piece.tags = piece.tags.iter().map(|t| format!(" {} ", t.to_uppercase())).collect();
        }
        file.default_piece = "Straight".to_string();
        file.adapter_piece = "PIN_CONNECTOR".to_string();

        let catalog = AssetCatalog::from_file_format(file).unwrap();
        assert_eq!(catalog.road_piece("straight").unwrap().key, "straight");
        assert_eq!(catalog.road_piece("Turn_90").unwrap().key, "turn_90");
        assert!(catalog.road_piece("s_bend").unwrap().has_tag("s_bend"));
        assert_eq!(catalog.default_piece().key, "straight");
        assert_eq!(catalog.adapter_piece().key, "pin_connector");
    }

    #[test]
    fn test_rejects_keys_equal_ignoring_case() {
        let mut file = AssetCatalog::embedded_file_format();
        let mut dup = file.road_pieces[0].clone();
        dup.key = "STRAIGHT".to_string();
        file.road_pieces.push(dup);
        assert!(matches!(
            AssetCatalog::from_file_format(file),
            Err(CatalogError::InvalidData(_))
        ));
    }

    #[test]
    fn test_invalid_syntax() {
        assert!(matches!(
            AssetCatalog::load_from_string("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
