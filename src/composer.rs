use crate::buildings::BuildingPlacer;
use crate::catalog::AssetCatalog;
use crate::config::ComposerSettings;
use crate::data::{Actor, GridCell, Scene};
use crate::error::{ComposeError, Resource};
use crate::foliage::{scatter_area, FoliageScatter};
use crate::grid::OccupancyGrid;
use crate::intent::SceneIntent;
use crate::road::{Cursor, KeySubstitution, RoadSegment, RoadWalker};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened during one composition, alongside the scene itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionReport {
    pub buildings_placed: usize,
    pub building_anchors: Vec<GridCell>,
    pub road_pieces: usize,
    pub adapters_inserted: usize,
    pub road_segments: Vec<RoadSegment>,
    pub substitutions: Vec<KeySubstitution>,
    pub foliage_placed: usize,
    pub dropped_actors: usize,
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub scene: Scene,
    pub report: CompositionReport,
    /// Cells reserved by buildings and road; foliage never lands on these
    pub occupancy: OccupancyGrid,
}

/// Turns a validated intent into a scene.
///
/// Holds only immutable state, so one instance can be shared across threads.
/// Every call builds its own occupancy grid.
#[derive(Debug, Clone)]
pub struct SceneComposer {
    catalog: Arc<AssetCatalog>,
    settings: ComposerSettings,
}

impl SceneComposer {
    pub fn new(catalog: Arc<AssetCatalog>, settings: ComposerSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    /// Compose using the intent's seed, or a fresh random one when it has none
    pub fn compose(&self, intent: &SceneIntent) -> Result<Composition, ComposeError> {
        let seed = intent.seed.unwrap_or_else(rand::random);
        self.compose_with_seed(intent, seed)
    }

    pub fn compose_with_seed(
        &self,
        intent: &SceneIntent,
        seed: u64,
    ) -> Result<Composition, ComposeError> {
        intent.validate(&self.settings)?;
        let environment = intent.environment.resolve()?;

        let settings = &self.settings;
        let catalog = self.catalog.as_ref();
        let mut grid = OccupancyGrid::new();
        let mut report = CompositionReport::default();

        // Buildings
        let buildings =
            BuildingPlacer::new(settings, catalog).place_all(&mut grid, &intent.building_specs())?;
        report.buildings_placed = buildings.len();
        report.building_anchors = buildings.iter().map(|b| b.anchor).collect();
        let building_actors: Vec<Actor> = buildings.into_iter().flat_map(|b| b.actors).collect();
        self.check_actor_cap(building_actors.len(), "after building placement")?;

        // Road
        let start = self.road_start(&grid);
        let layout = RoadWalker::new(settings, catalog, start).walk(&mut grid, &intent.road_keys());
        report.road_pieces = layout.actors.len();
        report.adapters_inserted = layout.adapters_inserted;
        report.road_segments = layout.segments;
        report.substitutions = layout.substitutions;
        self.check_actor_cap(
            building_actors.len() + layout.actors.len(),
            "after road layout",
        )?;

        // Foliage
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let area = scatter_area(&grid, settings.foliage_margin);
        let foliage = FoliageScatter::new(settings, catalog).scatter(
            &grid,
            area,
            intent.forest_density,
            building_actors.len() + layout.actors.len(),
            &mut rng,
        )?;
        report.foliage_placed = foliage.len();

        // Assembly
        let produced = building_actors.len() + layout.actors.len() + foliage.len();
        let actors: Vec<Actor> = building_actors
            .into_iter()
            .chain(layout.actors)
            .chain(foliage)
            .filter(is_resolved)
            .collect();
        report.dropped_actors = produced - actors.len();
        if report.dropped_actors > 0 {
            warn!("Dropped {} unresolved actor(s)", report.dropped_actors);
        }
        self.check_actor_cap(actors.len(), "scene assembly")?;

        info!(
            "Composed scene (seed {}): {} building(s), {} road piece(s) with {} adapter(s), {} foliage, {} actor(s) total",
            seed,
            report.buildings_placed,
            report.road_pieces,
            report.adapters_inserted,
            report.foliage_placed,
            actors.len()
        );

        Ok(Composition {
            scene: Scene {
                actors,
                lighting: environment.lighting,
                fog: environment.fog,
                rule_flags: intent.rules,
                seed,
            },
            report,
            occupancy: grid,
        })
    }

    /// Road starts east of everything the buildings reserved
    fn road_start(&self, grid: &OccupancyGrid) -> Cursor {
        match grid.bounds() {
            Some(bounds) => {
                let x = (bounds.max_x + self.settings.road_start_margin) as f64 * self.settings.grid_unit;
                Cursor::new(x, 0.0, 0.0, 0.0)
            }
            None => Cursor::origin(),
        }
    }

    fn check_actor_cap(&self, count: usize, stage: &str) -> Result<(), ComposeError> {
        if count > self.settings.max_actors {
            return Err(ComposeError::capacity(
                Resource::Actors,
                count,
                self.settings.max_actors,
                stage,
            ));
        }
        Ok(())
    }
}

fn is_resolved(actor: &Actor) -> bool {
    !actor.asset.display_class.is_empty() && !actor.asset.import_path.is_empty()
}
