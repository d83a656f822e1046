use crate::catalog::AssetCatalog;
use crate::config::ComposerSettings;
use crate::data::{Actor, ConnectorType, GridCell, RoadPieceSpec, Transform};
use crate::grid::OccupancyGrid;
use tracing::{debug, warn};

/// Position and heading of the next road socket. Yaw is in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

impl Cursor {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Socket position at the far end of `piece` laid from this cursor
    pub fn advanced_by(&self, piece: &RoadPieceSpec) -> Cursor {
        let heading = self.yaw.to_radians();
        Cursor {
            x: self.x + heading.cos() * piece.length_units,
            y: self.y + heading.sin() * piece.length_units,
            z: self.z + piece.elevation_delta,
            yaw: (self.yaw + piece.curve_degrees).rem_euclid(360.0),
        }
    }

    pub fn distance_to(&self, other: &Cursor) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// How a requested key was matched against the catalog
#[derive(Debug, Clone, Copy)]
pub enum PieceResolution<'c> {
    Exact(&'c RoadPieceSpec),
    ByClass(&'c RoadPieceSpec),
    ByTag(&'c RoadPieceSpec),
    Substituted(&'c RoadPieceSpec),
}

impl<'c> PieceResolution<'c> {
    pub fn spec(&self) -> &'c RoadPieceSpec {
        match *self {
            PieceResolution::Exact(spec)
            | PieceResolution::ByClass(spec)
            | PieceResolution::ByTag(spec)
            | PieceResolution::Substituted(spec) => spec,
        }
    }

    pub fn is_substitution(&self) -> bool {
        matches!(self, PieceResolution::Substituted(_))
    }
}

/// Resolve a planner key: exact key, asset class, then tag intent.
///
/// Tag matches prefer a piece that fits the current socket. Anything else
/// falls back to the default straight piece.
pub fn resolve_piece<'c>(
    catalog: &'c AssetCatalog,
    requested: &str,
    current: ConnectorType,
) -> PieceResolution<'c> {
    let trimmed = requested.trim();
    let key = trimmed.to_lowercase();

    if let Some(spec) = catalog.road_piece(&key) {
        return PieceResolution::Exact(spec);
    }

    if let Some(spec) = catalog.road_piece_by_class(trimmed) {
        return PieceResolution::ByClass(spec);
    }

    let tagged = || catalog.road_pieces().iter().filter(|p| p.has_tag(&key));
    if let Some(spec) = tagged()
        .find(|p| p.connector_type == current)
        .or_else(|| tagged().next())
    {
        return PieceResolution::ByTag(spec);
    }

    PieceResolution::Substituted(catalog.default_piece())
}

/// One emitted piece with the cursor it started and ended at
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    /// Index of the requested key that produced this piece
    pub step: usize,
    pub key: String,
    pub connector: ConnectorType,
    pub adapter: bool,
    pub start: Cursor,
    pub end: Cursor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySubstitution {
    pub step: usize,
    pub requested: String,
    pub substitute: String,
}

#[derive(Debug, Clone, Default)]
pub struct RoadLayout {
    pub actors: Vec<Actor>,
    pub segments: Vec<RoadSegment>,
    pub substitutions: Vec<KeySubstitution>,
    pub adapters_inserted: usize,
}

impl RoadLayout {
    pub fn end_cursor(&self) -> Option<Cursor> {
        self.segments.last().map(|s| s.end)
    }
}

/// Lays road pieces end to end while keeping every joint socket-compatible.
///
/// No closed-loop or self-intersection check is made; the key sequence is
/// responsible for a sensible path.
pub struct RoadWalker<'a> {
    settings: &'a ComposerSettings,
    catalog: &'a AssetCatalog,
    cursor: Cursor,
    connector: ConnectorType,
}

impl<'a> RoadWalker<'a> {
    pub fn new(settings: &'a ComposerSettings, catalog: &'a AssetCatalog, start: Cursor) -> Self {
        Self {
            settings,
            catalog,
            cursor: start,
            connector: catalog.default_piece().connector_type,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn connector(&self) -> ConnectorType {
        self.connector
    }

    pub fn walk<S: AsRef<str>>(mut self, grid: &mut OccupancyGrid, keys: &[S]) -> RoadLayout {
        let mut layout = RoadLayout::default();

        for (step, requested) in keys.iter().enumerate() {
            self.step(grid, step, requested.as_ref(), &mut layout);
        }

        debug!(
            "Road walk finished: {} piece(s), {} adapter(s), end at ({:.1}, {:.1}, {:.1}) yaw {:.1}",
            layout.segments.len(),
            layout.adapters_inserted,
            self.cursor.x,
            self.cursor.y,
            self.cursor.z,
            self.cursor.yaw
        );

        layout
    }

    fn step(&mut self, grid: &mut OccupancyGrid, step: usize, requested: &str, layout: &mut RoadLayout) {
        let catalog = self.catalog;
        let resolution = resolve_piece(catalog, requested, self.connector);
        let spec = resolution.spec();

        if resolution.is_substitution() {
            warn!(
                "Road step {}: unknown piece key '{}', substituting '{}'",
                step, requested, spec.key
            );
            layout.substitutions.push(KeySubstitution {
                step,
                requested: requested.to_string(),
                substitute: spec.key.clone(),
            });
        }

        let adapter = catalog.adapter_piece();
        if spec.connector_type != self.connector && spec.key != adapter.key {
            debug!(
                "Road step {}: {} socket cannot take {} piece '{}', inserting '{}'",
                step, self.connector, spec.connector_type, spec.key, adapter.key
            );
            self.lay(grid, step, adapter, true, layout);
            layout.adapters_inserted += 1;
        }

        self.lay(grid, step, spec, false, layout);
    }

    fn lay(
        &mut self,
        grid: &mut OccupancyGrid,
        step: usize,
        spec: &RoadPieceSpec,
        adapter: bool,
        layout: &mut RoadLayout,
    ) {
        let start = self.cursor;
        let end = start.advanced_by(spec);

        layout.actors.push(Actor::new(
            spec.asset.clone(),
            Transform::at(start.x, start.y, start.z, start.yaw),
        ));
        self.reserve_chord(grid, &start, &end);

        layout.segments.push(RoadSegment {
            step,
            key: spec.key.clone(),
            connector: spec.connector_type,
            adapter,
            start,
            end,
        });

        self.cursor = end;
        self.connector = spec.connector_type;
    }

    /// Reserve the cells under the straight chord from `start` to `end`
    fn reserve_chord(&self, grid: &mut OccupancyGrid, start: &Cursor, end: &Cursor) {
        let unit = self.settings.grid_unit;
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let samples = ((dx * dx + dy * dy).sqrt() / unit).ceil().max(1.0) as usize;

        let mut last: Option<GridCell> = None;
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            let cell = GridCell::from_world(start.x + dx * t, start.y + dy * t, unit);
            if last != Some(cell) {
                grid.reserve(cell, self.settings.road_clearance);
                last = Some(cell);
            }
        }
    }
}
