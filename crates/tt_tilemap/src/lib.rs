use bevy::log::{debug, warn};
use bevy::prelude::*;
use bevy::tasks::{block_on, poll_once, AsyncComputeTaskPool, Task};
use std::collections::{HashMap, HashSet};
use tt_core::{Palette, SynthesisError, TileCoord, TileKey, WorldConfig};
use tt_noise::{synthesize_tile, TerrainWorld, TileRequest, TileResponse, TtNoisePlugin};

/// Widest viewport edge in tiles, padding included.
pub const MAX_VIEWPORT_EDGE: u32 = 256;

/// A viewport the streaming systems refuse to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportError {
    /// One edge spans more than `MAX_VIEWPORT_EDGE` tiles.
    TooLarge { width: u64, height: u64, max: u32 },
    /// `min > max` on some axis.
    Inverted,
}

impl std::fmt::Display for ViewportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge { width, height, max } => write!(
                f,
                "viewport of {}x{} tiles exceeds the maximum edge of {}",
                width, height, max
            ),
            Self::Inverted => write!(f, "viewport range is inverted"),
        }
    }
}

impl std::error::Error for ViewportError {}

/// Tiles wanted on screen at one zoom level, as an inclusive tile range.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TileViewport {
    pub zoom: u32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl TileViewport {
    /// A `tiles_wide` by `tiles_high` block centered on `center`, grown by
    /// `padding` tiles on every side for smooth loading.
    ///
    /// Fails when either padded edge exceeds `MAX_VIEWPORT_EDGE`.
    pub fn around(
        center: TileCoord,
        zoom: u32,
        tiles_wide: u32,
        tiles_high: u32,
        padding: u32,
    ) -> Result<Self, ViewportError> {
        let width = padded_edge(tiles_wide, padding);
        let height = padded_edge(tiles_high, padding);
        if width > MAX_VIEWPORT_EDGE as u64 || height > MAX_VIEWPORT_EDGE as u64 {
            return Err(ViewportError::TooLarge {
                width,
                height,
                max: MAX_VIEWPORT_EDGE,
            });
        }

        let (min_x, max_x) = axis_range(center.x, tiles_wide, padding);
        let (min_y, max_y) = axis_range(center.y, tiles_high, padding);
        Ok(Self {
            zoom,
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Check a viewport built field by field against the same limits as
    /// [`TileViewport::around`].
    pub fn validate(&self) -> Result<(), ViewportError> {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(ViewportError::Inverted);
        }
        let (width, height) = (self.width(), self.height());
        if width > MAX_VIEWPORT_EDGE as u64 || height > MAX_VIEWPORT_EDGE as u64 {
            return Err(ViewportError::TooLarge {
                width,
                height,
                max: MAX_VIEWPORT_EDGE,
            });
        }
        Ok(())
    }

    /// Keep the zoom inside the world's configured bounds.
    pub fn clamp_zoom(&mut self, world: &TerrainWorld) {
        self.zoom = world.clamp_zoom(self.zoom);
    }

    pub fn contains(&self, key: TileKey) -> bool {
        key.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&key.coord.x)
            && (self.min_y..=self.max_y).contains(&key.coord.y)
    }

    pub fn width(&self) -> u64 {
        self.max_x.abs_diff(self.min_x) as u64 + 1
    }

    pub fn height(&self) -> u64 {
        self.max_y.abs_diff(self.min_y) as u64 + 1
    }

    /// Tile count, saturating for ranges no machine could hold.
    pub fn len(&self) -> usize {
        usize::try_from(self.width().saturating_mul(self.height())).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every key in the viewport, row by row.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| {
            (self.min_x..=self.max_x).map(move |x| TileKey::new(self.zoom, TileCoord::new(x, y)))
        })
    }

    /// Every key in the viewport, closest to the center first.
    pub fn keys_nearest_first(&self) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self.keys().collect();
        keys.sort_by_key(|key| self.distance_from_center(key.coord));
        keys
    }

    /// Squared distance in half tiles, so even-sized ranges stay integral.
    fn distance_from_center(&self, coord: TileCoord) -> i64 {
        let dx = 2 * coord.x as i64 - (self.min_x as i64 + self.max_x as i64);
        let dy = 2 * coord.y as i64 - (self.min_y as i64 + self.max_y as i64);
        dx * dx + dy * dy
    }
}

fn padded_edge(tiles: u32, padding: u32) -> u64 {
    tiles.max(1) as u64 + 2 * padding as u64
}

fn axis_range(center: i32, tiles: u32, padding: u32) -> (i32, i32) {
    let tiles = tiles.max(1) as i64;
    let min = center as i64 - tiles / 2 - padding as i64;
    let max = min + tiles - 1 + 2 * padding as i64;
    (clamp_to_i32(min), clamp_to_i32(max))
}

fn clamp_to_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Tile synthesis tasks still running on the async compute pool.
#[derive(Resource, Default)]
pub struct PendingTiles {
    tasks: HashMap<TileKey, Task<Result<TileResponse, SynthesisError>>>,
}

impl PendingTiles {
    /// Start synthesizing one tile in the background.
    pub fn spawn(&mut self, request: TileRequest, palette: &'static dyn Palette) {
        let task = AsyncComputeTaskPool::get().spawn(async move { synthesize_tile(&request, palette) });
        self.tasks.insert(request.key(), task);
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tasks.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Delivered tiles, plus keys whose synthesis was rejected.
#[derive(Resource, Default)]
pub struct LoadedTiles {
    tiles: HashMap<TileKey, TileResponse>,
    failed: HashSet<TileKey>,
}

impl LoadedTiles {
    pub fn get(&self, key: TileKey) -> Option<&TileResponse> {
        self.tiles.get(&key)
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    pub fn has_failed(&self, key: TileKey) -> bool {
        self.failed.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, &TileResponse)> {
        self.tiles.iter()
    }

    /// True once every tile of the viewport has been delivered or rejected.
    pub fn is_settled(&self, viewport: &TileViewport) -> bool {
        viewport
            .keys()
            .all(|key| self.tiles.contains_key(&key) || self.failed.contains(&key))
    }

    fn is_resolved(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key) || self.failed.contains(&key)
    }
}

/// A tile finished and was stored in `LoadedTiles`.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDelivered {
    pub key: TileKey,
}

/// A tile request was rejected; it is not retried while it stays in view.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct TileFailed {
    pub key: TileKey,
    pub error: SynthesisError,
}

/// Spawn tasks for visible tiles that are neither loaded nor in flight,
/// nearest to the viewport center first.
///
/// A viewport outside the size limits dispatches nothing.
pub fn dispatch_visible_tiles(
    viewport: Res<TileViewport>,
    world: Res<TerrainWorld>,
    config: Res<WorldConfig>,
    loaded: Res<LoadedTiles>,
    mut pending: ResMut<PendingTiles>,
) {
    if let Err(err) = viewport.validate() {
        if viewport.is_changed() {
            warn!("Not streaming viewport: {}", err);
        }
        return;
    }

    let budget = config.streaming.max_in_flight.saturating_sub(pending.len());
    if budget == 0 {
        return;
    }

    let wanted: Vec<TileKey> = viewport
        .keys_nearest_first()
        .into_iter()
        .filter(|key| !loaded.is_resolved(*key) && !pending.contains(*key))
        .take(budget)
        .collect();

    for key in wanted {
        debug!("Dispatching tile {}", key);
        pending.spawn(world.request(key), world.palette());
    }
}

/// Collect finished tasks in whatever order they complete.
///
/// Results for keys that left the viewport while in flight are dropped.
pub fn poll_tile_tasks(
    viewport: Res<TileViewport>,
    mut pending: ResMut<PendingTiles>,
    mut loaded: ResMut<LoadedTiles>,
    mut delivered: EventWriter<TileDelivered>,
    mut failed: EventWriter<TileFailed>,
) {
    pending.tasks.retain(|key, task| {
        let Some(result) = block_on(poll_once(task)) else {
            return true;
        };

        if !viewport.contains(*key) {
            warn!("Discarding stale tile {}", key);
            return false;
        }

        match result {
            Ok(response) => {
                loaded.tiles.insert(*key, response);
                delivered.send(TileDelivered { key: *key });
            }
            Err(error) => {
                warn!("Tile {} failed: {}", key, error);
                loaded.failed.insert(*key);
                failed.send(TileFailed { key: *key, error });
            }
        }
        false
    });
}

/// Forget tiles that are no longer in the viewport.
pub fn evict_hidden_tiles(viewport: Res<TileViewport>, mut loaded: ResMut<LoadedTiles>) {
    let before = loaded.tiles.len();
    loaded.tiles.retain(|key, _| viewport.contains(*key));
    loaded.failed.retain(|key| viewport.contains(*key));

    let evicted = before - loaded.tiles.len();
    if evicted > 0 {
        debug!("Evicted {} hidden tiles", evicted);
    }
}

/// Tile streaming plugin for Terratile.
/// Keeps `LoadedTiles` in step with the `TileViewport`.
pub struct TtTilemapPlugin;

impl Plugin for TtTilemapPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<TtNoisePlugin>() {
            app.add_plugins(TtNoisePlugin);
        }

        app.init_resource::<TileViewport>()
            .init_resource::<PendingTiles>()
            .init_resource::<LoadedTiles>()
            .add_event::<TileDelivered>()
            .add_event::<TileFailed>()
            .add_systems(
                Update,
                (dispatch_visible_tiles, poll_tile_tasks, evict_hidden_tiles).chain(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tt_core::TerrainPalette;

    #[derive(Resource, Default)]
    struct Deliveries(Vec<TileKey>);

    fn record_deliveries(mut events: EventReader<TileDelivered>, mut log: ResMut<Deliveries>) {
        log.0.extend(events.read().map(|event| event.key));
    }

    fn test_app(config: WorldConfig, viewport: TileViewport) -> App {
        let mut app = App::new();
        app.insert_resource(config)
            .add_plugins((MinimalPlugins, TtTilemapPlugin))
            .insert_resource(viewport)
            .init_resource::<Deliveries>()
            .add_systems(PostUpdate, record_deliveries);
        app
    }

    fn small_world() -> WorldConfig {
        WorldConfig {
            seed: 2,
            tile_resolution: 8,
            ..Default::default()
        }
    }

    fn run_until_settled(app: &mut App) {
        for _ in 0..2000 {
            app.update();
            let viewport = *app.world().resource::<TileViewport>();
            if app.world().resource::<LoadedTiles>().is_settled(&viewport) {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("viewport never settled");
    }

    #[test]
    fn around_centers_and_pads() {
        let viewport = TileViewport::around(TileCoord::new(10, -3), 4, 3, 1, 1).unwrap();
        assert_eq!((viewport.min_x, viewport.max_x), (8, 12));
        assert_eq!((viewport.min_y, viewport.max_y), (-4, -2));
        assert_eq!(viewport.len(), 15);
        assert!(viewport.contains(TileKey::new(4, TileCoord::new(12, -2))));
        assert!(!viewport.contains(TileKey::new(5, TileCoord::new(10, -3))));
        assert!(!viewport.contains(TileKey::new(4, TileCoord::new(13, -3))));
    }

    #[test]
    fn oversized_viewports_are_rejected() {
        let origin = TileCoord::new(0, 0);
        assert_eq!(
            TileViewport::around(origin, 0, u32::MAX, 1, 1),
            Err(ViewportError::TooLarge {
                width: u32::MAX as u64 + 2,
                height: 3,
                max: MAX_VIEWPORT_EDGE,
            })
        );
        assert!(TileViewport::around(origin, 0, 100_000, 100_000, 0).is_err());
        assert!(TileViewport::around(origin, 0, 1, 1, u32::MAX).is_err());

        let edge = TileViewport::around(origin, 0, MAX_VIEWPORT_EDGE - 2, 1, 1).unwrap();
        assert_eq!(edge.width(), MAX_VIEWPORT_EDGE as u64);
        assert_eq!(edge.validate(), Ok(()));
        assert!(TileViewport::around(origin, 0, MAX_VIEWPORT_EDGE - 1, 1, 1).is_err());
    }

    #[test]
    fn full_range_viewport_measures_without_overflow() {
        let viewport = TileViewport {
            zoom: 0,
            min_x: i32::MIN,
            max_x: i32::MAX,
            min_y: 0,
            max_y: 0,
        };
        assert_eq!(viewport.width(), 1 << 32);
        assert_eq!(viewport.height(), 1);
        assert!(viewport.len() > 0);
        assert!(matches!(
            viewport.validate(),
            Err(ViewportError::TooLarge { .. })
        ));

        let inverted = TileViewport {
            min_x: 3,
            max_x: 1,
            ..Default::default()
        };
        assert_eq!(inverted.validate(), Err(ViewportError::Inverted));
    }

    #[test]
    fn oversized_viewport_dispatches_nothing() {
        let viewport = TileViewport {
            zoom: 0,
            min_x: -100_000,
            max_x: 100_000,
            min_y: -100_000,
            max_y: 100_000,
        };
        let mut app = test_app(small_world(), viewport);
        for _ in 0..3 {
            app.update();
        }
        assert!(app.world().resource::<PendingTiles>().is_empty());
        assert!(app.world().resource::<LoadedTiles>().is_empty());
    }

    #[test]
    fn nearest_tiles_come_first() {
        let viewport = TileViewport::around(TileCoord::new(0, 0), 2, 3, 3, 0).unwrap();
        let keys = viewport.keys_nearest_first();
        assert_eq!(keys[0], TileKey::new(2, TileCoord::new(0, 0)));
        assert_eq!(keys.len(), 9);
        let corner = TileKey::new(2, TileCoord::new(1, 1));
        assert!(keys[5..].contains(&corner));
    }

    #[test]
    fn zoom_is_clamped_to_world_bounds() {
        let world = TerrainWorld::from_config(&WorldConfig {
            min_zoom: 2,
            max_zoom: 5,
            ..Default::default()
        });
        let mut viewport = TileViewport::around(TileCoord::new(0, 0), 9, 1, 1, 0).unwrap();
        viewport.clamp_zoom(&world);
        assert_eq!(viewport.zoom, 5);
    }

    #[test]
    fn streams_every_visible_tile() {
        let viewport = TileViewport::around(TileCoord::new(-1, 2), 3, 3, 2, 0).unwrap();
        let mut app = test_app(small_world(), viewport);
        run_until_settled(&mut app);

        let loaded = app.world().resource::<LoadedTiles>();
        assert_eq!(loaded.len(), viewport.len());

        let world = TerrainWorld::from_config(&small_world());
        for key in viewport.keys() {
            let expected = synthesize_tile(&world.request(key), &TerrainPalette).unwrap();
            assert_eq!(loaded.get(key), Some(&expected));
        }
        assert!(app.world().resource::<PendingTiles>().is_empty());

        // One event per tile, even after more frames.
        app.update();
        let mut delivered = app.world().resource::<Deliveries>().0.clone();
        delivered.sort_by_key(|key| (key.coord.y, key.coord.x));
        assert_eq!(delivered, viewport.keys().collect::<Vec<_>>());
    }

    #[test]
    fn in_flight_tasks_respect_budget() {
        let mut config = small_world();
        config.streaming.max_in_flight = 2;
        let viewport = TileViewport::around(TileCoord::new(0, 0), 1, 4, 4, 0).unwrap();
        let mut app = test_app(config, viewport);

        for _ in 0..2000 {
            app.update();
            assert!(app.world().resource::<PendingTiles>().len() <= 2);
            if app.world().resource::<LoadedTiles>().is_settled(&viewport) {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("viewport never settled");
    }

    #[test]
    fn stale_results_are_discarded() {
        let viewport = TileViewport::around(TileCoord::new(0, 0), 0, 1, 1, 0).unwrap();
        let mut app = test_app(small_world(), viewport);

        let stale = TileKey::new(0, TileCoord::new(50, 50));
        let request = app.world().resource::<TerrainWorld>().request(stale);
        app.world_mut()
            .resource_mut::<PendingTiles>()
            .spawn(request, &TerrainPalette);

        run_until_settled(&mut app);
        for _ in 0..2000 {
            if !app.world().resource::<PendingTiles>().contains(stale) {
                break;
            }
            app.update();
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(!app.world().resource::<PendingTiles>().contains(stale));
        assert!(!app.world().resource::<LoadedTiles>().contains(stale));
        assert!(!app.world().resource::<Deliveries>().0.contains(&stale));
    }

    #[test]
    fn panning_evicts_hidden_tiles() {
        let first = TileViewport::around(TileCoord::new(0, 0), 2, 2, 2, 0).unwrap();
        let mut app = test_app(small_world(), first);
        run_until_settled(&mut app);

        let second = TileViewport::around(TileCoord::new(9, 9), 2, 2, 2, 0).unwrap();
        app.insert_resource(second);
        run_until_settled(&mut app);

        let loaded = app.world().resource::<LoadedTiles>();
        assert_eq!(loaded.len(), second.len());
        assert!(first.keys().all(|key| !loaded.contains(key)));
    }

    #[test]
    fn rejected_tiles_are_not_retried() {
        let key = TileKey::new(0, TileCoord::new(i32::MAX, 0));
        let viewport = TileViewport {
            zoom: 0,
            min_x: i32::MAX,
            max_x: i32::MAX,
            min_y: 0,
            max_y: 0,
        };
        let mut app = test_app(small_world(), viewport);
        run_until_settled(&mut app);

        app.update();
        let loaded = app.world().resource::<LoadedTiles>();
        assert!(loaded.has_failed(key));
        assert!(loaded.is_empty());
        assert!(app.world().resource::<PendingTiles>().is_empty());
    }
}
