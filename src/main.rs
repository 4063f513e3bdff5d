use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{error, info, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tt_core::{TileCoord, WorldConfig};
use tt_noise::{synthesize_batch, BatchProgress, TerrainWorld, TtNoisePlugin};
use tt_persistence::{load_config, save_config, ConfigIoError};
use tt_tilemap::{
    LoadedTiles, TileDelivered, TileFailed, TileViewport, TtTilemapPlugin, MAX_VIEWPORT_EDGE,
};

/// Frame pacing for the headless runner.
const FRAME_INTERVAL: Duration = Duration::from_millis(5);

/// Synthesize terrain tiles for a block of the world around a center tile.
#[derive(Parser, Debug)]
#[command(name = "terratile", version, about)]
struct Args {
    /// World config to load (RON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the active world config to this path before synthesizing.
    #[arg(long)]
    save_config: Option<PathBuf>,
    /// Zoom level, clamped to the world's zoom range.
    #[arg(long, default_value_t = 0)]
    zoom: u32,
    /// Center tile column.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    x: i32,
    /// Center tile row.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    y: i32,
    /// Visible columns, before padding.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=MAX_VIEWPORT_EDGE as i64))]
    tiles_wide: u32,
    /// Visible rows, before padding.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=MAX_VIEWPORT_EDGE as i64))]
    tiles_high: u32,
    /// Synthesize the whole block on the rayon pool instead of streaming it.
    #[arg(long)]
    batch: bool,
}

fn main() -> AppExit {
    let args = Args::parse();

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(FRAME_INTERVAL)),
        LogPlugin::default(),
    ));

    let config = match world_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return AppExit::error();
        }
    };

    let mut viewport = match TileViewport::around(
        TileCoord::new(args.x, args.y),
        args.zoom,
        args.tiles_wide,
        args.tiles_high,
        config.streaming.padding,
    ) {
        Ok(viewport) => viewport,
        Err(err) => {
            error!("{}", err);
            return AppExit::error();
        }
    };
    viewport.clamp_zoom(&TerrainWorld::from_config(&config));
    info!(
        "World '{}' (seed {}): {} tiles at zoom {} around {},{}",
        config.name,
        config.seed,
        viewport.len(),
        viewport.zoom,
        args.x,
        args.y
    );

    app.insert_resource(config).insert_resource(viewport);

    if args.batch {
        app.add_plugins(TtNoisePlugin)
            .add_systems(Startup, run_batch);
    } else {
        app.add_plugins(TtTilemapPlugin)
            .add_systems(PostUpdate, (report_tiles, exit_when_settled).chain());
    }

    app.run()
}

fn world_config(args: &Args) -> Result<WorldConfig, ConfigIoError> {
    let config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("Loaded world config from {}", path.display());
            config
        }
        None => {
            let config = WorldConfig::default();
            config.validate()?;
            config
        }
    };

    if let Some(path) = &args.save_config {
        save_config(path, &config)?;
        info!("Saved world config to {}", path.display());
    }

    Ok(config)
}

/// Log every tile as it lands, with its terrain breakdown.
fn report_tiles(
    mut delivered: EventReader<TileDelivered>,
    mut failed: EventReader<TileFailed>,
    loaded: Res<LoadedTiles>,
) {
    for event in delivered.read() {
        if let Some(tile) = loaded.get(event.key) {
            info!("Tile {}: {}", event.key, tile.census());
        }
    }
    for event in failed.read() {
        error!("Tile {} failed: {}", event.key, event.error);
    }
}

fn exit_when_settled(
    viewport: Res<TileViewport>,
    loaded: Res<LoadedTiles>,
    mut exit: EventWriter<AppExit>,
) {
    if loaded.is_settled(&viewport) {
        info!("All {} tiles settled", viewport.len());
        exit.send(AppExit::Success);
    }
}

fn run_batch(
    world: Res<TerrainWorld>,
    viewport: Res<TileViewport>,
    mut exit: EventWriter<AppExit>,
) {
    let requests: Vec<_> = viewport
        .keys_nearest_first()
        .into_iter()
        .map(|key| world.request(key))
        .collect();

    let progress = BatchProgress::new(requests.len());
    let results = synthesize_batch(&requests, world.palette(), &progress);

    for (key, result) in &results {
        if let Ok(tile) = result {
            info!("Tile {}: {}", key, tile.census());
        }
    }
    info!(
        "Batch finished: {} synthesized, {} failed, {} total",
        progress.completed(),
        progress.failed(),
        progress.total()
    );

    if progress.failed() == 0 {
        exit.send(AppExit::Success);
    } else {
        exit.send(AppExit::error());
    }
}
