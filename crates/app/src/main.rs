use std::{path::PathBuf, time::Instant};

use clap::{Parser, Subcommand};
use gesture_sculpt_core::{
    AppConfig, JsonFileStore, PixelSource, SculptSession, SnapshotStore, WorldStore,
};
use tracing_subscriber::EnvFilter;

mod replay;

use replay::Recording;

fn main() -> gesture_sculpt_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            recording,
            config,
            frame,
            world,
        } => run_replay(&recording, config.as_ref(), frame.as_ref(), world),
        Commands::Show { config, world } => run_show(config.as_ref(), world),
    }
}

fn load_config(
    path: Option<&PathBuf>,
    world: Option<PathBuf>,
) -> gesture_sculpt_core::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if let Some(world) = world {
        config.persistence.snapshot_path = world;
    }
    Ok(config)
}

fn run_replay(
    recording: &PathBuf,
    config: Option<&PathBuf>,
    frame: Option<&PathBuf>,
    world: Option<PathBuf>,
) -> gesture_sculpt_core::Result<()> {
    let config = load_config(config, world)?;
    tracing::info!(?recording, snapshot = ?config.persistence.snapshot_path, "replaying recording");

    let recording = Recording::from_path(recording)?;
    let pixels = frame.map(|path| image::open(path).map(|img| img.to_rgb8())).transpose()?;

    let store = JsonFileStore::new(&config.persistence.snapshot_path);
    let (mut session, origin) = SculptSession::open(&config, Box::new(store), None);
    tracing::info!(?origin, voxels = session.world().len(), "world ready");

    let summary = replay::replay(
        &mut session,
        &recording,
        pixels.as_ref().map(|img| img as &dyn PixelSource),
        Instant::now(),
    );
    session.flush()?;

    tracing::info!(
        frames = summary.frames,
        emitted = summary.emitted,
        edits = summary.edits,
        mode = %session.mode(),
        color = %session.selected_color(),
        "replay finished"
    );
    print_world(session.world());
    Ok(())
}

fn run_show(config: Option<&PathBuf>, world: Option<PathBuf>) -> gesture_sculpt_core::Result<()> {
    let config = load_config(config, world)?;
    let store = JsonFileStore::new(&config.persistence.snapshot_path);
    let records = store.load()?.unwrap_or_default();
    print_world(&WorldStore::from_records(records));
    Ok(())
}

fn print_world(world: &WorldStore) {
    println!("{} voxel(s)", world.len());
    for voxel in world.snapshot() {
        println!("{:>12}  {}", voxel.id(), voxel.color);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Sculpt a voxel world with hand gestures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay recorded hand landmarks through the editor and save the result.
    Replay {
        /// JSON recording of detector frames and UI commands.
        recording: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Still image used as the camera frame for color sampling.
        #[arg(short, long)]
        frame: Option<PathBuf>,
        /// World snapshot path, overriding the configuration.
        #[arg(short, long)]
        world: Option<PathBuf>,
    },
    /// Print the persisted world snapshot.
    Show {
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// World snapshot path, overriding the configuration.
        #[arg(short, long)]
        world: Option<PathBuf>,
    },
}
