use std::path::PathBuf;

use clap::Parser;
use karst::{EngineConfig, ViewerPose, WorldPipeline};
use karst_geom::Vec3;

#[derive(Parser, Debug)]
#[command(name = "karst", version, about = "Karst voxel world engine (headless runner)")]
struct Cli {
    /// Engine config (TOML); defaults apply when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured world seed
    #[arg(long)]
    seed: Option<u32>,

    /// Override the configured activation distance
    #[arg(long, value_name = "UNITS")]
    activation_distance: Option<f32>,

    /// Save directory root
    #[arg(long, value_name = "DIR", default_value = "Saves")]
    saves_root: PathBuf,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Viewer speed along +X, world units per second
    #[arg(long, default_value_t = 20.0)]
    walk_speed: f32,

    /// Log to a file; optional path (defaults to karst.log if omitted)
    #[arg(long, num_args = 0..=1, value_name = "PATH", default_missing_value = "karst.log")]
    log_file: Option<String>,
}

fn init_logging(log_file: Option<String>) {
    if let Some(path) = log_file {
        let level = match std::env::var("RUST_LOG")
            .ok()
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => simplelog::LevelFilter::Trace,
            "debug" => simplelog::LevelFilter::Debug,
            "warn" => simplelog::LevelFilter::Warn,
            "error" => simplelog::LevelFilter::Error,
            _ => simplelog::LevelFilter::Info,
        };
        let config = simplelog::ConfigBuilder::new()
            .set_target_level(simplelog::LevelFilter::Info)
            .build();
        match std::fs::File::create(&path) {
            Ok(file) => {
                let _ = simplelog::WriteLogger::init(level, config, file);
                eprintln!("Logging to file: {path} (level: {level:?})");
            }
            Err(e) => {
                eprintln!("Failed to open log file {path}: {e}. Falling back to stderr.");
                env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                    .init();
            }
        }
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_file.clone());

    let mut cfg = match &cli.config {
        Some(path) => EngineConfig::load_from_path(path).unwrap_or_else(|e| {
            log::warn!("config load failed ({path:?}): {e}; using defaults");
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        cfg.world_seed = seed;
    }
    if let Some(dist) = cli.activation_distance {
        cfg.chunk_activation_distance = dist;
    }

    log::info!(
        "starting world: seed={} activation={} hsr={}",
        cfg.world_seed,
        cfg.chunk_activation_distance,
        cfg.enable_hidden_surface_removal
    );

    let mut world = WorldPipeline::new(&cfg, cli.saves_root.clone());
    let dt = 1.0 / 60.0;
    let mut pose = ViewerPose {
        position: Vec3::new(0.0, 0.0, 90.0),
        forward: Vec3::new(1.0, 0.0, -0.5).normalized(),
    };

    for frame in 0..cli.frames {
        pose.position.x += cli.walk_speed * dt;
        let stats = world.update(&pose, &[]);
        if frame % 60 == 0 {
            log::info!(
                "frame {frame}: pos=({:.0},{:.0}) active={} queued={} harvested={} light_steps={} meshed={}",
                pose.position.x,
                pose.position.y,
                world.active_count(),
                world.queued_count(),
                stats.harvested,
                stats.light_steps,
                stats.meshes_rebuilt
            );
        }
        std::thread::sleep(std::time::Duration::from_secs_f32(dt));
    }

    log::info!(
        "shutting down: saving {} active chunks as needed",
        world.active_count()
    );
    world.deactivate_all();
}
