use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::{error, LevelFilter};

use bioscape::components::cells::{AmbientParticleField, CellFieldConfig};
use bioscape::components::helix::structure::Complexity;
use bioscape::components::helix::{HelixConfig, InteractiveHelixViewer};
use bioscape::window::{run, ViewerOptions};

#[derive(Parser, Debug)]
#[command(name = "bioscape", version, about = "Decorative biology backdrops in a window")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Window width in logical pixels
    #[arg(long, default_value_t = 1280, global = true)]
    width: u32,

    /// Window height in logical pixels
    #[arg(long, default_value_t = 720, global = true)]
    height: u32,

    /// Increase verbosity (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slowly drifting blood cells that follow page scroll.
    Cells(CellsArgs),
    /// Rotating DNA double helix you can orbit, explode and inspect.
    Helix(HelixArgs),
}

#[derive(Args, Debug)]
struct CellsArgs {
    /// Number of cells
    #[arg(long, default_value_t = 2)]
    count: usize,

    /// Base swim speed
    #[arg(long, default_value_t = 0.3)]
    speed: f32,

    /// Cell radius in world units
    #[arg(long, default_value_t = 60.0)]
    size: f32,

    /// Seed for reproducible motion
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct HelixArgs {
    /// Start with the low-detail helix
    #[arg(long)]
    simple: bool,

    /// Initial rotation speed (0 to 3)
    #[arg(long, default_value_t = 0.5)]
    speed: f32,

    /// Seed for the exploded layout
    #[arg(long)]
    seed: Option<u64>,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(level_for(cli.verbose))
        .parse_default_env()
        .init();

    let options = ViewerOptions::new().with_size(cli.width, cli.height);

    let result = match cli.command {
        Commands::Cells(args) => {
            let mut config = CellFieldConfig::new()
                .with_cell_count(args.count)
                .with_speed(args.speed)
                .with_cell_size(args.size);
            if let Some(seed) = args.seed {
                config = config.with_seed(seed);
            }
            run(AmbientParticleField::new(config), options)
        }
        Commands::Helix(args) => {
            let complexity = if args.simple { Complexity::Low } else { Complexity::High };
            let mut config = HelixConfig::new().with_complexity(complexity).with_speed(args.speed);
            if let Some(seed) = args.seed {
                config = config.with_seed(seed);
            }
            run(InteractiveHelixViewer::new(config), options)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
