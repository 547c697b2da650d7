use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use plantcells::api::{run_server, ApiState};
use plantcells::headless::{run_headless, HeadlessConfig};
use plantcells::{Simulation, SimulationConfig, World};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the HTTP API server instead of a batch run
    #[arg(long)]
    serve: bool,

    /// Port for the API server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Configuration file path (YAML or JSON). If not specified, searches for config.yaml, config.yml, or config.json in current directory.
    #[arg(short, long)]
    config: Option<String>,

    /// Number of steps for a batch run
    #[arg(long, default_value_t = 10_000)]
    steps: u64,

    /// Log population statistics every N steps (0 disables)
    #[arg(long, default_value_t = 100)]
    progress_interval: u64,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Resume from a saved world snapshot
    #[arg(long)]
    load: Option<String>,

    /// Save the final world snapshot (batch run only)
    #[arg(long)]
    save: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if args.serve {
        serve_main(args, config, rng).await
    } else {
        let headless = HeadlessConfig {
            steps: args.steps,
            progress_interval: args.progress_interval,
            load_state_path: args.load,
            save_state_path: args.save,
        };
        // The batch loop is CPU-bound; keep it off the async workers.
        let world = tokio::task::spawn_blocking(move || {
            run_headless(&headless, config, &mut rng)
        })
        .await??;
        log::info!(
            "Finished at step {} with {} plants",
            world.age(),
            world.population()
        );
        Ok(())
    }
}

/// Load configuration from file or use default
fn load_config(config_path: Option<&str>) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        // User specified a config file
        SimulationConfig::from_file(path)
            .map_err(|e| format!("Failed to load config from {}: {}", path, e).into())
    } else {
        // Try default paths
        Ok(SimulationConfig::from_default_paths())
    }
}

/// API mode - runs HTTP server
async fn serve_main(
    args: Args,
    config: SimulationConfig,
    mut rng: StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    let world = match &args.load {
        Some(path) => {
            log::info!(
                "Using the configuration stored in {}; the supplied configuration is ignored",
                path
            );
            World::from_snapshot(plantcells::snapshot::load_snapshot(path)?)?
        }
        None => World::new(config, &mut rng)?,
    };
    let api_state = ApiState::with_rng(Simulation::from_world(world), rng);
    run_server(api_state, args.port).await
}
