// Headless batch runner for long runs without the API server

use std::time::Instant;

use rand::Rng;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::metrics::PopulationStats;
use crate::snapshot::{self, WorldSnapshot};
use crate::world::World;

#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub steps: u64,
    pub progress_interval: u64,
    pub load_state_path: Option<String>,
    pub save_state_path: Option<String>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            steps: 10_000,
            progress_interval: 100,
            load_state_path: None,
            save_state_path: None,
        }
    }
}

/// Run `steps` steps (or until every plant is dead) and return the final
/// world. A loaded snapshot brings its own configuration.
pub fn run_headless<R: Rng>(
    headless: &HeadlessConfig,
    config: SimulationConfig,
    rng: &mut R,
) -> Result<World> {
    let mut world = match &headless.load_state_path {
        Some(path) => {
            let world = World::from_snapshot(snapshot::load_snapshot(path)?)?;
            log::info!(
                "Using the configuration stored in {}; the supplied configuration is ignored",
                path
            );
            log::info!(
                "Loaded state from {} at step {} with {} plants",
                path,
                world.age(),
                world.population()
            );
            world
        }
        None => World::new(config, rng)?,
    };

    log::info!(
        "Headless run started: {} steps on {}x{}",
        headless.steps,
        world.config.rows,
        world.config.cols
    );

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_report_step = 0u64;
    let mut prev_stats: Option<PopulationStats> = None;

    for step in 0..headless.steps {
        world.step(rng);
        let done = step + 1;

        if headless.progress_interval > 0 && done % headless.progress_interval == 0 {
            let stats = PopulationStats::from_world(&world);
            stats.log(prev_stats.as_ref());

            let total_rate = done as f64 / started.elapsed().as_secs_f64().max(1e-6);
            let window_rate = (done - last_report_step) as f64
                / last_report.elapsed().as_secs_f64().max(1e-6);
            let remaining = headless.steps.saturating_sub(done);
            let eta_min = if total_rate > 1e-6 {
                remaining as f64 / total_rate / 60.0
            } else {
                0.0
            };
            log::info!(
                "Headless progress: {}/{} | steps/s={:.0} (window {:.0}) | ETA={:.1} min",
                done,
                headless.steps,
                total_rate,
                window_rate,
                eta_min,
            );

            prev_stats = Some(stats);
            last_report = Instant::now();
            last_report_step = done;
        }

        if world.population() == 0 {
            log::info!("Population extinct at step {}", world.age());
            break;
        }
    }

    if let Some(path) = &headless.save_state_path {
        snapshot::save_snapshot(path, &WorldSnapshot::capture(&world))?;
        log::info!("Saved final state to {}", path);
    }

    Ok(world)
}
