// Population diagnostics computed from a world snapshot in time

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;

use crate::world::World;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PopulationStats {
    pub step: u64,

    // Population
    pub population: usize,
    pub occupied_fraction: f64,
    pub lineages: usize, // distinct genome colors, a rough relatedness proxy

    // Energy
    pub total_energy: f64,
    pub mean_energy: f64,
    pub age_cost: f64,
    pub inbound_energy: f64,

    // Age
    pub mean_age: f64,
    pub max_age: u64,

    // Grid
    pub mean_nutrients: Vec<f64>, // per nutrient kind
    pub broadcasting: usize,      // cells with the info bit set
}

impl PopulationStats {
    pub fn from_world(world: &World) -> Self {
        let agents = world.agents();
        let grid = world.grid();
        let population = agents.len();

        let (total_energy, total_age, max_age) = agents
            .par_iter()
            .map(|p| (p.energy, p.age, p.age))
            .reduce(
                || (0.0, 0u64, 0u64),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2.max(b.2)),
            );

        let lineages = agents
            .iter()
            .map(|p| p.genome.color())
            .collect::<HashSet<_>>()
            .len();

        let cells = grid.cell_count();
        let kinds = grid.num_nutrients();
        let mean_nutrients = (0..kinds)
            .into_par_iter()
            .map(|k| {
                grid.nutrients.iter().skip(k).step_by(kinds).sum::<f64>() / cells as f64
            })
            .collect();

        let (mean_energy, mean_age) = if population > 0 {
            (
                total_energy / population as f64,
                total_age as f64 / population as f64,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            step: world.age(),
            population,
            occupied_fraction: population as f64 / cells as f64,
            lineages,
            total_energy,
            mean_energy,
            age_cost: world.world_age_cost(),
            inbound_energy: grid.inbound_energy.par_iter().sum(),
            mean_age,
            max_age,
            mean_nutrients,
            broadcasting: grid.info.par_iter().filter(|&&b| b).count(),
        }
    }

    /// Log at INFO level, with the population change since `prev` if given.
    pub fn log(&self, prev: Option<&PopulationStats>) {
        let delta = prev
            .map(|p| format!(" ({:+})", self.population as i64 - p.population as i64))
            .unwrap_or_default();
        log::info!(
            "step {} | plants {}{} ({:.1}% of cells) | lineages {} | energy mean {:.3} total {:.1} | age mean {:.1} max {} | age cost {:.3}",
            self.step,
            self.population,
            delta,
            self.occupied_fraction * 100.0,
            self.lineages,
            self.mean_energy,
            self.total_energy,
            self.mean_age,
            self.max_age,
            self.age_cost,
        );
        log::debug!(
            "step {} | nutrients {:?} | broadcasting {} | inbound energy {:.3}",
            self.step,
            self.mean_nutrients,
            self.broadcasting,
            self.inbound_energy,
        );
    }
}
