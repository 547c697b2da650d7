// Plant cell agent: per-tick sensing, deciding, paying and dying

use rand::Rng;

use crate::config::{SimulationConfig, INPUT_SIZE};
use crate::genome::Genome;
use crate::grid::{Direction, Grid, Location};
use crate::network;

/// Actions a plant commits to for one tick, indexed clockwise from Up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decisions {
    pub reproduce: [bool; 4],
    pub send_energy: [f64; 4],
    pub info: bool,
}

impl Decisions {
    /// Decode raw network outputs. Logits at or above 0.5 count as "on";
    /// negative energy amounts are clamped to zero.
    pub fn from_outputs(out: &[f64]) -> Self {
        let mut decisions = Decisions::default();
        for i in 0..4 {
            decisions.reproduce[i] = out[i] >= 0.5;
            decisions.send_energy[i] = out[4 + i].max(0.0);
        }
        decisions.info = out[8] >= 0.5;
        decisions
    }

    pub fn reproduction_count(&self) -> usize {
        self.reproduce.iter().filter(|&&r| r).count()
    }

    pub fn energy_sent(&self) -> f64 {
        self.send_energy.iter().sum()
    }
}

#[derive(Clone, Debug)]
pub struct PlantCell {
    pub location: Location,
    pub genome: Genome,
    pub energy: f64,
    pub age: u64,
    pub alive: bool,
    last_decision: Vec<f64>,
}

impl PlantCell {
    pub fn new(location: Location, genome: Genome, energy: f64) -> Self {
        Self {
            location,
            genome,
            energy,
            age: 0,
            alive: true,
            last_decision: Vec::new(),
        }
    }

    /// Raw network output from the most recent tick.
    pub fn last_decision(&self) -> &[f64] {
        &self.last_decision
    }

    pub(crate) fn restore_state(&mut self, energy: f64, age: u64) {
        self.energy = energy;
        self.age = age;
    }

    /// Run one tick against the grid. Reads neighbor occupancy and the info
    /// bits committed last step, and pulls nutrients from this cell only if
    /// the plant can afford the tick. A plant that cannot is marked dead and
    /// its decisions come back empty.
    pub fn choices(&mut self, grid: &mut Grid, config: &SimulationConfig) -> Decisions {
        let here = grid.index(self.location);
        let light = grid.light[here];
        let mut income = light;
        if config.feed_inbound_energy {
            income += grid.inbound_energy[here];
        }

        self.energy += income;
        self.age += 1;
        let age_cost = config.age_cost(light, self.age);

        let mut inputs = [0.0; INPUT_SIZE];
        inputs[0] = self.energy;
        inputs[1] = age_cost;
        for (i, dir) in Direction::ALL.into_iter().enumerate() {
            let n = grid.index(grid.neighbor(self.location, dir));
            inputs[2 + i] = if grid.occupancy[n] { 1.0 } else { 0.0 };
            inputs[6 + i] = if grid.info[n] { 1.0 } else { 0.0 };
        }

        self.last_decision = network::evaluate(self.genome.weights(), &inputs);
        let decisions = Decisions::from_outputs(&self.last_decision);

        let mut cost = age_cost;
        cost += decisions.reproduction_count() as f64 * config.reproduction_cost;
        cost += decisions.energy_sent() * (1.0 + config.energy_sending_cost);
        if decisions.info {
            cost += config.info_sending_cost;
        }
        self.energy -= cost;

        let scale = cost * config.nutrient_greed;
        let tentative: Vec<f64> = grid
            .nutrients_at(self.location)
            .iter()
            .zip(self.genome.nutrition())
            .map(|(have, share)| have - scale * share)
            .collect();

        if self.energy < 0.0 || tentative.iter().any(|&n| n < 0.0) {
            self.alive = false;
            return Decisions::default();
        }

        grid.nutrients_at_mut(self.location).copy_from_slice(&tentative);
        self.energy -= self.energy * config.energy_cost_dissipation * config.sun_energy;

        decisions
    }

    /// Accidents and predation: dies with probability `chance` regardless of
    /// how the tick went. Returns true if this call killed the plant.
    pub fn roll_random_death<R: Rng + ?Sized>(&mut self, chance: f64, rng: &mut R) -> bool {
        if self.alive && rng.gen::<f64>() < chance {
            self.alive = false;
            return true;
        }
        false
    }
}
