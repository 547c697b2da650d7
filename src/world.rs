// World: owns the grid arrays and the plant population, drives the step

use rand::seq::index::sample;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::genome::Genome;
use crate::grid::{Direction, Grid, Location};
use crate::plant::PlantCell;

/// Energy every plant starts with, seeded or born.
pub const INITIAL_ENERGY: f64 = 1.0;

/// What happened during one call to [`World::step`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: u64,
    pub births: usize,
    pub starvations: usize,
    pub random_deaths: usize,
    pub failed_births: usize,
    pub population: usize,
}

pub struct World {
    pub config: SimulationConfig,
    grid: Grid,
    agents: Vec<PlantCell>,
    age: u64,
}

impl World {
    /// Validated world seeded with `starting_population` random genomes at
    /// distinct cells.
    pub fn new<R: Rng + ?Sized>(config: SimulationConfig, rng: &mut R) -> Result<Self> {
        let mut world = Self::empty(config)?;
        let cells = world.grid.cell_count();
        let picks = sample(rng, cells, world.config.starting_population);
        for idx in picks.into_iter() {
            let genome = Genome::create_random(&world.config, rng);
            let loc = world.grid.location(idx);
            world.place(loc, genome, INITIAL_ENERGY);
        }
        log::info!(
            "World created: {}x{} grid, {} nutrient kinds, {} plants",
            world.config.rows,
            world.config.cols,
            world.config.num_nutrients,
            world.agents.len()
        );
        Ok(world)
    }

    /// Validated world with no plants.
    pub fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid: Grid::new(&config),
            config,
            agents: Vec::new(),
            age: 0,
        })
    }

    pub(crate) fn from_parts(
        config: SimulationConfig,
        grid: Grid,
        agents: Vec<PlantCell>,
        age: u64,
    ) -> Self {
        Self {
            config,
            grid,
            agents,
            age,
        }
    }

    /// Put a plant on a free cell. Returns false if the cell is taken or
    /// outside the grid, or if the genome does not fit the configuration.
    pub fn place(&mut self, loc: Location, genome: Genome, energy: f64) -> bool {
        if loc.row >= self.grid.rows() || loc.col >= self.grid.cols() {
            return false;
        }
        if let Some(reason) = genome.mismatch(&self.config) {
            log::warn!("Refusing plant at {:?}: {}", loc, reason);
            return false;
        }
        let idx = self.grid.index(loc);
        if self.grid.occupancy[idx] {
            return false;
        }
        self.grid.occupancy[idx] = true;
        self.agents.push(PlantCell::new(loc, genome, energy));
        true
    }

    /// Advance the world by one step.
    ///
    /// Plants run in a fresh random order. Occupancy and nutrients change in
    /// place, so later plants see births, deaths and depletion caused by
    /// earlier ones. Info bits and sent energy go into next-step buffers and
    /// only become visible after the step.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepReport {
        self.age += 1;
        self.grid.restore_nutrients(self.config.nutrient_restore);

        let mut report = StepReport {
            step: self.age,
            ..StepReport::default()
        };

        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        order.shuffle(rng);

        let cells = self.grid.cell_count();
        let mut next_info = vec![false; cells];
        let mut next_inbound = vec![0.0; cells];
        let mut newborns: Vec<PlantCell> = Vec::new();

        let grid = &mut self.grid;
        let config = &self.config;
        for idx in order {
            let plant = &mut self.agents[idx];
            let decisions = plant.choices(grid, config);
            let starved = !plant.alive;
            let accident = plant.roll_random_death(config.death_chance, rng);

            let here = grid.index(plant.location);
            if starved {
                report.starvations += 1;
            } else if accident {
                report.random_deaths += 1;
            }
            if !plant.alive {
                grid.occupancy[here] = false;
            }

            for (i, dir) in Direction::ALL.into_iter().enumerate() {
                let target = grid.neighbor(plant.location, dir);
                let t = grid.index(target);
                if decisions.reproduce[i] && !grid.occupancy[t] {
                    match plant.genome.mutate(&config.mutation, rng) {
                        Ok(genome) => {
                            newborns.push(PlantCell::new(target, genome, INITIAL_ENERGY));
                            grid.occupancy[t] = true;
                            report.births += 1;
                        }
                        Err(e) => {
                            log::warn!("Birth at {:?} abandoned: {}", target, e);
                            report.failed_births += 1;
                        }
                    }
                }
                next_inbound[t] += decisions.send_energy[i];
            }
            next_info[here] = decisions.info;
        }

        self.grid.info = next_info;
        self.grid.inbound_energy = next_inbound;
        self.agents.retain(|p| p.alive);
        self.agents.extend(newborns);

        report.population = self.agents.len();
        log::debug!("{:?}", report);
        report
    }

    /// Location and color of every living plant, for drawing.
    pub fn active_agents(&self) -> Vec<(Location, [u8; 3])> {
        self.agents
            .iter()
            .map(|p| (p.location, p.genome.color()))
            .collect()
    }

    pub fn agents(&self) -> &[PlantCell] {
        &self.agents
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    /// Aging tax currently charged to a plant as old as the world.
    pub fn world_age_cost(&self) -> f64 {
        self.config.age_cost(self.config.sun_energy, self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MutationConfig, INPUT_SIZE};
    use crate::error::SimError;
    use crate::network::Matrix;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn quiet_config(rows: usize, cols: usize) -> SimulationConfig {
        SimulationConfig {
            rows,
            cols,
            num_nutrients: 2,
            starting_population: 0,
            sun_energy: 0.0,
            nutrient_restore: 0.0,
            nutrient_greed: 0.1,
            death_chance: 0.0,
            reproduction_cost: 0.5,
            genome_layers: vec![(INPUT_SIZE, 9)],
            mutation: MutationConfig {
                noise_scale: 0.0,
                displacement_probability: 0.0,
            },
            ..SimulationConfig::default()
        }
    }

    fn inert_genome() -> Genome {
        Genome::from_parts(vec![Matrix::zeros(INPUT_SIZE, 9)], vec![0.5, 0.5])
    }

    /// Outputs listed in `outputs` saturate whenever energy is positive.
    fn energy_driven(outputs: &[usize]) -> Genome {
        let mut w = Matrix::zeros(INPUT_SIZE, 9);
        for &o in outputs {
            w.set(0, o, 10.0);
        }
        Genome::from_parts(vec![w], vec![0.75, 0.25])
    }

    fn assert_occupancy_consistent(world: &World) {
        let grid = world.grid();
        assert_eq!(grid.occupied_count(), world.population());
        let mut seen = HashSet::new();
        for plant in world.agents() {
            assert!(seen.insert(plant.location), "two plants share {:?}", plant.location);
            assert!(grid.is_occupied(plant.location));
        }
    }

    #[test]
    fn broken_genome_chain_fails_at_construction() {
        let config = SimulationConfig {
            genome_layers: vec![(INPUT_SIZE, 9), (8, 9)],
            ..quiet_config(4, 4)
        };
        assert!(matches!(
            World::empty(config),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn seeding_places_distinct_plants() {
        let config = SimulationConfig {
            starting_population: 30,
            ..quiet_config(6, 6)
        };
        let mut rng = StdRng::seed_from_u64(42);
        let world = World::new(config, &mut rng).unwrap();
        assert_eq!(world.population(), 30);
        assert!(world.agents().iter().all(|p| p.energy == INITIAL_ENERGY));
        assert_occupancy_consistent(&world);
    }

    #[test]
    fn place_refuses_taken_or_outside_cells() {
        let mut world = World::empty(quiet_config(3, 3)).unwrap();
        assert!(world.place(Location::new(1, 1), inert_genome(), 1.0));
        assert!(!world.place(Location::new(1, 1), inert_genome(), 1.0));
        assert!(!world.place(Location::new(3, 0), inert_genome(), 1.0));
        assert_eq!(world.population(), 1);
    }

    #[test]
    fn place_refuses_genomes_that_do_not_fit() {
        let mut world = World::empty(quiet_config(3, 3)).unwrap();
        let wide = Genome::from_parts(vec![Matrix::zeros(12, 9)], vec![0.5, 0.5]);
        let short = Genome::from_parts(vec![Matrix::zeros(INPUT_SIZE, 9)], vec![1.0]);
        assert!(!world.place(Location::new(0, 0), wide, 1.0));
        assert!(!world.place(Location::new(0, 0), short, 1.0));
        assert_eq!(world.population(), 0);
        assert!(!world.grid().is_occupied(Location::new(0, 0)));

        // Nothing was admitted, so stepping is safe.
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(world.step(&mut rng).population, 0);
    }

    #[test]
    fn idle_plant_without_sun_lives_forever() {
        let mut world = World::empty(quiet_config(4, 4)).unwrap();
        world.place(Location::new(0, 0), inert_genome(), 1.0);
        let occupancy_before = world.grid().occupancy.clone();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..200 {
            let report = world.step(&mut rng);
            assert_eq!(report.births, 0);
        }
        assert_eq!(world.population(), 1);
        assert_eq!(world.agents()[0].energy, 1.0);
        assert_eq!(world.agents()[0].age, 200);
        assert_eq!(world.grid().occupancy, occupancy_before);
        assert_eq!(world.age(), 200);
    }

    #[test]
    fn single_reproduction_lands_on_wrapped_cell() {
        let mut world = World::empty(quiet_config(3, 3)).unwrap();
        let parent_loc = Location::new(0, 0);
        let genome = energy_driven(&[0]);
        let nutrition = genome.nutrition().to_vec();
        world.place(parent_loc, genome, 1.0);
        let mut rng = StdRng::seed_from_u64(2);

        let report = world.step(&mut rng);
        assert_eq!(report.births, 1);
        assert_eq!(world.population(), 2);

        let parent = &world.agents()[0];
        assert_eq!(parent.location, parent_loc);
        assert!((parent.energy - 0.5).abs() < 1e-12);

        let child = &world.agents()[1];
        assert_eq!(child.location, Location::new(2, 0));
        assert_eq!(child.energy, INITIAL_ENERGY);
        assert_eq!(child.age, 0);

        let cell = world.grid().nutrients_at(parent_loc);
        for (have, share) in cell.iter().zip(&nutrition) {
            assert!((have - (1.0 - 0.5 * share * 0.1)).abs() < 1e-12);
        }
        assert_occupancy_consistent(&world);
    }

    #[test]
    fn contested_cell_admits_one_offspring() {
        // 1x3 ring: both plants try to reproduce into the middle cell
        let mut world = World::empty(quiet_config(1, 3)).unwrap();
        world.place(Location::new(0, 0), energy_driven(&[1, 3]), 5.0);
        world.place(Location::new(0, 2), energy_driven(&[1, 3]), 5.0);
        let mut rng = StdRng::seed_from_u64(3);

        let report = world.step(&mut rng);
        assert_eq!(report.births, 1);
        assert_eq!(world.population(), 3);
        let born: Vec<_> = world.agents()[2..].iter().map(|p| p.location).collect();
        assert_eq!(born, vec![Location::new(0, 1)]);
        assert_occupancy_consistent(&world);
    }

    #[test]
    fn starving_plant_leaves_its_nutrients_untouched() {
        let config = SimulationConfig {
            nutrient_restore: 0.01,
            ..quiet_config(3, 3)
        };
        let mut world = World::empty(config).unwrap();
        let loc = Location::new(1, 1);
        world.place(loc, energy_driven(&[0]), 0.49);
        let before = world.grid().nutrients_at(loc).to_vec();
        let mut rng = StdRng::seed_from_u64(4);

        let report = world.step(&mut rng);
        assert_eq!(report.starvations, 1);
        assert_eq!(report.births, 0);
        assert_eq!(world.population(), 0);
        assert!(!world.grid().is_occupied(loc));
        for (after, before) in world.grid().nutrients_at(loc).iter().zip(&before) {
            assert!((after - (before + 0.01)).abs() < 1e-12);
        }
    }

    #[test]
    fn certain_random_death_clears_the_cell() {
        let config = SimulationConfig {
            death_chance: 1.0,
            ..quiet_config(3, 3)
        };
        let mut world = World::empty(config).unwrap();
        world.place(Location::new(2, 1), inert_genome(), 1.0);
        let mut rng = StdRng::seed_from_u64(5);

        let report = world.step(&mut rng);
        assert_eq!(report.random_deaths, 1);
        assert_eq!(report.starvations, 0);
        assert_eq!(world.population(), 0);
        assert_eq!(world.grid().occupied_count(), 0);
    }

    #[test]
    fn randomly_killed_plant_still_acts() {
        let config = SimulationConfig {
            death_chance: 1.0,
            ..quiet_config(3, 3)
        };
        let mut world = World::empty(config).unwrap();
        let parent = Location::new(1, 1);
        world.place(parent, energy_driven(&[0, 8]), 5.0);
        let mut rng = StdRng::seed_from_u64(9);

        let report = world.step(&mut rng);
        assert_eq!(report.random_deaths, 1);
        assert_eq!(report.starvations, 0);
        assert_eq!(report.births, 1);
        assert_eq!(world.population(), 1);
        assert_eq!(world.agents()[0].location, Location::new(0, 1));
        assert!(world.grid().info[world.grid().index(parent)]);
        assert!(!world.grid().is_occupied(parent));
        assert_occupancy_consistent(&world);
    }

    #[test]
    fn info_bits_are_double_buffered() {
        let mut world = World::empty(quiet_config(1, 3)).unwrap();
        let talker = Location::new(0, 0);
        world.place(talker, energy_driven(&[8]), 5.0);
        let mut rng = StdRng::seed_from_u64(6);

        assert!(!world.grid().info[0]);
        world.step(&mut rng);
        assert!(world.grid().info[0]);
        assert!(!world.grid().info[1]);
    }

    #[test]
    fn sent_energy_accumulates_without_sending_loss() {
        let config = SimulationConfig {
            energy_sending_cost: 0.4,
            ..quiet_config(3, 3)
        };
        let mut world = World::empty(config).unwrap();
        let loc = Location::new(1, 1);
        world.place(loc, energy_driven(&[5]), 5.0);
        let mut rng = StdRng::seed_from_u64(7);

        world.step(&mut rng);
        let sent = world.agents()[0].last_decision()[5];
        let right = world.grid().index(Location::new(1, 2));
        assert!((world.grid().inbound_energy[right] - sent).abs() < 1e-12);
        assert!((world.agents()[0].energy - (5.0 - sent * 1.4)).abs() < 1e-12);
        let total: f64 = world.grid().inbound_energy.iter().sum();
        assert!((total - sent).abs() < 1e-12);
    }

    #[test]
    fn later_plants_see_earlier_births_in_the_same_step() {
        // Whichever plant runs first claims the middle; the other must see it.
        let mut world = World::empty(quiet_config(1, 3)).unwrap();
        world.place(Location::new(0, 0), energy_driven(&[1]), 5.0);
        world.place(Location::new(0, 2), energy_driven(&[3]), 5.0);
        let mut rng = StdRng::seed_from_u64(8);

        world.step(&mut rng);
        assert_eq!(world.population(), 3);
        assert_eq!(world.agents()[2].location, Location::new(0, 1));
        // Both paid for their attempt.
        assert!(world.agents()[..2]
            .iter()
            .all(|p| (p.energy - 4.5).abs() < 1e-12));
    }

    #[test]
    fn random_population_keeps_occupancy_consistent() {
        let config = SimulationConfig {
            rows: 20,
            cols: 20,
            starting_population: 150,
            reproduction_cost: 0.2,
            death_chance: 0.01,
            ..SimulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(99);
        let mut world = World::new(config, &mut rng).unwrap();

        for _ in 0..40 {
            let before = world.population();
            let report = world.step(&mut rng);
            assert_eq!(
                report.population,
                before + report.births - report.starvations - report.random_deaths
            );
            assert_occupancy_consistent(&world);
            assert!(world.grid().nutrients.iter().all(|&n| n >= 0.0));
            assert!(world.agents().iter().all(|p| p.energy >= 0.0));
        }
    }

    #[test]
    fn render_snapshot_lists_every_plant() {
        let mut world = World::empty(quiet_config(3, 3)).unwrap();
        let genome = energy_driven(&[0]);
        let color = genome.color();
        world.place(Location::new(1, 2), genome, 1.0);

        assert_eq!(world.active_agents(), vec![(Location::new(1, 2), color)]);
    }

    #[test]
    fn world_age_cost_grows_with_age() {
        let config = SimulationConfig {
            sun_energy: 0.5,
            ..quiet_config(2, 2)
        };
        let mut world = World::empty(config).unwrap();
        let mut rng = StdRng::seed_from_u64(10);
        assert_eq!(world.world_age_cost(), 0.0);
        world.step(&mut rng);
        let one = world.world_age_cost();
        world.step(&mut rng);
        assert!(world.world_age_cost() > one && one > 0.0);
    }
}
