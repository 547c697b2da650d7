use rand::Rng;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::world::{StepReport, World};

// Simulation - contains the world and run-control flags
pub struct Simulation {
    pub world: World,
    pub paused: bool,
    pub speed_multiplier: f32,
    pub speed_accumulator: f32,
    pub last_report: Option<StepReport>,
}

// Implement Deref for convenience - allows sim.population() instead of sim.world.population()
impl std::ops::Deref for Simulation {
    type Target = World;
    fn deref(&self) -> &Self::Target {
        &self.world
    }
}

impl std::ops::DerefMut for Simulation {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.world
    }
}

impl Simulation {
    pub fn new<R: Rng>(rng: &mut R) -> Result<Self> {
        Self::with_config(rng, SimulationConfig::default())
    }

    pub fn with_config<R: Rng>(rng: &mut R, config: SimulationConfig) -> Result<Self> {
        Ok(Self::from_world(World::new(config, rng)?))
    }

    pub fn from_world(world: World) -> Self {
        Self {
            world,
            paused: false,
            speed_multiplier: 1.0,
            speed_accumulator: 0.0,
            last_report: None,
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
    pub fn increase_speed(&mut self) {
        self.speed_multiplier = (self.speed_multiplier * 1.5).min(10.0);
    }
    pub fn decrease_speed(&mut self) {
        self.speed_multiplier = (self.speed_multiplier / 1.5).max(0.1);
    }
    pub fn reset_speed(&mut self) {
        self.speed_multiplier = 1.0;
    }

    /// Reseed the world from its own configuration.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        self.world = World::new(self.world.config.clone(), rng)?;
        self.last_report = None;
        Ok(())
    }

    pub fn step<R: Rng>(&mut self, rng: &mut R) -> StepReport {
        let report = self.world.step(rng);
        self.last_report = Some(report.clone());
        report
    }

    /// Run the whole number of steps owed by the speed accumulator, unless
    /// paused. Returns how many steps ran.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> usize {
        if self.paused {
            return 0;
        }
        self.speed_accumulator += self.speed_multiplier;
        let steps = self.speed_accumulator.floor() as usize;
        self.speed_accumulator -= steps as f32;

        for _ in 0..steps {
            self.step(rng);
        }
        steps
    }
}
