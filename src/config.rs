// Global configuration and constants

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Length of the sensory vector: energy, age cost, 4 neighbor bits, 4 info bits.
pub const INPUT_SIZE: usize = 10;
/// Minimum network output: 4 reproduction logits, 4 energy amounts, 1 info logit.
pub const MIN_OUTPUT_SIZE: usize = 9;

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

// Mutation operator parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Standard deviation of the Gaussian noise added to every gene.
    pub noise_scale: f64,
    /// Chance per matrix that one random element is displaced to `1 - x`.
    pub displacement_probability: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            noise_scale: 1e-2,
            displacement_probability: 1e-2,
        }
    }
}

// Configuration struct for simulation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Grid
    pub rows: usize,
    pub cols: usize,

    // Nutrients
    pub num_nutrients: usize,
    pub initial_nutrients: f64,
    pub nutrient_restore: f64,
    pub nutrient_greed: f64,

    // Initialization
    pub starting_population: usize,

    // Energy economy
    pub sun_energy: f64,
    pub energy_cost_age: f64,
    pub energy_cost_dissipation: f64,
    pub death_chance: f64,
    pub reproduction_cost: f64,
    pub energy_sending_cost: f64,
    pub info_sending_cost: f64,

    // Genome: (inputs, outputs) per layer
    pub genome_layers: Vec<(usize, usize)>,
    pub mutation: MutationConfig,

    // Pay neighbors' sent energy out as income (inert by default)
    pub feed_inbound_energy: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rows: 200,
            cols: 200,
            num_nutrients: 4,
            initial_nutrients: 1.0,
            nutrient_restore: 1e-5,
            nutrient_greed: 2e-3,
            starting_population: 10_000,
            sun_energy: 0.5,
            energy_cost_age: 1e-3,
            energy_cost_dissipation: 5e-3,
            death_chance: 1e-6,
            reproduction_cost: 2.0,
            energy_sending_cost: 0.4,
            info_sending_cost: 0.01,
            genome_layers: vec![(INPUT_SIZE, 9), (9, 9)],
            mutation: MutationConfig::default(),
            feed_inbound_energy: false,
        }
    }
}

impl SimulationConfig {
    /// Load a config file, picking the format from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            other => {
                return Err(SimError::config(format!(
                    "unsupported config extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Try config.yaml, config.yml and config.json in the working directory.
    pub fn from_default_paths() -> Self {
        for candidate in DEFAULT_CONFIG_PATHS {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::from_file(candidate) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", candidate);
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", candidate, e),
            }
        }
        log::info!("No config file found, using defaults");
        Self::default()
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn output_size(&self) -> usize {
        self.genome_layers.last().map(|&(_, out)| out).unwrap_or(0)
    }

    /// Aging tax charged to an agent of the given age.
    pub fn age_cost(&self, light: f64, age: u64) -> f64 {
        light * 1.1 * (1.0 - (-self.energy_cost_age * age as f64).exp())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SimError::config(format!(
                "grid dimensions must be positive, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.num_nutrients == 0 {
            return Err(SimError::config("num_nutrients must be at least 1"));
        }
        if self.starting_population > self.cell_count() {
            return Err(SimError::config(format!(
                "starting_population {} exceeds the {} available cells",
                self.starting_population,
                self.cell_count()
            )));
        }
        self.validate_layers()?;

        let non_negative = [
            ("initial_nutrients", self.initial_nutrients),
            ("nutrient_restore", self.nutrient_restore),
            ("nutrient_greed", self.nutrient_greed),
            ("sun_energy", self.sun_energy),
            ("energy_cost_age", self.energy_cost_age),
            ("energy_cost_dissipation", self.energy_cost_dissipation),
            ("reproduction_cost", self.reproduction_cost),
            ("energy_sending_cost", self.energy_sending_cost),
            ("info_sending_cost", self.info_sending_cost),
            ("mutation.noise_scale", self.mutation.noise_scale),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        let probabilities = [
            ("death_chance", self.death_chance),
            (
                "mutation.displacement_probability",
                self.mutation.displacement_probability,
            ),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn validate_layers(&self) -> Result<()> {
        let layers = &self.genome_layers;
        let (first_in, _) = *layers
            .first()
            .ok_or_else(|| SimError::config("genome_layers must not be empty"))?;
        if first_in != INPUT_SIZE {
            return Err(SimError::config(format!(
                "first genome layer must take {} inputs, got {}",
                INPUT_SIZE, first_in
            )));
        }
        for (i, &(inputs, outputs)) in layers.iter().enumerate() {
            if inputs == 0 || outputs == 0 {
                return Err(SimError::config(format!(
                    "genome layer {} has an empty dimension ({}, {})",
                    i, inputs, outputs
                )));
            }
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].1 != pair[1].0 {
                return Err(SimError::config(format!(
                    "genome layer {} outputs {} values but layer {} expects {}",
                    i,
                    pair[0].1,
                    i + 1,
                    pair[1].0
                )));
            }
        }
        if self.output_size() < MIN_OUTPUT_SIZE {
            return Err(SimError::config(format!(
                "last genome layer must produce at least {} outputs, got {}",
                MIN_OUTPUT_SIZE,
                self.output_size()
            )));
        }
        Ok(())
    }
}
