// Exact save/restore of a world for resuming long runs

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::genome::Genome;
use crate::grid::{Grid, Location};
use crate::network::Matrix;
use crate::plant::PlantCell;
use crate::world::World;

const FORMAT: &str = "plantcells-snapshot-v1";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub location: Location,
    pub weights: Vec<Matrix>,
    pub nutrition: Vec<f64>,
    pub energy: f64,
    pub age: u64,
}

/// Everything needed to continue a run step-for-step. Light is not stored;
/// it is rebuilt from the configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub format: String,
    pub config: SimulationConfig,
    pub age: u64,
    pub agents: Vec<AgentRecord>,
    pub occupancy: Vec<bool>,
    pub nutrients: Vec<f64>,
    pub info: Vec<bool>,
    pub inbound_energy: Vec<f64>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let grid = world.grid();
        Self {
            format: FORMAT.to_string(),
            config: world.config.clone(),
            age: world.age(),
            agents: world
                .agents()
                .iter()
                .map(|p| AgentRecord {
                    location: p.location,
                    weights: p.genome.weights().to_vec(),
                    nutrition: p.genome.nutrition().to_vec(),
                    energy: p.energy,
                    age: p.age,
                })
                .collect(),
            occupancy: grid.occupancy.clone(),
            nutrients: grid.nutrients.clone(),
            info: grid.info.clone(),
            inbound_energy: grid.inbound_energy.clone(),
        }
    }
}

impl World {
    /// Rebuild a world from a snapshot, checking it against its own config.
    pub fn from_snapshot(snapshot: WorldSnapshot) -> Result<World> {
        if snapshot.format != FORMAT {
            return Err(SimError::Snapshot(format!(
                "unknown snapshot format {:?}",
                snapshot.format
            )));
        }
        let config = snapshot.config;
        config.validate()?;

        let cells = config.cell_count();
        check_len("occupancy", snapshot.occupancy.len(), cells)?;
        check_len("info", snapshot.info.len(), cells)?;
        check_len("inbound_energy", snapshot.inbound_energy.len(), cells)?;
        check_len(
            "nutrients",
            snapshot.nutrients.len(),
            cells * config.num_nutrients,
        )?;

        if let Some(bad) = snapshot
            .nutrients
            .iter()
            .find(|n| !n.is_finite() || **n < 0.0)
        {
            return Err(SimError::Snapshot(format!(
                "nutrient level {} is negative or not finite",
                bad
            )));
        }

        let mut grid = Grid::new(&config);
        grid.nutrients = snapshot.nutrients;
        grid.info = snapshot.info;
        grid.inbound_energy = snapshot.inbound_energy;

        let mut claimed = vec![false; cells];
        let mut agents = Vec::with_capacity(snapshot.agents.len());
        for record in snapshot.agents {
            let loc = record.location;
            if loc.row >= config.rows || loc.col >= config.cols {
                return Err(SimError::Snapshot(format!("plant outside grid at {:?}", loc)));
            }
            let idx = grid.index(loc);
            if claimed[idx] {
                return Err(SimError::Snapshot(format!("two plants share {:?}", loc)));
            }
            claimed[idx] = true;

            let genome = Genome::from_parts(record.weights, record.nutrition);
            if let Some(reason) = genome.mismatch(&config) {
                return Err(SimError::Snapshot(format!("plant at {:?} has {}", loc, reason)));
            }

            let mut plant = PlantCell::new(loc, genome, record.energy);
            plant.restore_state(record.energy, record.age);
            agents.push(plant);
        }

        if claimed != snapshot.occupancy {
            return Err(SimError::Snapshot(
                "occupancy does not match plant locations".to_string(),
            ));
        }
        grid.occupancy = claimed;

        Ok(World::from_parts(config, grid, agents, snapshot.age))
    }
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(SimError::Snapshot(format!(
            "{} has {} entries, expected {}",
            name, actual, expected
        )));
    }
    Ok(())
}

pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &WorldSnapshot) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, snapshot)?;
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<WorldSnapshot> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
