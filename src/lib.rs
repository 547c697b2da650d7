//! Evolutionary plant cell simulation on a toroidal grid.
//!
//! Plants sense their four neighbors, decide through a small genome-encoded
//! network, pay for their actions in energy and nutrients, and reproduce with
//! mutation. [`World::step`] advances the whole population by one tick and
//! [`World::active_agents`] hands a renderer the (location, color) pairs to
//! draw.

pub mod api;
pub mod config;
pub mod error;
pub mod genome;
pub mod grid;
pub mod headless;
pub mod metrics;
pub mod network;
pub mod plant;
pub mod simulation;
pub mod snapshot;
pub mod world;

pub use config::{MutationConfig, SimulationConfig};
pub use error::{Result, SimError};
pub use genome::Genome;
pub use grid::{Direction, Grid, Location};
pub use plant::{Decisions, PlantCell};
pub use simulation::Simulation;
pub use snapshot::WorldSnapshot;
pub use world::{StepReport, World};
