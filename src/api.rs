// API module for headless mode - HTTP endpoints to interact with the simulation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::config::SimulationConfig;
use crate::metrics::PopulationStats;
use crate::simulation::Simulation;
use crate::snapshot::WorldSnapshot;
use crate::world::StepReport;
use rand::rngs::StdRng;
use rand::SeedableRng;

// Upper bound on steps per /step request so one call cannot stall the loop
const MAX_STEPS_PER_REQUEST: usize = 10_000;

// Render-ready view of one plant
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AgentData {
    pub row: usize,
    pub col: usize,
    pub color: [u8; 3],
}

#[derive(Serialize, Clone)]
pub struct SimulationStateResponse {
    pub age: u64,
    pub paused: bool,
    pub agents: Vec<AgentData>,
    pub stats: PopulationStats,
    pub last_step: Option<StepReport>,
}

#[derive(Deserialize)]
pub struct StepQuery {
    pub steps: Option<usize>,
}

// Shared state for the API server
#[derive(Clone)]
pub struct ApiState {
    pub simulation: Arc<Mutex<Simulation>>,
    pub rng: Arc<Mutex<StdRng>>,
}

impl ApiState {
    pub fn new(sim: Simulation) -> Self {
        Self::with_rng(sim, StdRng::from_entropy())
    }

    pub fn with_rng(sim: Simulation, rng: StdRng) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(sim)),
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

fn agents_of(sim: &Simulation) -> Vec<AgentData> {
    sim.active_agents()
        .into_iter()
        .map(|(loc, color)| AgentData {
            row: loc.row,
            col: loc.col,
            color,
        })
        .collect()
}

// Helper function to convert simulation state to API response
fn simulation_to_response(sim: &Simulation) -> SimulationStateResponse {
    SimulationStateResponse {
        age: sim.age(),
        paused: sim.paused,
        agents: agents_of(sim),
        stats: PopulationStats::from_world(sim),
        last_step: sim.last_report.clone(),
    }
}

// GET /state - Get current simulation state
async fn get_state(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(simulation_to_response(&sim)))
}

// GET /agents - Location and color of every plant
async fn get_agents(
    State(api_state): State<ApiState>,
) -> Result<Json<Vec<AgentData>>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(agents_of(&sim)))
}

// GET /stats - Get simulation statistics
async fn get_stats(
    State(api_state): State<ApiState>,
) -> Result<Json<PopulationStats>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(PopulationStats::from_world(&sim)))
}

// POST /step - Step the simulation forward
async fn step_simulation(
    Query(params): Query<StepQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut rng = api_state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let steps = params.steps.unwrap_or(1);
    if steps > MAX_STEPS_PER_REQUEST {
        return Err(StatusCode::BAD_REQUEST);
    }

    for _ in 0..steps {
        sim.step(&mut *rng);
    }

    Ok(Json(simulation_to_response(&sim)))
}

// POST /reset - Reset the simulation
async fn reset_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut rng = api_state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    sim.reset(&mut *rng).map_err(|e| {
        log::error!("Reset failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(simulation_to_response(&sim)))
}

// POST /pause - Toggle pause
async fn pause_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    sim.toggle_pause();
    Ok(Json(serde_json::json!({ "paused": sim.paused })))
}

// GET /config - Get simulation configuration
async fn get_config(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationConfig>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(sim.config.clone()))
}

// GET /snapshot - Full resumable state
async fn get_snapshot(
    State(api_state): State<ApiState>,
) -> Result<Json<WorldSnapshot>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(WorldSnapshot::capture(&sim)))
}

// Create the API router
pub fn create_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/agents", get(get_agents))
        .route("/stats", get(get_stats))
        .route("/step", post(step_simulation))
        .route("/reset", post(reset_simulation))
        .route("/pause", post(pause_simulation))
        .route("/config", get(get_config))
        .route("/snapshot", get(get_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

// Run the API server with automatic simulation stepping
pub async fn run_server(api_state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(api_state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("Plant cell API server running on http://localhost:{}", port);
    log::info!("Endpoints:");
    log::info!("  GET  /state    - Stats, plants and last step report");
    log::info!("  GET  /agents   - Location and color of every plant");
    log::info!("  GET  /stats    - Population statistics");
    log::info!("  POST /step?steps=N - Step simulation N times (default: 1)");
    log::info!("  POST /reset    - Reseed the world");
    log::info!("  POST /pause    - Toggle pause");
    log::info!("  GET  /config   - Simulation configuration");
    log::info!("  GET  /snapshot - Full resumable world state");
    log::info!("Simulation is running automatically at ~60 steps/s (respects pause state)");

    // Spawn background task to continuously step the simulation
    let simulation_task = tokio::spawn(simulation_loop(api_state.clone()));

    // Run the server
    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    // Wait for either task to complete
    tokio::select! {
        result = server_handle => {
            result??;
        }
        _ = simulation_task => {
            log::error!("Simulation loop ended unexpectedly");
        }
    }

    Ok(())
}

// Background task that continuously steps the simulation
async fn simulation_loop(api_state: ApiState) {
    const TARGET_FPS: f32 = 60.0;
    let frame_duration = std::time::Duration::from_secs_f32(1.0 / TARGET_FPS);

    loop {
        let start = std::time::Instant::now();

        {
            let mut sim = match api_state.simulation.lock() {
                Ok(sim) => sim,
                Err(_) => break,
            };
            let mut rng = match api_state.rng.lock() {
                Ok(rng) => rng,
                Err(_) => break,
            };
            sim.advance(&mut *rng);
        }

        // Sleep to maintain target rate
        let elapsed = start.elapsed();
        if elapsed < frame_duration {
            tokio::time::sleep(frame_duration - elapsed).await;
        }
    }
}
