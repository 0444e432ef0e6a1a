//! TLCD Solver HTTP Server

use axum::{
    extract::Json,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use tlcd_solver::math::Mat;
use tlcd_solver::prelude::*;

const DEFAULT_ADDR: &str = "0.0.0.0:8086";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DmfRequest {
    model: DynamicModel,
    /// Defaults to the ratios configured on the model
    #[serde(default)]
    frequencies: Option<Frequencies>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<T>,
}

#[derive(Debug, Serialize)]
struct SimulationData {
    time: Vec<f64>,
    /// `[dof][time]`
    displacement: Vec<Vec<f64>>,
    velocity: Vec<Vec<f64>>,
    acceleration: Vec<Vec<f64>>,
    dmf: DmfSummary,
    peak_displacement: Vec<f64>,
    natural_frequencies: Vec<f64>,
}

fn rows(m: &Mat) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

fn respond<T: Serialize>(result: Result<T, String>) -> (StatusCode, Json<ApiResponse<T>>) {
    match result {
        Ok(results) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                error: None,
                results: Some(results),
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                error: Some(e),
                results: None,
            }),
        ),
    }
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn simulate(Json(model): Json<DynamicModel>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || run_simulation(&model))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));
    respond(result)
}

fn run_simulation(model: &DynamicModel) -> DynaResult<SimulationData> {
    let output = model.analyze()?;
    let peak_displacement = output.peak_displacements();
    let response = output.response;

    Ok(SimulationData {
        displacement: rows(&response.displacement),
        velocity: rows(&response.velocity),
        acceleration: rows(&response.acceleration),
        time: response.time,
        dmf: output.dmf,
        peak_displacement,
        natural_frequencies: output.natural_frequencies,
    })
}

async fn dmf(Json(request): Json<DmfRequest>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || run_sweep(&request))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));
    respond(result)
}

fn run_sweep(request: &DmfRequest) -> DynaResult<SweepResult> {
    let progress = |p: f64| log::debug!("DMF sweep {:.0}% done", p * 100.0);
    match &request.frequencies {
        Some(frequencies) => request
            .model
            .dmf_sweep_over(frequencies, Some(&progress), None),
        None => request.model.dmf_sweep(Some(&progress), None),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/simulate", post(simulate))
        .route("/api/v1/dmf", post(dmf))
        .layer(cors);

    let addr: SocketAddr = std::env::var("TLCD_SERVER_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    println!("TLCD Solver Server listening on http://{}", addr);
    println!("  Health check: GET  /health");
    println!("  Simulation:   POST /api/v1/simulate");
    println!("  DMF sweep:    POST /api/v1/dmf");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
