//! Dashboard HTTP API over a loaded policy.

use anyhow::{Context, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

use crate::{
    advisor::{validate_readings, Advisor, Recommendation},
    assessment::{assess, simulate_day, WaterAssessment},
    diagnostics::{LogEntry, RecommendationLog},
    environment::ContinuousState,
    settings::Settings,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub advisor: Arc<Advisor>,
    pub log: Arc<RecommendationLog>,
}

impl AppState {
    pub fn new(advisor: Advisor, log: RecommendationLog) -> Self {
        Self {
            advisor: Arc::new(advisor),
            log: Arc::new(log),
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    learned_states: usize,
}

/// Readings in a request body or query string.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ReadingsRequest {
    pub temperature: f64,
    pub ph: f64,
    pub dissolved_oxygen: f64,
}

impl From<ReadingsRequest> for ContinuousState {
    fn from(r: ReadingsRequest) -> Self {
        ContinuousState::new(r.temperature, r.ph, r.dissolved_oxygen)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Recommended,
    UnknownCondition,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub outcome: Outcome,
    pub state: [u8; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub health_score: u8,
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(water_status))
        .route("/recommend", post(recommend))
        .route("/simulate-day", post(simulate_next_day))
        .route("/log", get(recommendation_log))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Malformed bodies and queries are a 400, the same as non-finite readings.
fn checked<E: Display>(
    payload: Result<ReadingsRequest, E>,
) -> Result<ContinuousState, StatusCode> {
    let request = payload.map_err(|e| {
        warn!("Rejected readings: {}", e);
        StatusCode::BAD_REQUEST
    })?;
    let readings = ContinuousState::from(request);
    validate_readings(&readings).map_err(|e| {
        warn!("Rejected readings: {}", e);
        StatusCode::BAD_REQUEST
    })?;
    Ok(readings)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        learned_states: state.advisor.table().len(),
    })
}

/// Per-reading status against the ideal ranges
#[instrument]
async fn water_status(
    query: Result<Query<ReadingsRequest>, QueryRejection>,
) -> Result<Json<WaterAssessment>, StatusCode> {
    let readings = checked(query.map(|Query(request)| request))?;
    Ok(Json(assess(&readings)))
}

/// Recommend an action and record it in the log
#[instrument(skip(state))]
async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<ReadingsRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, StatusCode> {
    let readings = checked(payload.map(|Json(request)| request))?;
    let health_score = assess(&readings).health_score;

    let response = match state.advisor.recommend(&readings) {
        Recommendation::Act { action, state: key } => {
            let log = Arc::clone(&state.log);
            let entry = LogEntry::now(&readings, action);
            tokio::task::spawn_blocking(move || log.append(&entry))
                .await
                .context("Recommendation log task failed")
                .and_then(|appended| appended)
                .map_err(|e| {
                    error!("Failed to record recommendation: {:#}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                })?;
            info!(%key, ?action, "Recommendation served");

            RecommendResponse {
                outcome: Outcome::Recommended,
                state: key.0,
                action: Some(action.index()),
                label: Some(action.label().to_string()),
                health_score,
            }
        }
        Recommendation::UnknownCondition { state: key } => {
            info!(%key, "Unknown condition");
            RecommendResponse {
                outcome: Outcome::UnknownCondition,
                state: key.0,
                action: None,
                label: None,
                health_score,
            }
        }
    };

    Ok(Json(response))
}

/// Readings one simulated day later
#[instrument]
async fn simulate_next_day(
    payload: Result<Json<ReadingsRequest>, JsonRejection>,
) -> Result<Json<ReadingsRequest>, StatusCode> {
    let readings = checked(payload.map(|Json(request)| request))?;
    let next = simulate_day(&readings, &mut rand::thread_rng());
    Ok(Json(ReadingsRequest {
        temperature: next.temperature,
        ph: next.ph,
        dissolved_oxygen: next.dissolved_oxygen,
    }))
}

/// All recorded recommendations
async fn recommendation_log(
    State(state): State<AppState>,
) -> Result<Json<Vec<LogEntry>>, StatusCode> {
    let log = Arc::clone(&state.log);
    tokio::task::spawn_blocking(move || log.read_all())
        .await
        .context("Recommendation log task failed")
        .and_then(|entries| entries)
        .map(Json)
        .map_err(|e| {
            error!("Failed to read recommendation log: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Load the policy and serve the dashboard API until Ctrl-C.
pub async fn serve(settings: &Settings) -> Result<()> {
    let advisor = Advisor::load(&settings.policy.path)?;
    let log = RecommendationLog::new(settings.diagnostics.recommendation_log.clone());
    let app = create_router(AppState::new(advisor, log), settings.server.enable_cors);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Dashboard API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
