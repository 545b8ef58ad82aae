//! Status API handlers
//!
//! `/report` and `/machines` serve the latest published cycle. The
//! per-machine and per-sensor endpoints analyse live from the engine, so
//! they reflect readings accepted since the last cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::envelope::{ApiError, ApiResponse};
use crate::engine::TrendEngine;
use crate::report::ReportPublisher;
use crate::types::{MachineStatus, MachineTrend};

// ============================================================================
// API State
// ============================================================================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<TrendEngine>,
    pub publisher: Arc<ReportPublisher>,
}

impl ApiState {
    pub fn new(engine: Arc<TrendEngine>, publisher: Arc<ReportPublisher>) -> Self {
        Self { engine, publisher }
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sensors_tracked: usize,
    pub limits_loaded: usize,
    pub readings_appended: u64,
    pub cycles_completed: u64,
    pub last_report_at: Option<DateTime<Utc>>,
}

/// One machine as seen by the latest cycle.
#[derive(Debug, Default, Serialize)]
pub struct MachineOverview {
    pub machine: String,
    pub trend: Option<MachineTrend>,
    pub status: Option<MachineStatus>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<ApiState>) -> Response {
    let store = state.engine.store_stats();
    ApiResponse::ok(HealthResponse {
        status: "ok",
        sensors_tracked: store.sensors,
        limits_loaded: state.engine.limits().len(),
        readings_appended: store.appended,
        cycles_completed: state.engine.cycles_completed(),
        last_report_at: state.publisher.latest().map(|r| r.generated_at),
    })
}

pub async fn report(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let report = state.publisher.latest().ok_or(ApiError::NoReport)?;
    Ok(ApiResponse::from_cycle(report.as_ref(), report.cycle))
}

pub async fn machines(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let report = state.publisher.latest().ok_or(ApiError::NoReport)?;

    let mut by_name: BTreeMap<&str, MachineOverview> = BTreeMap::new();
    for trend in &report.machine_trends {
        let entry = by_name.entry(trend.machine.as_str()).or_default();
        entry.machine = trend.machine.clone();
        entry.trend = Some(trend.clone());
    }
    for status in &report.machine_status {
        let entry = by_name.entry(status.machine.as_str()).or_default();
        entry.machine = status.machine.clone();
        entry.status = Some(status.clone());
    }

    Ok(ApiResponse::from_cycle(
        by_name.into_values().collect::<Vec<_>>(),
        report.cycle,
    ))
}

pub async fn machine(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let trend = state
        .engine
        .analyze_machine(&name)
        .ok_or(ApiError::UnknownMachine(name))?;
    Ok(ApiResponse::ok(trend))
}

pub async fn sensor(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if !state.engine.limits().contains(&id) {
        return Err(ApiError::NoLimit(id));
    }
    match state.engine.analyze_sensor(&id) {
        Some(analysis) => Ok(ApiResponse::ok(analysis)),
        None => Err(ApiError::InsufficientData(id)),
    }
}
