//! HTTP request handlers
//!
//! Handlers stay thin: they extract the request, call into the database,
//! booking and notify modules, and shape the JSON envelope the storefront
//! expects. Every failure is an [`AppError`](crate::error::AppError).

pub mod auth;
pub mod booking;
pub mod catalog;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::AppState;
use crate::error::AppError;

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the process started
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe, served outside `/api` and without an API key
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    })
}

/// Catch-all for unknown paths
pub async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Plain `{ success, message }` acknowledgement
#[derive(Serialize, Debug)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
