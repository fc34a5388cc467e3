//! Health-Check-Endpunkt fuer Fernblick
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Relay-Zustand

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::RelayMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Relay laeuft, aber das Ereignis-Log kann nicht geschrieben werden
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub admin_connected: bool,
    pub cameras_registered: i64,
    pub connections_active: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub metriken: RelayMetrics,
    /// Wird vom Ereignis-Log bei Schreibfehlern gesetzt
    pub log_gestoert: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu(metriken: RelayMetrics, log_gestoert: Arc<AtomicBool>) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            metriken,
            log_gestoert,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Baut die aktuelle Health-Antwort
    pub fn antwort(&self) -> HealthResponse {
        let status = if self.log_gestoert.load(Ordering::Relaxed) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            admin_connected: self.metriken.admin_connected.get() > 0,
            cameras_registered: self.metriken.cameras_registered.get(),
            connections_active: self.metriken.connections_active.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Relay-Status zurueck
///
/// Auch `degraded` liefert 200, das Relay routet weiterhin.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
