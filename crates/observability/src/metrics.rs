//! Prometheus-kompatible Metriken fuer Fernblick
//!
//! Registrierte Metriken:
//! - `fernblick_connections_active` – Gauge: Offene WebSocket-Verbindungen
//! - `fernblick_cameras_registered` – Gauge: Registrierte Kamera-Sitzungen
//! - `fernblick_admin_connected` – Gauge: 1 wenn ein Admin registriert ist
//! - `fernblick_signals_forwarded_total` – Counter: Weitergeleitete Nachrichten (event)
//! - `fernblick_signals_dropped_total` – Counter: Verworfene Nachrichten (event, reason)

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relay-Metriken
///
/// Clone teilt die zugrundeliegenden Zaehler.
#[derive(Clone)]
pub struct RelayMetrics {
    pub registry: Arc<Registry>,

    pub connections_active: IntGauge,
    pub cameras_registered: IntGauge,
    pub admin_connected: IntGauge,

    pub signals_forwarded_total: IntCounterVec,
    pub signals_dropped_total: IntCounterVec,
}

impl RelayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connections_active = IntGauge::with_opts(Opts::new(
            "fernblick_connections_active",
            "Anzahl offener WebSocket-Verbindungen",
        ))?;
        registry.register(Box::new(connections_active.clone()))?;

        let cameras_registered = IntGauge::with_opts(Opts::new(
            "fernblick_cameras_registered",
            "Anzahl registrierter Kamera-Sitzungen",
        ))?;
        registry.register(Box::new(cameras_registered.clone()))?;

        let admin_connected = IntGauge::with_opts(Opts::new(
            "fernblick_admin_connected",
            "1 wenn ein Admin registriert ist, sonst 0",
        ))?;
        registry.register(Box::new(admin_connected.clone()))?;

        let signals_forwarded_total = IntCounterVec::new(
            Opts::new(
                "fernblick_signals_forwarded_total",
                "Weitergeleitete Signaling-Nachrichten",
            ),
            &["event"],
        )?;
        registry.register(Box::new(signals_forwarded_total.clone()))?;

        let signals_dropped_total = IntCounterVec::new(
            Opts::new(
                "fernblick_signals_dropped_total",
                "Verworfene Signaling-Nachrichten",
            ),
            &["event", "reason"],
        )?;
        registry.register(Box::new(signals_dropped_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connections_active,
            cameras_registered,
            admin_connected,
            signals_forwarded_total,
            signals_dropped_total,
        })
    }

    /// Zaehlt eine erfolgreich eingereihte Weiterleitung
    pub fn weitergeleitet(&self, event: &str) {
        self.signals_forwarded_total.with_label_values(&[event]).inc();
    }

    /// Zaehlt eine verworfene Nachricht
    pub fn verworfen(&self, event: &str, grund: &str) {
        self.signals_dropped_total
            .with_label_values(&[event, grund])
            .inc();
    }

    /// Uebernimmt den aktuellen Registry-Stand
    pub fn register_stand(&self, kameras: usize, admin_vorhanden: bool) {
        self.cameras_registered.set(kameras as i64);
        self.admin_connected.set(i64::from(admin_vorhanden));
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<RelayMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
