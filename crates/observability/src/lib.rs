//! # fernblick-observability
//!
//! Observability-Crate fuer Fernblick:
//! - Append-only Ereignis-Log (`access.log`)
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber

pub mod ereignis_log;
pub mod health;
pub mod logging;
pub mod metrics;

pub use ereignis_log::{EreignisLog, EreignisProtokoll, SpeicherProtokoll};
pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::{log_filter, logging_initialisieren, LogFormat};
pub use metrics::{metrics_router, RelayMetrics};
