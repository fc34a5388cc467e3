//! Prozess-Logging via tracing-subscriber
//!
//! Level und Format kommen fertig aufgeloest aus der Server-Konfiguration
//! (Datei, danach `FB_LOG_LEVEL` / `FB_LOG_FORMAT`). Das Ereignis-Log
//! `access.log` ist davon getrennt.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

/// Ausgabeformat der Prozess-Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Menschenlesbar, eine Zeile pro Ereignis
    #[default]
    Text,
    /// Ein JSON-Objekt pro Zeile, inklusive Thread-ID und aktuellem Span
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => anyhow::bail!("Unbekanntes Log-Format '{andere}' (erlaubt: text, json)"),
        }
    }
}

/// Baut den Filter aus einem Level oder einer EnvFilter-Direktive
///
/// `info` und `fernblick_signaling=debug,info` sind beide gueltig.
pub fn log_filter(direktive: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(direktive)
        .with_context(|| format!("Ungueltige Log-Direktive '{direktive}'"))
}

/// Initialisiert das Logging-System
///
/// Darf pro Prozess nur einmal aufgerufen werden.
pub fn logging_initialisieren(direktive: &str, format: LogFormat) -> anyhow::Result<()> {
    let basis = fmt().with_env_filter(log_filter(direktive)?).with_target(true);
    match format {
        LogFormat::Json => basis
            .json()
            .with_thread_ids(true)
            .with_current_span(true)
            .init(),
        LogFormat::Text => basis.init(),
    }
    Ok(())
}
