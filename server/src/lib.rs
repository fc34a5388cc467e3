//! fernblick-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use fernblick_observability::{EreignisLog, HealthState, RelayMetrics};
use fernblick_signaling::{SignalingServer, SignalingState};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet die konfigurierte Adresse und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self.config.bind_adresse()?;
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Bind auf {bind_addr} fehlgeschlagen"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        self.starten_mit_listener(listener, shutdown_rx).await
    }

    /// Startet alle Subsysteme auf einem gebundenen Listener
    ///
    /// Reihenfolge:
    /// 1. Ereignis-Log anlegen (Fehler sind nicht fatal)
    /// 2. Metriken und Signaling-Zustand erzeugen
    /// 3. HTTP/WebSocket-Server starten
    /// 4. Nach dem Shutdown das Ereignis-Log leeren
    pub async fn starten_mit_listener(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %listener.local_addr()?,
            "Server startet"
        );

        let log = EreignisLog::neu(self.config.ereignis_log_verzeichnis());
        if let Err(e) = log.initialisieren().await {
            tracing::error!(
                pfad = %log.pfad().display(),
                fehler = %e,
                "Ereignis-Log konnte nicht angelegt werden"
            );
        }

        let metriken = RelayMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        let health = HealthState::neu(metriken.clone(), log.stoerung_flag());
        let state = SignalingState::neu(self.config.signaling.clone(), log.clone(), metriken);

        let server = SignalingServer::neu(state, self.config.web_konfig(), health);
        let ergebnis = server
            .starten_mit_listener(listener, shutdown_rx)
            .await
            .context("Signaling-Server beendet mit Fehler");

        log.leeren().await;
        ergebnis
    }
}
