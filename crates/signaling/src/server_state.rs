//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Pro Server-Instanz genau ein `SignalingState`; es gibt keinen globalen
//! Zustand. Tests koennen beliebig viele unabhaengige Instanzen erzeugen.

use fernblick_observability::{EreignisProtokoll, RelayMetrics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dispatcher::MessageDispatcher;
use crate::registry::AngebotsRichtlinie;
use crate::zustellung::{Zustellung, SEND_QUEUE_GROESSE};

/// Wann eine Kamera `start-camera` erhaelt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartKameraModus {
    /// Nur auf ausdruecklichen Befehl des Admins
    #[default]
    AufBefehl,
    /// Zusaetzlich direkt nach der Registrierung der Kamera
    BeiRegistrierung,
}

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub start_kamera: StartKameraModus,
    /// Offene Offers nach dem Replay an einen Admin verwerfen
    pub angebote_nach_replay_loeschen: bool,
    /// Groesse der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Einzel-Client-Modus mit `admin-command`
    pub legacy_einzelclient: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            start_kamera: StartKameraModus::AufBefehl,
            angebote_nach_replay_loeschen: true,
            sende_queue_groesse: SEND_QUEUE_GROESSE,
            legacy_einzelclient: false,
        }
    }
}

impl SignalingConfig {
    pub fn angebots_richtlinie(&self) -> AngebotsRichtlinie {
        if self.angebote_nach_replay_loeschen {
            AngebotsRichtlinie::NachReplayLoeschen
        } else {
            AngebotsRichtlinie::Behalten
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState<P: EreignisProtokoll> {
    pub config: Arc<SignalingConfig>,
    /// Send-Queues aller offenen Verbindungen
    pub zustellung: Zustellung,
    /// Router inklusive Verbindungsregister
    pub dispatcher: MessageDispatcher<Zustellung, P>,
    pub metriken: RelayMetrics,
}

impl<P: EreignisProtokoll> SignalingState<P> {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, protokoll: P, metriken: RelayMetrics) -> Arc<Self> {
        let config = Arc::new(config);
        let zustellung = Zustellung::neu(config.sende_queue_groesse);
        let dispatcher = MessageDispatcher::neu(
            Arc::clone(&config),
            zustellung.clone(),
            protokoll,
            metriken.clone(),
        );
        Arc::new(Self {
            config,
            zustellung,
            dispatcher,
            metriken,
        })
    }
}
