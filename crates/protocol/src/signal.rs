//! Signaling-Protokoll (WebSocket, JSON-Textframes)
//!
//! Jede Nachricht ist ein JSON-Objekt mit dem Event-Namen im Feld `event`
//! und den Nutzdaten als weitere Felder:
//!
//! ```text
//! {"event":"offer","offer":{...},"clientId":"kamera-1"}
//! ```
//!
//! ## Design
//! - Eingehend: geschlossener Enum `SignalNachricht` (exhaustiv matchbar)
//! - Ausgehend: `AusgehendeNachricht`, der Event-Name ist Teil der Variante
//! - SDP, ICE-Kandidaten und Snapshots bleiben opake `serde_json::Value`
//! - Event-Namen sind kompatibel zu bestehenden Browser-Clients

use fernblick_core::{FernblickError, KameraId, Rolle};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Eingehende Nachrichten
// ---------------------------------------------------------------------------

/// Nachricht von einem Client oder dem Admin an das Relay
///
/// `clientId` ist auf dem Draht optional, damit der Router eine fehlende
/// ID als ungueltige Nachricht protokollieren kann statt den ganzen Frame
/// zu verwerfen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SignalNachricht {
    /// Anmeldung als Kamera-Client oder Admin
    #[serde(rename_all = "camelCase")]
    Register {
        role: Rolle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// WebRTC-Offer einer Kamera
    #[serde(rename_all = "camelCase")]
    Offer {
        offer: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// WebRTC-Answer des Admins fuer eine Kamera
    #[serde(rename_all = "camelCase")]
    Answer {
        answer: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// ICE-Kandidat in beide Richtungen
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
        #[serde(default)]
        from_admin: bool,
    },

    /// Admin fordert eine Kamera zum Start auf
    #[serde(rename_all = "camelCase")]
    StartCamera {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// Admin beendet eine Kamera (entfernt die Sitzung)
    #[serde(rename_all = "camelCase")]
    StopCamera {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// Standbild einer Kamera fuer den Admin
    #[serde(rename_all = "camelCase")]
    Snapshot {
        image_data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<KameraId>,
    },

    /// Einzel-Client-Modus: Befehlsname wird unveraendert als Event weitergereicht
    AdminCommand { command: String },
}

impl SignalNachricht {
    /// Event-Name auf dem Draht
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::StartCamera { .. } => "start-camera",
            Self::StopCamera { .. } => "stop-camera",
            Self::Snapshot { .. } => "snapshot",
            Self::AdminCommand { .. } => "admin-command",
        }
    }

    /// Deserialisiert einen Textframe
    ///
    /// Unbekannte Events und fehlende Pflichtfelder ergeben
    /// `FernblickError::UngueltigeNachricht`.
    pub fn from_json(json: &str) -> fernblick_core::Result<Self> {
        serde_json::from_str(json).map_err(|e| FernblickError::UngueltigeNachricht(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

/// Nachricht vom Relay an genau eine Verbindung
#[derive(Debug, Clone, PartialEq)]
pub enum AusgehendeNachricht {
    /// Offer an den Admin, markiert mit der Kamera-ID
    Offer { offer: Value, client_id: KameraId },
    /// Answer an die Kamera (ohne ID, die Kamera kennt sich selbst)
    Answer { answer: Value },
    /// ICE-Kandidat; an den Admin mit Kamera-ID, an die Kamera ohne
    IceCandidate {
        candidate: Value,
        client_id: Option<KameraId>,
    },
    StartCamera,
    StopCamera,
    /// Standbild an den Admin
    Snapshot { image_data: Value, client_id: KameraId },
    /// Frei benannter Befehl (Einzel-Client-Modus), Event-Name = Befehl
    Befehl(String),
}

impl AusgehendeNachricht {
    /// Event-Name auf dem Draht
    pub fn event_name(&self) -> &str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::StartCamera => "start-camera",
            Self::StopCamera => "stop-camera",
            Self::Snapshot { .. } => "snapshot",
            Self::Befehl(name) => name,
        }
    }

    /// Serialisiert die Nachricht als JSON-Textframe
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for AusgehendeNachricht {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("event", self.event_name())?;
        match self {
            Self::Offer { offer, client_id } => {
                map.serialize_entry("offer", offer)?;
                map.serialize_entry("clientId", client_id)?;
            }
            Self::Answer { answer } => {
                map.serialize_entry("answer", answer)?;
            }
            Self::IceCandidate {
                candidate,
                client_id,
            } => {
                map.serialize_entry("candidate", candidate)?;
                if let Some(id) = client_id {
                    map.serialize_entry("clientId", id)?;
                }
            }
            Self::Snapshot {
                image_data,
                client_id,
            } => {
                map.serialize_entry("imageData", image_data)?;
                map.serialize_entry("clientId", client_id)?;
            }
            Self::StartCamera | Self::StopCamera | Self::Befehl(_) => {}
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
