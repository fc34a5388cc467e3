//! Gemeinsame Identifikationstypen fuer Fernblick
//!
//! Verbindungen und Kameras werden ueber Newtypes identifiziert, damit eine
//! Transport-Verbindung nie mit einer Kamera-Identitaet verwechselt wird.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opake ID einer Live-Verbindung
///
/// Wird vom Transport beim Verbindungsaufbau vergeben und nie wiederverwendet,
/// solange die Verbindung offen ist. Vergleich erfolgt ausschliesslich ueber
/// den Wert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Stabile, vom Client gewaehlte Kamera-Identitaet (`clientId` im Protokoll)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KameraId(String);

impl From<&str> for KameraId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for KameraId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for KameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rolle einer Verbindung beim `register`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    /// Kamera-Client
    Client,
    /// Der (einzige) Admin
    Admin,
}
