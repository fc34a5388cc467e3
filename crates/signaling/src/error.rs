//! Fehlertypen fuer den Signaling-Service
//!
//! Kein Fehler wird je an den Absender zurueckgesendet. Der Dispatcher
//! protokolliert ihn und verwirft die Nachricht.

use fernblick_core::{FernblickError, VerbindungsId};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Ziel-Verbindung konnte nicht aufgeloest werden
    #[error("Ziel nicht gefunden: {0}")]
    ZielNichtGefunden(String),

    /// Pflichtfeld fehlt oder Frame nicht lesbar
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    /// Absender ist weder Admin noch registrierte Kamera
    #[error("Unbekannter Absender: {0}")]
    UnbekannterAbsender(VerbindungsId),

    /// Send-Queue der Ziel-Verbindung voll oder geschlossen
    #[error("Senden an {0} fehlgeschlagen")]
    SendFehler(VerbindungsId),

    /// Nachrichtentyp ist in der aktuellen Konfiguration abgeschaltet
    #[error("Deaktiviert: {0}")]
    Deaktiviert(&'static str),

    /// IO-Fehler (Socket, Listener)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen Fehler fuer ein fehlendes Ziel
    pub fn ziel(msg: impl Into<String>) -> Self {
        Self::ZielNichtGefunden(msg.into())
    }

    /// Erstellt einen Fehler fuer eine ungueltige Nachricht
    pub fn ungueltig(msg: impl Into<String>) -> Self {
        Self::UngueltigeNachricht(msg.into())
    }

    /// Kurzer, stabiler Grund (Metrik-Label)
    pub fn grund(&self) -> &'static str {
        match self {
            Self::ZielNichtGefunden(_) => "ziel_nicht_gefunden",
            Self::UngueltigeNachricht(_) => "ungueltig",
            Self::UnbekannterAbsender(_) => "unbekannter_absender",
            Self::SendFehler(_) => "send_fehler",
            Self::Deaktiviert(_) => "deaktiviert",
            Self::Io(_) => "io",
            Self::Intern(_) => "intern",
        }
    }
}

impl From<FernblickError> for SignalingError {
    fn from(e: FernblickError) -> Self {
        match e {
            FernblickError::UngueltigeNachricht(msg) => Self::UngueltigeNachricht(msg),
            andere => Self::Intern(andere.to_string()),
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
