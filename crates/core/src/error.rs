//! Fehlertypen fuer Fernblick
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Andere Crates definieren eigene Fehler und konvertieren via `From`.

use thiserror::Error;

/// Globaler Result-Alias fuer Fernblick
pub type Result<T> = std::result::Result<T, FernblickError>;

/// Alle crate-uebergreifenden Fehler im Fernblick-System
#[derive(Debug, Error)]
pub enum FernblickError {
    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}
