//! fernblick-protocol – Signaling-Nachrichten
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Kamera-Clients,
//! Admin und Relay ueber die WebSocket-Verbindung ausgetauscht werden.

pub mod signal;

pub use signal::{AusgehendeNachricht, SignalNachricht};
