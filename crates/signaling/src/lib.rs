//! fernblick-signaling – WebRTC-Signaling-Relay
//!
//! Dieser Crate vermittelt WebRTC-Signaling zwischen genau einem Admin und
//! beliebig vielen Kamera-Clients. Medien laufen nie ueber den Server.
//!
//! ## Architektur
//!
//! ```text
//! HTTP/WS-Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro WebSocket ein Task)
//!     |
//!     v
//! MessageDispatcher --- VerbindungsRegister (Admin, Kamera-Sitzungen)
//!     |
//!     v
//! Zustellung (Send-Queue pro Verbindung) -> ClientConnection -> Socket
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod server_state;
pub mod web;
pub mod zustellung;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use registry::{AngebotsRichtlinie, GetrennteRolle, KameraSitzung, VerbindungsRegister};
pub use server_state::{SignalingConfig, SignalingState, StartKameraModus};
pub use web::{SignalingServer, WebKonfig};
pub use zustellung::{Zusteller, Zustellung};
