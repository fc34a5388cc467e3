//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Rolle und Kamera-Identitaet kennt nur das Register; die
//! Verbindung selbst ist anonym bis auf ihre `VerbindungsId`.
//!
//! ## Ablauf
//! ```text
//! Aufbau: Send-Queue registrieren -> verbindung_geoeffnet
//! Schleife: Textframe -> dispatch | Send-Queue -> Socket | Shutdown -> Close
//! Abbau: Send-Queue entfernen -> verbindung_getrennt
//! ```

use axum::extract::ws::{Message, WebSocket};
use fernblick_core::VerbindungsId;
use fernblick_observability::EreignisProtokoll;
use fernblick_protocol::SignalNachricht;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::SignalingError;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection<P: EreignisProtokoll> {
    state: Arc<SignalingState<P>>,
    verbindung: VerbindungsId,
    peer_addr: SocketAddr,
}

impl<P: EreignisProtokoll> ClientConnection<P> {
    /// Erstellt eine neue ClientConnection mit frischer `VerbindungsId`
    pub fn neu(state: Arc<SignalingState<P>>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            verbindung: VerbindungsId::new(),
            peer_addr,
        }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Socket-Fehler auftritt oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        socket: WebSocket,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let verbindung = self.verbindung;
        let peer_addr = self.peer_addr;
        let dispatcher = &self.state.dispatcher;

        tracing::info!(verbindung = %verbindung, peer = %peer_addr, "Neue WebSocket-Verbindung");

        let mut sende_rx = self.state.zustellung.verbindung_registrieren(verbindung);
        dispatcher.verbindung_geoeffnet(verbindung);

        let (mut sender, mut empfaenger) = socket.split();

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = empfaenger.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match SignalNachricht::from_json(&text) {
                                Ok(nachricht) => {
                                    tracing::trace!(
                                        verbindung = %verbindung,
                                        event = nachricht.event_name(),
                                        "Nachricht empfangen"
                                    );
                                    dispatcher.dispatch(verbindung, nachricht);
                                }
                                Err(e) => dispatcher.ungueltig(verbindung, &SignalingError::from(e)),
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            dispatcher.ungueltig(
                                verbindung,
                                &SignalingError::ungueltig("Binaerframes werden nicht unterstuetzt"),
                            );
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(verbindung = %verbindung, "Verbindung vom Client getrennt");
                            break;
                        }
                        // Ping/Pong beantwortet axum selbst
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(verbindung = %verbindung, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                Some(nachricht) = sende_rx.recv() => {
                    let text = match nachricht.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(verbindung = %verbindung, fehler = %e, "Serialisierung fehlgeschlagen");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        tracing::warn!(verbindung = %verbindung, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(verbindung = %verbindung, "Shutdown – Verbindung wird geschlossen");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Aufraeumen: erst die Queue, dann das Register
        self.state.zustellung.verbindung_entfernen(&verbindung);
        dispatcher.verbindung_getrennt(verbindung);
        tracing::info!(verbindung = %verbindung, peer = %peer_addr, "Verbindung beendet");
    }
}
