//! Zustellung – Send-Queues aller offenen WebSocket-Verbindungen
//!
//! Jede Verbindung erhaelt beim Aufbau eine begrenzte mpsc-Queue. Der
//! `MessageDispatcher` reiht ausgehende Nachrichten nicht-blockierend ein,
//! die `ClientConnection` schreibt sie auf den Socket.

use dashmap::DashMap;
use fernblick_core::VerbindungsId;
use fernblick_protocol::AusgehendeNachricht;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Standard-Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// Zusteller-Trait
// ---------------------------------------------------------------------------

/// Nicht-blockierende Zustellung an genau eine Verbindung
///
/// Gibt `false` zurueck wenn die Verbindung unbekannt, die Queue voll oder
/// geschlossen ist.
pub trait Zusteller: Send + Sync + 'static {
    fn senden(&self, ziel: VerbindungsId, nachricht: AusgehendeNachricht) -> bool;
}

impl<T: Zusteller> Zusteller for Arc<T> {
    fn senden(&self, ziel: VerbindungsId, nachricht: AusgehendeNachricht) -> bool {
        (**self).senden(ziel, nachricht)
    }
}

// ---------------------------------------------------------------------------
// VerbindungsSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct VerbindungsSender {
    pub verbindung: VerbindungsId,
    pub tx: mpsc::Sender<AusgehendeNachricht>,
}

impl VerbindungsSender {
    pub fn senden(&self, nachricht: AusgehendeNachricht) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(
                    verbindung = %self.verbindung,
                    event = n.event_name(),
                    "Send-Queue voll, Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.verbindung, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Zustellung
// ---------------------------------------------------------------------------

/// Verwaltet die Send-Queues aller Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Zustellung {
    inner: Arc<ZustellungInner>,
}

struct ZustellungInner {
    verbindungen: DashMap<VerbindungsId, VerbindungsSender>,
    queue_groesse: usize,
}

impl Zustellung {
    /// Erstellt eine leere Zustellung; `queue_groesse` 0 wird auf 1 angehoben
    pub fn neu(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(ZustellungInner {
                verbindungen: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine Verbindung und gibt ihre Empfangs-Queue zurueck
    pub fn verbindung_registrieren(
        &self,
        verbindung: VerbindungsId,
    ) -> mpsc::Receiver<AusgehendeNachricht> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .verbindungen
            .insert(verbindung, VerbindungsSender { verbindung, tx });
        tracing::debug!(verbindung = %verbindung, "Verbindung in Zustellung registriert");
        rx
    }

    pub fn verbindung_entfernen(&self, verbindung: &VerbindungsId) {
        self.inner.verbindungen.remove(verbindung);
        tracing::debug!(verbindung = %verbindung, "Verbindung aus Zustellung entfernt");
    }

    /// Reiht eine Nachricht fuer eine Verbindung ein
    pub fn an_verbindung_senden(
        &self,
        verbindung: &VerbindungsId,
        nachricht: AusgehendeNachricht,
    ) -> bool {
        match self.inner.verbindungen.get(verbindung) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    pub fn ist_registriert(&self, verbindung: &VerbindungsId) -> bool {
        self.inner.verbindungen.contains_key(verbindung)
    }
}

impl Default for Zustellung {
    fn default() -> Self {
        Self::neu(SEND_QUEUE_GROESSE)
    }
}

impl Zusteller for Zustellung {
    fn senden(&self, ziel: VerbindungsId, nachricht: AusgehendeNachricht) -> bool {
        self.an_verbindung_senden(&ziel, nachricht)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
