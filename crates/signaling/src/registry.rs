//! Verbindungsregister – Wer ist Admin, welche Kamera haengt an welcher Verbindung
//!
//! Das Register haelt den einzigen geteilten, veraenderlichen Zustand des
//! Relays. Es protokolliert nichts selbst; Logging und Locking liegen beim
//! Aufrufer (`MessageDispatcher`).
//!
//! ## Lebenszyklus einer Kamera-Sitzung
//! ```text
//! Unregistriert -> Registriert(verbunden) <-> Registriert(getrennt) -> Entfernt
//! ```
//! - `register` legt die Sitzung an oder setzt die Verbindung neu
//! - Ein Verbindungsabbruch loescht nur die Verbindung, nie die Sitzung
//! - Nur `stop-camera` entfernt die Sitzung

use fernblick_core::{KameraId, VerbindungsId};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Registrierte Kamera
#[derive(Debug, Clone, PartialEq)]
pub struct KameraSitzung {
    pub client_id: KameraId,
    /// Aktuelle Live-Verbindung, `None` solange getrennt
    pub verbindung: Option<VerbindungsId>,
    /// Letzter noch nicht zugestellter Offer
    pub offenes_angebot: Option<Value>,
}

/// Was ein Verbindungsabbruch betroffen hat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetrennteRolle {
    Admin,
    /// Kameras deren Live-Verbindung das war (Sitzungen bleiben bestehen)
    Kamera(Vec<KameraId>),
    Unbekannt,
}

/// Umgang mit offenen Offers beim Replay an einen neuen Admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngebotsRichtlinie {
    /// Offer nach Zustellung verwerfen (hoechstens ein Replay)
    #[default]
    NachReplayLoeschen,
    /// Offer behalten, jeder spaetere Admin erhaelt ihn erneut
    Behalten,
}

// ---------------------------------------------------------------------------
// VerbindungsRegister
// ---------------------------------------------------------------------------

/// In-Memory-Register fuer Admin und Kamera-Sitzungen
#[derive(Debug, Default)]
pub struct VerbindungsRegister {
    kameras: BTreeMap<KameraId, KameraSitzung>,
    admin: Option<VerbindungsId>,
}

impl VerbindungsRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine Sitzung an oder bindet sie an die neue Verbindung
    ///
    /// Ein vorhandener offener Offer bleibt erhalten.
    pub fn client_registrieren(&mut self, client_id: KameraId, verbindung: VerbindungsId) {
        self.kameras
            .entry(client_id.clone())
            .and_modify(|sitzung| sitzung.verbindung = Some(verbindung))
            .or_insert(KameraSitzung {
                client_id,
                verbindung: Some(verbindung),
                offenes_angebot: None,
            });
    }

    /// Setzt den Admin; gibt den verdraengten Admin zurueck
    pub fn admin_registrieren(&mut self, verbindung: VerbindungsId) -> Option<VerbindungsId> {
        self.admin.replace(verbindung)
    }

    /// Live-Verbindung einer Kamera
    pub fn kamera_verbindung(&self, client_id: &KameraId) -> Option<VerbindungsId> {
        self.kameras.get(client_id).and_then(|s| s.verbindung)
    }

    /// Live-Verbindung des Admins
    pub fn admin_verbindung(&self) -> Option<VerbindungsId> {
        self.admin
    }

    /// Merkt einen Offer fuer spaeteres Replay vor
    pub fn angebot_speichern(
        &mut self,
        client_id: &KameraId,
        angebot: Value,
    ) -> SignalingResult<()> {
        match self.kameras.get_mut(client_id) {
            Some(sitzung) => {
                sitzung.offenes_angebot = Some(angebot);
                Ok(())
            }
            None => Err(SignalingError::ziel(format!(
                "keine Sitzung fuer Kamera {client_id}"
            ))),
        }
    }

    /// Momentaufnahme aller offenen Offers, sortiert nach Kamera-ID
    ///
    /// Mit `NachReplayLoeschen` sind die Offers danach geleert.
    pub fn angebote_abholen(&mut self, richtlinie: AngebotsRichtlinie) -> Vec<(KameraId, Value)> {
        self.kameras
            .values_mut()
            .filter_map(|sitzung| {
                let angebot = match richtlinie {
                    AngebotsRichtlinie::NachReplayLoeschen => sitzung.offenes_angebot.take(),
                    AngebotsRichtlinie::Behalten => sitzung.offenes_angebot.clone(),
                };
                angebot.map(|a| (sitzung.client_id.clone(), a))
            })
            .collect()
    }

    /// Entfernt eine Sitzung (no-op wenn unbekannt)
    pub fn kamera_entfernen(&mut self, client_id: &KameraId) -> Option<KameraSitzung> {
        self.kameras.remove(client_id)
    }

    /// Verarbeitet einen Verbindungsabbruch
    ///
    /// Der Admin wird nur geloescht, wenn die Verbindung noch der aktuelle
    /// Admin ist. Kamera-Sitzungen verlieren nur ihre Verbindung.
    pub fn verbindung_getrennt(&mut self, verbindung: VerbindungsId) -> GetrennteRolle {
        let war_admin = self.admin == Some(verbindung);
        if war_admin {
            self.admin = None;
        }

        let mut kameras = Vec::new();
        for sitzung in self.kameras.values_mut() {
            if sitzung.verbindung == Some(verbindung) {
                sitzung.verbindung = None;
                kameras.push(sitzung.client_id.clone());
            }
        }

        if war_admin {
            GetrennteRolle::Admin
        } else if !kameras.is_empty() {
            GetrennteRolle::Kamera(kameras)
        } else {
            GetrennteRolle::Unbekannt
        }
    }

    /// Erste Kamera, deren Live-Verbindung `verbindung` ist
    pub fn kamera_fuer_verbindung(&self, verbindung: VerbindungsId) -> Option<KameraId> {
        self.kameras
            .values()
            .find(|s| s.verbindung == Some(verbindung))
            .map(|s| s.client_id.clone())
    }

    /// Verbindung der einzigen verbundenen Kamera (Einzel-Client-Modus)
    ///
    /// `None` wenn keine oder mehrere Kameras verbunden sind.
    pub fn einzige_kamera_verbindung(&self) -> Option<VerbindungsId> {
        let mut verbunden = self.kameras.values().filter_map(|s| s.verbindung);
        match (verbunden.next(), verbunden.next()) {
            (Some(v), None) => Some(v),
            _ => None,
        }
    }

    pub fn ist_admin(&self, verbindung: VerbindungsId) -> bool {
        self.admin == Some(verbindung)
    }

    pub fn ist_registriert(&self, client_id: &KameraId) -> bool {
        self.kameras.contains_key(client_id)
    }

    pub fn sitzung(&self, client_id: &KameraId) -> Option<&KameraSitzung> {
        self.kameras.get(client_id)
    }

    pub fn kamera_anzahl(&self) -> usize {
        self.kameras.len()
    }

    pub fn admin_vorhanden(&self) -> bool {
        self.admin.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
