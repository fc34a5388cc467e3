//! Message-Dispatcher – Routet Signaling-Nachrichten zwischen Kameras und Admin
//!
//! Der Dispatcher empfaengt eine `SignalNachricht` von einer `ClientConnection`,
//! loest ueber das `VerbindungsRegister` das Ziel auf und reiht die
//! ausgehende Nachricht in dessen Send-Queue ein.
//!
//! ## Routing-Tabelle
//! | Event           | Ziel                                          |
//! |-----------------|-----------------------------------------------|
//! | `register`      | Register (Kamera oder Admin, Admin-Replay)     |
//! | `offer`         | Admin, zusaetzlich fuer Replay vorgemerkt      |
//! | `answer`        | Kamera (ohne `clientId`)                      |
//! | `ice-candidate` | Gegenseite, je nach Absender                  |
//! | `start-camera`  | Kamera                                        |
//! | `stop-camera`   | Kamera, danach Sitzung entfernen              |
//! | `snapshot`      | Admin (mit `clientId`)                        |
//! | `admin-command` | einzige Kamera (nur Einzel-Client-Modus)       |
//!
//! ## Nebenlaeufigkeit
//! Das Register liegt hinter einem Mutex. Aufloesen und Einreihen passieren
//! unter demselben Lock; Einreihen ist ein `try_send`, nie Netzwerk-IO.
//!
//! ## Fehler
//! Kein Fehler geht an den Absender zurueck. `dispatch` protokolliert
//! verworfene Nachrichten und zaehlt sie in `fernblick_signals_dropped_total`.

use fernblick_core::{KameraId, Rolle, VerbindungsId};
use fernblick_observability::{EreignisProtokoll, RelayMetrics};
use fernblick_protocol::{AusgehendeNachricht, SignalNachricht};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{GetrennteRolle, VerbindungsRegister};
use crate::server_state::{SignalingConfig, StartKameraModus};
use crate::zustellung::Zusteller;

/// Event-Label fuer Frames, die nicht geparst werden konnten
const UNBEKANNTES_EVENT: &str = "unbekannt";

/// Zentraler Signaling-Router
pub struct MessageDispatcher<Z: Zusteller, P: EreignisProtokoll> {
    register: Mutex<VerbindungsRegister>,
    zusteller: Z,
    protokoll: P,
    config: Arc<SignalingConfig>,
    metriken: RelayMetrics,
}

impl<Z: Zusteller, P: EreignisProtokoll> MessageDispatcher<Z, P> {
    /// Erstellt einen Dispatcher mit leerem Register
    pub fn neu(
        config: Arc<SignalingConfig>,
        zusteller: Z,
        protokoll: P,
        metriken: RelayMetrics,
    ) -> Self {
        Self {
            register: Mutex::new(VerbindungsRegister::neu()),
            zusteller,
            protokoll,
            config,
            metriken,
        }
    }

    // -----------------------------------------------------------------------
    // Verbindungs-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Meldet eine neue Transport-Verbindung
    pub fn verbindung_geoeffnet(&self, von: VerbindungsId) {
        self.metriken.connections_active.inc();
        tracing::info!(verbindung = %von, "Verbindung geoeffnet");
        self.protokoll.protokollieren(&format!("Client connected: {von}"));
    }

    /// Meldet das Ende einer Transport-Verbindung
    ///
    /// Kamera-Sitzungen bleiben bestehen, nur ihre Verbindung wird geloescht.
    pub fn verbindung_getrennt(&self, von: VerbindungsId) -> GetrennteRolle {
        let rolle = {
            let mut register = self.register.lock();
            let rolle = register.verbindung_getrennt(von);
            self.metriken
                .register_stand(register.kamera_anzahl(), register.admin_vorhanden());
            rolle
        };
        self.metriken.connections_active.dec();

        match &rolle {
            GetrennteRolle::Admin => {
                tracing::info!(verbindung = %von, "Admin getrennt");
                self.protokoll.protokollieren(&format!("Admin disconnected: {von}"));
            }
            GetrennteRolle::Kamera(kameras) => {
                tracing::info!(verbindung = %von, kameras = ?kameras, "Kamera getrennt, Sitzung bleibt erhalten");
                self.protokoll.protokollieren(&format!("Client disconnected: {von}"));
            }
            GetrennteRolle::Unbekannt => {
                tracing::debug!(verbindung = %von, "Unregistrierte Verbindung getrennt");
            }
        }
        rolle
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Verarbeitet eine eingehende Nachricht
    ///
    /// Fehler werden protokolliert und gezaehlt, nie zurueckgegeben.
    pub fn dispatch(&self, von: VerbindungsId, nachricht: SignalNachricht) {
        let event = nachricht.event_name();
        if let Err(e) = self.route(von, nachricht) {
            self.verwerfen(von, event, &e);
        }
    }

    /// Meldet einen Frame, der nicht als `SignalNachricht` lesbar war
    pub fn ungueltig(&self, von: VerbindungsId, fehler: &SignalingError) {
        self.verwerfen(von, UNBEKANNTES_EVENT, fehler);
    }

    fn verwerfen(&self, von: VerbindungsId, event: &str, fehler: &SignalingError) {
        self.metriken.verworfen(event, fehler.grund());
        match fehler {
            SignalingError::ZielNichtGefunden(_) | SignalingError::SendFehler(_) => {
                tracing::debug!(verbindung = %von, event, fehler = %fehler, "Nachricht verworfen");
            }
            _ => {
                tracing::warn!(verbindung = %von, event, fehler = %fehler, "Nachricht verworfen");
            }
        }
    }

    fn route(&self, von: VerbindungsId, nachricht: SignalNachricht) -> SignalingResult<()> {
        let mut register = self.register.lock();
        let ergebnis = self.route_gesperrt(&mut register, von, nachricht);
        self.metriken
            .register_stand(register.kamera_anzahl(), register.admin_vorhanden());
        ergebnis
    }

    fn route_gesperrt(
        &self,
        register: &mut VerbindungsRegister,
        von: VerbindungsId,
        nachricht: SignalNachricht,
    ) -> SignalingResult<()> {
        match nachricht {
            SignalNachricht::Register {
                role: Rolle::Client,
                client_id,
            } => {
                let client_id = pflicht(client_id, "register")?;
                register.client_registrieren(client_id.clone(), von);
                tracing::info!(verbindung = %von, client_id = %client_id, "Kamera registriert");
                self.protokoll
                    .protokollieren(&format!("Client registered: {client_id}"));

                if self.config.start_kamera == StartKameraModus::BeiRegistrierung {
                    self.weiterleiten(von, AusgehendeNachricht::StartCamera)?;
                }
                Ok(())
            }

            SignalNachricht::Register {
                role: Rolle::Admin, ..
            } => {
                if let Some(vorher) = register.admin_registrieren(von) {
                    tracing::info!(verbindung = %von, vorher = %vorher, "Admin ersetzt");
                }
                tracing::info!(verbindung = %von, "Admin registriert");
                self.protokoll
                    .protokollieren(&format!("Admin registered: {von}"));

                let angebote = register.angebote_abholen(self.config.angebots_richtlinie());
                for (client_id, offer) in angebote {
                    // Ein voller Admin-Puffer verwirft nur diesen Offer
                    let ergebnis = self.weiterleiten(
                        von,
                        AusgehendeNachricht::Offer {
                            offer,
                            client_id: client_id.clone(),
                        },
                    );
                    match ergebnis {
                        Ok(()) => {
                            tracing::info!(verbindung = %von, client_id = %client_id, "Offer an neuen Admin nachgereicht");
                            self.protokoll.protokollieren(&format!(
                                "Offer sent from client {client_id} to admin"
                            ));
                        }
                        Err(e) => self.verwerfen(von, "offer", &e),
                    }
                }
                Ok(())
            }

            SignalNachricht::Offer { offer, client_id } => {
                let client_id = pflicht(client_id, "offer")?;
                // Jeder Offer wird fuer einen spaeteren Admin-Replay vorgemerkt
                let vorgemerkt = register.angebot_speichern(&client_id, offer.clone());

                let Some(admin) = register.admin_verbindung() else {
                    vorgemerkt?;
                    tracing::info!(client_id = %client_id, "Kein Admin, Offer vorgemerkt");
                    return Ok(());
                };
                if vorgemerkt.is_err() {
                    tracing::debug!(client_id = %client_id, "Offer ohne Sitzung, nur weitergeleitet");
                }

                self.weiterleiten(
                    admin,
                    AusgehendeNachricht::Offer {
                        offer,
                        client_id: client_id.clone(),
                    },
                )?;
                tracing::info!(client_id = %client_id, admin = %admin, "Offer an Admin weitergeleitet");
                self.protokoll
                    .protokollieren(&format!("Offer sent from client {client_id} to admin"));
                Ok(())
            }

            SignalNachricht::Answer { answer, client_id } => {
                let client_id = pflicht(client_id, "answer")?;
                let ziel = kamera_ziel(register, &client_id)?;
                self.weiterleiten(ziel, AusgehendeNachricht::Answer { answer })?;
                tracing::info!(client_id = %client_id, "Answer an Kamera weitergeleitet");
                self.protokoll.protokollieren(&format!(
                    "Answer sent from admin to client {client_id}"
                ));
                Ok(())
            }

            SignalNachricht::IceCandidate {
                candidate,
                client_id,
                from_admin,
            } => {
                if register.ist_admin(von) {
                    if !from_admin {
                        tracing::debug!(verbindung = %von, "fromAdmin fehlt, Absender ist Admin");
                    }
                    let client_id = pflicht(client_id, "ice-candidate")?;
                    let ziel = kamera_ziel(register, &client_id)?;
                    self.weiterleiten(
                        ziel,
                        AusgehendeNachricht::IceCandidate {
                            candidate,
                            client_id: None,
                        },
                    )?;
                    self.protokoll.protokollieren(&format!(
                        "ICE candidate sent from admin to client {client_id}"
                    ));
                    return Ok(());
                }

                // Die Kennung aus der Nachricht gilt nur, wenn sie zu dieser Verbindung gehoert
                let absender = match client_id {
                    Some(id) if register.kamera_verbindung(&id) == Some(von) => Some(id),
                    _ => register.kamera_fuer_verbindung(von),
                };
                let Some(absender) = absender else {
                    return Err(SignalingError::UnbekannterAbsender(von));
                };
                if from_admin {
                    tracing::debug!(verbindung = %von, client_id = %absender, "fromAdmin gesetzt, Absender ist Kamera");
                }
                let admin = register
                    .admin_verbindung()
                    .ok_or_else(|| SignalingError::ziel("kein Admin registriert"))?;
                self.weiterleiten(
                    admin,
                    AusgehendeNachricht::IceCandidate {
                        candidate,
                        client_id: Some(absender.clone()),
                    },
                )?;
                self.protokoll.protokollieren(&format!(
                    "ICE candidate sent from client {absender} to admin"
                ));
                Ok(())
            }

            SignalNachricht::StartCamera { client_id } => {
                let client_id = pflicht(client_id, "start-camera")?;
                let ziel = kamera_ziel(register, &client_id)?;
                self.weiterleiten(ziel, AusgehendeNachricht::StartCamera)?;
                tracing::info!(client_id = %client_id, "start-camera weitergeleitet");
                Ok(())
            }

            SignalNachricht::StopCamera { client_id } => {
                let client_id = pflicht(client_id, "stop-camera")?;
                let weitergeleitet = kamera_ziel(register, &client_id)
                    .and_then(|ziel| self.weiterleiten(ziel, AusgehendeNachricht::StopCamera));
                // Sitzung wird unabhaengig vom Zustellerfolg entfernt
                if register.kamera_entfernen(&client_id).is_some() {
                    tracing::info!(client_id = %client_id, "Kamera-Sitzung entfernt");
                }
                weitergeleitet
            }

            SignalNachricht::Snapshot {
                image_data,
                client_id,
            } => {
                let client_id = pflicht(client_id, "snapshot")?;
                let admin = register
                    .admin_verbindung()
                    .ok_or_else(|| SignalingError::ziel("kein Admin registriert"))?;
                self.weiterleiten(
                    admin,
                    AusgehendeNachricht::Snapshot {
                        image_data,
                        client_id,
                    },
                )
            }

            SignalNachricht::AdminCommand { command } => {
                if !self.config.legacy_einzelclient {
                    return Err(SignalingError::Deaktiviert("admin-command"));
                }
                let ziel = register
                    .einzige_kamera_verbindung()
                    .ok_or_else(|| SignalingError::ziel("keine eindeutige Kamera verbunden"))?;
                self.weiterleiten(ziel, AusgehendeNachricht::Befehl(command.clone()))?;
                self.protokoll.protokollieren(&format!("Admin sent: {command}"));
                Ok(())
            }
        }
    }

    /// Reiht eine Nachricht ein und zaehlt sie
    fn weiterleiten(
        &self,
        ziel: VerbindungsId,
        nachricht: AusgehendeNachricht,
    ) -> SignalingResult<()> {
        let event = nachricht.event_name().to_string();
        if self.zusteller.senden(ziel, nachricht) {
            self.metriken.weitergeleitet(&event);
            Ok(())
        } else {
            Err(SignalingError::SendFehler(ziel))
        }
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Ereignis-Senke (auch fuer Server-Ereignisse ausserhalb des Routings)
    pub fn protokoll(&self) -> &P {
        &self.protokoll
    }

    pub fn kamera_verbindung(&self, client_id: &KameraId) -> Option<VerbindungsId> {
        self.register.lock().kamera_verbindung(client_id)
    }

    pub fn admin_verbindung(&self) -> Option<VerbindungsId> {
        self.register.lock().admin_verbindung()
    }

    pub fn kamera_anzahl(&self) -> usize {
        self.register.lock().kamera_anzahl()
    }

    pub fn ist_registriert(&self, client_id: &KameraId) -> bool {
        self.register.lock().ist_registriert(client_id)
    }
}

fn pflicht(client_id: Option<KameraId>, event: &str) -> SignalingResult<KameraId> {
    client_id.ok_or_else(|| SignalingError::ungueltig(format!("{event}: clientId fehlt")))
}

fn kamera_ziel(
    register: &VerbindungsRegister,
    client_id: &KameraId,
) -> SignalingResult<VerbindungsId> {
    register
        .kamera_verbindung(client_id)
        .ok_or_else(|| SignalingError::ziel(format!("Kamera {client_id} nicht verbunden")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fernblick_observability::SpeicherProtokoll;
    use serde_json::json;

    /// Zeichnet alle Zustellungen auf
    #[derive(Default)]
    struct Aufzeichnung {
        gesendet: Mutex<Vec<(VerbindungsId, AusgehendeNachricht)>>,
    }

    impl Aufzeichnung {
        fn an(&self, ziel: VerbindungsId) -> Vec<AusgehendeNachricht> {
            self.gesendet
                .lock()
                .iter()
                .filter(|(v, _)| *v == ziel)
                .map(|(_, n)| n.clone())
                .collect()
        }

        fn anzahl(&self) -> usize {
            self.gesendet.lock().len()
        }
    }

    impl Zusteller for Aufzeichnung {
        fn senden(&self, ziel: VerbindungsId, nachricht: AusgehendeNachricht) -> bool {
            self.gesendet.lock().push((ziel, nachricht));
            true
        }
    }

    type TestDispatcher = MessageDispatcher<Arc<Aufzeichnung>, Arc<SpeicherProtokoll>>;

    struct Aufbau {
        dispatcher: TestDispatcher,
        zusteller: Arc<Aufzeichnung>,
        protokoll: Arc<SpeicherProtokoll>,
        metriken: RelayMetrics,
    }

    fn aufbau(config: SignalingConfig) -> Aufbau {
        let zusteller = Arc::new(Aufzeichnung::default());
        let protokoll = Arc::new(SpeicherProtokoll::neu());
        let metriken = RelayMetrics::neu().unwrap();
        let dispatcher = MessageDispatcher::neu(
            Arc::new(config),
            Arc::clone(&zusteller),
            Arc::clone(&protokoll),
            metriken.clone(),
        );
        Aufbau {
            dispatcher,
            zusteller,
            protokoll,
            metriken,
        }
    }

    fn kamera_registrieren(d: &TestDispatcher, id: &str) -> VerbindungsId {
        let v = VerbindungsId::new();
        d.dispatch(
            v,
            SignalNachricht::Register {
                role: Rolle::Client,
                client_id: Some(KameraId::from(id)),
            },
        );
        v
    }

    fn admin_registrieren(d: &TestDispatcher) -> VerbindungsId {
        let v = VerbindungsId::new();
        d.dispatch(
            v,
            SignalNachricht::Register {
                role: Rolle::Admin,
                client_id: None,
            },
        );
        v
    }

    fn offer(id: &str, sdp: &str) -> SignalNachricht {
        SignalNachricht::Offer {
            offer: json!(sdp),
            client_id: Some(KameraId::from(id)),
        }
    }

    fn verworfen(m: &RelayMetrics, event: &str, grund: &str) -> u64 {
        m.signals_dropped_total
            .with_label_values(&[event, grund])
            .get()
    }

    #[test]
    fn offer_wird_bei_admin_registrierung_nachgereicht() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));
        assert_eq!(a.zusteller.anzahl(), 0);

        let admin = admin_registrieren(&a.dispatcher);
        assert_eq!(
            a.zusteller.an(admin),
            vec![AusgehendeNachricht::Offer {
                offer: json!("O1"),
                client_id: KameraId::from("A"),
            }]
        );

        // Standard: nach dem Replay geloescht, zweiter Admin erhaelt nichts
        let zweiter = admin_registrieren(&a.dispatcher);
        assert!(a.zusteller.an(zweiter).is_empty());
        assert!(a.protokoll.enthaelt("Offer sent from client A to admin"));
    }

    #[test]
    fn behalten_richtlinie_spielt_offer_erneut_ab() {
        let a = aufbau(SignalingConfig {
            angebote_nach_replay_loeschen: false,
            ..Default::default()
        });
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));

        let erster = admin_registrieren(&a.dispatcher);
        let zweiter = admin_registrieren(&a.dispatcher);
        assert_eq!(a.zusteller.an(erster).len(), 1);
        assert_eq!(a.zusteller.an(zweiter).len(), 1);
    }

    #[test]
    fn offer_mit_admin_wird_sofort_weitergeleitet() {
        let a = aufbau(SignalingConfig::default());
        let admin = admin_registrieren(&a.dispatcher);
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));

        assert_eq!(a.zusteller.an(admin).len(), 1);
        assert_eq!(
            a.metriken
                .signals_forwarded_total
                .with_label_values(&["offer"])
                .get(),
            1
        );
    }

    #[test]
    fn neu_verbundener_admin_erhaelt_letzten_offer_einmal() {
        let a = aufbau(SignalingConfig::default());
        let erster = admin_registrieren(&a.dispatcher);
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));
        assert_eq!(a.zusteller.an(erster).len(), 1);

        a.dispatcher.verbindung_getrennt(erster);
        let zweiter = admin_registrieren(&a.dispatcher);
        assert_eq!(
            a.zusteller.an(zweiter),
            vec![AusgehendeNachricht::Offer {
                offer: json!("O1"),
                client_id: KameraId::from("A"),
            }]
        );

        let dritter = admin_registrieren(&a.dispatcher);
        assert!(a.zusteller.an(dritter).is_empty());
    }

    #[test]
    fn offer_ohne_sitzung_geht_an_admin_ohne_vormerkung() {
        let a = aufbau(SignalingConfig::default());
        let admin = admin_registrieren(&a.dispatcher);
        a.dispatcher.dispatch(VerbindungsId::new(), offer("X", "O"));
        assert_eq!(a.zusteller.an(admin).len(), 1);

        let neuer = admin_registrieren(&a.dispatcher);
        assert!(a.zusteller.an(neuer).is_empty());
    }

    #[test]
    fn offer_ohne_sitzung_und_admin_wird_verworfen() {
        let a = aufbau(SignalingConfig::default());
        a.dispatcher.dispatch(VerbindungsId::new(), offer("X", "O"));
        assert_eq!(a.zusteller.anzahl(), 0);
        assert_eq!(verworfen(&a.metriken, "offer", "ziel_nicht_gefunden"), 1);
    }

    #[test]
    fn vollstaendiges_szenario() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));
        let admin = admin_registrieren(&a.dispatcher);

        a.dispatcher.dispatch(
            admin,
            SignalNachricht::Answer {
                answer: json!("R1"),
                client_id: Some(KameraId::from("A")),
            },
        );
        a.dispatcher.dispatch(
            kamera,
            SignalNachricht::IceCandidate {
                candidate: json!("IC1"),
                client_id: Some(KameraId::from("A")),
                from_admin: false,
            },
        );
        a.dispatcher.dispatch(
            admin,
            SignalNachricht::StopCamera {
                client_id: Some(KameraId::from("A")),
            },
        );

        assert_eq!(
            a.zusteller.an(kamera),
            vec![
                AusgehendeNachricht::Answer {
                    answer: json!("R1")
                },
                AusgehendeNachricht::StopCamera,
            ]
        );
        assert_eq!(
            a.zusteller.an(admin)[1],
            AusgehendeNachricht::IceCandidate {
                candidate: json!("IC1"),
                client_id: Some(KameraId::from("A")),
            }
        );
        assert_eq!(a.dispatcher.kamera_verbindung(&KameraId::from("A")), None);
        assert!(!a.dispatcher.ist_registriert(&KameraId::from("A")));
    }

    #[test]
    fn ice_vom_admin_geht_ohne_tag_an_kamera() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        let admin = admin_registrieren(&a.dispatcher);
        a.dispatcher.dispatch(
            admin,
            SignalNachricht::IceCandidate {
                candidate: json!("c"),
                client_id: Some(KameraId::from("A")),
                from_admin: true,
            },
        );
        assert_eq!(
            a.zusteller.an(kamera),
            vec![AusgehendeNachricht::IceCandidate {
                candidate: json!("c"),
                client_id: None,
            }]
        );
        assert!(a.protokoll.enthaelt("ICE candidate sent from admin to client A"));
    }

    #[test]
    fn ice_von_kamera_traegt_client_id_der_nachricht() {
        let a = aufbau(SignalingConfig::default());
        let admin = admin_registrieren(&a.dispatcher);
        let kamera = VerbindungsId::new();
        for id in ["B", "A"] {
            a.dispatcher.dispatch(
                kamera,
                SignalNachricht::Register {
                    role: Rolle::Client,
                    client_id: Some(KameraId::from(id)),
                },
            );
        }

        let ice = |client_id: Option<&str>| SignalNachricht::IceCandidate {
            candidate: json!("c"),
            client_id: client_id.map(KameraId::from),
            from_admin: false,
        };
        a.dispatcher.dispatch(kamera, ice(Some("B")));
        // Fremde Kennung zaehlt nicht, Tag kommt dann von der Verbindung
        a.dispatcher.dispatch(kamera, ice(Some("Z")));

        let tags: Vec<_> = a
            .zusteller
            .an(admin)
            .into_iter()
            .map(|n| match n {
                AusgehendeNachricht::IceCandidate { client_id, .. } => client_id,
                andere => panic!("unerwartet: {andere:?}"),
            })
            .collect();
        assert_eq!(tags, vec![Some(KameraId::from("B")), Some(KameraId::from("A"))]);
        assert!(a.protokoll.enthaelt("ICE candidate sent from client B to admin"));
    }

    #[test]
    fn trennung_ohne_registrierung_schreibt_kein_ereignis() {
        let a = aufbau(SignalingConfig::default());
        let v = VerbindungsId::new();
        a.dispatcher.verbindung_geoeffnet(v);
        assert_eq!(a.dispatcher.verbindung_getrennt(v), GetrennteRolle::Unbekannt);
        assert!(!a.protokoll.enthaelt("Client disconnected"));
        assert_eq!(a.metriken.connections_active.get(), 0);
    }

    #[test]
    fn ice_von_unbekanntem_absender_wird_verworfen() {
        let a = aufbau(SignalingConfig::default());
        admin_registrieren(&a.dispatcher);
        a.dispatcher.dispatch(
            VerbindungsId::new(),
            SignalNachricht::IceCandidate {
                candidate: json!("c"),
                client_id: Some(KameraId::from("A")),
                from_admin: false,
            },
        );
        assert_eq!(a.zusteller.anzahl(), 0);
        assert_eq!(
            verworfen(&a.metriken, "ice-candidate", "unbekannter_absender"),
            1
        );
    }

    #[test]
    fn snapshot_ohne_admin_wird_still_verworfen() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "B");
        a.dispatcher.dispatch(
            kamera,
            SignalNachricht::Snapshot {
                image_data: json!("bytes"),
                client_id: Some(KameraId::from("B")),
            },
        );
        assert_eq!(a.zusteller.anzahl(), 0);
    }

    #[test]
    fn snapshot_an_admin_mit_tag() {
        let a = aufbau(SignalingConfig::default());
        let admin = admin_registrieren(&a.dispatcher);
        let kamera = kamera_registrieren(&a.dispatcher, "B");
        a.dispatcher.dispatch(
            kamera,
            SignalNachricht::Snapshot {
                image_data: json!("bytes"),
                client_id: Some(KameraId::from("B")),
            },
        );
        assert_eq!(
            a.zusteller.an(admin),
            vec![AusgehendeNachricht::Snapshot {
                image_data: json!("bytes"),
                client_id: KameraId::from("B"),
            }]
        );
    }

    #[test]
    fn stop_camera_entfernt_auch_getrennte_sitzung() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.verbindung_getrennt(kamera);
        assert!(a.dispatcher.ist_registriert(&KameraId::from("A")));

        a.dispatcher.dispatch(
            VerbindungsId::new(),
            SignalNachricht::StopCamera {
                client_id: Some(KameraId::from("A")),
            },
        );
        assert!(!a.dispatcher.ist_registriert(&KameraId::from("A")));
        assert_eq!(a.zusteller.anzahl(), 0);
    }

    #[test]
    fn trennung_behaelt_sitzung_und_offer() {
        let a = aufbau(SignalingConfig::default());
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));

        assert_eq!(
            a.dispatcher.verbindung_getrennt(kamera),
            GetrennteRolle::Kamera(vec![KameraId::from("A")])
        );
        assert_eq!(a.dispatcher.kamera_verbindung(&KameraId::from("A")), None);

        let admin = admin_registrieren(&a.dispatcher);
        assert_eq!(a.zusteller.an(admin).len(), 1);
        assert!(a.protokoll.enthaelt("Client disconnected"));
    }

    #[test]
    fn zweiter_admin_ersetzt_ersten() {
        let a = aufbau(SignalingConfig::default());
        let erster = admin_registrieren(&a.dispatcher);
        let zweiter = admin_registrieren(&a.dispatcher);
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        a.dispatcher.dispatch(kamera, offer("A", "O1"));

        assert!(a.zusteller.an(erster).is_empty());
        assert_eq!(a.zusteller.an(zweiter).len(), 1);
        assert_eq!(a.dispatcher.admin_verbindung(), Some(zweiter));
    }

    #[test]
    fn neu_registrierung_gewinnt() {
        let a = aufbau(SignalingConfig::default());
        let alt = kamera_registrieren(&a.dispatcher, "A");
        let neu = kamera_registrieren(&a.dispatcher, "A");
        let admin = admin_registrieren(&a.dispatcher);

        a.dispatcher.dispatch(
            admin,
            SignalNachricht::StartCamera {
                client_id: Some(KameraId::from("A")),
            },
        );
        assert!(a.zusteller.an(alt).is_empty());
        assert_eq!(a.zusteller.an(neu), vec![AusgehendeNachricht::StartCamera]);
    }

    #[test]
    fn start_camera_bei_registrierung() {
        let a = aufbau(SignalingConfig {
            start_kamera: StartKameraModus::BeiRegistrierung,
            ..Default::default()
        });
        let kamera = kamera_registrieren(&a.dispatcher, "A");
        assert_eq!(a.zusteller.an(kamera), vec![AusgehendeNachricht::StartCamera]);
    }

    #[test]
    fn fehlende_client_id_ist_ungueltig() {
        let a = aufbau(SignalingConfig::default());
        a.dispatcher.dispatch(
            VerbindungsId::new(),
            SignalNachricht::Answer {
                answer: json!("R"),
                client_id: None,
            },
        );
        assert_eq!(verworfen(&a.metriken, "answer", "ungueltig"), 1);
        assert_eq!(a.zusteller.anzahl(), 0);
    }

    #[test]
    fn admin_command_nur_im_einzelclient_modus() {
        let aus = aufbau(SignalingConfig::default());
        kamera_registrieren(&aus.dispatcher, "A");
        aus.dispatcher.dispatch(
            VerbindungsId::new(),
            SignalNachricht::AdminCommand {
                command: "take-snapshot".into(),
            },
        );
        assert_eq!(aus.zusteller.anzahl(), 0);
        assert_eq!(verworfen(&aus.metriken, "admin-command", "deaktiviert"), 1);

        let an = aufbau(SignalingConfig {
            legacy_einzelclient: true,
            ..Default::default()
        });
        let kamera = kamera_registrieren(&an.dispatcher, "A");
        let admin = admin_registrieren(&an.dispatcher);
        an.dispatcher.dispatch(
            admin,
            SignalNachricht::AdminCommand {
                command: "take-snapshot".into(),
            },
        );
        assert_eq!(
            an.zusteller.an(kamera),
            vec![AusgehendeNachricht::Befehl("take-snapshot".into())]
        );
        assert!(an.protokoll.enthaelt("Admin sent: take-snapshot"));
    }

    #[test]
    fn lebenszyklus_protokoll_und_metriken() {
        let a = aufbau(SignalingConfig::default());
        let v = VerbindungsId::new();
        a.dispatcher.verbindung_geoeffnet(v);
        assert_eq!(a.metriken.connections_active.get(), 1);
        assert!(a.protokoll.enthaelt(&format!("Client connected: {v}")));

        a.dispatcher.dispatch(
            v,
            SignalNachricht::Register {
                role: Rolle::Admin,
                client_id: None,
            },
        );
        assert_eq!(a.metriken.admin_connected.get(), 1);

        assert_eq!(a.dispatcher.verbindung_getrennt(v), GetrennteRolle::Admin);
        assert_eq!(a.metriken.connections_active.get(), 0);
        assert_eq!(a.metriken.admin_connected.get(), 0);
        assert!(a.protokoll.enthaelt(&format!("Admin disconnected: {v}")));
    }
}
