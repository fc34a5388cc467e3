//! Ereignis-Log – Append-only Protokolldatei fuer Relay-Ereignisse
//!
//! Jede Zeile hat das Format `<ISO-8601 Zeitstempel> - <Ereignis>` und wird
//! an `<verzeichnis>/access.log` angehaengt.
//!
//! ## Fire-and-forget
//! `protokollieren` blockiert nie und liefert keinen Fehler. Die Zeilen
//! laufen ueber eine begrenzte Queue zu einem Schreib-Task. Volle Queue oder
//! fehlgeschlagene Schreibvorgaenge werden nur via `tracing` gemeldet.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Dateiname der Protokolldatei
pub const LOG_DATEI: &str = "access.log";

/// Groesse der Schreib-Queue
const QUEUE_GROESSE: usize = 1024;

/// Senke fuer Relay-Ereignisse
pub trait EreignisProtokoll: Send + Sync + 'static {
    /// Haengt ein Ereignis an (fire-and-forget)
    fn protokollieren(&self, nachricht: &str);
}

// ---------------------------------------------------------------------------
// EreignisLog (Datei)
// ---------------------------------------------------------------------------

enum Auftrag {
    Zeile(String),
    Leeren(oneshot::Sender<()>),
}

/// Datei-basiertes Ereignis-Log
///
/// Clone teilt Queue und Stoerungs-Flag.
#[derive(Clone)]
pub struct EreignisLog {
    tx: mpsc::Sender<Auftrag>,
    pfad: Arc<PathBuf>,
    gestoert: Arc<AtomicBool>,
}

impl EreignisLog {
    /// Erstellt das Log und startet den Schreib-Task
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden. Das Verzeichnis
    /// wird erst von `initialisieren` angelegt.
    pub fn neu(verzeichnis: impl AsRef<Path>) -> Self {
        let pfad = Arc::new(verzeichnis.as_ref().join(LOG_DATEI));
        let gestoert = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(QUEUE_GROESSE);

        tokio::spawn(schreib_schleife(rx, Arc::clone(&pfad), Arc::clone(&gestoert)));

        Self { tx, pfad, gestoert }
    }

    /// Legt Verzeichnis und Datei an
    ///
    /// Ein Fehler ist nicht fatal: spaetere Schreibversuche werden weiterhin
    /// unternommen und einzeln gemeldet.
    pub async fn initialisieren(&self) -> std::io::Result<()> {
        if let Some(verzeichnis) = self.pfad.parent() {
            tokio::fs::create_dir_all(verzeichnis).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.pfad.as_path())
            .await?;
        tracing::info!(pfad = %self.pfad.display(), "Ereignis-Log bereit");
        Ok(())
    }

    /// Pfad der Protokolldatei
    pub fn pfad(&self) -> &Path {
        &self.pfad
    }

    /// Flag, das bei fehlgeschlagenem Schreiben gesetzt wird
    pub fn stoerung_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.gestoert)
    }

    /// Wartet bis alle bisher eingereihten Zeilen geschrieben sind
    pub async fn leeren(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Auftrag::Leeren(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

impl EreignisProtokoll for EreignisLog {
    fn protokollieren(&self, nachricht: &str) {
        let zeile = format!(
            "{} - {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            nachricht
        );
        if let Err(e) = self.tx.try_send(Auftrag::Zeile(zeile)) {
            tracing::error!(fehler = %e, "Ereignis-Log: Zeile verworfen");
        }
    }
}

/// Schreib-Task: oeffnet die Datei pro Zeile im Append-Modus
async fn schreib_schleife(
    mut rx: mpsc::Receiver<Auftrag>,
    pfad: Arc<PathBuf>,
    gestoert: Arc<AtomicBool>,
) {
    while let Some(auftrag) = rx.recv().await {
        match auftrag {
            Auftrag::Zeile(zeile) => match zeile_anhaengen(&pfad, &zeile).await {
                Ok(()) => gestoert.store(false, Ordering::Relaxed),
                Err(e) => {
                    gestoert.store(true, Ordering::Relaxed);
                    tracing::error!(
                        pfad = %pfad.display(),
                        fehler = %e,
                        "Fehler beim Schreiben in das Ereignis-Log"
                    );
                }
            },
            Auftrag::Leeren(fertig) => {
                let _ = fertig.send(());
            }
        }
    }
}

async fn zeile_anhaengen(pfad: &Path, zeile: &str) -> std::io::Result<()> {
    let mut datei = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(pfad)
        .await?;
    datei.write_all(zeile.as_bytes()).await?;
    datei.flush().await
}

// ---------------------------------------------------------------------------
// SpeicherProtokoll (Tests, Einbettung)
// ---------------------------------------------------------------------------

/// Haelt Ereignisse im Speicher statt in einer Datei
#[derive(Default)]
pub struct SpeicherProtokoll {
    eintraege: Mutex<Vec<String>>,
}

impl SpeicherProtokoll {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Kopie aller bisherigen Eintraege
    pub fn eintraege(&self) -> Vec<String> {
        self.eintraege.lock().clone()
    }

    /// Prueft ob ein Eintrag den Text enthaelt
    pub fn enthaelt(&self, text: &str) -> bool {
        self.eintraege.lock().iter().any(|e| e.contains(text))
    }
}

impl EreignisProtokoll for SpeicherProtokoll {
    fn protokollieren(&self, nachricht: &str) {
        self.eintraege.lock().push(nachricht.to_string());
    }
}

impl<T: EreignisProtokoll> EreignisProtokoll for Arc<T> {
    fn protokollieren(&self, nachricht: &str) {
        (**self).protokollieren(nachricht)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
