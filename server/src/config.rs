//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist. Danach ueberschreiben Umgebungsvariablen einzelne Werte:
//!
//! | Variable        | Wirkung                                              |
//! |-----------------|------------------------------------------------------|
//! | `PORT`          | Listen-Port                                          |
//! | `FB_LOG_LEVEL`  | Log-Level bzw. EnvFilter-Direktive                   |
//! | `FB_LOG_FORMAT` | Log-Format (`text`/`json`)                           |
//! | `FB_LOG_DIR`    | Verzeichnis des Ereignis-Logs                        |
//! | `NODE_ENV`      | `production` waehlt `/tmp/logs` als Log-Verzeichnis  |

use anyhow::{Context, Result};
use fernblick_observability::{log_filter, LogFormat};
use fernblick_signaling::{SignalingConfig, WebKonfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log-Verzeichnis im Produktionsbetrieb
const PRODUKTION_LOG_VERZEICHNIS: &str = "/tmp/logs";
/// Log-Verzeichnis sonst (relativ zum Arbeitsverzeichnis)
const STANDARD_LOG_VERZEICHNIS: &str = "logs";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Web-Roots und CORS
    pub web: WebEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Routing-Richtlinien
    pub signaling: SignalingConfig,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Fernblick".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Web-Einstellungen (statische Roots, CORS)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebEinstellungen {
    /// Verzeichnis der Kamera-App (`/client-app`)
    pub client_app_verzeichnis: String,
    /// Verzeichnis des Admin-Panels (`/admin-panel`)
    pub admin_panel_verzeichnis: String,
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for WebEinstellungen {
    fn default() -> Self {
        Self {
            client_app_verzeichnis: "client-app".into(),
            admin_panel_verzeichnis: "admin-panel".into(),
            cors_origins: vec![
                "http://localhost:3000".into(),
                "https://secret-404e.onrender.com".into(),
            ],
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder EnvFilter-Direktive, z.B. "info" oder "fernblick_signaling=debug,info"
    pub level: String,
    /// Format: "text" oder "json"
    pub format: LogFormat,
    /// Verzeichnis fuer `access.log` (leer = aus `NODE_ENV` abgeleitet)
    pub ereignis_verzeichnis: Option<String>,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
            ereignis_verzeichnis: None,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Wendet die Prozess-Umgebung an
    pub fn umgebung_anwenden(&mut self) -> Result<()> {
        self.umgebung_anwenden_mit(|name| std::env::var(name).ok())
    }

    /// Wendet Umgebungsvariablen aus einer beliebigen Quelle an
    pub fn umgebung_anwenden_mit(&mut self, lesen: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lesen("PORT") {
            self.netzwerk.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT ist kein gueltiger Port: '{port}'"))?;
        }

        if let Some(level) = lesen("FB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lesen("FB_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        if let Some(verzeichnis) = lesen("FB_LOG_DIR") {
            self.logging.ereignis_verzeichnis = Some(verzeichnis);
        } else if self.logging.ereignis_verzeichnis.is_none() {
            let produktion = lesen("NODE_ENV").as_deref() == Some("production");
            let verzeichnis = if produktion {
                PRODUKTION_LOG_VERZEICHNIS
            } else {
                STANDARD_LOG_VERZEICHNIS
            };
            self.logging.ereignis_verzeichnis = Some(verzeichnis.into());
        }
        Ok(())
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> Result<()> {
        log_filter(&self.logging.level)?;
        if self.signaling.sende_queue_groesse == 0 {
            anyhow::bail!("signaling.sende_queue_groesse muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer HTTP/WebSocket zurueck
    pub fn bind_adresse(&self) -> Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    /// Verzeichnis des Ereignis-Logs
    pub fn ereignis_log_verzeichnis(&self) -> PathBuf {
        PathBuf::from(
            self.logging
                .ereignis_verzeichnis
                .as_deref()
                .unwrap_or(STANDARD_LOG_VERZEICHNIS),
        )
    }

    /// Baut die Konfiguration fuer den `SignalingServer`
    pub fn web_konfig(&self) -> WebKonfig {
        WebKonfig {
            client_app_verzeichnis: PathBuf::from(&self.web.client_app_verzeichnis),
            admin_panel_verzeichnis: PathBuf::from(&self.web.admin_panel_verzeichnis),
            cors_origins: self.web.cors_origins.clone(),
        }
    }
}
