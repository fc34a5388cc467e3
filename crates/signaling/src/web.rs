//! HTTP/WebSocket-Server – Router und Serve-Schleife
//!
//! Der `SignalingServer` vereint alle HTTP-Endpunkte in einem axum-Router:
//!
//! | Pfad            | Inhalt                                        |
//! |-----------------|-----------------------------------------------|
//! | `/`             | Kennung des Servers (Text)                    |
//! | `/ws`           | WebSocket-Upgrade, eine `ClientConnection` je Socket |
//! | `/client-app`   | Statische Kamera-App (`index.html`)           |
//! | `/admin-panel`  | Statisches Admin-Panel (`admin.html`)         |
//! | `/health`       | JSON-Health-Check                             |
//! | `/metrics`      | Prometheus-Textformat                         |

use axum::{
    body::Body,
    extract::{ConnectInfo, State, WebSocketUpgrade},
    handler::HandlerWithoutStateExt,
    http::{HeaderValue, Method, Request, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use fernblick_observability::{health_router, metrics_router, EreignisProtokoll, HealthState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// Antwort auf `GET /`
pub const SERVER_KENNUNG: &str = "Remote Camera Control Server";

/// Index-Datei des Admin-Panels
const ADMIN_INDEX: &str = "/admin.html";

/// Konfiguration fuer den HTTP/WebSocket-Server
#[derive(Debug, Clone)]
pub struct WebKonfig {
    pub client_app_verzeichnis: PathBuf,
    pub admin_panel_verzeichnis: PathBuf,
    /// Erlaubte CORS-Origins; leer bedeutet permissiv
    pub cors_origins: Vec<String>,
}

/// Zustand des `/ws`-Handlers
struct WsZustand<P: EreignisProtokoll> {
    state: Arc<SignalingState<P>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<P: EreignisProtokoll> Clone for WsZustand<P> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            shutdown_rx: self.shutdown_rx.clone(),
        }
    }
}

/// HTTP/WebSocket-Signaling-Server
pub struct SignalingServer<P: EreignisProtokoll> {
    state: Arc<SignalingState<P>>,
    konfig: WebKonfig,
    health: HealthState,
}

impl<P: EreignisProtokoll> SignalingServer<P> {
    pub fn neu(state: Arc<SignalingState<P>>, konfig: WebKonfig, health: HealthState) -> Self {
        Self {
            state,
            konfig,
            health,
        }
    }

    /// Baut den vollstaendigen Router
    ///
    /// `/ws` benoetigt `ConnectInfo<SocketAddr>`, also einen Dienst aus
    /// `into_make_service_with_connect_info`.
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        let ws_zustand = WsZustand {
            state: Arc::clone(&self.state),
            shutdown_rx,
        };

        let client_app = ServeDir::new(&self.konfig.client_app_verzeichnis)
            .not_found_service(client_app_fehlt.into_service());

        let admin_panel = tower::ServiceBuilder::new()
            .map_request(admin_index)
            .service(
                ServeDir::new(&self.konfig.admin_panel_verzeichnis)
                    .not_found_service(admin_panel_fehlt.into_service()),
            );

        Router::new()
            .route("/", get(wurzel))
            .route("/ws", get(ws_upgrade::<P>))
            .with_state(ws_zustand)
            .nest_service("/client-app", client_app)
            .nest_service("/admin-panel", admin_panel)
            .merge(health_router(self.health.clone()))
            .merge(metrics_router(self.state.metriken.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(self.cors())
    }

    // CORS: entweder konfigurierte Origins (GET/POST) oder permissiv
    fn cors(&self) -> CorsLayer {
        if self.konfig.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .konfig
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(wert) => Some(wert),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ungueltiger CORS-Origin ignoriert");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
    }

    /// Startet den Server auf einem bereits gebundenen Listener
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten_mit_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        let app = self.router(shutdown_rx.clone());

        tracing::info!(adresse = %lokale_addr, "Signaling-Server gestartet");
        self.state
            .dispatcher
            .protokoll()
            .protokollieren(&format!("Server started on port {}", lokale_addr.port()));

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
        })
        .await?;

        tracing::info!("Signaling-Server gestoppt");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

async fn wurzel() -> &'static str {
    SERVER_KENNUNG
}

async fn ws_upgrade<P: EreignisProtokoll>(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(zustand): State<WsZustand<P>>,
) -> impl IntoResponse {
    let verbindung = ClientConnection::neu(zustand.state, peer_addr);
    let shutdown_rx = zustand.shutdown_rx;
    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}

async fn client_app_fehlt() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Client app not found")
}

async fn admin_panel_fehlt() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Admin panel not found")
}

/// `/admin-panel` und `/admin-panel/` liefern `admin.html`
fn admin_index(mut req: Request<Body>) -> Request<Body> {
    if req.uri().path() == "/" {
        *req.uri_mut() = Uri::from_static(ADMIN_INDEX);
    }
    req
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use fernblick_observability::{RelayMetrics, SpeicherProtokoll};
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn test_verzeichnis(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fernblick-web-{}-{}", name, std::process::id()))
    }

    fn server(client_app: PathBuf, admin_panel: PathBuf) -> SignalingServer<SpeicherProtokoll> {
        let metriken = RelayMetrics::neu().unwrap();
        let state = SignalingState::neu(
            SignalingConfig::default(),
            SpeicherProtokoll::neu(),
            metriken.clone(),
        );
        let health = HealthState::neu(metriken, Arc::new(AtomicBool::new(false)));
        SignalingServer::neu(
            state,
            WebKonfig {
                client_app_verzeichnis: client_app,
                admin_panel_verzeichnis: admin_panel,
                cors_origins: vec!["http://localhost:3000".into()],
            },
            health,
        )
    }

    async fn get_text(router: Router, pfad: &str) -> (StatusCode, String) {
        let antwort = router
            .oneshot(Request::builder().uri(pfad).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = antwort.status();
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn wurzel_liefert_kennung() {
        let (_tx, rx) = watch::channel(false);
        let s = server(test_verzeichnis("leer-a"), test_verzeichnis("leer-b"));
        let (status, text) = get_text(s.router(rx), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, SERVER_KENNUNG);
    }

    #[tokio::test]
    async fn fehlende_web_roots_liefern_404_text() {
        let (_tx, rx) = watch::channel(false);
        let s = server(test_verzeichnis("fehlt-a"), test_verzeichnis("fehlt-b"));

        let (status, text) = get_text(s.router(rx.clone()), "/client-app/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(text, "Client app not found");

        let (status, text) = get_text(s.router(rx), "/admin-panel/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(text, "Admin panel not found");
    }

    #[tokio::test]
    async fn web_roots_liefern_index_dateien() {
        let client_app = test_verzeichnis("client-app");
        let admin_panel = test_verzeichnis("admin-panel");
        std::fs::create_dir_all(&client_app).unwrap();
        std::fs::create_dir_all(&admin_panel).unwrap();
        std::fs::write(client_app.join("index.html"), "kamera").unwrap();
        std::fs::write(admin_panel.join("admin.html"), "admin").unwrap();

        let (_tx, rx) = watch::channel(false);
        let s = server(client_app.clone(), admin_panel.clone());

        let (status, text) = get_text(s.router(rx.clone()), "/client-app/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "kamera");

        let (status, text) = get_text(s.router(rx), "/admin-panel/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "admin");

        let _ = std::fs::remove_dir_all(&client_app);
        let _ = std::fs::remove_dir_all(&admin_panel);
    }

    #[tokio::test]
    async fn health_und_metrics_sind_eingebunden() {
        let (_tx, rx) = watch::channel(false);
        let s = server(test_verzeichnis("h-a"), test_verzeichnis("h-b"));

        let (status, text) = get_text(s.router(rx.clone()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("\"status\""));

        let (status, text) = get_text(s.router(rx), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("fernblick_connections_active"));
    }
}
