//! The local web server shared by the parts of an applet that need browser callbacks.
//!
//! Each user registers a path prefix with its own router. The listener is bound when the
//! first prefix starts and shut down when the last one stops.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use smart_default::SmartDefault;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const DEFAULT_PORT: u16 = 15610;

struct Prefix {
    router: Router,
    started: bool,
}

#[derive(SmartDefault)]
struct ServerState {
    #[default("localhost".to_string())]
    host: String,
    #[default(DEFAULT_PORT)]
    port: u16,
    prefixes: BTreeMap<String, Prefix>,
    running: Option<CancellationToken>,
}

#[derive(Clone, Default)]
pub struct WebServer(Arc<Mutex<ServerState>>);

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("WebServer")
            .field("url", &format!("{}:{}", state.host, state.port))
            .field("prefixes", &state.prefixes.keys().collect::<Vec<_>>())
            .field("running", &state.running.is_some())
            .finish()
    }
}

impl WebServer {
    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the address used by the next bind. An empty host keeps the current one.
    pub fn set_address(&self, host: &str, port: u16) {
        let mut state = self.state();
        if !host.is_empty() {
            state.host = host.to_string();
        }
        state.port = port;
    }

    /// `host:port` of the server.
    pub fn url(&self) -> String {
        let state = self.state();
        format!("{}:{}", state.host, state.port)
    }

    /// Register the routes served under `prefix`. The prefix is stopped until [`WebServer::start`].
    pub fn register(&self, prefix: &str, router: Router) {
        self.state().prefixes.insert(prefix.to_string(), Prefix { router, started: false });
    }

    pub fn unregister(&self, prefix: &str) {
        self.stop(prefix);
        self.state().prefixes.remove(prefix);
    }

    pub fn is_started(&self, prefix: &str) -> bool {
        self.state().prefixes.get(prefix).map_or(false, |p| p.started)
    }

    pub fn is_running(&self) -> bool {
        self.state().running.is_some()
    }

    /// Serve `prefix`, binding the listener if no other prefix is served yet.
    pub async fn start(&self, prefix: &str) -> Result<()> {
        let (token, address) = {
            let mut state = self.state();
            let entry = state.prefixes.get_mut(prefix).ok_or_else(|| anyhow!("Web prefix {} is not registered", prefix))?;
            entry.started = true;
            if state.running.is_some() {
                return Ok(());
            }
            let token = CancellationToken::new();
            state.running = Some(token.clone());
            (token, format!("{}:{}", state.host, state.port))
        };

        let listener = match tokio::net::TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(err) => {
                let mut state = self.state();
                state.running = None;
                if let Some(entry) = state.prefixes.get_mut(prefix) {
                    entry.started = false;
                }
                return Err(err).with_context(|| format!("Could not bind the web server to {}", address));
            }
        };
        log::info!("Web server listening on http://{}", address);

        let app = self.app();
        tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                log::error!("Web server stopped: {:?}", err);
            }
        });
        Ok(())
    }

    /// Stop serving `prefix`. The listener closes once no prefix is served.
    pub fn stop(&self, prefix: &str) {
        let mut state = self.state();
        if let Some(entry) = state.prefixes.get_mut(prefix) {
            entry.started = false;
        }
        if state.prefixes.values().any(|p| p.started) {
            return;
        }
        if let Some(token) = state.running.take() {
            log::info!("Stopping web server");
            token.cancel();
        }
    }

    /// Start `prefix` for as long as the returned guard lives, unless it was started already.
    pub async fn auto_start(&self, prefix: &str) -> Result<AutoStop> {
        if self.is_started(prefix) {
            return Ok(AutoStop { server: self.clone(), prefix: None });
        }
        self.start(prefix).await?;
        Ok(AutoStop { server: self.clone(), prefix: Some(prefix.to_string()) })
    }

    fn router_for(&self, path: &str) -> Option<Router> {
        let state = self.state();
        let (prefix, entry) = state.prefixes.iter().find(|(prefix, _)| {
            path.strip_prefix(prefix.as_str()).map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
        })?;
        if !entry.started {
            log::debug!("Refused request to {}: {} is not started", path, prefix);
            return None;
        }
        Some(entry.router.clone())
    }

    /// The service answering every request of the listener.
    pub fn app(&self) -> Router {
        Router::new().fallback(dispatch).with_state(self.clone())
    }
}

async fn dispatch(State(server): State<WebServer>, request: Request) -> Response {
    let Some(router) = server.router_for(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Stops the prefix it started when dropped.
#[must_use]
pub struct AutoStop {
    server: WebServer,
    prefix: Option<String>,
}

impl Drop for AutoStop {
    fn drop(&mut self) {
        if let Some(prefix) = self.prefix.take() {
            self.server.stop(&prefix);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{body::Body, routing::get};
    use pretty_assertions::assert_eq;

    fn server() -> WebServer {
        let server = WebServer::default();
        server.set_address("127.0.0.1", 0);
        server.register("/video", Router::new().route("/video/list", get(|| async { "[]" })));
        server
    }

    async fn status(server: &WebServer, path: &str) -> StatusCode {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        server.app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_prefix_must_be_started() {
        let server = server();
        assert_eq!(server.url(), "127.0.0.1:0");
        assert_eq!(status(&server, "/video/list").await, StatusCode::NOT_FOUND);

        server.start("/video").await.unwrap();
        assert!(server.is_running());
        assert_eq!(status(&server, "/video/list").await, StatusCode::OK);
        assert_eq!(status(&server, "/videos/list").await, StatusCode::NOT_FOUND);

        server.stop("/video");
        assert!(!server.is_running());
        assert_eq!(status(&server, "/video/list").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listener_lives_until_last_prefix_stops() {
        let server = server();
        server.register("/mail", Router::new());
        server.start("/video").await.unwrap();
        server.start("/mail").await.unwrap();
        server.stop("/video");
        assert!(server.is_running());
        server.stop("/mail");
        assert!(!server.is_running());
        assert!(server.start("/unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_auto_start_only_stops_what_it_started() {
        let server = server();
        {
            let _guard = server.auto_start("/video").await.unwrap();
            assert!(server.is_started("/video"));
        }
        assert!(!server.is_started("/video"));

        server.start("/video").await.unwrap();
        drop(server.auto_start("/video").await.unwrap());
        assert!(server.is_started("/video"));
    }
}
