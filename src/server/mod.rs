// src/server/mod.rs

//! Development server: static files from the build tree plus the live-reload
//! channel.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::dag::RunSummary;
use crate::errors::{AssetdagError, Result};

pub mod livereload;

pub use livereload::{inject_client, LiveReload, ReloadEvent, CLIENT_JS, CLIENT_PATH, EVENTS_PATH};

const STOP_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of the dev server. There is no terminal state; `stop` returns
/// to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Serving { addr: SocketAddr },
}

#[derive(Debug, Clone)]
struct AppState {
    root: Arc<PathBuf>,
    live: LiveReload,
}

/// Routes of the dev server, rooted at the build tree.
pub fn router(root: PathBuf, live: LiveReload) -> Router {
    let state = AppState {
        root: Arc::new(root),
        live,
    };

    Router::new()
        .route(EVENTS_PATH, get(reload_events))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_build)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn reload_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.live.subscribe()).map(|msg| {
        let event = match msg {
            Ok(ev) => Event::default().event(ev.name()).data(ev.data()),
            // Missed events: a full reload covers whatever they were.
            Err(BroadcastStreamRecvError::Lagged(_)) => Event::default().event("reload").data(""),
        };
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

/// Page requests get the client injected; everything else is plain
/// `ServeDir`.
async fn serve_build(State(state): State<AppState>, req: Request) -> Response {
    if let Some(page) = html_target(&state.root, req.uri().path()) {
        match tokio::fs::read_to_string(&page).await {
            Ok(html) => return Html(inject_client(&html)).into_response(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(page = ?page, error = %e, "failed to read page");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match ServeDir::new(state.root.as_ref()).oneshot(req).await {
        Ok(res) => res.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

/// Build-tree file for a request path that names an HTML page.
fn html_target(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut rel = uri_path.trim_start_matches('/').to_string();
    if rel.is_empty() || rel.ends_with('/') {
        rel.push_str("index.html");
    }
    if !rel.ends_with(".html") {
        return None;
    }

    let rel = Path::new(&rel);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(rel))
}

#[derive(Debug)]
pub struct DevServer {
    host: String,
    port: u16,
    root: PathBuf,
    start_path: String,
    live: LiveReload,
    state: ServerState,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DevServer {
    pub fn new(cfg: &ConfigFile, live: LiveReload) -> Self {
        Self {
            host: cfg.server.host.clone(),
            port: cfg.server.port,
            root: cfg.build_root(),
            start_path: cfg.server.start_path.clone(),
            live,
            state: ServerState::Idle,
            shutdown: None,
            task: None,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Start serving once `summary` shows a completed `build` run.
    ///
    /// Calling this while already serving returns the bound address.
    pub async fn start(&mut self, summary: &RunSummary) -> Result<SocketAddr> {
        if let ServerState::Serving { addr } = self.state {
            return Ok(addr);
        }

        if !summary.includes_target("build") {
            return Err(AssetdagError::BuildIncomplete(format!(
                "run {} did not include 'build' (targets: {:?})",
                summary.run_id, summary.targets
            )));
        }
        if !summary.completed() {
            return Err(AssetdagError::BuildIncomplete(format!(
                "build failed in steps {:?}",
                summary.failed
            )));
        }

        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let addr = listener.local_addr()?;
        let app = router(self.root.clone(), self.live.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                error!(error = %e, "dev server stopped with an error");
            }
        });

        self.shutdown = Some(tx);
        self.task = Some(task);
        self.state = ServerState::Serving { addr };

        info!(
            url = %format!("http://{addr}/{}", self.start_path.trim_start_matches('/')),
            root = ?self.root,
            "dev server listening"
        );
        Ok(addr)
    }

    /// Stop serving and wait for the listener to close.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            // Open event streams keep graceful shutdown waiting.
            match tokio::time::timeout(STOP_GRACE, &mut task).await {
                Ok(Err(e)) => warn!(error = %e, "dev server task did not shut down cleanly"),
                Ok(Ok(())) => {}
                Err(_) => task.abort(),
            }
        }
        self.state = ServerState::Idle;
    }
}
