//! Local web dashboard.
//!
//! Mirrors the terminal feed in a browser using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) for real-time feed updates
//! - A single compact HTML page, no build step
//!
//! A background task re-reads the backend snapshot at every top-of-hour
//! boundary and broadcasts feed lines to connected clients. The shared
//! snapshot slot is overwritten wholesale; last write wins.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json,
    },
    routing::get,
    Router,
};
use chrono::{Local, Utc};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::backend::BackendClient;
use crate::models::WeatherSnapshot;
use crate::schedule::next_top_of_hour;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub backend_url: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Channel for broadcasting feed lines to SSE clients
    tx: broadcast::Sender<String>,
    /// Latest snapshot; overwritten wholesale on each cycle
    snapshot: Arc<RwLock<Option<WeatherSnapshot>>>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let (tx, _rx) = broadcast::channel::<String>(100);
    let snapshot = Arc::new(RwLock::new(None));

    let state = AppState {
        tx: tx.clone(),
        snapshot: snapshot.clone(),
    };

    // Spawn the background refresh task
    let poll_state = state.clone();
    let backend_url = config.backend_url.clone();
    tokio::spawn(async move {
        poll_snapshot(poll_state, backend_url).await;
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("wxsentry dashboard starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task: read-through snapshot fetch at each top-of-hour
/// boundary, with one immediate fetch at startup.
async fn poll_snapshot(state: AppState, backend_url: String) {
    let client = match BackendClient::new(backend_url) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to create backend client: {}", e);
            return;
        }
    };

    loop {
        match client.fetch_weather(false).await {
            Ok(fresh) => {
                let line = if fresh.ai_report.is_empty() {
                    feed_line("SYSTEM", "後端尚無 AI 快訊。")
                } else {
                    feed_line("AI", &fresh.ai_report)
                };
                *state.snapshot.write().await = Some(fresh);
                let _ = state.tx.send(line);
            }
            Err(e) => {
                tracing::warn!("snapshot fetch failed: {}", e);
                let _ = state.tx.send(feed_line("ERROR", &e.to_string()));
            }
        }

        let next = next_top_of_hour(Utc::now());
        let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!("next dashboard refresh at {}", next);
        tokio::time::sleep(delay).await;
    }
}

/// One rendered feed line for SSE clients.
fn feed_line(tag: &str, text: &str) -> String {
    format!(
        "[{}] {tag}: {text}",
        Local::now().format("%H:%M:%S")
    )
}

/// Serve the dashboard page.
async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// SSE stream of feed lines.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|line| match line {
        Ok(line) => Some(Ok(Event::default().data(line))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Latest snapshot as JSON, `null` before the first successful fetch.
async fn snapshot_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot.read().await.clone())
}

/// Liveness probe.
async fn health_handler() -> impl IntoResponse {
    "ok"
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
<meta charset="utf-8">
<title>wxsentry</title>
<style>
  body { font-family: system-ui, sans-serif; background: #f1f5f9; color: #1e293b;
         max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
  h1 { font-size: 1.3rem; }
  .card { background: #fff; border: 1px solid #e2e8f0; border-radius: 12px;
          padding: 1rem; margin-bottom: 1rem; }
  #report { white-space: pre-line; min-height: 4rem; }
  .city { display: flex; justify-content: space-between; padding: .25rem 0;
          border-bottom: 1px dotted #e2e8f0; font-size: .9rem; }
  #feed div { font-family: monospace; font-size: .85rem; padding: .15rem 0; }
</style>
</head>
<body>
<h1>🤖 AI 氣象/特報/地震 監控</h1>
<div class="card"><h2>最新 AI 氣象快訊</h2><div id="report">載入中...</div></div>
<div class="card"><h2>全臺主要縣市預報</h2><div id="cities"></div></div>
<div class="card"><h2>訊息</h2><div id="feed"></div></div>
<script>
async function refresh() {
  const res = await fetch('/api/snapshot');
  const snap = await res.json();
  if (!snap) return;
  document.getElementById('report').textContent =
    snap.ai_report || '尚無資料，請稍候。';
  document.getElementById('cities').innerHTML = (snap.cities || []).map(c =>
    `<div class="city"><b>${c.name}</b><span>${c.wx}</span>` +
    `<span>${c.minT}-${c.maxT}°C ☂ ${c.pop}%</span></div>`).join('');
}
const es = new EventSource('/stream');
es.onmessage = e => {
  const div = document.createElement('div');
  div.textContent = e.data;
  document.getElementById('feed').prepend(div);
  refresh();
};
refresh();
setInterval(refresh, 60000);
</script>
</body>
</html>
"#;
