//! Topic Quiz · Backend
//!
//! - Axum HTTP + WebSocket API for the topic browser and the quiz engine
//! - Static pages (./static/topic-selector.html, ./static/test.html)
//! - Shared key-value store persisted to a JSON file
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   TOPICS_PATH      : topics resource (default ./static/js/topics-data.json)
//!   STORE_PATH       : shared store file (default ./data/local_storage.json, empty = in-memory)
//!   STATIC_DIR       : static pages (default ./static)
//!   QUIZ_CONFIG_PATH : optional TOML config (pass threshold, default title, test url)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod domain;
mod config;
mod seeds;
mod catalog;
mod store;
mod browser;
mod quiz;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Paths;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let paths = Paths::from_env();

  // Catalog, shared store and settings; the catalog fetch happens once here.
  let state = Arc::new(AppState::from_env(&paths).await);

  let app = build_router(state.clone(), &paths.static_dir);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_backend", %addr, static_dir = %paths.static_dir.display(), "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "quiz_backend", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quiz_backend", error = %e, "Failed to listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
}
