//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Log targets used across the crate:
//!   quiz_backend : startup, bind, shutdown
//!   catalog      : topics resource loading, quarantined questions, browser actions
//!   store        : shared key-value store loads and writes
//!   quiz         : session lifecycle, submits, invalid actions
//!
//! LOG_LEVEL overrides the default filter, either as a bare level ("debug") or
//! as directives, e.g. "info,quiz=trace,catalog=warn,store=debug,tower_http=debug".
//! LOG_FORMAT=json switches to structured JSON lines; anything else is pretty.
//! Per-request spans come from the TraceLayer in `routes`.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,quiz_backend=debug,catalog=debug,store=info,quiz=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The json and pretty builders are different types, so each branch inits its own.
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    tracing::debug!(target: "quiz_backend", json, "Tracing initialized");
}
