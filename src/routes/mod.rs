//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::{path::Path, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static pages from `static_dir` with the topic browser as fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("topic-selector.html")));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Topic browser
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/topics", get(http::http_list_topics).post(http::http_post_topic))
        .route("/api/v1/topics/select", post(http::http_select_topic))
        .route("/api/v1/topics/start", post(http::http_start_test))
        .route(
            "/api/v1/topics/:id",
            get(http::http_get_topic)
                .patch(http::http_patch_topic)
                .delete(http::http_delete_topic),
        )
        // Quiz engine
        .route("/api/v1/quiz", post(http::http_start_quiz))
        .route("/api/v1/quiz/:id", get(http::http_get_quiz))
        .route("/api/v1/quiz/:id/select", post(http::http_quiz_select))
        .route("/api/v1/quiz/:id/check", post(http::http_quiz_check))
        .route("/api/v1/quiz/:id/next", post(http::http_quiz_next))
        .route("/api/v1/quiz/:id/prev", post(http::http_quiz_prev))
        .route("/api/v1/quiz/:id/submit", post(http::http_quiz_submit))
        .route("/api/v1/quiz/:id/fix_mistakes", post(http::http_quiz_fix_mistakes))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::logic::tests::test_state;

    fn app() -> Router {
        build_router(Arc::new(test_state()), Path::new("./static"))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn health_ok() {
        let (status, body) = call(&app(), "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn start_without_selection_is_bad_request() {
        let (status, body) = call(&app(), "POST", "/api/v1/topics/start", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no_topic_selected");
    }

    #[tokio::test]
    async fn quiz_without_topic_redirects() {
        let (status, body) = call(&app(), "POST", "/api/v1/quiz", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["redirect"], "topic-selector.html");
    }

    #[tokio::test]
    async fn full_http_flow_with_correction() {
        let app = app();
        let (_, cards) = call(&app, "GET", "/api/v1/topics?search=MEGA&sort=name", None).await;
        assert_eq!(cards[0]["id"], "megaliths");
        assert_eq!(cards[0]["selected"], false);

        let (_, sel) = call(&app, "POST", "/api/v1/topics/select", Some(serde_json::json!({ "topicId": "megaliths" }))).await;
        assert_eq!(sel["selection"]["questionCount"], 2);

        let (status, nav) = call(&app, "POST", "/api/v1/topics/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nav["redirect"], "test.html?topic=megaliths");

        let (status, quiz) = call(&app, "POST", "/api/v1/quiz", None).await;
        assert_eq!(status, StatusCode::OK);
        let id = quiz["sessionId"].as_str().unwrap().to_string();
        assert_eq!(quiz["view"]["title"], "Megaliths");

        let (status, body) = call(&app, "POST", &format!("/api/v1/quiz/{id}/check"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no_option_selected");

        let base = format!("/api/v1/quiz/{id}");
        call(&app, "POST", &format!("{base}/select"), Some(serde_json::json!({ "index": 1 }))).await;
        call(&app, "POST", &format!("{base}/check"), None).await;
        call(&app, "POST", &format!("{base}/next"), None).await;
        call(&app, "POST", &format!("{base}/select"), Some(serde_json::json!({ "index": 2 }))).await;
        call(&app, "POST", &format!("{base}/check"), None).await;
        let (_, out) = call(&app, "POST", &format!("{base}/submit"), None).await;
        assert_eq!(out["view"]["report"]["kind"], "interim");
        assert_eq!(out["view"]["report"]["remaining_incorrect"], 1);
        assert_eq!(out["view"]["controls"]["fix_mistakes"], true);

        let (_, out) = call(&app, "POST", &format!("{base}/fix_mistakes"), None).await;
        assert_eq!(out["view"]["iteration"], 2);
        assert_eq!(out["view"]["total"], 1);

        call(&app, "POST", &format!("{base}/select"), Some(serde_json::json!({ "index": 0 }))).await;
        call(&app, "POST", &format!("{base}/check"), None).await;
        let (_, out) = call(&app, "POST", &format!("{base}/submit"), None).await;
        assert_eq!(out["view"]["report"]["kind"], "final");
        assert_eq!(out["view"]["report"]["verdict"], "pass");
        assert_eq!(out["view"]["completed"], true);
    }

    #[tokio::test]
    async fn topic_crud() {
        let app = app();
        let new_topic = serde_json::json!({
            "id": "runes",
            "title": "Runes",
            "description": "Norse alphabets",
            "questions": [{ "text": "Futhark letters?", "options": ["16", "24"], "correctAnswer": 1, "difficulty": "basic" }]
        });
        let (status, body) = call(&app, "POST", "/api/v1/topics", Some(new_topic)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["difficulty"], "Basic");

        let (status, body) =
            call(&app, "PATCH", "/api/v1/topics/runes", Some(serde_json::json!({ "title": "Runic Writing" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Runic Writing");

        let (status, _) = call(&app, "DELETE", "/api/v1/topics/runes", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", "/api/v1/topics/runes", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
