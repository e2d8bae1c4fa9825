//! Router tests. Requests are sent with `tower::ServiceExt::oneshot`
//! directly to the router without starting a network server.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use grml_server::router::build_router;
use grml_server::state::AppState;

async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(json!(null));
    (status, json)
}

#[tokio::test]
async fn health_reports_connected_clients() {
    let state = AppState::new();
    let (_id, _rx) = state.hub.join();
    let app = build_router(state.clone());

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "status": "ok", "clients": 1}));
}

#[tokio::test]
async fn plain_requests_to_the_socket_are_rejected() {
    let app = build_router(AppState::new());
    let (status, body) = get_json(&app, "/ws").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_routes_are_json_errors() {
    let app = build_router(AppState::new());
    let (status, body) = get_json(&app, "/programs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"success": false, "error": {"code": "NOT_FOUND", "message": "/programs"}})
    );
}
