//! API endpoint integration tests
//!
//! These run entirely offline: every request is rejected before the gateway
//! would touch a vendor API.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use playcoach_gateway::api::ApiServer;
use tower::ServiceExt;

mod common;
use common::test_state;

fn test_router() -> axum::Router {
    ApiServer::new(test_state(), 0).router()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_version() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn analyze_without_bearer_is_unauthorized() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze/fifa")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text":"my possession is terrible"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn analyze_unknown_game_is_not_found() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze/chess")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text":"hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn recent_without_bearer_is_unauthorized() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analyses/recent/lol")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recent_unknown_game_is_not_found() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/analyses/recent/valorant")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
