//! HTTP surface tests: routing, auth guards, and webhook acknowledgement.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delifast_bridge::config::AppConfig;
use delifast_bridge::server::{build_state, create_app};
use migration::{Migrator, MigratorTrait};
use serde_json::Value;
use tower::ServiceExt;

async fn test_app() -> axum::Router {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("db");
    Migrator::up(&db, None).await.expect("migrations");

    let config = AppConfig {
        crypto_key: Some(vec![7u8; 32]),
        operator_tokens: vec!["op-token".to_string()],
        ..Default::default()
    };
    let state = build_state(config, db).expect("state");
    create_app(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn root_returns_service_info() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "delifast-bridge");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn health_pings_the_database() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn shipment_endpoints_require_bearer_auth() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/shipments/send")
                .header("content-type", "application/json")
                .header("X-Shop-Domain", "acme.myshopify.com")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn job_triggers_run_with_bearer_auth_only() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/status-sync")
                .header("Authorization", "Bearer op-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["processed"], 0);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn shipment_lookup_for_unknown_shop_returns_404() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/shipments/42")
                .header("Authorization", "Bearer op-token")
                .header("X-Shop-Domain", "ghost.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "SETTINGS_NOT_FOUND");
}

#[tokio::test]
async fn webhook_acknowledges_immediately() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/shopify/orders")
                .header("content-type", "application/json")
                .header("X-Shopify-Topic", "orders/create")
                .header("X-Shopify-Shop-Domain", "unknown.myshopify.com")
                .body(Body::from(r##"{ "id": 1, "name": "#1" }"##))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn webhook_without_topic_header_is_rejected() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/shopify/orders")
                .header("content-type", "application/json")
                .header("X-Shopify-Shop-Domain", "acme.myshopify.com")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_manual_shipment_id_is_rejected() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/shipments/42/shipment-id")
                .header("Authorization", "Bearer op-token")
                .header("X-Shop-Domain", "acme.myshopify.com")
                .header("content-type", "application/json")
                .body(Body::from(r#"{ "shipment_id": "TEMP-42" }"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}
