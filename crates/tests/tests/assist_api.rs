use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use safepoint_api::build_app;
use serde_json::json;
use tower::ServiceExt;

fn assist_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/assist")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app().await.expect("app should build");

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
    let parsed = response_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert!(parsed.get("metrics").is_some());
    assert!(parsed.get("capabilities").is_some());
}

#[tokio::test]
async fn missing_message_is_a_400_with_an_error_body() {
    let app = build_app().await.expect("app should build");

    let response = app.oneshot(assist_request(json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = response_json(response).await;
    assert_eq!(parsed["error"], "message required");
    assert!(parsed.get("reply").is_none());
}

#[tokio::test]
async fn blank_message_is_rejected_like_a_missing_one() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(assist_request(json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = response_json(response).await;
    assert_eq!(parsed["error"], "message required");
}

#[tokio::test]
async fn unconfigured_providers_surface_as_a_server_fault() {
    // The test environment carries no SAFEPOINT_* provider keys, so any
    // well-formed message must hit the configuration branch.
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(assist_request(json!({
            "message": "find nearest hospital",
            "latitude": 12.9,
            "longitude": 77.6
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let parsed = response_json(response).await;
    assert_eq!(parsed["error"], "provider credentials are not configured");
}

#[tokio::test]
async fn message_validation_precedes_the_configuration_check() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(assist_request(json!({ "message": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_never_reaches_the_pipeline() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/assist")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
