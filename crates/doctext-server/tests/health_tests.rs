use axum::body::Body;
use axum::http::{Request, StatusCode};
use doctext_server::{build_router, AppState};
use doctext_sync::SessionConfig;
use tower::ServiceExt;

#[tokio::test]
async fn healthz_reports_ok() {
    let app = build_router(AppState::new(SessionConfig::default()));
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_reports_zero_documents_initially() {
    let app = build_router(AppState::new(SessionConfig::default()));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["open_documents"], 0);
}
