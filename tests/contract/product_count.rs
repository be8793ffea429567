use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use super::support::{RecordingStore, StoreCall, app, get, response_json};

#[tokio::test]
async fn reports_estimated_document_count() {
    let store = Arc::new(RecordingStore::counting(100));

    let response = get(app(store.clone()), "/api/v1/product/product-count").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.calls(), vec![StoreCall::EstimatedCount]);

    let json = response_json(response).await;
    assert_eq!(json, json!({"success": true, "total": 100}));
}

#[tokio::test]
async fn store_failure_is_reported_as_bad_request() {
    let store = Arc::new(RecordingStore::failing("Database error"));

    let response = get(app(store), "/api/v1/product/product-count").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(
        json,
        json!({
            "message": "Error in product count",
            "error": "Database error",
            "success": false,
        })
    );
}
