use std::sync::Arc;

use axum::http::{
    StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG},
};
use storefront_catalog::models::Photo;

use super::support::{
    RecordingStore, StoreCall, app, get, mock_products, response_bytes, response_json,
};

fn product_with_photo(photo: Option<Photo>) -> storefront_catalog::models::Product {
    let mut product = mock_products().remove(0);
    product.photo = photo;
    product
}

#[tokio::test]
async fn streams_stored_photo_bytes() {
    let product = product_with_photo(Some(Photo {
        data: Some(b"image-data".to_vec()),
        content_type: Some("image/jpeg".into()),
    }));
    let store = Arc::new(RecordingStore::returning_one(Some(product)));

    let response = get(app(store.clone()), "/api/v1/product/product-photo/123").await;
    assert_eq!(
        store.calls(),
        vec![StoreCall::FindPhotoById("123".into())]
    );

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/jpeg");
    assert_eq!(response.headers()[CONTENT_LENGTH], "10");
    assert!(response.headers().contains_key(ETAG));
    assert_eq!(response_bytes(response).await.as_ref(), b"image-data");
}

#[tokio::test]
async fn missing_photo_data_sends_no_body() {
    let product = product_with_photo(Some(Photo::default()));
    let store = Arc::new(RecordingStore::returning_one(Some(product)));

    let response = get(app(store.clone()), "/api/v1/product/product-photo/123").await;
    assert_eq!(
        store.calls(),
        vec![StoreCall::FindPhotoById("123".into())]
    );

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(CONTENT_TYPE).is_none());
    assert!(response_bytes(response).await.is_empty());
}

#[tokio::test]
async fn photo_without_declared_type_falls_back_to_octet_stream() {
    let product = product_with_photo(Some(Photo {
        data: Some(vec![1, 2, 3]),
        content_type: None,
    }));
    let store = Arc::new(RecordingStore::returning_one(Some(product)));

    let response = get(app(store), "/api/v1/product/product-photo/123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
}

#[tokio::test]
async fn unknown_product_uses_photo_envelope() {
    let store = Arc::new(RecordingStore::returning_one(None));

    let response = get(app(store), "/api/v1/product/product-photo/404").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Erorr while getting photo");
}

#[tokio::test]
async fn store_failure_is_reported_as_server_error() {
    let store = Arc::new(RecordingStore::failing("Database error"));

    let response = get(app(store.clone()), "/api/v1/product/product-photo/123").await;
    assert_eq!(
        store.calls(),
        vec![StoreCall::FindPhotoById("123".into())]
    );
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Erorr while getting photo");
    assert_eq!(json["error"], "Database error");
}
