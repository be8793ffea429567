use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use storefront_catalog::store::{FindQuery, PriceRange, ProductFilter, Projection};

use super::support::{
    RecordingStore, StoreCall, app, mock_products, post_json, post_raw, response_json,
};

const FILTER_URI: &str = "/api/v1/product/product-filters";

fn recorded_filter(store: &RecordingStore) -> ProductFilter {
    match store.calls().as_slice() {
        [StoreCall::Find(query)] => query.filter.clone(),
        other => panic!("expected a single find call, got {other:?}"),
    }
}

fn products_json(indices: &[usize]) -> Value {
    let products = mock_products();
    Value::Array(
        indices
            .iter()
            .map(|&index| serde_json::to_value(&products[index]).unwrap())
            .collect(),
    )
}

#[tokio::test]
async fn filters_by_single_category() {
    let store = Arc::new(RecordingStore::returning(vec![mock_products()[0].clone()]));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": ["Cat1"], "radio": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let filter = recorded_filter(&store);
    assert_eq!(filter.to_document(), json!({"category": ["Cat1"]}));
    assert_eq!(
        store.calls(),
        vec![StoreCall::Find(
            FindQuery::new(filter).projection(Projection::ExcludePhoto)
        )],
        "filter queries drop the photo and apply no limit or sort"
    );

    let json = response_json(response).await;
    assert_eq!(json, json!({"success": true, "products": products_json(&[0])}));
}

#[tokio::test]
async fn filters_by_multiple_categories() {
    let store = Arc::new(RecordingStore::returning(vec![
        mock_products()[0].clone(),
        mock_products()[2].clone(),
    ]));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": ["Cat1", "Cat3"], "radio": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        recorded_filter(&store).to_document(),
        json!({"category": ["Cat1", "Cat3"]})
    );

    let json = response_json(response).await;
    assert_eq!(json["products"], products_json(&[0, 2]));
}

#[tokio::test]
async fn filters_by_price_range() {
    let store = Arc::new(RecordingStore::returning(vec![
        mock_products()[1].clone(),
        mock_products()[2].clone(),
    ]));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": [], "radio": [500, 1000]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let filter = recorded_filter(&store);
    assert_eq!(filter.categories, None);
    assert_eq!(
        filter.price,
        Some(PriceRange {
            gte: Decimal::from(500),
            lte: Decimal::from(1000),
        })
    );
    assert_eq!(
        filter.to_document(),
        json!({"price": {"$gte": 500.0, "$lte": 1000.0}})
    );

    let json = response_json(response).await;
    assert_eq!(json["products"], products_json(&[1, 2]));
}

#[tokio::test]
async fn filters_by_category_and_price() {
    let store = Arc::new(RecordingStore::returning(vec![mock_products()[1].clone()]));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": ["Cat1", "Cat2"], "radio": [500, 1000]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        recorded_filter(&store).to_document(),
        json!({
            "category": ["Cat1", "Cat2"],
            "price": {"$gte": 500.0, "$lte": 1000.0},
        })
    );

    let json = response_json(response).await;
    assert_eq!(json["products"], products_json(&[1]));
}

#[tokio::test]
async fn no_selection_matches_everything() {
    let store = Arc::new(RecordingStore::returning(mock_products()));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": [], "radio": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(recorded_filter(&store).to_document(), json!({}));

    let json = response_json(response).await;
    assert_eq!(json["products"], products_json(&[0, 1, 2]));
}

#[tokio::test]
async fn omitted_fields_default_to_empty_selection() {
    let store = Arc::new(RecordingStore::returning(Vec::new()));

    let response = post_json(app(store.clone()), FILTER_URI, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(recorded_filter(&store).is_empty());
}

#[tokio::test]
async fn store_failure_is_reported_as_bad_request() {
    let store = Arc::new(RecordingStore::failing("Database error"));

    let response = post_json(
        app(store.clone()),
        FILTER_URI,
        json!({"checked": [], "radio": []}),
    )
    .await;
    assert_eq!(recorded_filter(&store).to_document(), json!({}));
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(
        json,
        json!({
            "success": false,
            "message": "Error WHile Filtering Products",
            "error": "Database error",
        })
    );
}

#[tokio::test]
async fn malformed_body_is_rejected_before_querying() {
    let store = Arc::new(RecordingStore::returning(mock_products()));

    let response = post_raw(app(store.clone()), FILTER_URI, "{\"checked\": 7".into()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.calls().is_empty());

    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Error WHile Filtering Products");
}
