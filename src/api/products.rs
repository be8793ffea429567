//! Read-only product catalog endpoints.
//!
//! The response envelopes, status codes and message strings below are the
//! contract existing storefront clients parse; they are kept byte-for-byte,
//! misspellings included.

use anyhow::anyhow;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG},
    },
    response::Response,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::instrument;

use crate::{
    api::ApiError,
    models::{Photo, Product},
    routes::AppState,
    store::{FindOneQuery, FindQuery, ProductFilter, Projection, SortOrder},
};

/// Newest products returned by the catalog listing.
pub const LIST_LIMIT: usize = 12;
/// Page size of the paginated listing.
pub const PER_PAGE: usize = 6;

const FALLBACK_PHOTO_TYPE: &str = "application/octet-stream";

mod messages {
    pub const LIST_OK: &str = "ALlProducts ";
    pub const LIST_FAILED: &str = "Erorr in getting products";
    pub const SINGLE_OK: &str = "Single Product Fetched";
    pub const SINGLE_FAILED: &str = "Eror while getitng single product";
    pub const PHOTO_FAILED: &str = "Erorr while getting photo";
    pub const FILTER_FAILED: &str = "Error WHile Filtering Products";
    pub const COUNT_FAILED: &str = "Error in product count";
    pub const PAGE_FAILED: &str = "error in per page ctrl";
}

/// Product routes, mounted under `/api/v1/product`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-product", get(list_products))
        .route("/get-product/{slug}", get(get_single_product))
        .route("/product-photo/{pid}", get(product_photo))
        .route("/product-filters", post(filter_products))
        .route("/product-count", get(count_products))
        .route("/product-list", get(list_first_page))
        .route("/product-list/{page}", get(list_products_page))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub coun_total: usize,
    pub message: &'static str,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct SingleProductResponse {
    pub success: bool,
    pub message: &'static str,
    pub product: Option<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductCountResponse {
    pub success: bool,
    pub total: u64,
}

/// Storefront filter selection: category ids and a `[min, max]` price pair.
#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub checked: Vec<String>,
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let query = FindQuery::default()
        .projection(Projection::ExcludePhoto)
        .populate_category()
        .limit(LIST_LIMIT)
        .sort(SortOrder::CreatedAtDesc);
    tracing::debug!(
        projection = query.projection.as_str(),
        limit = LIST_LIMIT,
        "listing products"
    );

    let products = state.store.find(&query).await.map_err(|err| {
        ApiError::with_source(
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::LIST_FAILED,
            err,
        )
    })?;

    Ok(Json(ProductListResponse {
        success: true,
        coun_total: products.len(),
        message: messages::LIST_OK,
        products,
    }))
}

#[instrument(skip(state))]
pub async fn get_single_product(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SingleProductResponse>, ApiError> {
    let query = FindOneQuery {
        slug,
        projection: Projection::ExcludePhoto,
        populate_category: true,
    };

    let product = state.store.find_one(&query).await.map_err(|err| {
        ApiError::with_source(
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::SINGLE_FAILED,
            err,
        )
    })?;

    Ok(Json(SingleProductResponse {
        success: true,
        message: messages::SINGLE_OK,
        product,
    }))
}

/// Stream the stored photo bytes. A product without photo data answers
/// `204 No Content` with no content type.
#[instrument(skip(state))]
pub async fn product_photo(
    Path(pid): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let document = state
        .store
        .find_photo_by_id(&pid)
        .await
        .map_err(|err| {
            ApiError::with_source(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::PHOTO_FAILED,
                err,
            )
        })?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                messages::PHOTO_FAILED,
                format!("product '{pid}' not found"),
            )
        })?;

    let Some(Photo {
        data: Some(data),
        content_type,
    }) = document.photo
    else {
        tracing::debug!(product_id = %pid, "product has no photo data");
        return Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .map_err(|err| {
                ApiError::with_source(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::PHOTO_FAILED,
                    anyhow!(err),
                )
            })?);
    };

    let content_type = content_type.unwrap_or_else(|| FALLBACK_PHOTO_TYPE.to_string());
    let etag = format!("\"{}\"", photo_digest(&data));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CACHE_CONTROL, "public, max-age=3600")
        .header(ETAG, etag)
        .header(CONTENT_LENGTH, data.len().to_string())
        .body(Body::from(data))
        .map_err(|err| {
            ApiError::with_source(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::PHOTO_FAILED,
                anyhow!(err),
            )
        })
}

#[instrument(skip(state, payload))]
pub async fn filter_products(
    State(state): State<AppState>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let Json(selection) = payload.map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            messages::FILTER_FAILED,
            rejection.body_text(),
        )
    })?;

    let filter = ProductFilter::from_selection(&selection.checked, &selection.radio);
    let query = FindQuery::new(filter).projection(Projection::ExcludePhoto);
    tracing::debug!(
        predicate = %query.filter.to_document(),
        projection = query.projection.as_str(),
        "filtering products"
    );

    let products = state
        .store
        .find(&query)
        .await
        .map_err(|err| {
            ApiError::with_source(StatusCode::BAD_REQUEST, messages::FILTER_FAILED, err)
        })?;

    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

#[instrument(skip(state))]
pub async fn count_products(
    State(state): State<AppState>,
) -> Result<Json<ProductCountResponse>, ApiError> {
    let total = state
        .store
        .estimated_document_count()
        .await
        .map_err(|err| {
            ApiError::with_source(StatusCode::BAD_REQUEST, messages::COUNT_FAILED, err)
        })?;

    Ok(Json(ProductCountResponse {
        success: true,
        total,
    }))
}

pub async fn list_first_page(
    State(state): State<AppState>,
) -> Result<Json<ProductsResponse>, ApiError> {
    fetch_page(&state, None).await
}

pub async fn list_products_page(
    Path(page): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProductsResponse>, ApiError> {
    fetch_page(&state, Some(&page)).await
}

#[instrument(skip(state))]
async fn fetch_page(
    state: &AppState,
    page: Option<&str>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let page = parse_page(page).map_err(|detail| {
        ApiError::new(StatusCode::BAD_REQUEST, messages::PAGE_FAILED, detail)
    })?;

    let query = FindQuery::default()
        .projection(Projection::ExcludePhoto)
        .skip(page_offset(page))
        .limit(PER_PAGE)
        .sort(SortOrder::CreatedAtDesc);
    tracing::debug!(page, projection = query.projection.as_str(), "listing product page");

    let products = state
        .store
        .find(&query)
        .await
        .map_err(|err| ApiError::with_source(StatusCode::BAD_REQUEST, messages::PAGE_FAILED, err))?;

    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// Resolve the 1-based page number; a missing, blank or zero page means page 1.
fn parse_page(raw: Option<&str>) -> Result<usize, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(1);
    };
    let page: usize = raw
        .parse()
        .map_err(|_| format!("page '{raw}' is not a positive integer"))?;
    Ok(page.max(1))
}

fn page_offset(page: usize) -> usize {
    page.saturating_sub(1).saturating_mul(PER_PAGE)
}

fn photo_digest(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
