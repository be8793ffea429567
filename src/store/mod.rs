//! Document-store seam used by the catalog handlers.
//!
//! Handlers never touch storage directly: they build a [`FindQuery`] (or one
//! of its siblings) and hand it to a [`ProductStore`]. The query values are
//! plain data so they can be compared, logged and recorded in tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::models::{PhotoDocument, Product};

/// Failures raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),
    #[error("catalog io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog json is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog document: {0}")]
    InvalidDocument(String),
}

/// Read-only access to the product collection.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Product>, StoreError>;

    async fn find_one(&self, query: &FindOneQuery) -> Result<Option<Product>, StoreError>;

    /// Find by id with the `photo` projection: only the id and photo come back.
    async fn find_photo_by_id(&self, id: &str) -> Result<Option<PhotoDocument>, StoreError>;

    /// Count from collection metadata; never applies a filter.
    async fn estimated_document_count(&self) -> Result<u64, StoreError>;
}

/// Field projection applied to returned documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    All,
    /// `-photo`
    ExcludePhoto,
}

impl Projection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Projection::All => "",
            Projection::ExcludePhoto => "-photo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `{createdAt: -1}`
    CreatedAtDesc,
}

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub gte: Decimal,
    pub lte: Decimal,
}

impl PriceRange {
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.gte && price <= self.lte
    }
}

/// Predicate passed to `find`. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub categories: Option<Vec<String>>,
    pub price: Option<PriceRange>,
}

impl ProductFilter {
    /// Build the predicate from the storefront filter inputs.
    ///
    /// `checked` narrows by category id when non-empty. `radio` narrows by
    /// price only when it carries exactly a lower and an upper bound.
    pub fn from_selection(checked: &[String], radio: &[Decimal]) -> Self {
        let categories = (!checked.is_empty()).then(|| checked.to_vec());
        let price = match radio {
            [gte, lte] => Some(PriceRange {
                gte: *gte,
                lte: *lte,
            }),
            _ => None,
        };
        Self { categories, price }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.price.is_none()
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.iter().any(|id| id == product.category.id()) {
                return false;
            }
        }
        if let Some(range) = &self.price {
            if !range.contains(product.price) {
                return false;
            }
        }
        true
    }

    /// Render the predicate in document-store query syntax.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();
        if let Some(categories) = &self.categories {
            document.insert("category".into(), json!(categories));
        }
        if let Some(range) = &self.price {
            document.insert(
                "price".into(),
                json!({ "$gte": range.gte, "$lte": range.lte }),
            );
        }
        Value::Object(document)
    }
}

/// Arguments of a `find` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    pub filter: ProductFilter,
    pub projection: Projection,
    pub populate_category: bool,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub sort: Option<SortOrder>,
}

impl FindQuery {
    pub fn new(filter: ProductFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn populate_category(mut self) -> Self {
        self.populate_category = true;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Arguments of a `find_one` call keyed by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOneQuery {
    pub slug: String,
    pub projection: Projection,
    pub populate_category: bool,
}
