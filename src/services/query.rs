use std::cmp::Reverse;

use crate::{
    catalog::CatalogSnapshot,
    models::{CategoryRef, PhotoDocument, Product},
    store::{FindOneQuery, FindQuery, Projection, SortOrder},
};

/// Evaluates store queries against an in-memory catalog snapshot.
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn find(snapshot: &CatalogSnapshot, query: &FindQuery) -> Vec<Product> {
        let mut matched: Vec<&Product> = snapshot
            .products
            .iter()
            .filter(|product| query.filter.matches(product))
            .collect();

        if let Some(SortOrder::CreatedAtDesc) = query.sort {
            matched.sort_by_key(|product| Reverse(product.created_at));
        }

        let skip = query.skip.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|product| shape(snapshot, product, query.projection, query.populate_category))
            .collect()
    }

    pub fn find_one(snapshot: &CatalogSnapshot, query: &FindOneQuery) -> Option<Product> {
        snapshot
            .products
            .iter()
            .find(|product| product.slug == query.slug)
            .map(|product| shape(snapshot, product, query.projection, query.populate_category))
    }

    /// Looks up a product by id, keeping only its id and photo.
    pub fn find_photo_by_id(snapshot: &CatalogSnapshot, id: &str) -> Option<PhotoDocument> {
        snapshot
            .products
            .iter()
            .find(|product| product.id == id)
            .map(PhotoDocument::from)
    }
}

fn shape(
    snapshot: &CatalogSnapshot,
    product: &Product,
    projection: Projection,
    populate_category: bool,
) -> Product {
    let mut shaped = product.clone();
    if projection == Projection::ExcludePhoto {
        shaped.photo = None;
    }
    if populate_category {
        // Dangling references stay as bare ids.
        if let Some(category) = snapshot
            .categories
            .iter()
            .find(|category| category.id == product.category.id())
        {
            shaped.category = CategoryRef::Populated(category.clone());
        }
    }
    shaped
}
