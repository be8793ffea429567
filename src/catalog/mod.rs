use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    models::{Category, PhotoDocument, Product},
    services::query::QueryExecutor,
    store::{FindOneQuery, FindQuery, ProductStore, StoreError},
};

const CATALOG_VERSION: &str = "1.0.0";

/// Catalog contents persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn new(categories: Vec<Category>, products: Vec<Product>) -> Self {
        Self {
            version: CATALOG_VERSION.to_string(),
            generated_at: Utc::now(),
            categories,
            products,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    fn parse(contents: &str) -> Result<Self, StoreError> {
        let snapshot: CatalogSnapshot = serde_json::from_str(contents)?;
        if snapshot.version != CATALOG_VERSION {
            return Err(StoreError::InvalidDocument(format!(
                "catalog schema mismatch (found {}, expected {})",
                snapshot.version, CATALOG_VERSION
            )));
        }
        Ok(snapshot)
    }
}

/// JSON-file backed product collection held in memory between reloads.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    snapshot: RwLock<CatalogSnapshot>,
}

impl CatalogStore {
    /// Wrap an already loaded snapshot without touching disk.
    pub fn with_snapshot(path: impl Into<PathBuf>, snapshot: CatalogSnapshot) -> Self {
        Self {
            path: path.into(),
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Open the catalog file, writing an empty catalog first if none exists.
    pub fn open_or_init(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match load(&path)? {
            Some(snapshot) => snapshot,
            None => {
                tracing::warn!(path = %path.display(), "catalog missing, starting empty");
                let snapshot = CatalogSnapshot::empty();
                write_snapshot(&path, &snapshot)?;
                snapshot
            }
        };
        tracing::info!(
            path = %path.display(),
            products = snapshot.products.len(),
            categories = snapshot.categories.len(),
            "catalog loaded"
        );
        Ok(Self::with_snapshot(path, snapshot))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the catalog file and swap it in, returning the product count.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = CatalogSnapshot::parse(&contents)?;
        let count = snapshot.products.len();
        *self.snapshot.write().await = snapshot;
        Ok(count)
    }

    /// Write the provided catalog to disk and make it the live snapshot.
    pub async fn persist(&self, snapshot: CatalogSnapshot) -> Result<(), StoreError> {
        write_snapshot(&self.path, &snapshot)?;
        *self.snapshot.write().await = snapshot;
        Ok(())
    }

    pub async fn generated_at(&self) -> DateTime<Utc> {
        self.snapshot.read().await.generated_at
    }
}

#[async_trait]
impl ProductStore for CatalogStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Product>, StoreError> {
        let snapshot = self.snapshot.read().await;
        Ok(QueryExecutor::find(&snapshot, query))
    }

    async fn find_one(&self, query: &FindOneQuery) -> Result<Option<Product>, StoreError> {
        let snapshot = self.snapshot.read().await;
        Ok(QueryExecutor::find_one(&snapshot, query))
    }

    async fn find_photo_by_id(&self, id: &str) -> Result<Option<PhotoDocument>, StoreError> {
        let snapshot = self.snapshot.read().await;
        Ok(QueryExecutor::find_photo_by_id(&snapshot, id))
    }

    async fn estimated_document_count(&self) -> Result<u64, StoreError> {
        Ok(self.snapshot.read().await.products.len() as u64)
    }
}

fn load(path: &Path) -> Result<Option<CatalogSnapshot>, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => CatalogSnapshot::parse(&contents).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_snapshot(path: &Path, snapshot: &CatalogSnapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        Utc::now().timestamp_nanos_opt().unwrap_or(0)
    ));
    let json = serde_json::to_string_pretty(snapshot)?;

    fs::write(&tmp_path, json)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}
