//! Catalog data sources.
//!
//! Provides the `CatalogSource` trait and its implementations:
//! - `RestSource`: the storefront's REST API (`GET /api/products`, ...)
//! - `SnapshotSource`: a JSON file holding all four collections
//!
//! The listing only ever sees the resolved `CatalogData`.

use lustre_model::{Attribute, Brand, CatalogData, Category, Product};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from catalog source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Response has no {0} collection")]
    MissingCollection(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source not available")]
    Unavailable,
}

/// The record collections the listing loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Products,
    Categories,
    Brands,
    Attributes,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Brands => "brands",
            Self::Attributes => "attributes",
        }
    }
}

/// Trait for catalog sources (REST API, snapshot file, ...).
pub trait CatalogSource {
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, SourceError>> + Send;

    fn fetch_categories(&self) -> impl Future<Output = Result<Vec<Category>, SourceError>> + Send;

    fn fetch_brands(&self) -> impl Future<Output = Result<Vec<Brand>, SourceError>> + Send;

    fn fetch_attributes(&self) -> impl Future<Output = Result<Vec<Attribute>, SourceError>> + Send;

    /// Check if the source is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

/// Fetch all four collections concurrently.
pub async fn load_catalog<S: CatalogSource + Sync>(source: &S) -> Result<CatalogData, SourceError> {
    let (products, categories, brands, attributes) = tokio::try_join!(
        source.fetch_products(),
        source.fetch_categories(),
        source.fetch_brands(),
        source.fetch_attributes(),
    )?;

    tracing::info!(
        source = source.name(),
        products = products.len(),
        categories = categories.len(),
        brands = brands.len(),
        attributes = attributes.len(),
        "Loaded catalog"
    );

    Ok(CatalogData {
        products,
        categories,
        brands,
        attributes,
    })
}

/// Pull a collection's records out of an API response.
///
/// Accepts a bare array, or an object holding the array under the
/// collection name or under `data` (possibly nested one level:
/// `{ "data": { "products": [...] } }`). Records that fail to decode are
/// skipped with a warning.
pub fn extract_records<T: DeserializeOwned>(
    response: Value,
    collection: Collection,
) -> Result<Vec<T>, SourceError> {
    let items = find_array(response, collection.as_str())
        .ok_or(SourceError::MissingCollection(collection.as_str()))?;

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(collection = collection.as_str(), index = i, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            collection = collection.as_str(),
            kept = records.len(),
            total,
            "Some records could not be decoded"
        );
    }
    Ok(records)
}

fn find_array(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => match map.remove("data") {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Object(mut inner)) => match inner.remove(key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                },
                _ => None,
            },
        },
        _ => None,
    }
}

/// REST source configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the storefront
    pub base_url: String,
    /// Path prefix of the collection endpoints
    pub api_prefix: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// The storefront REST API.
pub struct RestSource {
    config: RestConfig,
    client: reqwest::Client,
}

impl RestSource {
    pub fn new(config: RestConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Endpoint URL for a collection.
    fn endpoint(&self, collection: Collection) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_prefix.trim_matches('/'),
            collection.as_str()
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, SourceError> {
        let url = self.endpoint(collection);
        tracing::debug!(url = %url, "Fetching collection");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        extract_records(json, collection)
    }
}

impl CatalogSource for RestSource {
    async fn fetch_products(&self) -> Result<Vec<Product>, SourceError> {
        self.fetch(Collection::Products).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError> {
        self.fetch(Collection::Categories).await
    }

    async fn fetch_brands(&self) -> Result<Vec<Brand>, SourceError> {
        self.fetch(Collection::Brands).await
    }

    async fn fetch_attributes(&self) -> Result<Vec<Attribute>, SourceError> {
        self.fetch(Collection::Attributes).await
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        let response = self
            .client
            .get(self.endpoint(Collection::Categories))
            .send()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// A JSON snapshot file: `{ "products": [...], "categories": [...], ... }`.
///
/// Missing collections read as empty.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let json: Value =
            serde_json::from_str(&text).map_err(|e| SourceError::ParseError(e.to_string()))?;

        match extract_records(json, collection) {
            Err(SourceError::MissingCollection(_)) => Ok(Vec::new()),
            other => other,
        }
    }
}

impl CatalogSource for SnapshotSource {
    async fn fetch_products(&self) -> Result<Vec<Product>, SourceError> {
        self.read(Collection::Products).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError> {
        self.read(Collection::Categories).await
    }

    async fn fetch_brands(&self) -> Result<Vec<Brand>, SourceError> {
        self.read(Collection::Brands).await
    }

    async fn fetch_attributes(&self) -> Result<Vec<Attribute>, SourceError> {
        self.read(Collection::Attributes).await
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        tokio::fs::metadata(&self.path).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

/// Already-loaded data, served as is.
impl CatalogSource for CatalogData {
    async fn fetch_products(&self) -> Result<Vec<Product>, SourceError> {
        Ok(self.products.clone())
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError> {
        Ok(self.categories.clone())
    }

    async fn fetch_brands(&self) -> Result<Vec<Brand>, SourceError> {
        Ok(self.brands.clone())
    }

    async fn fetch_attributes(&self) -> Result<Vec<Attribute>, SourceError> {
        Ok(self.attributes.clone())
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
