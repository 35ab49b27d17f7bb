//! Remote catalog access
//!
//! The pipeline depends on [`CatalogClient`] only; [`HttpCatalogClient`] is the
//! production implementation speaking the catalog's HTTP API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteFetchError;
use crate::types::{ImageId, ProductId};

mod http;

pub use http::HttpCatalogClient;


/// Result of a single remote call
pub type FetchResult<T> = std::result::Result<T, RemoteFetchError>;

/// Body sent with every search request
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    /// Free-text query (empty matches everything)
    pub search: String,
    /// Attribute filters
    pub attributes: Vec<serde_json::Value>,
    /// Whether subcategories are included
    pub include_subcategories: bool,
}

impl Default for SearchBody {
    fn default() -> Self {
        Self {
            search: String::new(),
            attributes: Vec::new(),
            include_subcategories: true,
        }
    }
}

/// One search result entry
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Product identifier
    pub id: ProductId,
    /// Thumbnail image identifier, if the product has one
    #[serde(rename = "imageId", default)]
    pub image_id: Option<ImageId>,
}

/// One page of search results
///
/// Both fields are required: a body without them is malformed, not empty.
#[derive(Clone, Debug, Deserialize)]
pub struct SearchPage {
    /// Total number of records matching the search
    pub total: u64,
    /// Records on this page
    pub articles: Vec<Article>,
}

/// Per-product detail
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArticleDetail {
    /// Full image list; absent or null means no images
    #[serde(rename = "imageIds", default)]
    pub image_ids: Option<Vec<ImageId>>,
}

impl ArticleDetail {
    /// The image list, treating absent as empty
    pub fn into_image_ids(self) -> Vec<ImageId> {
        self.image_ids.unwrap_or_default()
    }
}

/// Raw image response
#[derive(Clone, Debug)]
pub struct ImagePayload {
    /// Declared `Content-Type`, if the server sent one
    pub content_type: Option<String>,
    /// Response body
    pub bytes: Vec<u8>,
}

/// Operations the pipeline needs from the remote catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Total record count (a search with page size 1 at offset 0)
    async fn total_count(&self) -> FetchResult<u64>;

    /// One page of search results
    async fn search_page(&self, offset: u64, limit: u64) -> FetchResult<SearchPage>;

    /// Detail of one product
    async fn article_detail(&self, product_id: &ProductId) -> FetchResult<ArticleDetail>;

    /// Raw bytes of one image
    async fn fetch_image(
        &self,
        product_id: &ProductId,
        image_id: &ImageId,
    ) -> FetchResult<ImagePayload>;
}
