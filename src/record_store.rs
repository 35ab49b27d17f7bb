//! Durable product record store abstraction
//!
//! The pipeline talks to its store only through [`RecordStore`], so a run gets its
//! store handle injected rather than reaching for a process-wide connection.
//! [`Database`] is the SQLite implementation.

use async_trait::async_trait;

use crate::db::{Database, ImageIdsUpdate};
use crate::types::{ImageId, ProductId, Stage};

/// Durable mapping of product identifier to known image identifiers
///
/// Every write must be committed before the call returns; the pipeline never
/// batches writes across units of work.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Products with a known thumbnail or resolved image list, in stable order
    async fn list_products_with_images(&self) -> crate::Result<Vec<ProductId>>;

    /// Insert a product; an existing identity is ignored and reported as `false`
    async fn insert_product(
        &self,
        product_id: &ProductId,
        thumbnail_id: Option<&ImageId>,
    ) -> crate::Result<bool>;

    /// Store a resolved image list; safe to repeat with the same value
    async fn update_image_ids(
        &self,
        product_id: &ProductId,
        image_ids: &[ImageId],
    ) -> crate::Result<ImageIdsUpdate>;

    /// Resolved image list of a product, if already stored
    async fn image_ids(&self, product_id: &ProductId) -> crate::Result<Option<Vec<ImageId>>>;

    /// Saved resume position of a stage
    async fn load_cursor(&self, stage: Stage) -> crate::Result<Option<String>>;

    /// Persist the resume position of a stage
    async fn save_cursor(&self, stage: Stage, position: &str) -> crate::Result<()>;

    /// Forget the resume position of a stage
    async fn clear_cursor(&self, stage: Stage) -> crate::Result<()>;

    /// Release underlying resources; further calls may fail
    async fn close(&self) {}
}

#[async_trait]
impl RecordStore for Database {
    async fn list_products_with_images(&self) -> crate::Result<Vec<ProductId>> {
        Database::list_products_with_images(self).await
    }

    async fn insert_product(
        &self,
        product_id: &ProductId,
        thumbnail_id: Option<&ImageId>,
    ) -> crate::Result<bool> {
        Database::insert_product(self, product_id, thumbnail_id).await
    }

    async fn update_image_ids(
        &self,
        product_id: &ProductId,
        image_ids: &[ImageId],
    ) -> crate::Result<ImageIdsUpdate> {
        Database::update_image_ids(self, product_id, image_ids).await
    }

    async fn image_ids(&self, product_id: &ProductId) -> crate::Result<Option<Vec<ImageId>>> {
        self.get_image_ids(product_id).await
    }

    async fn load_cursor(&self, stage: Stage) -> crate::Result<Option<String>> {
        Database::load_cursor(self, stage).await
    }

    async fn save_cursor(&self, stage: Stage, position: &str) -> crate::Result<()> {
        Database::save_cursor(self, stage, position).await
    }

    async fn clear_cursor(&self, stage: Stage) -> crate::Result<()> {
        Database::clear_cursor(self, stage).await
    }

    async fn close(&self) {
        Database::close(self).await;
    }
}
