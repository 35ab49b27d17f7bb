//! The two-stage mirror pipeline.
//!
//! [`CatalogMirror`] owns the handles a run needs and exposes each stage as a method:
//! - [`enumerate`] - paging the catalog search into the record store
//! - [`image_sync`] - resolving image lists and downloading assets
//!
//! Stages run strictly one after the other. Within a stage the outer loop is
//! sequential and paced by a [`RateLimiter`](crate::rate_limiter::RateLimiter);
//! the only concurrency is the image fan-out inside a single product.

mod enumerate;
mod image_sync;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::catalog::{CatalogClient, HttpCatalogClient};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::file_store::FileStore;
use crate::record_store::RecordStore;
use crate::types::RunReport;

/// Catalog mirror run context
///
/// The record store, file store and catalog client are injected rather than
/// global, so a run is scoped to one value and [`close`](Self::close) releases
/// the store on every exit path.
pub struct CatalogMirror {
    pub(crate) config: Arc<Config>,
    pub(crate) catalog: Arc<dyn CatalogClient>,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) files: Arc<FileStore>,
}

impl CatalogMirror {
    /// Open the database and image tree and build the HTTP catalog client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the database cannot be
    /// opened or migrated, or the image root cannot be created
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(HttpCatalogClient::new(&config.catalog)?);
        let db = Database::new(&config.persistence.database_path).await?;

        let files = match FileStore::open(&config.storage.image_dir).await {
            Ok(files) => files,
            Err(e) => {
                db.close().await;
                return Err(e);
            }
        };

        tracing::info!(
            base_url = %config.catalog.base_url,
            database = %config.persistence.database_path.display(),
            image_dir = %config.storage.image_dir.display(),
            resume = config.sync.resume,
            "catalog mirror initialized"
        );

        Ok(Self::with_components(config, catalog, Arc::new(db), files))
    }

    /// Assemble a mirror from already constructed parts
    pub fn with_components(
        config: Config,
        catalog: Arc<dyn CatalogClient>,
        store: Arc<dyn RecordStore>,
        files: FileStore,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            store,
            files: Arc::new(files),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record store used by this run
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Image tree used by this run
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Enumerate the catalog, then sync images
    ///
    /// The image stage does not run if enumeration fails fatally.
    pub async fn run(&self) -> Result<RunReport> {
        let enumeration = self.enumerate_catalog().await?;
        let images = self.sync_images().await?;
        Ok(RunReport {
            enumeration,
            images,
        })
    }

    /// Release the record store
    pub async fn close(&self) {
        self.store.close().await;
        tracing::debug!("record store closed");
    }
}
