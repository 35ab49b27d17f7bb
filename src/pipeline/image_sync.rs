//! Image sync stage.

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use super::CatalogMirror;
use crate::db::ImageIdsUpdate;
use crate::error::Result;
use crate::file_store::AssetWrite;
use crate::normalizer;
use crate::rate_limiter::RateLimiter;
use crate::types::{ImageId, ImageSyncReport, ProductId, Stage};

/// What happened to one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetOutcome {
    /// On disk before we started; not fetched
    Present,
    /// Fetched and written
    Written(u64),
    /// Fetched, but another writer got there first
    Dropped,
    /// Skipped after an error
    Failed {
        /// Whether the download request had been issued
        requested: bool,
    },
}

impl ImageSyncReport {
    fn tally(&mut self, outcome: AssetOutcome) {
        match outcome {
            AssetOutcome::Present => self.assets_already_present += 1,
            AssetOutcome::Written(bytes) => {
                self.assets_requested += 1;
                self.assets_written += 1;
                self.bytes_written += bytes;
            }
            AssetOutcome::Dropped => {
                self.assets_requested += 1;
                self.assets_already_present += 1;
            }
            AssetOutcome::Failed { requested } => {
                if requested {
                    self.assets_requested += 1;
                }
                self.assets_failed += 1;
            }
        }
    }
}

impl CatalogMirror {
    /// Resolve image lists and download every missing asset
    ///
    /// Products are processed one at a time in store order, with the product
    /// delay applied after each one. Within a product all images are fetched
    /// concurrently (capped by `max_concurrent_images` when non-zero) and the
    /// stage waits for all of them before moving on. Only a failure to list
    /// products is returned; everything else is logged and counted.
    pub async fn sync_images(&self) -> Result<ImageSyncReport> {
        let resume = self.config.sync.resume;
        let limiter = RateLimiter::new(self.config.sync.product_delay);

        let products = self.store.list_products_with_images().await.map_err(|e| {
            error!(error = %e, "failed to get products from the record store");
            e
        })?;

        let start = if resume {
            self.resume_index(&products).await
        } else {
            0
        };

        let mut report = ImageSyncReport {
            products_total: products.len() as u64,
            products_resumed_past: start as u64,
            ..Default::default()
        };

        info!(
            products = products.len(),
            skipped = start,
            "fetched product ids"
        );

        for product_id in &products[start..] {
            self.sync_product(product_id, &mut report).await;

            if resume {
                if let Err(e) = self
                    .store
                    .save_cursor(Stage::ImageSync, product_id.as_str())
                    .await
                {
                    warn!(product_id = %product_id, error = %e, "failed to save image sync cursor");
                }
            }

            limiter.wait().await;
        }

        if resume {
            if let Err(e) = self.store.clear_cursor(Stage::ImageSync).await {
                warn!(error = %e, "failed to clear image sync cursor");
            }
        }

        info!(
            products = report.products_total,
            products_failed = report.products_failed,
            without_images = report.products_without_images,
            requested = report.assets_requested,
            written = report.assets_written,
            already_present = report.assets_already_present,
            failed = report.assets_failed,
            bytes = report.bytes_written,
            "finished downloading images"
        );

        Ok(report)
    }

    /// One unit of work of the image stage
    async fn sync_product(&self, product_id: &ProductId, report: &mut ImageSyncReport) {
        let Some(image_ids) = self.resolve_image_ids(product_id, report).await else {
            return;
        };

        if image_ids.is_empty() {
            report.products_without_images += 1;
            debug!(product_id = %product_id, "product has no images");
            return;
        }

        if let Err(e) = self.files.ensure_product_directory(product_id).await {
            report.assets_failed += image_ids.len() as u64;
            error!(
                product_id = %product_id,
                kind = %e.kind(),
                error = %e,
                "failed to create product directory, skipping its images"
            );
            return;
        }

        let concurrency = match self.config.sync.max_concurrent_images {
            0 => image_ids.len(),
            n => n,
        };

        let outcomes: Vec<AssetOutcome> = stream::iter(image_ids.iter())
            .map(|image_id| self.sync_asset(product_id, image_id))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, AssetOutcome::Failed { .. }))
            .count();
        for outcome in outcomes {
            report.tally(outcome);
        }

        if failed > 0 {
            warn!(
                product_id = %product_id,
                images = image_ids.len(),
                failed,
                "finished downloading images with failures"
            );
        } else {
            info!(
                product_id = %product_id,
                images = image_ids.len(),
                "finished downloading images"
            );
        }
    }

    /// Stored image list, or the one from the product detail (persisted when non-empty)
    ///
    /// Returns `None` when the detail request failed.
    async fn resolve_image_ids(
        &self,
        product_id: &ProductId,
        report: &mut ImageSyncReport,
    ) -> Option<Vec<ImageId>> {
        match self.store.image_ids(product_id).await {
            Ok(Some(image_ids)) => {
                report.products_already_resolved += 1;
                debug!(product_id = %product_id, count = image_ids.len(), "image ids already stored");
                return Some(image_ids);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(product_id = %product_id, error = %e, "failed to read stored image ids, fetching detail");
            }
        }

        let image_ids = match self.catalog.article_detail(product_id).await {
            Ok(detail) => detail.into_image_ids(),
            Err(e) => {
                report.products_failed += 1;
                error!(
                    product_id = %product_id,
                    status = ?e.status(),
                    error = %e,
                    "failed to fetch product detail"
                );
                return None;
            }
        };

        if image_ids.is_empty() {
            return Some(image_ids);
        }

        match self.store.update_image_ids(product_id, &image_ids).await {
            Ok(ImageIdsUpdate::Stored) => {
                info!(product_id = %product_id, image_ids = ?image_ids, "saved image ids");
            }
            Ok(ImageIdsUpdate::Unchanged) => {
                debug!(product_id = %product_id, "image ids already saved");
            }
            Ok(ImageIdsUpdate::Conflict { existing }) => {
                warn!(
                    product_id = %product_id,
                    stored = ?existing,
                    remote = ?image_ids,
                    "remote image ids differ from the stored list, keeping the stored list"
                );
            }
            Ok(ImageIdsUpdate::UnknownProduct) => {
                warn!(product_id = %product_id, "product vanished from the record store");
            }
            Err(e) => {
                error!(
                    product_id = %product_id,
                    kind = %e.kind(),
                    error = %e,
                    "failed to save image ids"
                );
            }
        }

        Some(image_ids)
    }

    /// Fetch, normalize and store one asset unless it is already on disk
    async fn sync_asset(&self, product_id: &ProductId, image_id: &ImageId) -> AssetOutcome {
        match self.files.contains(product_id, image_id).await {
            Ok(true) => {
                debug!(product_id = %product_id, image_id = %image_id, "asset already on disk");
                return AssetOutcome::Present;
            }
            Ok(false) => {}
            Err(e) => {
                error!(product_id = %product_id, image_id = %image_id, error = %e, "cannot store asset");
                return AssetOutcome::Failed { requested: false };
            }
        }

        let payload = match self.catalog.fetch_image(product_id, image_id).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    product_id = %product_id,
                    image_id = %image_id,
                    status = ?e.status(),
                    error = %e,
                    "failed to download image"
                );
                return AssetOutcome::Failed { requested: true };
            }
        };

        let bytes = match normalizer::normalize(
            payload.content_type.as_deref(),
            payload.bytes,
            self.config.sync.jpeg_quality,
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    product_id = %product_id,
                    image_id = %image_id,
                    content_type = payload.content_type.as_deref().unwrap_or_default(),
                    error = %e,
                    "failed to convert image to JPEG"
                );
                return AssetOutcome::Failed { requested: true };
            }
        };

        match self
            .files
            .write_asset_if_absent(product_id, image_id, &bytes)
            .await
        {
            Ok(AssetWrite::Written { bytes }) => AssetOutcome::Written(bytes),
            Ok(AssetWrite::AlreadyPresent | AssetWrite::LostRace) => AssetOutcome::Dropped,
            Err(e) => {
                error!(product_id = %product_id, image_id = %image_id, error = %e, "failed to write image");
                AssetOutcome::Failed { requested: true }
            }
        }
    }

    /// Index of the first product after the saved cursor, or 0
    async fn resume_index(&self, products: &[ProductId]) -> usize {
        let position = match self.store.load_cursor(Stage::ImageSync).await {
            Ok(Some(position)) => position,
            Ok(None) => return 0,
            Err(e) => {
                warn!(error = %e, "failed to load image sync cursor, starting from the first product");
                return 0;
            }
        };

        match products.iter().position(|p| p.as_str() == position) {
            Some(index) => {
                info!(last_completed = %position, "resuming image sync after saved cursor");
                index + 1
            }
            None => {
                warn!(position = %position, "saved product no longer listed, starting from the first product");
                0
            }
        }
    }
}
