//! Catalog enumeration stage.

use tracing::{error, info, warn};

use super::CatalogMirror;
use crate::catalog::Article;
use crate::error::{Error, Result};
use crate::rate_limiter::RateLimiter;
use crate::types::{EnumerationReport, Stage};

impl CatalogMirror {
    /// Page through the catalog search and record every product seen
    ///
    /// Fails only if the total record count cannot be fetched
    /// ([`Error::TotalCountUnavailable`]); in that case no search page is
    /// requested. A failed page is logged and skipped, the offset still advances,
    /// and the page delay applies after every page whatever its outcome.
    pub async fn enumerate_catalog(&self) -> Result<EnumerationReport> {
        let page_size = self.config.catalog.page_size;
        let resume = self.config.sync.resume;
        let limiter = RateLimiter::new(self.config.sync.page_delay);

        let total = self.catalog.total_count().await.map_err(|e| {
            error!(status = ?e.status(), error = %e, "couldn't fetch total number of products");
            Error::TotalCountUnavailable(e)
        })?;

        let start_offset = if resume {
            self.saved_offset().await
        } else {
            0
        };

        let mut report = EnumerationReport {
            total,
            start_offset,
            ..Default::default()
        };

        info!(total, start_offset, page_size, "started fetching products");

        let mut offset = start_offset;
        while offset < total {
            let to = offset.saturating_add(page_size);
            report.pages_requested += 1;

            match self.catalog.search_page(offset, page_size).await {
                Ok(page) => {
                    for article in &page.articles {
                        self.record_article(article, &mut report).await;
                    }
                    info!(
                        from = offset,
                        to,
                        received = page.articles.len(),
                        "fetched page"
                    );
                }
                Err(e) => {
                    report.pages_failed += 1;
                    error!(
                        from = offset,
                        to,
                        status = ?e.status(),
                        error = %e,
                        "failed to fetch page"
                    );
                }
            }

            offset = to;

            if resume {
                if let Err(e) = self.store.save_cursor(Stage::Enumerate, &offset.to_string()).await {
                    warn!(offset, error = %e, "failed to save enumeration cursor");
                }
            }

            limiter.wait().await;
        }

        if resume {
            if let Err(e) = self.store.clear_cursor(Stage::Enumerate).await {
                warn!(error = %e, "failed to clear enumeration cursor");
            }
        }

        info!(
            total,
            pages = report.pages_requested,
            pages_failed = report.pages_failed,
            inserted = report.products_inserted,
            already_known = report.products_already_known,
            insert_failures = report.insert_failures,
            "finished fetching products"
        );

        Ok(report)
    }

    /// Persist one search result; failures are isolated to this record
    async fn record_article(&self, article: &Article, report: &mut EnumerationReport) {
        match self
            .store
            .insert_product(&article.id, article.image_id.as_ref())
            .await
        {
            Ok(true) => report.products_inserted += 1,
            Ok(false) => report.products_already_known += 1,
            Err(e) => {
                report.insert_failures += 1;
                error!(
                    product_id = %article.id,
                    kind = %e.kind(),
                    error = %e,
                    "failed to insert product"
                );
            }
        }
    }

    /// Offset saved by an interrupted run, or 0
    async fn saved_offset(&self) -> u64 {
        match self.store.load_cursor(Stage::Enumerate).await {
            Ok(Some(position)) => match position.parse::<u64>() {
                Ok(offset) => {
                    info!(offset, "resuming enumeration from saved cursor");
                    offset
                }
                Err(_) => {
                    warn!(position = %position, "ignoring unreadable enumeration cursor");
                    0
                }
            },
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "failed to load enumeration cursor, starting from 0");
                0
            }
        }
    }
}
