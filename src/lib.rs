//! # catalog-mirror
//!
//! Mirrors a remote paginated product catalog into a local SQLite database and
//! downloads every referenced product image into a deduplicated directory tree.
//!
//! ## Pipeline
//!
//! A run has two sequential stages:
//! - **Enumerate** - fetch the total record count, then page through the catalog
//!   search and insert each product (identifier and thumbnail) into the record store
//! - **Sync images** - for every product with a known image, resolve its full image
//!   list, store it, and download every image not yet on disk as
//!   `{image_dir}/{productId}/{imageId}.jpg`, re-encoding non-JPEG payloads
//!
//! Only a failure to fetch the total record count aborts a run. Every other failure
//! is isolated to one page, product or image, logged, and counted in the stage report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_mirror::{CatalogMirror, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.storage.image_dir = "./images".into();
//!
//!     let mirror = CatalogMirror::new(config).await?;
//!     let result = mirror.run().await;
//!     mirror.close().await;
//!
//!     let report = result?;
//!     println!("wrote {} images", report.images.assets_written);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote catalog client
pub mod catalog;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// On-disk image tree
pub mod file_store;
/// JPEG normalization
pub mod normalizer;
/// Enumeration and image sync stages
pub mod pipeline;
/// Fixed-delay pacing
pub mod rate_limiter;
/// Record store abstraction
pub mod record_store;
/// Core types and run reports
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogClient, HttpCatalogClient};
pub use config::Config;
pub use db::Database;
pub use error::{DatabaseError, Error, ErrorKind, FileSystemError, RemoteFetchError, Result};
pub use file_store::FileStore;
pub use pipeline::CatalogMirror;
pub use record_store::RecordStore;
pub use types::{EnumerationReport, ImageId, ImageSyncReport, ProductId, RunReport, Stage};
