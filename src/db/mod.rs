//! Database layer for catalog-mirror
//!
//! Handles SQLite persistence for mirrored catalog products and stage cursors.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`products`] - Product rows and their resolved image lists
//! - [`cursor`] - Per-stage resume cursors

use crate::types::{ImageId, ProductId};
use sqlx::{FromRow, sqlite::SqlitePool};

mod cursor;
mod migrations;
mod products;

/// Product record from database
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    /// Catalog product identifier
    pub product_id: ProductId,
    /// Thumbnail image identifier seen during enumeration
    pub thumbnail_id: Option<ImageId>,
    /// JSON-encoded resolved image identifier list (NULL until resolved)
    pub image_ids: Option<String>,
    /// Unix timestamp when the row was created
    pub created_at: i64,
    /// Unix timestamp of the last image list change
    pub updated_at: Option<i64>,
}

impl ProductRow {
    /// Decode the stored image identifier list
    ///
    /// Returns `Ok(None)` when the list has not been resolved yet.
    pub fn image_id_list(&self) -> crate::Result<Option<Vec<ImageId>>> {
        match &self.image_ids {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }
}

/// Result of [`Database::update_image_ids`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageIdsUpdate {
    /// The list was stored for the first time
    Stored,
    /// The same list was already stored
    Unchanged,
    /// A different list is already stored; it was left untouched
    Conflict {
        /// The list that remains stored
        existing: Vec<ImageId>,
    },
    /// No row exists for the product
    UnknownProduct,
}

/// Database handle for catalog-mirror
pub struct Database {
    pool: SqlitePool,
}
