//! Product rows: enumeration inserts, listing, and image list resolution.

use crate::error::DatabaseError;
use crate::types::{ImageId, ProductId};
use crate::{Error, Result};

use super::{Database, ImageIdsUpdate, ProductRow};

impl Database {
    /// Insert a product seen during enumeration
    ///
    /// Insert-or-ignore: re-paging over an already mirrored range after a restart
    /// is expected, so an existing identity is left untouched. Returns `true` when
    /// a new row was created.
    pub async fn insert_product(
        &self,
        product_id: &ProductId,
        thumbnail_id: Option<&ImageId>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO products (product_id, thumbnail_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(product_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(thumbnail_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert product {}: {}",
                product_id, e
            )))
        })?;

        Ok(result.rows_affected() == 1)
    }

    /// List products that have a thumbnail or a resolved image list, in insertion order
    pub async fn list_products_with_images(&self) -> Result<Vec<ProductId>> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            r#"
            SELECT product_id FROM products
            WHERE thumbnail_id IS NOT NULL OR image_ids IS NOT NULL
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list products: {}",
                e
            )))
        })?;

        Ok(ids)
    }

    /// Get a product row
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT product_id, thumbnail_id, image_ids, created_at, updated_at
            FROM products
            WHERE product_id = ?
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get product {}: {}",
                product_id, e
            )))
        })?;

        Ok(row)
    }

    /// Get the resolved image list of a product, if any
    pub async fn get_image_ids(&self, product_id: &ProductId) -> Result<Option<Vec<ImageId>>> {
        match self.get_product(product_id).await? {
            Some(row) => row.image_id_list(),
            None => Ok(None),
        }
    }

    /// Store the resolved image list of a product
    ///
    /// The column is only ever filled once. Calling again with the same list is a
    /// no-op; a different list is reported as a conflict and not written.
    pub async fn update_image_ids(
        &self,
        product_id: &ProductId,
        image_ids: &[ImageId],
    ) -> Result<ImageIdsUpdate> {
        let encoded = serde_json::to_string(image_ids)?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE products SET image_ids = ?, updated_at = ?
            WHERE product_id = ? AND image_ids IS NULL
            "#,
        )
        .bind(&encoded)
        .bind(now)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update image ids of {}: {}",
                product_id, e
            )))
        })?;

        if result.rows_affected() == 1 {
            return Ok(ImageIdsUpdate::Stored);
        }

        match self.get_image_ids(product_id).await? {
            None => match self.get_product(product_id).await? {
                // Row exists but the list is still NULL: a concurrent writer cleared it
                Some(_) => Err(Error::Database(DatabaseError::ConstraintViolation(format!(
                    "image ids of {} could not be stored",
                    product_id
                )))),
                None => Ok(ImageIdsUpdate::UnknownProduct),
            },
            Some(existing) if existing == image_ids => Ok(ImageIdsUpdate::Unchanged),
            Some(existing) => Ok(ImageIdsUpdate::Conflict { existing }),
        }
    }

    /// Count all product rows
    pub async fn count_products(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count products: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}
