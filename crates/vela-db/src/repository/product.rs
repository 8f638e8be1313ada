//! # Product Catalog Repository
//!
//! Per-store catalog access. The transaction engine only ever reads here
//! (plus the stock decrement that lives in [`crate::repository::stock`]);
//! the write operations back the inventory/management surfaces that feed
//! the catalog.

use chrono::Utc;
use sqlx::sqlite::SqliteQueryResult;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use vela_core::Product;

/// One column list shared by every SELECT so the `FromRow` mapping cannot
/// drift between queries.
const PRODUCT_COLUMNS: &str = "id, store_id, name, category, gross_price_cents, \
     vat_rate_bps, stock, is_active, created_at, updated_at";

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Fetches one product by id, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        Ok(sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// A store's active products, by name.
    pub async fn list_by_store(&self, store_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        debug!(store_id = %store_id, limit = %limit, "Listing products");

        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE store_id = ?1 AND is_active = 1 \
             ORDER BY name LIMIT ?2"
        );
        Ok(sqlx::query_as::<_, Product>(&query)
            .bind(store_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Adds a product to a store's catalog.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, store_id = %product.store_id, "Inserting product");

        sqlx::query(
            "INSERT INTO products \
               (id, store_id, name, category, gross_price_cents, vat_rate_bps, \
                stock, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.gross_price_cents)
        .bind(product.vat_rate_bps)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rewrites a product's catalog fields.
    ///
    /// Stock is deliberately absent from this UPDATE: stock only moves via
    /// [`Self::adjust_stock`] deltas or the reservation commit path, never
    /// by absolute overwrite.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            "UPDATE products \
             SET name = ?2, category = ?3, gross_price_cents = ?4, \
                 vat_rate_bps = ?5, is_active = ?6, updated_at = ?7 \
             WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.gross_price_cents)
        .bind(product.vat_rate_bps)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        ensure_row_hit(result, &product.id)
    }

    /// Moves stock by a delta: positive restocks, negative corrects.
    ///
    /// `stock = stock + delta` composes with concurrent sales, which an
    /// absolute `stock = n` write would clobber. A delta that would land
    /// below zero trips the `stock >= 0` CHECK and comes back as
    /// [`DbError::CheckViolation`] with inventory untouched.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result =
            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(delta)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        ensure_row_hit(result, id)
    }

    /// Marks a product unsellable. Rows are never physically deleted;
    /// historical sale items keep referencing the id.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        ensure_row_hit(result, id)
    }

    /// Active product count for one store (diagnostics).
    pub async fn count_by_store(&self, store_id: &str) -> DbResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = ?1 AND is_active = 1")
                .bind(store_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

fn ensure_row_hit(result: SqliteQueryResult, id: &str) -> DbResult<()> {
    if result.rows_affected() == 0 {
        Err(DbError::not_found("Product", id))
    } else {
        Ok(())
    }
}
