//! # Sale Repository
//!
//! Persistence for committed sales and their item snapshots.
//!
//! A sale is written exactly once — header and items in a single
//! transaction — and never updated or deleted afterwards. The VAT breakdown
//! is stored as a JSON snapshot keyed by normalized rate, so the historical
//! record survives any later change to products or tax configuration.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use vela_core::{CustomerInfo, PaymentMethod, Sale, SaleItem, VatBreakdown};

/// Raw sales row; items and the breakdown snapshot are assembled on top.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    store_id: String,
    user_id: String,
    payment_method: PaymentMethod,
    gross_total_cents: i64,
    net_total_cents: i64,
    vat_total_cents: i64,
    vat_breakdown: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    amount_tendered_cents: Option<i64>,
    change_cents: Option<i64>,
    created_at: DateTime<Utc>,
}

const SALE_COLUMNS: &str = "id, store_id, user_id, payment_method, gross_total_cents, \
     net_total_cents, vat_total_cents, vat_breakdown, customer_name, customer_phone, \
     customer_email, amount_tendered_cents, change_cents, created_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, name_snapshot, \
     unit_gross_price_cents, vat_rate_bps, quantity, line_gross_cents, created_at";

/// Repository for sale persistence.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a sale and all its item snapshots in one transaction.
    ///
    /// Either the whole sale lands or nothing does; the committer relies on
    /// this to know exactly what to roll back on failure.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, store_id = %sale.store_id, total = %sale.gross_total_cents, "Inserting sale");

        let breakdown_json = serde_json::to_string(&sale.vat_breakdown)
            .map_err(|e| DbError::Internal(format!("breakdown serialization: {e}")))?;

        let customer = sale.customer.as_ref();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, store_id, user_id, payment_method,
                gross_total_cents, net_total_cents, vat_total_cents, vat_breakdown,
                customer_name, customer_phone, customer_email,
                amount_tendered_cents, change_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.store_id)
        .bind(&sale.user_id)
        .bind(sale.payment_method)
        .bind(sale.gross_total_cents)
        .bind(sale.net_total_cents)
        .bind(sale.vat_total_cents)
        .bind(&breakdown_json)
        .bind(customer.and_then(|c| c.name.clone()))
        .bind(customer.and_then(|c| c.phone.clone()))
        .bind(customer.and_then(|c| c.email.clone()))
        .bind(sale.amount_tendered_cents)
        .bind(sale.change_cents)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        for item in &sale.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot,
                    unit_gross_price_cents, vat_rate_bps, quantity, line_gross_cents,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_gross_price_cents)
            .bind(item.vat_rate_bps)
            .bind(item.quantity)
            .bind(item.line_gross_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Gets a sale by ID with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let query = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let row = sqlx::query_as::<_, SaleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self.get_items(id).await?;
        Ok(Some(assemble_sale(row, items)?))
    }

    /// Gets the item snapshots of a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let query =
            format!("SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
        let items = sqlx::query_as::<_, SaleItem>(&query)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Lists a store's most recent sales, newest first, items included.
    pub async fn list_recent(&self, store_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let query = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE store_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );
        let rows = sqlx::query_as::<_, SaleRow>(&query)
            .bind(store_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.get_items(&row.id).await?;
            sales.push(assemble_sale(row, items)?);
        }

        Ok(sales)
    }

    /// Counts a store's sales (for diagnostics).
    pub async fn count_by_store(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Reassembles the domain `Sale` from a raw row and its items.
fn assemble_sale(row: SaleRow, items: Vec<SaleItem>) -> DbResult<Sale> {
    let vat_breakdown: VatBreakdown = serde_json::from_str(&row.vat_breakdown)
        .map_err(|e| DbError::Internal(format!("breakdown deserialization: {e}")))?;

    let customer = CustomerInfo {
        name: row.customer_name,
        phone: row.customer_phone,
        email: row.customer_email,
    };
    let customer = if customer.is_empty() {
        None
    } else {
        Some(customer)
    };

    Ok(Sale {
        id: row.id,
        store_id: row.store_id,
        user_id: row.user_id,
        payment_method: row.payment_method,
        gross_total_cents: row.gross_total_cents,
        net_total_cents: row.net_total_cents,
        vat_total_cents: row.vat_total_cents,
        vat_breakdown,
        items,
        customer,
        amount_tendered_cents: row.amount_tendered_cents,
        change_cents: row.change_cents,
        created_at: row.created_at,
    })
}
