//! # Stock Reservation Repository
//!
//! The storage half of the stock guard: reservations that hold availability
//! between checkout start and commit.
//!
//! ## How the Oversell Race Is Closed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Two POS sessions, last unit of the same product              │
//! │                                                                         │
//! │  Session A: reserve(qty 1) ──┐                                          │
//! │  Session B: reserve(qty 1) ──┤  both arrive "at once"                   │
//! │                              ▼                                          │
//! │  One guarded INSERT…SELECT per attempt:                                 │
//! │                                                                         │
//! │    INSERT reservation                                                   │
//! │    SELECT … FROM products p                                             │
//! │    WHERE p.stock - (active reserved qty) >= requested                   │
//! │                                                                         │
//! │  SQLite serializes writers, so the availability check and the insert    │
//! │  are one atomic step. The first attempt inserts a row and shrinks       │
//! │  availability; the second sees 0 available and inserts nothing.         │
//! │                                                                         │
//! │  Exactly one session proceeds. No read-then-write window exists.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! `reserved` rows count against availability but leave `products.stock`
//! untouched. `commit` performs the actual decrement (with a `stock >= qty`
//! fence) and flips the row to `committed`. `release` drops the hold.
//! Rows past `expires_at` stop counting and are swept to `released`, so an
//! abandoned checkout can never lock stock permanently.

use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vela_core::{ReservationState, StockReservation};

/// Outcome of a reservation attempt.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// The hold was placed; commit or release it.
    Reserved(StockReservation),
    /// Not enough availability; nothing was stored.
    Rejected { available: i64 },
}

/// Repository for stock reservation operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Attempts to reserve `quantity` units of a product.
    ///
    /// Availability is evaluated against CURRENT stock minus all live
    /// reservations, at the moment of the insert — not against whatever the
    /// cart saw at add time. The check and the insert are a single guarded
    /// statement (see module docs), so concurrent attempts cannot both pass.
    ///
    /// Inactive products and products of other stores never match the guard
    /// and come back as `Rejected`.
    pub async fn reserve(
        &self,
        store_id: &str,
        product_id: &str,
        quantity: i64,
        ttl: Duration,
    ) -> DbResult<ReserveOutcome> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + chrono::Duration::milliseconds(ttl.as_millis() as i64);

        let result = sqlx::query(
            r#"
            INSERT INTO stock_reservations (id, product_id, store_id, quantity, state, created_at, expires_at)
            SELECT ?1, p.id, p.store_id, ?2, 'reserved', ?3, ?4
            FROM products p
            WHERE p.id = ?5
              AND p.store_id = ?6
              AND p.is_active = 1
              AND p.stock - COALESCE((
                    SELECT SUM(r.quantity) FROM stock_reservations r
                    WHERE r.product_id = p.id
                      AND r.state = 'reserved'
                      AND r.expires_at > ?7
                  ), 0) >= ?8
            "#,
        )
        .bind(&id)
        .bind(quantity)
        .bind(now)
        .bind(expires_at)
        .bind(product_id)
        .bind(store_id)
        .bind(now)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(reservation_id = %id, product_id = %product_id, quantity = %quantity, "Stock reserved");
            return Ok(ReserveOutcome::Reserved(StockReservation {
                id,
                product_id: product_id.to_string(),
                store_id: store_id.to_string(),
                quantity,
                state: ReservationState::Reserved,
                created_at: now,
                expires_at,
            }));
        }

        let available = self
            .availability(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        debug!(product_id = %product_id, available = %available, requested = %quantity, "Reservation rejected");
        Ok(ReserveOutcome::Rejected {
            available: available.max(0),
        })
    }

    /// Current availability of a product: stock minus live reservations.
    ///
    /// Returns `None` if the product doesn't exist.
    pub async fn availability(&self, product_id: &str) -> DbResult<Option<i64>> {
        let now = Utc::now();

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT p.stock - COALESCE((
                     SELECT SUM(r.quantity) FROM stock_reservations r
                     WHERE r.product_id = p.id
                       AND r.state = 'reserved'
                       AND r.expires_at > ?1
                   ), 0)
            FROM products p
            WHERE p.id = ?2
            "#,
        )
        .bind(now)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(available,)| available))
    }

    /// Commits a reservation: decrements product stock and marks the row
    /// committed, in one transaction.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented, reservation committed
    /// * `Ok(false)` - the `stock >= quantity` fence failed (stock moved
    ///   underneath the reservation, e.g. a manual correction); nothing
    ///   changed, the caller should roll the checkout back
    /// * `Err(DbError::NotFound)` - the row is no longer `reserved`
    ///   (already committed, released, or swept after expiry)
    pub async fn commit(&self, reservation_id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT product_id, quantity FROM stock_reservations WHERE id = ?1 AND state = 'reserved'",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id, quantity)) = row else {
            return Err(DbError::not_found("Reservation", reservation_id));
        };

        let now = Utc::now();

        let updated = sqlx::query(
            "UPDATE products SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?4",
        )
        .bind(quantity)
        .bind(now)
        .bind(&product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            warn!(reservation_id = %reservation_id, product_id = %product_id, "Commit fence failed, stock moved under reservation");
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            return Ok(false);
        }

        sqlx::query("UPDATE stock_reservations SET state = 'committed' WHERE id = ?1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(reservation_id = %reservation_id, product_id = %product_id, quantity = %quantity, "Reservation committed");
        Ok(true)
    }

    /// Releases a reservation that was never committed.
    ///
    /// Idempotent: releasing a row that is already released (or was swept by
    /// the expiry cleanup) is a no-op.
    pub async fn release(&self, reservation_id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE stock_reservations SET state = 'released' WHERE id = ?1 AND state = 'reserved'")
                .bind(reservation_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 1 {
            debug!(reservation_id = %reservation_id, "Reservation released");
        }

        Ok(())
    }

    /// Rolls back an already-committed reservation: restores the product's
    /// stock and flips the row to released, in one transaction.
    ///
    /// Used when a later line of the same checkout fails, or when persisting
    /// the sale fails after stock was decremented. Idempotent: a row that is
    /// not `committed` is left alone.
    pub async fn rollback_committed(&self, reservation_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT product_id, quantity FROM stock_reservations WHERE id = ?1 AND state = 'committed'",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((product_id, quantity)) = row else {
            return Ok(());
        };

        let now = Utc::now();

        sqlx::query("UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
            .bind(quantity)
            .bind(now)
            .bind(&product_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE stock_reservations SET state = 'released' WHERE id = ?1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(reservation_id = %reservation_id, product_id = %product_id, quantity = %quantity, "Committed reservation rolled back");
        Ok(())
    }

    /// Sweeps expired holds: every `reserved` row past its `expires_at`
    /// becomes `released`.
    ///
    /// Expired rows already stop counting against availability the moment
    /// they expire; the sweep is hygiene so the table doesn't accumulate
    /// stale rows. Called opportunistically before each reserve batch.
    pub async fn release_expired(&self) -> DbResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE stock_reservations SET state = 'released' WHERE state = 'reserved' AND expires_at <= ?1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            debug!(count = %swept, "Released expired reservations");
        }

        Ok(swept)
    }

    /// Gets a reservation by ID (diagnostics and tests).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockReservation>> {
        let reservation = sqlx::query_as::<_, StockReservation>(
            "SELECT id, product_id, store_id, quantity, state, created_at, expires_at \
             FROM stock_reservations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }
}
