//! # Stock Guard
//!
//! Drives the reservation state machine for a whole cart, all-or-nothing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Stock Protocol                              │
//! │                                                                         │
//! │  reserve_all(lines)                                                     │
//! │    line 1 reserve ──ok──┐                                               │
//! │    line 2 reserve ──ok──┤  any rejection: release every prior hold,     │
//! │    line 3 reserve ──X   │  fail naming the offending product            │
//! │                         ▼                                               │
//! │  commit_all(reservations)                                               │
//! │    res 1 commit ──ok──┐                                                 │
//! │    res 2 commit ──X   │  any failure: roll back prior commits           │
//! │                       │  (stock restored) and release the rest          │
//! │                       ▼                                                 │
//! │  all committed: stock is decremented, checkout may persist the sale     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-reservation atomicity lives in `vela_db::StockRepository`; this
//! layer owns the unwind logic that makes a multi-line checkout atomic.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{EngineError, EngineResult};
use vela_core::CartLine;
use vela_db::{Database, ReserveOutcome};

/// A live hold taken for one cart line, with enough context for error
/// reporting and unwinding.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

/// Validates and holds stock for checkouts against one database.
#[derive(Debug, Clone)]
pub struct StockGuard {
    db: Database,
    ttl: Duration,
}

impl StockGuard {
    /// Creates a stock guard with the given reservation time-to-live.
    pub fn new(db: Database, ttl: Duration) -> Self {
        StockGuard { db, ttl }
    }

    /// Reserves every line of a cart, in order.
    ///
    /// Re-validates each line against CURRENT availability — not the stock
    /// the cart saw at add time. On the first rejection all prior holds are
    /// released and the checkout fails naming the offending product.
    pub async fn reserve_all(
        &self,
        store_id: &str,
        lines: &[CartLine],
    ) -> EngineResult<Vec<Reservation>> {
        // Hygiene: sweep stale holds so the table doesn't accumulate them.
        // Expired rows already stopped counting against availability.
        if let Err(err) = self.db.stock().release_expired().await {
            warn!(error = %err, "expired-reservation sweep failed");
        }

        let mut reserved: Vec<Reservation> = Vec::with_capacity(lines.len());

        for line in lines {
            let outcome = match self
                .db
                .stock()
                .reserve(store_id, &line.product_id, line.quantity, self.ttl)
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.release_all(&reserved).await;
                    return Err(err.into());
                }
            };

            match outcome {
                ReserveOutcome::Reserved(r) => reserved.push(Reservation {
                    id: r.id,
                    product_id: line.product_id.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                }),
                ReserveOutcome::Rejected { available } => {
                    self.release_all(&reserved).await;
                    return Err(EngineError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        name: line.name.clone(),
                        available,
                        requested: line.quantity,
                    });
                }
            }
        }

        debug!(store_id = %store_id, count = reserved.len(), "All lines reserved");
        Ok(reserved)
    }

    /// Commits every reservation, in order.
    ///
    /// If any commit fails, commits made so far are rolled back (stock
    /// restored) and the remaining holds are released, then the checkout
    /// fails. Partial sales cannot happen.
    pub async fn commit_all(&self, reservations: &[Reservation]) -> EngineResult<()> {
        for (index, reservation) in reservations.iter().enumerate() {
            let committed = match self.db.stock().commit(&reservation.id).await {
                Ok(committed) => committed,
                Err(err) => {
                    self.unwind(reservations, index).await;
                    return Err(err.into());
                }
            };

            if !committed {
                self.unwind(reservations, index).await;

                let available = self
                    .db
                    .stock()
                    .availability(&reservation.product_id)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or(0);

                return Err(EngineError::InsufficientStock {
                    product_id: reservation.product_id.clone(),
                    name: reservation.name.clone(),
                    available: available.max(0),
                    requested: reservation.quantity,
                });
            }
        }

        debug!(count = reservations.len(), "All reservations committed");
        Ok(())
    }

    /// Releases holds that were never committed (abort before commit).
    pub async fn release_all(&self, reservations: &[Reservation]) {
        for reservation in reservations {
            if let Err(err) = self.db.stock().release(&reservation.id).await {
                warn!(reservation_id = %reservation.id, error = %err, "failed to release reservation");
            }
        }
    }

    /// Rolls back fully committed reservations (sale persistence failed
    /// after the stock was already decremented).
    pub async fn rollback_all(&self, reservations: &[Reservation]) {
        for reservation in reservations {
            if let Err(err) = self.db.stock().rollback_committed(&reservation.id).await {
                error!(reservation_id = %reservation.id, error = %err, "failed to roll back committed reservation");
            }
        }
    }

    /// Undoes a partially committed batch: `[0, failed)` were committed and
    /// get rolled back, `[failed, ..]` are still mere holds and get released.
    async fn unwind(&self, reservations: &[Reservation], failed: usize) {
        warn!(
            committed = failed,
            total = reservations.len(),
            "Unwinding partially committed checkout"
        );
        self.rollback_all(&reservations[..failed]).await;
        self.release_all(&reservations[failed..]).await;
    }
}
