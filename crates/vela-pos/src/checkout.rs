//! # Sale Committer
//!
//! Turns a validated cart into a persisted, tax-correct, auditable sale.
//!
//! ## Checkout Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       checkout(session, tender)                         │
//! │                                                                         │
//! │  1. snapshot cart ── empty? ────────────────────► EmptyCart             │
//! │  2. cash tender < total? ───────────────────────► InsufficientPayment   │
//! │  3. stock guard: reserve_all then commit_all                            │
//! │       any failure ──────────────────────────────► InsufficientStock     │
//! │       (all prior holds/commits unwound)                                 │
//! │  4. decompose VAT, snapshot items, persist Sale (one transaction)       │
//! │       persistence failure ──► roll back ALL stock commits, fail         │
//! │  5. clear the cart, append audit entry, queue analytics outbox          │
//! │       (side effects are fire-and-forget; a sale never fails on them)    │
//! │                                                                         │
//! │  A failed checkout therefore never leaves stock decremented without a   │
//! │  corresponding Sale row, and a sale is never persisted twice.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::SessionManager;
use crate::stock::StockGuard;
use vela_core::{
    decompose, validation, AuditEvent, AuditSeverity, CustomerInfo, PaymentMethod, Sale, SaleItem,
};
use vela_db::Database;

// =============================================================================
// Tender
// =============================================================================

/// How the customer is paying, with whatever that method needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Tender {
    /// Cash: the amount handed over must cover the total; change is computed.
    #[serde(rename_all = "camelCase")]
    Cash { amount_tendered_cents: i64 },
    /// Card: authorization happens on an external terminal, no tender check.
    Card,
}

impl Tender {
    /// The payment method label recorded on the sale.
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::Card => PaymentMethod::Card,
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Receipt view of a persisted sale, assembled for printing/display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: String,
    pub store_name: String,
    pub timestamp: String,
    pub lines: Vec<ReceiptLine>,
    /// Per-rate VAT lines, keyed by normalized rate ("21%").
    pub vat_lines: Vec<ReceiptVatLine>,
    pub net_total_cents: i64,
    pub vat_total_cents: i64,
    pub gross_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub amount_tendered_cents: Option<i64>,
    pub change_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_gross_price_cents: i64,
    pub line_gross_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptVatLine {
    pub rate: String,
    pub net_cents: i64,
    pub vat_cents: i64,
}

// =============================================================================
// Checkout Service
// =============================================================================

/// The sale committer: orchestrates tender validation, the stock guard and
/// sale persistence for one database.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    guard: StockGuard,
}

impl CheckoutService {
    /// Creates a checkout service.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        CheckoutService {
            guard: StockGuard::new(db.clone(), config.reservation_ttl),
            db,
        }
    }

    /// Commits the session's cart as a sale.
    ///
    /// On success the cart is cleared and the immutable [`Sale`] is
    /// returned. On any failure the cart is left intact so the user can
    /// adjust it, and no stock remains decremented.
    pub async fn checkout(
        &self,
        sessions: &SessionManager,
        session_id: &str,
        tender: Tender,
        customer: Option<CustomerInfo>,
    ) -> EngineResult<Sale> {
        let snapshot = sessions.snapshot(session_id)?;

        if snapshot.cart.is_empty() {
            return Err(EngineError::EmptyCart);
        }

        if let Some(customer) = &customer {
            validation::validate_customer_info(customer).map_err(|e| EngineError::Cart(e.into()))?;
        }

        let total_cents = snapshot.cart.total_cents();

        // Tender check before any stock is touched
        let (amount_tendered_cents, change_cents) = match tender {
            Tender::Cash {
                amount_tendered_cents,
            } => {
                validation::validate_tendered_cents(amount_tendered_cents)
                    .map_err(|e| EngineError::Cart(e.into()))?;
                if amount_tendered_cents < total_cents {
                    return Err(EngineError::InsufficientPayment {
                        shortfall_cents: total_cents - amount_tendered_cents,
                    });
                }
                (
                    Some(amount_tendered_cents),
                    Some(amount_tendered_cents - total_cents),
                )
            }
            Tender::Card => (None, None),
        };

        // Hold then decrement stock, all-or-nothing
        let reservations = self
            .guard
            .reserve_all(&snapshot.store_id, snapshot.cart.lines())
            .await?;
        self.guard.commit_all(&reservations).await?;

        // Snapshot the sale
        let breakdown = decompose(&snapshot.cart);
        let sale_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now();

        let items: Vec<SaleItem> = snapshot
            .cart
            .lines()
            .iter()
            .map(|line| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: line.name.clone(),
                unit_gross_price_cents: line.unit_gross_price_cents,
                vat_rate_bps: line.vat_rate_bps,
                quantity: line.quantity,
                line_gross_cents: line.line_gross_cents(),
                created_at: now,
            })
            .collect();

        let customer = customer.filter(|c| !c.is_empty());

        let sale = Sale {
            id: sale_id,
            store_id: snapshot.store_id.clone(),
            user_id: snapshot.user_id.clone(),
            payment_method: tender.method(),
            gross_total_cents: breakdown.gross_total_cents,
            net_total_cents: breakdown.net_total_cents,
            vat_total_cents: breakdown.vat_total_cents,
            vat_breakdown: breakdown,
            items,
            customer,
            amount_tendered_cents,
            change_cents,
            created_at: now,
        };

        // Persist; a failure here must restore every decremented unit so no
        // stock movement exists without a Sale row
        if let Err(err) = self.db.sales().insert(&sale).await {
            warn!(sale_id = %sale.id, error = %err, "Sale persistence failed, rolling back stock");
            self.guard.rollback_all(&reservations).await;
            return Err(err.into());
        }

        // The sale is durable from here on; a session closed mid-checkout
        // must not turn a committed sale into an error.
        if let Err(err) = sessions.clear_cart(session_id) {
            warn!(session_id = %session_id, error = %err, "cart clear after checkout failed");
        }

        self.emit_side_effects(&sale).await;

        info!(
            sale_id = %sale.id,
            store_id = %sale.store_id,
            total_cents = %sale.gross_total_cents,
            items = sale.items.len(),
            "Sale committed"
        );

        Ok(sale)
    }

    /// Assembles a receipt for a persisted sale.
    pub async fn receipt(&self, sale_id: &str) -> EngineResult<SaleReceipt> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::Db(vela_db::DbError::not_found("Sale", sale_id)))?;

        let store_name = self
            .db
            .stores()
            .get_by_id(&sale.store_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| sale.store_id.clone());

        Ok(SaleReceipt {
            sale_id: sale.id,
            store_name,
            timestamp: sale.created_at.to_rfc3339(),
            lines: sale
                .items
                .iter()
                .map(|item| ReceiptLine {
                    name: item.name_snapshot.clone(),
                    quantity: item.quantity,
                    unit_gross_price_cents: item.unit_gross_price_cents,
                    line_gross_cents: item.line_gross_cents,
                })
                .collect(),
            vat_lines: sale
                .vat_breakdown
                .groups
                .iter()
                .map(|(bps, group)| ReceiptVatLine {
                    rate: vela_core::TaxRate::from_bps(*bps).to_string(),
                    net_cents: group.net_cents,
                    vat_cents: group.vat_cents,
                })
                .collect(),
            net_total_cents: sale.net_total_cents,
            vat_total_cents: sale.vat_total_cents,
            gross_total_cents: sale.gross_total_cents,
            payment_method: sale.payment_method,
            amount_tendered_cents: sale.amount_tendered_cents,
            change_cents: sale.change_cents,
        })
    }

    /// Audit entry + analytics outbox row for a committed sale.
    ///
    /// Fire-and-forget: the sale is already durable, so failures here are
    /// logged and swallowed rather than failing the checkout.
    async fn emit_side_effects(&self, sale: &Sale) {
        let payload = match serde_json::to_string(sale) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(sale_id = %sale.id, error = %err, "sale serialization for side effects failed");
                return;
            }
        };

        let event = AuditEvent {
            action: "sale.completed".to_string(),
            actor_id: sale.user_id.clone(),
            entity_type: "sale".to_string(),
            entity_id: sale.id.clone(),
            before: None,
            after: Some(payload.clone()),
            severity: AuditSeverity::Info,
        };
        if let Err(err) = self.db.audit().record(event).await {
            warn!(sale_id = %sale.id, error = %err, "audit append failed");
        }

        if let Err(err) = self
            .db
            .outbox()
            .queue(&sale.store_id, "SALE", &sale.id, &payload)
            .await
        {
            warn!(sale_id = %sale.id, error = %err, "analytics outbox queue failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Actor;
    use chrono::Utc;
    use std::sync::Arc;
    use vela_core::{Product, Store, TaxRate};
    use vela_db::DbConfig;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .try_init();
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_store(db: &Database, id: &str) {
        let store = Store {
            id: id.to_string(),
            company_id: "acme".to_string(),
            name: format!("Store {}", id),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.stores().insert(&store).await.unwrap();
    }

    async fn seed_product(db: &Database, id: &str, store_id: &str, gross: i64, bps: u32, stock: i64) {
        let product = Product {
            id: id.to_string(),
            store_id: store_id.to_string(),
            name: format!("Product {}", id),
            category: "grocery".to_string(),
            gross_price_cents: gross,
            vat_rate_bps: bps,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.products().insert(&product).await.unwrap();
    }

    fn manager(store_id: &str) -> Actor {
        Actor::Manager {
            user_id: "cashier-1".to_string(),
            store_id: Some(store_id.to_string()),
        }
    }

    async fn setup() -> (Database, SessionManager, CheckoutService) {
        init_tracing();
        let db = test_db().await;
        seed_store(&db, "s-1").await;
        let sessions = SessionManager::new(db.clone());
        let checkout = CheckoutService::new(db.clone(), EngineConfig::new());
        (db, sessions, checkout)
    }

    #[tokio::test]
    async fn test_cash_checkout_happy_path() {
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-1", "s-1", 12_100, 2_100, 5).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 2).await.unwrap();

        let sale = checkout
            .checkout(
                &sessions,
                &info.session_id,
                Tender::Cash {
                    amount_tendered_cents: 30_000,
                },
                Some(CustomerInfo {
                    name: Some("Ana García".to_string()),
                    phone: None,
                    email: None,
                }),
            )
            .await
            .unwrap();

        assert_eq!(sale.gross_total_cents, 24_200);
        assert_eq!(sale.net_total_cents, 20_000);
        assert_eq!(sale.vat_total_cents, 4_200);
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.amount_tendered_cents, Some(30_000));
        assert_eq!(sale.change_cents, Some(5_800));
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].quantity, 2);

        // Stock decremented, sale persisted, cart cleared
        let product = db.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(product.stock, 3);
        assert!(db.sales().get_by_id(&sale.id).await.unwrap().is_some());
        assert!(sessions.cart_view(&info.session_id).unwrap().lines.is_empty());

        // Side effects landed
        let audit = db.audit().recent(10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "sale.completed");
        assert_eq!(audit[0].entity_id, sale.id);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cash_tender_rules() {
        // Total 50.00: 40.00 is 10.00 short, 60.00 gives 10.00 change
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-1", "s-1", 2_500, 1_000, 10).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 2).await.unwrap();

        let err = checkout
            .checkout(
                &sessions,
                &info.session_id,
                Tender::Cash {
                    amount_tendered_cents: 4_000,
                },
                None,
            )
            .await
            .unwrap_err();
        match err {
            EngineError::InsufficientPayment { shortfall_cents } => {
                assert_eq!(shortfall_cents, 1_000)
            }
            other => panic!("unexpected error: {other}"),
        }

        // Nothing was touched by the failed attempt
        assert_eq!(db.products().get_by_id("p-1").await.unwrap().unwrap().stock, 10);
        assert_eq!(sessions.cart_view(&info.session_id).unwrap().total_quantity, 2);

        let sale = checkout
            .checkout(
                &sessions,
                &info.session_id,
                Tender::Cash {
                    amount_tendered_cents: 6_000,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(sale.change_cents, Some(1_000));
    }

    #[tokio::test]
    async fn test_card_checkout_has_no_tender_check() {
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-1", "s-1", 9_999, 2_100, 3).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 3).await.unwrap();

        let sale = checkout
            .checkout(&sessions, &info.session_id, Tender::Card, None)
            .await
            .unwrap();

        assert_eq!(sale.payment_method, PaymentMethod::Card);
        assert_eq!(sale.amount_tendered_cents, None);
        assert_eq!(sale.change_cents, None);
        assert_eq!(db.products().get_by_id("p-1").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let (_db, sessions, checkout) = setup().await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        let err = checkout
            .checkout(&sessions, &info.session_id, Tender::Card, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCart));
    }

    #[tokio::test]
    async fn test_checkout_is_all_or_nothing() {
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-a", "s-1", 1_000, 1_000, 5).await;
        seed_product(&db, "p-b", "s-1", 2_000, 2_100, 5).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-a", 2).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-b", 3).await.unwrap();

        // Another terminal drains product B before this checkout commits
        db.products().adjust_stock("p-b", -5).await.unwrap();

        let err = checkout
            .checkout(&sessions, &info.session_id, Tender::Card, None)
            .await
            .unwrap_err();

        // The failure names the offending product
        match err {
            EngineError::InsufficientStock {
                ref product_id,
                available,
                requested,
                ..
            } => {
                assert_eq!(product_id, "p-b");
                assert_eq!(available, 0);
                assert_eq!(requested, 3);
            }
            ref other => panic!("unexpected error: {other}"),
        }

        // No line was decremented and no sale was persisted
        assert_eq!(db.products().get_by_id("p-a").await.unwrap().unwrap().stock, 5);
        assert_eq!(db.sales().count_by_store("s-1").await.unwrap(), 0);

        // The cart survives so the user can adjust it
        assert_eq!(sessions.cart_view(&info.session_id).unwrap().line_count, 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back_stock() {
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-1", "s-1", 1_000, 1_000, 5).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 2).await.unwrap();

        // Sabotage persistence: the item insert will fail mid-transaction
        sqlx::query("DROP TABLE sale_items")
            .execute(db.pool())
            .await
            .unwrap();

        let err = checkout
            .checkout(&sessions, &info.session_id, Tender::Card, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Db(_)));

        // The decrement was undone: no stock movement without a Sale row
        assert_eq!(db.products().get_by_id("p-1").await.unwrap().unwrap().stock, 5);
        assert_eq!(db.sales().count_by_store("s-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mixed_rate_sale_breakdown() {
        // A: 12.10 @ 10% x2, B: 126.00 @ 26% x1 -> 150.20 gross
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-a", "s-1", 1_210, 1_000, 10).await;
        seed_product(&db, "p-b", "s-1", 12_600, 2_600, 10).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-a", 2).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-b", 1).await.unwrap();

        let sale = checkout
            .checkout(&sessions, &info.session_id, Tender::Card, None)
            .await
            .unwrap();

        assert_eq!(sale.gross_total_cents, 15_020);
        let ten = sale.vat_breakdown.group(TaxRate::from_bps(1_000)).unwrap();
        assert_eq!((ten.net_cents, ten.vat_cents), (2_200, 220));
        let twenty_six = sale.vat_breakdown.group(TaxRate::from_bps(2_600)).unwrap();
        assert_eq!((twenty_six.net_cents, twenty_six.vat_cents), (10_000, 2_600));
    }

    #[tokio::test]
    async fn test_receipt_assembly() {
        let (db, sessions, checkout) = setup().await;
        seed_product(&db, "p-1", "s-1", 12_100, 2_100, 5).await;

        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 1).await.unwrap();

        let sale = checkout
            .checkout(
                &sessions,
                &info.session_id,
                Tender::Cash {
                    amount_tendered_cents: 15_000,
                },
                None,
            )
            .await
            .unwrap();

        let receipt = checkout.receipt(&sale.id).await.unwrap();
        assert_eq!(receipt.store_name, "Store s-1");
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.gross_total_cents, 12_100);
        assert_eq!(receipt.vat_lines.len(), 1);
        assert_eq!(receipt.vat_lines[0].rate, "21%");
        assert_eq!(receipt.vat_lines[0].net_cents, 10_000);
        assert_eq!(receipt.change_cents, Some(2_900));
    }

    /// The oversell race: two sessions race for the last unit; exactly one
    /// sale commits and the loser sees InsufficientStock.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkout_of_last_unit() {
        init_tracing();

        // File-backed database so both checkouts get their own connection
        let path = std::env::temp_dir().join(format!("vela-pos-race-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        seed_store(&db, "s-1").await;
        seed_product(&db, "p-1", "s-1", 1_000, 1_000, 1).await;

        let sessions = Arc::new(SessionManager::new(db.clone()));
        let checkout = Arc::new(CheckoutService::new(db.clone(), EngineConfig::new()));

        // Both carts accept the unit: each saw stock 1 at add time
        let first = sessions.open(&manager("s-1"), None).await.unwrap();
        let second = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&first.session_id, "p-1", 1).await.unwrap();
        sessions.add_to_cart(&second.session_id, "p-1", 1).await.unwrap();

        let spawn_checkout = |session_id: String| {
            let checkout = Arc::clone(&checkout);
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                checkout
                    .checkout(&sessions, &session_id, Tender::Card, None)
                    .await
            })
        };

        let handle_a = spawn_checkout(first.session_id.clone());
        let handle_b = spawn_checkout(second.session_id.clone());
        let result_a = handle_a.await.unwrap();
        let result_b = handle_b.await.unwrap();

        let successes = [&result_a, &result_b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one checkout must win the last unit");

        let loser = if result_a.is_err() { result_a } else { result_b };
        assert!(matches!(
            loser.unwrap_err(),
            EngineError::InsufficientStock { .. }
        ));

        assert_eq!(db.products().get_by_id("p-1").await.unwrap().unwrap().stock, 0);
        assert_eq!(db.sales().count_by_store("s-1").await.unwrap(), 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
