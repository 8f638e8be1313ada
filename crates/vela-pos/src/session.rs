//! # POS Sessions
//!
//! Explicit session objects owning the in-progress cart, keyed by session
//! id — the cart is engine state with a defined lifecycle, not ambient UI
//! state.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      POS Session Lifecycle                              │
//! │                                                                         │
//! │  open(actor, selection?) ── store resolution ──► Session { empty cart } │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  add_to_cart / set_quantity / remove_from_cart   (live catalog lookups) │
//! │       │                                                                 │
//! │       ├── cancel() ────────► cart cleared, session stays open           │
//! │       ├── checkout ────────► (vela-pos::checkout) cart cleared          │
//! │       └── close() ─────────► session dropped                            │
//! │                                                                         │
//! │  The bound store is sticky: switching stores = opening a new session,   │
//! │  which always starts empty. A cart can therefore never span stores.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! Sessions live in a `Mutex<HashMap>`. Each client session owns exactly one
//! cart and never shares it; the mutex only guards the map against
//! concurrent handler invocations, and it is never held across an await —
//! catalog lookups happen before the lock is taken.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::store::{Actor, StoreResolver};
use vela_core::{decompose, Cart, CartLine, Product, Store, VatBreakdown};
use vela_db::Database;

// =============================================================================
// Session
// =============================================================================

/// One POS client session: an actor, a resolved store and a cart.
#[derive(Debug)]
pub struct PosSession {
    pub id: String,
    pub user_id: String,
    pub store: Store,
    pub cart: Cart,
    pub opened_at: DateTime<Utc>,
}

/// What the committer needs from a session, captured under the lock.
#[derive(Debug, Clone)]
pub struct CheckoutSnapshot {
    pub session_id: String,
    pub store_id: String,
    pub user_id: String,
    pub cart: Cart,
}

/// Summary returned when a session opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub store_id: String,
    pub store_name: String,
    pub user_id: String,
}

/// Cart contents plus derived totals, for display after every mutation.
///
/// The breakdown comes from the one canonical [`decompose`]; this view never
/// recomputes VAT with its own rounding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub store_id: String,
    pub lines: Vec<CartLine>,
    pub line_count: usize,
    pub total_quantity: i64,
    pub gross_total_cents: i64,
    pub breakdown: VatBreakdown,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        CartView {
            store_id: cart.store_id().to_string(),
            lines: cart.lines().to_vec(),
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            gross_total_cents: cart.total_cents(),
            breakdown: decompose(cart),
        }
    }
}

// =============================================================================
// Session Manager
// =============================================================================

/// Owns every live POS session, keyed by session id.
#[derive(Debug)]
pub struct SessionManager {
    db: Database,
    resolver: StoreResolver,
    sessions: Mutex<HashMap<String, PosSession>>,
}

impl SessionManager {
    /// Creates a new session manager over a database handle.
    pub fn new(db: Database) -> Self {
        SessionManager {
            resolver: StoreResolver::new(db.clone()),
            db,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a new POS session for an actor.
    ///
    /// Store resolution runs first (see [`StoreResolver::resolve`]); only a
    /// successfully resolved store ever gets a cart. The new cart is empty.
    pub async fn open(&self, actor: &Actor, store_selection: Option<&str>) -> EngineResult<SessionInfo> {
        let store = self.resolver.resolve(actor, store_selection).await?;

        let session = PosSession {
            id: Uuid::new_v4().to_string(),
            user_id: actor.user_id().to_string(),
            cart: Cart::new(store.id.clone()),
            store,
            opened_at: Utc::now(),
        };

        let info = SessionInfo {
            session_id: session.id.clone(),
            store_id: session.store.id.clone(),
            store_name: session.store.name.clone(),
            user_id: session.user_id.clone(),
        };

        info!(session_id = %info.session_id, store_id = %info.store_id, user_id = %info.user_id, "POS session opened");

        let mut sessions = self.lock_sessions();
        sessions.insert(info.session_id.clone(), session);

        Ok(info)
    }

    /// Adds a product to the session's cart (merging quantities), validated
    /// against the live catalog row.
    pub async fn add_to_cart(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<CartView> {
        debug!(session_id = %session_id, product_id = %product_id, quantity = %quantity, "add_to_cart");

        let product = self.fetch_sellable_product(product_id).await?;

        self.with_session_mut(session_id, |session| {
            session.cart.add_line(&product, quantity)?;
            Ok(CartView::from(&session.cart))
        })
    }

    /// Sets the quantity of a cart line. Zero or less removes the line.
    pub async fn set_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<CartView> {
        debug!(session_id = %session_id, product_id = %product_id, quantity = %quantity, "set_quantity");

        if quantity <= 0 {
            // Removal must work even if the product has vanished from the
            // catalog in the meantime, so skip the lookup.
            return self.remove_from_cart(session_id, product_id);
        }

        let product = self.fetch_sellable_product(product_id).await?;

        self.with_session_mut(session_id, |session| {
            session.cart.set_quantity(&product, quantity)?;
            Ok(CartView::from(&session.cart))
        })
    }

    /// Removes a line from the cart. Removing an absent line is a no-op.
    pub fn remove_from_cart(&self, session_id: &str, product_id: &str) -> EngineResult<CartView> {
        debug!(session_id = %session_id, product_id = %product_id, "remove_from_cart");

        self.with_session_mut(session_id, |session| {
            session.cart.remove_line(product_id);
            Ok(CartView::from(&session.cart))
        })
    }

    /// The current cart contents and totals.
    pub fn cart_view(&self, session_id: &str) -> EngineResult<CartView> {
        self.with_session(session_id, |session| Ok(CartView::from(&session.cart)))
    }

    /// Cancels the in-progress checkout: clears the cart, keeps the session.
    pub fn cancel(&self, session_id: &str) -> EngineResult<CartView> {
        info!(session_id = %session_id, "Cart cancelled");

        self.with_session_mut(session_id, |session| {
            session.cart.clear();
            Ok(CartView::from(&session.cart))
        })
    }

    /// Closes a session, dropping whatever cart it held.
    pub fn close(&self, session_id: &str) -> EngineResult<()> {
        let mut sessions = self.lock_sessions();
        sessions
            .remove(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        info!(session_id = %session_id, "POS session closed");
        Ok(())
    }

    /// Captures what the committer needs, under the lock.
    pub fn snapshot(&self, session_id: &str) -> EngineResult<CheckoutSnapshot> {
        self.with_session(session_id, |session| {
            Ok(CheckoutSnapshot {
                session_id: session.id.clone(),
                store_id: session.store.id.clone(),
                user_id: session.user_id.clone(),
                cart: session.cart.clone(),
            })
        })
    }

    /// Empties the session's cart (called by the committer after success).
    pub fn clear_cart(&self, session_id: &str) -> EngineResult<()> {
        self.with_session_mut(session_id, |session| {
            session.cart.clear();
            Ok(())
        })
    }

    /// Number of live sessions (diagnostics).
    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn fetch_sellable_product(&self, product_id: &str) -> EngineResult<Product> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotAvailable(product_id.to_string()))?;

        if !product.is_active {
            return Err(EngineError::ProductNotAvailable(product_id.to_string()));
        }

        Ok(product)
    }

    fn with_session<F, R>(&self, session_id: &str, f: F) -> EngineResult<R>
    where
        F: FnOnce(&PosSession) -> EngineResult<R>,
    {
        let sessions = self.lock_sessions();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        f(session)
    }

    fn with_session_mut<F, R>(&self, session_id: &str, f: F) -> EngineResult<R>
    where
        F: FnOnce(&mut PosSession) -> EngineResult<R>,
    {
        let mut sessions = self.lock_sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        f(session)
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, PosSession>> {
        self.sessions.lock().expect("session map mutex poisoned")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vela_core::CoreError;
    use vela_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_store(db: &Database, id: &str, company_id: &str) {
        let store = Store {
            id: id.to_string(),
            company_id: company_id.to_string(),
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
            user_id: "user-1".to_string(),
            store_id: Some(store_id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_open_and_mutate_cart() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;
        seed_product(&db, "p-1", "s-1", 12_100, 2_100, 10).await;

        let sessions = SessionManager::new(db);
        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        assert_eq!(info.store_id, "s-1");

        let view = sessions.add_to_cart(&info.session_id, "p-1", 2).await.unwrap();
        assert_eq!(view.line_count, 1);
        assert_eq!(view.gross_total_cents, 24_200);
        // The view carries the canonical breakdown
        assert_eq!(view.breakdown.net_total_cents, 20_000);
        assert_eq!(view.breakdown.vat_total_cents, 4_200);

        let view = sessions.set_quantity(&info.session_id, "p-1", 1).await.unwrap();
        assert_eq!(view.gross_total_cents, 12_100);

        let view = sessions.set_quantity(&info.session_id, "p-1", 0).await.unwrap();
        assert!(view.lines.is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_product() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;
        seed_product(&db, "p-1", "s-1", 1_000, 1_000, 10).await;
        db.products().soft_delete("p-1").await.unwrap();

        let sessions = SessionManager::new(db);
        let info = sessions.open(&manager("s-1"), None).await.unwrap();

        let err = sessions.add_to_cart(&info.session_id, "p-1", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::ProductNotAvailable(_)));

        let err = sessions.add_to_cart(&info.session_id, "ghost", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::ProductNotAvailable(_)));
    }

    #[tokio::test]
    async fn test_cross_store_product_is_rejected() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;
        seed_store(&db, "s-2", "acme").await;
        seed_product(&db, "p-2", "s-2", 1_000, 1_000, 10).await;

        let sessions = SessionManager::new(db);
        let info = sessions.open(&manager("s-1"), None).await.unwrap();

        let err = sessions.add_to_cart(&info.session_id, "p-2", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::Cart(CoreError::StoreMismatch { .. })));
    }

    #[tokio::test]
    async fn test_cancel_clears_cart_but_keeps_session() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;
        seed_product(&db, "p-1", "s-1", 1_000, 1_000, 10).await;

        let sessions = SessionManager::new(db);
        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&info.session_id, "p-1", 3).await.unwrap();

        let view = sessions.cancel(&info.session_id).unwrap();
        assert!(view.lines.is_empty());

        // Session still usable after cancel
        let view = sessions.add_to_cart(&info.session_id, "p-1", 1).await.unwrap();
        assert_eq!(view.total_quantity, 1);
    }

    #[tokio::test]
    async fn test_closed_session_is_gone() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;

        let sessions = SessionManager::new(db);
        let info = sessions.open(&manager("s-1"), None).await.unwrap();
        assert_eq!(sessions.session_count(), 1);

        sessions.close(&info.session_id).unwrap();
        assert_eq!(sessions.session_count(), 0);

        let err = sessions.cart_view(&info.session_id).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_new_session_starts_with_empty_cart() {
        let db = test_db().await;
        seed_store(&db, "s-1", "acme").await;
        seed_store(&db, "s-2", "acme").await;
        seed_product(&db, "p-1", "s-1", 1_000, 1_000, 10).await;

        let sessions = SessionManager::new(db);
        let first = sessions.open(&manager("s-1"), None).await.unwrap();
        sessions.add_to_cart(&first.session_id, "p-1", 2).await.unwrap();

        // Switching stores means a fresh session; its cart is empty
        let second = sessions.open(&manager("s-2"), None).await.unwrap();
        let view = sessions.cart_view(&second.session_id).unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(view.store_id, "s-2");
    }
}
