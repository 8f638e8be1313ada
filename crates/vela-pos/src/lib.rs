//! # vela-pos: The Sale Transaction Engine
//!
//! The pipeline that turns an in-memory cart into a persisted, tax-correct,
//! auditable sale, while protecting finite stock against overselling across
//! concurrent checkouts.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Sale Transaction Engine                               │
//! │                                                                         │
//! │  StoreResolver ── picks the one store a session is bound to             │
//! │       │              (manager: fixed; company admin: explicit choice)   │
//! │       ▼                                                                 │
//! │  SessionManager ── owns carts keyed by session id; every mutation       │
//! │       │            re-validates against the live catalog                │
//! │       ▼                                                                 │
//! │  CheckoutService ── tender check ► StockGuard reserve/commit ►          │
//! │                     persist Sale ► clear cart ► audit + outbox          │
//! │                                                                         │
//! │  Everything is store-scoped; every failure path unwinds stock so a      │
//! │  failed checkout never leaves a decrement without a Sale row.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No wire protocol lives here — request handlers call these types
//! in-process. Auth, CRUD surfaces, dashboards and audit querying are
//! external collaborators.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vela_pos::{Actor, CheckoutService, EngineConfig, SessionManager, Tender};
//!
//! let sessions = SessionManager::new(db.clone());
//! let checkout = CheckoutService::new(db, EngineConfig::new());
//!
//! let actor = Actor::Manager { user_id, store_id: Some(store_id) };
//! let info = sessions.open(&actor, None).await?;
//!
//! sessions.add_to_cart(&info.session_id, &product_id, 2).await?;
//! let sale = checkout
//!     .checkout(&sessions, &info.session_id, Tender::Cash { amount_tendered_cents: 5_000 }, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod stock;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutService, ReceiptLine, ReceiptVatLine, SaleReceipt, Tender};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use session::{CartView, CheckoutSnapshot, PosSession, SessionInfo, SessionManager};
pub use stock::{Reservation, StockGuard};
pub use store::{Actor, StoreResolver};
