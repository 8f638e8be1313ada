//! # Repository Module
//!
//! Repository implementations over the SQLite pool.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine code                                                            │
//! │       │  db.stock().reserve(store, product, qty, ttl)                   │
//! │       ▼                                                                 │
//! │  StockRepository ── SQL ──► SQLite                                      │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place per concern                             │
//! │  • The engine depends on small async APIs, not on query text            │
//! │  • Each repository is a thin Clone-able wrapper around the pool         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog reads, stock adjustments
//! - [`store::StoreRepository`] - Store directory for store resolution
//! - [`stock::StockRepository`] - Reservation lifecycle (reserve/commit/release)
//! - [`sale::SaleRepository`] - Immutable sale + item snapshots
//! - [`audit::AuditLogRepository`] - Append-only audit trail
//! - [`outbox::AnalyticsOutboxRepository`] - Aggregator notification queue

pub mod audit;
pub mod outbox;
pub mod product;
pub mod sale;
pub mod stock;
pub mod store;
