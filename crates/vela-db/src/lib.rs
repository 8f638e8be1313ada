//! # vela-db: Storage Layer for the Vela Sale Engine
//!
//! SQLite persistence behind the sale-transaction engine: the product
//! catalog and store directory it reads, the stock reservations that close
//! the oversell race, and the sale/audit/outbox tables it writes.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vela_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/vela.db")).await?;
//!
//! let products = db.products().list_by_store(&store_id, 50).await?;
//! let outcome = db.stock().reserve(&store_id, &product_id, 2, ttl).await?;
//! ```
//!
//! ## Why SQLite?
//! One file per deployment, WAL concurrency, and a single serialized writer
//! — which is precisely the property the stock guard leans on to make its
//! check-and-reserve step atomic (see [`repository::stock`]).

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;


// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::AuditLogRepository;
pub use repository::outbox::AnalyticsOutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{ReserveOutcome, StockRepository};
pub use repository::store::StoreRepository;
