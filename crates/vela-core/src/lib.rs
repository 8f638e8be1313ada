//! # vela-core: Pure Business Logic for the Vela Sale Engine
//!
//! Everything computational about a sale lives here — money arithmetic,
//! VAT decomposition, cart invariants — as pure functions over in-memory
//! data. Nothing in this crate touches a database, the network or a clock
//! beyond timestamping.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request handlers (out of scope)                                        │
//! │        │ in-process calls                                               │
//! │        ▼                                                                │
//! │  vela-pos ──── sessions, store resolution, stock guard, committer       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  vela-core (THIS CRATE)                                                 │
//! │    ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────┐             │
//! │    │   money   │ │    tax    │ │   cart    │ │    vat    │             │
//! │    │   Money   │ │  TaxRate  │ │   Cart    │ │ decompose │             │
//! │    └───────────┘ └───────────┘ └───────────┘ └───────────┘             │
//! │    pure functions only — no I/O, no SQL, no network                     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  vela-db ──── SQLite queries, migrations, repositories                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Two Numeric Rules
//!
//! 1. Money is i64 **cents**; VAT rates are u32 **basis points**. Floats
//!    never carry a monetary value.
//! 2. The single rounding in the system is the half-up gross→net split in
//!    [`money::Money::net_of`]; VAT is always the exact remainder.
//!
//! ```rust
//! use vela_core::{Money, TaxRate};
//!
//! let gross = Money::from_cents(12_100); // 121.00, tax-inclusive
//! let rate = TaxRate::from_bps(2_100);   // 21%
//!
//! assert_eq!(gross.net_of(rate).cents(), 10_000);
//! assert_eq!(gross.vat_portion(rate).cents(), 2_100);
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;
pub mod vat;

// Flat re-exports: callers write `vela_core::Cart`, not `vela_core::cart::Cart`.
pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tax::TaxRate;
pub use types::*;
pub use vat::{decompose, RateGroup, VatBreakdown};

/// Cap on distinct lines per cart; keeps a single transaction a sane size.
/// Could move to per-company configuration later.
pub const MAX_CART_LINES: usize = 100;

/// Cap on the quantity of one line; catches fat-fingered quantities
/// (1000 for 10) before they hit stock checks.
pub const MAX_LINE_QUANTITY: i64 = 999;
