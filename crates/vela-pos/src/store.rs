//! # Store Resolution
//!
//! Determines which store a POS session (and therefore every cart and sale
//! in it) is bound to.
//!
//! ## Actor Capabilities, Not Role Strings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Resolution                                  │
//! │                                                                         │
//! │  Actor::Manager { store_id: Some(s) } ──────────► that store, done      │
//! │  Actor::Manager { store_id: None }    ──────────► NoStoreAssigned       │
//! │                                                                         │
//! │  Actor::CompanyAdmin { company_id }                                     │
//! │       │                                                                 │
//! │       ├── company has zero stores ──────────────► NoStoresAvailable     │
//! │       ├── no selection given ───────────────────► StoreSelectionRequired│
//! │       ├── selection not in the company ─────────► StoreNotInCompany     │
//! │       └── valid selection ──────────────────────► that store            │
//! │                                                                         │
//! │  The engine only ever sees "has a fixed store" vs "must select one";    │
//! │  whatever other roles exist in the management surface never reach it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution happens once, when a session opens, and is sticky for the
//! session's lifetime. Switching stores means opening a new session, which
//! always starts with an empty cart.

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use vela_db::Database;
use vela_core::Store;

// =============================================================================
// Actor
// =============================================================================

/// Who is operating the POS, reduced to the one capability that matters
/// here: do they come with a fixed store, or must they pick one?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A store manager, permanently bound to (at most) one store.
    Manager {
        user_id: String,
        /// The store bound to this manager, if any has been assigned.
        store_id: Option<String>,
    },

    /// A company admin or owner operating any of their company's stores.
    CompanyAdmin {
        user_id: String,
        company_id: String,
    },
}

impl Actor {
    /// The acting user's id.
    pub fn user_id(&self) -> &str {
        match self {
            Actor::Manager { user_id, .. } => user_id,
            Actor::CompanyAdmin { user_id, .. } => user_id,
        }
    }

    /// Whether this actor resolves to a store without a selection.
    pub fn has_fixed_store(&self) -> bool {
        matches!(self, Actor::Manager { .. })
    }
}

// =============================================================================
// Store Resolver
// =============================================================================

/// Resolves an actor (plus an optional explicit selection) to the one store
/// a POS session will be bound to.
#[derive(Debug, Clone)]
pub struct StoreResolver {
    db: Database,
}

impl StoreResolver {
    /// Creates a new StoreResolver.
    pub fn new(db: Database) -> Self {
        StoreResolver { db }
    }

    /// The stores an actor may operate: the manager's own store, or all of
    /// the company's stores. This is what a selection UI would list.
    pub async fn available_stores(&self, actor: &Actor) -> EngineResult<Vec<Store>> {
        match actor {
            Actor::Manager { user_id, store_id } => {
                let store_id = store_id.as_deref().ok_or_else(|| {
                    EngineError::NoStoreAssigned {
                        user_id: user_id.clone(),
                    }
                })?;
                let store = self.require_store(store_id).await?;
                Ok(vec![store])
            }
            Actor::CompanyAdmin { company_id, .. } => {
                Ok(self.db.stores().list_by_company(company_id).await?)
            }
        }
    }

    /// Resolves the store for a new session.
    ///
    /// `selection` is ignored for managers (their store is fixed) and
    /// required for company admins.
    pub async fn resolve(&self, actor: &Actor, selection: Option<&str>) -> EngineResult<Store> {
        match actor {
            Actor::Manager { user_id, store_id } => {
                let store_id = store_id.as_deref().ok_or_else(|| {
                    EngineError::NoStoreAssigned {
                        user_id: user_id.clone(),
                    }
                })?;
                let store = self.require_store(store_id).await?;
                debug!(user_id = %user_id, store_id = %store.id, "Resolved manager store");
                Ok(store)
            }

            Actor::CompanyAdmin {
                user_id,
                company_id,
            } => {
                let stores = self.db.stores().list_by_company(company_id).await?;

                // Zero stores is fatal regardless of any selection; no cart
                // can ever be constructed for this actor.
                if stores.is_empty() {
                    return Err(EngineError::NoStoresAvailable {
                        company_id: company_id.clone(),
                    });
                }

                let selected = selection.ok_or(EngineError::StoreSelectionRequired)?;

                let store = stores
                    .into_iter()
                    .find(|s| s.id == selected)
                    .ok_or_else(|| EngineError::StoreNotInCompany {
                        store_id: selected.to_string(),
                        company_id: company_id.clone(),
                    })?;

                debug!(user_id = %user_id, store_id = %store.id, "Resolved admin store selection");
                Ok(store)
            }
        }
    }

    async fn require_store(&self, store_id: &str) -> EngineResult<Store> {
        self.db
            .stores()
            .get_by_id(store_id)
            .await?
            .ok_or_else(|| EngineError::StoreNotFound(store_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
