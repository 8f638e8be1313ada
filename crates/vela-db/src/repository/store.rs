//! # Store Directory Repository
//!
//! Read access to the store directory for store resolution, plus the insert
//! used when a company provisions a new store. Company CRUD itself lives in
//! the management surface, not here.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use vela_core::Store;

const STORE_COLUMNS: &str = "id, company_id, name, is_active, created_at, updated_at";

/// Repository for store directory operations.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    /// Creates a new StoreRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Gets a store by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Store>> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1");
        let store = sqlx::query_as::<_, Store>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(store)
    }

    /// Lists a company's active stores, ordered by name.
    ///
    /// This is the list a company admin picks from when opening a POS
    /// session.
    pub async fn list_by_company(&self, company_id: &str) -> DbResult<Vec<Store>> {
        debug!(company_id = %company_id, "Listing company stores");

        let query = format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE company_id = ?1 AND is_active = 1 \
             ORDER BY name"
        );
        let stores = sqlx::query_as::<_, Store>(&query)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(stores)
    }

    /// Inserts a new store.
    pub async fn insert(&self, store: &Store) -> DbResult<()> {
        debug!(id = %store.id, company_id = %store.company_id, "Inserting store");

        sqlx::query(
            r#"
            INSERT INTO stores (id, company_id, name, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&store.id)
        .bind(&store.company_id)
        .bind(&store.name)
        .bind(store.is_active)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
