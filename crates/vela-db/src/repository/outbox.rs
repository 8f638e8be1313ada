//! # Analytics Outbox Repository
//!
//! Committed sales land here as rows the (external) analytics aggregator
//! drains on its own schedule:
//!
//! ```text
//! committer ── INSERT ('SALE', id, json) ──► analytics_outbox
//!                                                │ pending()        (aggregator)
//!                                                ▼
//!                                           fold into dashboards
//!                                                │ mark_processed(id)
//!                                                ▼
//!                                           cleanup_processed() later
//! ```
//!
//! The engine owns no aggregation state; a sale that reaches this table
//! reaches the dashboards eventually, even if the aggregator was down at
//! commit time.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use vela_core::AnalyticsOutboxEntry;

const OUTBOX_COLUMNS: &str =
    "id, store_id, entity_type, entity_id, payload, created_at, processed_at";

/// Repository for analytics outbox operations.
#[derive(Debug, Clone)]
pub struct AnalyticsOutboxRepository {
    pool: SqlitePool,
}

impl AnalyticsOutboxRepository {
    /// Creates a new AnalyticsOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsOutboxRepository { pool }
    }

    /// Queues an entity change, payload being the entity's full JSON.
    pub async fn queue(
        &self,
        store_id: &str,
        entity_type: &str,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<AnalyticsOutboxEntry> {
        let entry = AnalyticsOutboxEntry {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            payload: payload.to_string(),
            created_at: Utc::now(),
            processed_at: None,
        };

        debug!(entity_type = %entity_type, entity_id = %entity_id, "Queuing for analytics");

        sqlx::query(
            "INSERT INTO analytics_outbox \
               (id, store_id, entity_type, entity_id, payload, created_at, processed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
        )
        .bind(&entry.id)
        .bind(&entry.store_id)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Unconsumed entries, oldest first, so the aggregator folds sales in
    /// commit order.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<AnalyticsOutboxEntry>> {
        let query = format!(
            "SELECT {OUTBOX_COLUMNS} FROM analytics_outbox \
             WHERE processed_at IS NULL ORDER BY created_at ASC LIMIT ?1"
        );
        Ok(sqlx::query_as::<_, AnalyticsOutboxEntry>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Stamps an entry as consumed.
    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE analytics_outbox SET processed_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// How many entries still await the aggregator.
    pub async fn count_pending(&self) -> DbResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM analytics_outbox WHERE processed_at IS NULL")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Drops consumed entries older than `days_old` days; returns how many
    /// went away.
    pub async fn cleanup_processed(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(days_old as i64);

        let result = sqlx::query(
            "DELETE FROM analytics_outbox WHERE processed_at IS NOT NULL AND processed_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
