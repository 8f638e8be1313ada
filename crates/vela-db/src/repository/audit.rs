//! # Audit Log Repository
//!
//! Append-only structured audit trail. The engine records events
//! fire-and-forget after a sale commits; querying and filtering the log is
//! the administration surface's job, so only a minimal recent-entries read
//! exists here.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use vela_core::{AuditEntry, AuditEvent};

const AUDIT_COLUMNS: &str = "id, action, actor_id, entity_type, entity_id, \
     before_json, after_json, severity, created_at";

/// Repository for audit log appends.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    /// Creates a new AuditLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Appends an event to the audit log.
    pub async fn record(&self, event: AuditEvent) -> DbResult<AuditEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(action = %event.action, entity_id = %event.entity_id, "Recording audit event");

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, action, actor_id, entity_type, entity_id,
                before_json, after_json, severity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&event.action)
        .bind(&event.actor_id)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.before)
        .bind(&event.after)
        .bind(event.severity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(AuditEntry {
            id,
            action: event.action,
            actor_id: event.actor_id,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            before: event.before,
            after: event.after,
            severity: event.severity,
            created_at: now,
        })
    }

    /// The most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let query =
            format!("SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY created_at DESC LIMIT ?1");
        let entries = sqlx::query_as::<_, AuditEntry>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries for one entity, newest first.
    pub async fn for_entity(&self, entity_type: &str, entity_id: &str) -> DbResult<Vec<AuditEntry>> {
        let query = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log \
             WHERE entity_type = ?1 AND entity_id = ?2 \
             ORDER BY created_at DESC"
        );
        let entries = sqlx::query_as::<_, AuditEntry>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}
