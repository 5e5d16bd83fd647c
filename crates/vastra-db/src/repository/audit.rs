//! # Audit Log Repository
//!
//! Append-only record of what each invoice save did.
//!
//! ## Best-Effort Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────── SAVE TRANSACTION ─────────────────────┐          │
//! │  │  header, batch deltas, new batches, item rows             │          │
//! │  └──────────────────────────┬─────────────────────────────────┘          │
//! │                             │ COMMIT                                    │
//! │                             ▼                                           │
//! │  INSERT INTO audit_log (entity_type, entity_id, action, payload)       │
//! │       │                                                                 │
//! │       ├── ok     ──► done                                              │
//! │       └── failed ──► warn! and carry on; the save already stands       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// One audit log row. `payload` is JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    /// Creates a new AuditLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    /// Appends an entry.
    ///
    /// ## Arguments
    /// * `entity_type` - "INVOICE", "BATCH", ...
    /// * `entity_id` - The entity's id
    /// * `action` - "created", "updated", ...
    /// * `payload` - Anything serializable; stored as JSON
    pub async fn record<T: Serialize>(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: &str,
        payload: &T,
    ) -> DbResult<AuditEntry> {
        let payload =
            serde_json::to_string(payload).map_err(|e| DbError::Internal(e.to_string()))?;

        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action: action.to_string(),
            payload,
            created_at: Utc::now(),
        };

        debug!(
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            action = %entry.action,
            "Writing audit entry"
        );

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, entity_type, entity_id, action, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Entries for one entity, oldest first.
    pub async fn for_entity(&self, entity_type: &str, entity_id: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, entity_type, entity_id, action, payload, created_at
            FROM audit_log
            WHERE entity_type = ?1 AND entity_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
