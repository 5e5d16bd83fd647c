//! # Sequence Repository
//!
//! Durable named counters. The barcode alias sequence lives here.
//!
//! ```text
//! UPDATE sequences SET value = value + 1 WHERE name = ? RETURNING value
//! ```
//!
//! One statement reads and bumps the counter, so two callers can never see
//! the same value. Drawn inside an invoice transaction, a value rolled back
//! with the transaction is never visible to anyone and may be issued again.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for durable counters.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Increments the named counter and returns the new value.
    ///
    /// ## Errors
    /// `NotFound` if the counter row doesn't exist.
    pub async fn next_value<'e, E>(&self, executor: E, name: &str) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let value: Option<i64> = sqlx::query_scalar(
            "UPDATE sequences SET value = value + 1 WHERE name = ?1 RETURNING value",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        let value = value.ok_or_else(|| DbError::not_found("Sequence", name))?;
        debug!(sequence = %name, value, "Sequence advanced");
        Ok(value)
    }

    /// Last value issued by the named counter.
    pub async fn current(&self, name: &str) -> DbResult<i64> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        value.ok_or_else(|| DbError::not_found("Sequence", name))
    }

    /// Creates the named counter at `start` if it doesn't exist yet.
    pub async fn ensure(&self, name: &str, start: i64) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO sequences (name, value) VALUES (?1, ?2)")
            .bind(name)
            .bind(start)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use vastra_core::BARCODE_ALIAS_SEQUENCE;

    #[tokio::test]
    async fn test_alias_sequence_is_seeded_and_advances() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seq = db.sequences();

        assert_eq!(seq.current(BARCODE_ALIAS_SEQUENCE).await.unwrap(), 0);
        assert_eq!(seq.next_value(db.pool(), BARCODE_ALIAS_SEQUENCE).await.unwrap(), 1);
        assert_eq!(seq.next_value(db.pool(), BARCODE_ALIAS_SEQUENCE).await.unwrap(), 2);
        assert_eq!(seq.current(BARCODE_ALIAS_SEQUENCE).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rolled_back_draw_is_not_kept() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seq = db.sequences();

        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(seq.next_value(&mut *tx, BARCODE_ALIAS_SEQUENCE).await.unwrap(), 1);
            tx.rollback().await.unwrap();
        }

        assert_eq!(seq.current(BARCODE_ALIAS_SEQUENCE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_sequence() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seq = db.sequences();

        assert!(seq.next_value(db.pool(), "nope").await.is_err());
        seq.ensure("nope", 100).await.unwrap();
        seq.ensure("nope", 5).await.unwrap();
        assert_eq!(seq.next_value(db.pool(), "nope").await.unwrap(), 101);
    }
}
