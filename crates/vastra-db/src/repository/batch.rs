//! # Batch Repository
//!
//! The batch store: one row per stock batch, at most one `active` row per
//! SKU fingerprint (enforced by a partial unique index).
//!
//! ## Conditional Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read batch (version = 7)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE batches SET                                                    │
//! │      total_quantity     = MAX(0, total_quantity + Δ),                  │
//! │      available_quantity = MAX(0, available_quantity + Δ),              │
//! │      version            = version + 1                                  │
//! │  WHERE id = ? AND version = 7 AND status = 'active'                    │
//! │  RETURNING ...                                                         │
//! │       │                                                                 │
//! │       ├── row returned ──► new counters, version 8                     │
//! │       └── no row       ──► DbError::Conflict (someone moved it first)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The arithmetic happens in SQL; application code never writes back a
//! counter it computed from an earlier read.

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{decode_bps, decode_photos, encode_photos};
use vastra_core::reconcile::select_authoritative;
use vastra_core::{Batch, BatchStatus, GstLogic, Money, SkuKey};

const SELECT_BATCH: &str = r#"
    SELECT
        id, design_no, product_group_id, color_id, size_id, vendor_id,
        status, total_quantity, available_quantity,
        cost_paise, mrp_paise, mrp_markup_bps, gst_logic, hsn_code,
        barcode_alias, barcode_structured, floor, photos, description,
        source_invoice_id, version, created_at, updated_at
    FROM batches
"#;

/// Raw `batches` row.
#[derive(Debug, FromRow)]
struct BatchRow {
    id: String,
    design_no: String,
    product_group_id: String,
    color_id: Option<String>,
    size_id: String,
    vendor_id: String,
    status: BatchStatus,
    total_quantity: i64,
    available_quantity: i64,
    cost_paise: i64,
    mrp_paise: i64,
    mrp_markup_bps: i64,
    gst_logic: GstLogic,
    hsn_code: Option<String>,
    barcode_alias: String,
    barcode_structured: String,
    floor: Option<String>,
    photos: String,
    description: Option<String>,
    source_invoice_id: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BatchRow {
    fn into_batch(self) -> DbResult<Batch> {
        Ok(Batch {
            sku_key: SkuKey::new(
                &self.design_no,
                self.product_group_id,
                self.color_id,
                self.size_id,
                self.vendor_id,
            ),
            id: self.id,
            status: self.status,
            total_quantity: self.total_quantity,
            available_quantity: self.available_quantity,
            cost_actual: Money::from_paise(self.cost_paise),
            mrp: Money::from_paise(self.mrp_paise),
            mrp_markup_bps: decode_bps("mrp_markup_bps", self.mrp_markup_bps)?,
            gst_logic: self.gst_logic,
            hsn_code: self.hsn_code,
            barcode_alias: self.barcode_alias,
            barcode_structured: self.barcode_structured,
            floor: self.floor,
            photos: decode_photos(&self.photos)?,
            description: self.description,
            source_invoice_id: self.source_invoice_id,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_batches(rows: Vec<BatchRow>) -> DbResult<Vec<Batch>> {
    rows.into_iter().map(BatchRow::into_batch).collect()
}

/// Repository for batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let row: Option<BatchRow> = sqlx::query_as(&format!("{SELECT_BATCH} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BatchRow::into_batch).transpose()
    }

    /// Gets a batch by its scanned alias.
    pub async fn get_by_alias(&self, alias: &str) -> DbResult<Option<Batch>> {
        let row: Option<BatchRow> =
            sqlx::query_as(&format!("{SELECT_BATCH} WHERE barcode_alias = ?1"))
                .bind(alias.trim())
                .fetch_optional(&self.pool)
                .await?;

        row.map(BatchRow::into_batch).transpose()
    }

    /// Batches minted by one invoice, in alias order.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<Batch>> {
        let rows: Vec<BatchRow> = sqlx::query_as(&format!(
            "{SELECT_BATCH} WHERE source_invoice_id = ?1 ORDER BY barcode_alias"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        into_batches(rows)
    }

    /// The active batch for a key, if any.
    pub async fn get_active_batch(&self, sku_key: &SkuKey) -> DbResult<Option<Batch>> {
        self.active_for_key(&self.pool, sku_key).await
    }

    /// Every active batch for a key, newest first.
    pub async fn find_active<'e, E>(&self, executor: E, sku_key: &SkuKey) -> DbResult<Vec<Batch>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<BatchRow> = sqlx::query_as(&format!(
            "{SELECT_BATCH} WHERE sku_fingerprint = ?1 AND status = 'active' ORDER BY created_at DESC"
        ))
        .bind(sku_key.fingerprint())
        .fetch_all(executor)
        .await?;

        into_batches(rows)
    }

    /// The authoritative active batch for a key.
    ///
    /// Several active rows should be impossible under the unique index; if
    /// they show up anyway the newest wins and a warning is logged.
    pub async fn active_for_key<'e, E>(&self, executor: E, sku_key: &SkuKey) -> DbResult<Option<Batch>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let batches = self.find_active(executor, sku_key).await?;
        if batches.len() > 1 {
            warn!(
                sku = %sku_key,
                count = batches.len(),
                "Multiple active batches for one SKU, using the newest"
            );
        }
        Ok(select_authoritative(batches))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new batch.
    ///
    /// ## Errors
    /// `UniqueViolation` if the key already has an active batch or the alias
    /// is taken.
    pub async fn insert<'e, E>(&self, executor: E, batch: &Batch) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(
            id = %batch.id,
            alias = %batch.barcode_alias,
            sku = %batch.sku_key,
            quantity = batch.total_quantity,
            "Inserting batch"
        );

        let photos = encode_photos(&batch.photos)?;
        let key = &batch.sku_key;

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, design_no, product_group_id, color_id, size_id, vendor_id,
                sku_fingerprint, status, total_quantity, available_quantity,
                cost_paise, mrp_paise, mrp_markup_bps, gst_logic, hsn_code,
                barcode_alias, barcode_structured, floor, photos, description,
                source_invoice_id, version, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24
            )
            "#,
        )
        .bind(&batch.id)
        .bind(&key.design_no)
        .bind(&key.product_group_id)
        .bind(&key.color_id)
        .bind(&key.size_id)
        .bind(&key.vendor_id)
        .bind(key.fingerprint())
        .bind(batch.status)
        .bind(batch.total_quantity)
        .bind(batch.available_quantity)
        .bind(batch.cost_actual.paise())
        .bind(batch.mrp.paise())
        .bind(i64::from(batch.mrp_markup_bps))
        .bind(batch.gst_logic)
        .bind(&batch.hsn_code)
        .bind(&batch.barcode_alias)
        .bind(&batch.barcode_structured)
        .bind(&batch.floor)
        .bind(photos)
        .bind(&batch.description)
        .bind(&batch.source_invoice_id)
        .bind(batch.version)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Applies a signed quantity delta if the batch is still at
    /// `expected_version` and active. Returns the updated batch.
    ///
    /// ## Errors
    /// `Conflict` when no row matched.
    pub async fn apply_delta<'e, E>(
        &self,
        executor: E,
        batch_id: &str,
        expected_version: i64,
        delta: i64,
    ) -> DbResult<Batch>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %batch_id, expected_version, delta, "Applying batch delta");

        let row: Option<BatchRow> = sqlx::query_as(
            r#"
            UPDATE batches SET
                total_quantity = MAX(0, total_quantity + ?1),
                available_quantity = MAX(0, available_quantity + ?1),
                version = version + 1,
                updated_at = ?2
            WHERE id = ?3 AND version = ?4 AND status = 'active'
            RETURNING
                id, design_no, product_group_id, color_id, size_id, vendor_id,
                status, total_quantity, available_quantity,
                cost_paise, mrp_paise, mrp_markup_bps, gst_logic, hsn_code,
                barcode_alias, barcode_structured, floor, photos, description,
                source_invoice_id, version, created_at, updated_at
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(batch_id)
        .bind(expected_version)
        .fetch_optional(executor)
        .await?;

        match row {
            Some(row) => row.into_batch(),
            None => Err(DbError::conflict("Batch", batch_id)),
        }
    }

    /// Marks a batch inactive. Reconciliation never touches it again.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating batch");

        let result = sqlx::query(
            r#"
            UPDATE batches SET
                status = 'inactive',
                version = version + 1,
                updated_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch (active)", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;
    use chrono::Duration;

    fn key(color: Option<&str>) -> SkuKey {
        SkuKey::new("D-101", "grp-kurta", color.map(str::to_string), "M", "vendor-1")
    }

    fn batch(id: &str, alias: &str, sku_key: SkuKey, quantity: i64) -> Batch {
        let now = Utc::now();
        Batch {
            id: id.to_string(),
            sku_key,
            status: BatchStatus::Active,
            total_quantity: quantity,
            available_quantity: quantity,
            cost_actual: Money::from_paise(45050),
            mrp: Money::from_rupees(999),
            mrp_markup_bps: 12_000,
            gst_logic: GstLogic::Auto5_18,
            hsn_code: Some("6211".to_string()),
            barcode_alias: alias.to_string(),
            barcode_structured: format!("KUR-D-101-SHR-450.50-{alias}"),
            floor: Some("F1".to_string()),
            photos: vec!["front.jpg".to_string()],
            description: None,
            source_invoice_id: "inv-1".to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = seeded_db().await;
        let repo = db.batches();
        let original = batch("b-1", "00000001", key(Some("red")), 5);

        repo.insert(db.pool(), &original).await.unwrap();

        let by_id = repo.get_by_id("b-1").await.unwrap().unwrap();
        assert_eq!(by_id.sku_key, original.sku_key);
        assert_eq!(by_id.cost_actual, Money::from_paise(45050));
        assert_eq!(by_id.gst_logic, GstLogic::Auto5_18);
        assert_eq!(by_id.photos, vec!["front.jpg".to_string()]);

        let by_alias = repo.get_by_alias("00000001").await.unwrap().unwrap();
        assert_eq!(by_alias.id, "b-1");

        let active = repo.get_active_batch(&key(Some("red"))).await.unwrap().unwrap();
        assert_eq!(active.id, "b-1");
        assert!(repo.get_active_batch(&key(None)).await.unwrap().is_none());

        assert_eq!(repo.list_for_invoice("inv-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_active_batch_per_key() {
        let db = seeded_db().await;
        let repo = db.batches();

        repo.insert(db.pool(), &batch("b-1", "00000001", key(None), 5)).await.unwrap();
        let err = repo
            .insert(db.pool(), &batch("b-2", "00000002", key(None), 3))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // After deactivation a new active batch is allowed
        repo.deactivate("b-1").await.unwrap();
        repo.insert(db.pool(), &batch("b-2", "00000002", key(None), 3)).await.unwrap();
        assert_eq!(repo.get_active_batch(&key(None)).await.unwrap().unwrap().id, "b-2");
    }

    #[tokio::test]
    async fn test_apply_delta_clamps_and_bumps_version() {
        let db = seeded_db().await;
        let repo = db.batches();
        let mut original = batch("b-1", "00000001", key(None), 5);
        original.available_quantity = 2;
        repo.insert(db.pool(), &original).await.unwrap();

        let grown = repo.apply_delta(db.pool(), "b-1", 0, 3).await.unwrap();
        assert_eq!(grown.total_quantity, 8);
        assert_eq!(grown.available_quantity, 5);
        assert_eq!(grown.version, 1);

        let drained = repo.apply_delta(db.pool(), "b-1", 1, -6).await.unwrap();
        assert_eq!(drained.total_quantity, 2);
        assert_eq!(drained.available_quantity, 0);
        assert!(drained.quantities_consistent());
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let db = seeded_db().await;
        let repo = db.batches();
        repo.insert(db.pool(), &batch("b-1", "00000001", key(None), 5)).await.unwrap();

        repo.apply_delta(db.pool(), "b-1", 0, 1).await.unwrap();
        let err = repo.apply_delta(db.pool(), "b-1", 0, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // Untouched by the rejected write
        assert_eq!(repo.get_by_id("b-1").await.unwrap().unwrap().total_quantity, 6);
    }

    #[tokio::test]
    async fn test_inactive_batch_is_never_adjusted() {
        let db = seeded_db().await;
        let repo = db.batches();
        repo.insert(db.pool(), &batch("b-1", "00000001", key(None), 5)).await.unwrap();
        repo.deactivate("b-1").await.unwrap();

        let err = repo.apply_delta(db.pool(), "b-1", 1, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(repo.deactivate("b-1").await.is_err());
    }

    #[tokio::test]
    async fn test_null_color_and_column_defaults() {
        let db = seeded_db().await;
        sqlx::query(
            r#"
            INSERT INTO batches (
                id, design_no, product_group_id, color_id, size_id, vendor_id,
                sku_fingerprint, cost_paise, mrp_paise, barcode_alias,
                barcode_structured, source_invoice_id, created_at, updated_at
            ) VALUES ('b-9', 'D-9', 'grp-kurta', NULL, 'L', 'vendor-1',
                      '3:D-9|9:grp-kurta|~|1:L|8:vendor-1', 100, 200, '00000009',
                      'KUR-D-9-SHR-1-00000009', 'inv-9', ?1, ?1)
            "#,
        )
        .bind(Utc::now() - Duration::days(1))
        .execute(db.pool())
        .await
        .unwrap();

        let batch = db.batches().get_by_alias("00000009").await.unwrap().unwrap();
        assert_eq!(batch.sku_key.color_id, None);
        assert!(batch.photos.is_empty());
        assert_eq!(batch.status, BatchStatus::Active);
    }
}
