//! # Invoice Repository
//!
//! Purchase invoice headers and their flattened item rows.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InvoiceLineItem { design D-101, red, sizes: [M×3, L×2] }               │
//! │       │  flatten                                                        │
//! │       ▼                                                                 │
//! │  invoice_items                                                         │
//! │  ├── (order 1, D-101, red, M, 3, vendor-1, cost, mrp, ...)            │
//! │  └── (order 1, D-101, red, L, 2, vendor-1, cost, mrp, ...)            │
//! │       │  group by order_number                                         │
//! │       ▼                                                                 │
//! │  InvoiceLineItem { design D-101, red, sizes: [M×3, L×2] }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Editing replaces every row of the invoice. The previous rows are read
//! first, inside the same transaction, to rebuild the old quantity state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{decode_bps, decode_photos, encode_photos};
use vastra_core::{GstLogic, InvoiceLineItem, Money, SizeQuantity, SkuKey};

// =============================================================================
// Records
// =============================================================================

/// An `invoices` row: header fields plus the totals computed at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct InvoiceRecord {
    pub id: String,
    pub invoice_number: String,
    pub vendor_id: String,
    pub invoice_date: NaiveDate,
    pub discount_paise: i64,
    pub freight_paise: i64,
    pub freight_rate_bps: i64,
    pub raw_total_paise: i64,
    pub taxable_paise: i64,
    pub gst_paise: i64,
    pub round_off_paise: i64,
    pub grand_total_paise: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An `invoice_items` row: one size of one line.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceItemRecord {
    pub id: String,
    pub invoice_id: String,
    pub vendor_id: String,
    pub order_number: i64,
    pub design_no: String,
    pub product_group_id: String,
    pub color_id: Option<String>,
    pub size_id: String,
    pub quantity: i64,
    pub cost_paise: i64,
    pub mrp_paise: i64,
    pub mrp_markup_bps: i64,
    pub gst_logic: GstLogic,
    pub hsn_code: Option<String>,
    pub description: Option<String>,
    pub photos: String,
    pub created_at: DateTime<Utc>,
}

impl InvoiceItemRecord {
    /// SKU key this row contributed to, under the vendor it was saved with.
    pub fn sku_key(&self) -> SkuKey {
        SkuKey::new(
            &self.design_no,
            self.product_group_id.clone(),
            self.color_id.clone(),
            self.size_id.clone(),
            self.vendor_id.clone(),
        )
    }
}

/// Header plus regrouped line items.
#[derive(Debug, Clone)]
pub struct StoredInvoice {
    pub record: InvoiceRecord,
    pub items: Vec<InvoiceLineItem>,
}

/// Regroups flattened rows into line items by `order_number`.
///
/// Rows must arrive ordered by `order_number`; sizes keep their row order.
pub fn group_items(rows: Vec<InvoiceItemRecord>) -> DbResult<Vec<InvoiceLineItem>> {
    let mut items: Vec<InvoiceLineItem> = Vec::new();

    for row in rows {
        let size = SizeQuantity {
            size_id: row.size_id.clone(),
            quantity: row.quantity,
        };
        match items.last_mut() {
            Some(last) if last.order_number == row.order_number => last.sizes.push(size),
            _ => items.push(InvoiceLineItem {
                order_number: row.order_number,
                design_no: row.design_no,
                product_group_id: row.product_group_id,
                color_id: vastra_core::normalize_color_id(row.color_id),
                sizes: vec![size],
                cost_per_item: Money::from_paise(row.cost_paise),
                mrp_markup_bps: decode_bps("mrp_markup_bps", row.mrp_markup_bps)?,
                mrp: Money::from_paise(row.mrp_paise),
                gst_logic: row.gst_logic,
                hsn_code: row.hsn_code,
                description: row.description,
                photos: decode_photos(&row.photos)?,
            }),
        }
    }

    Ok(items)
}

const SELECT_HEADER: &str = r#"
    SELECT
        id, invoice_number, vendor_id, invoice_date,
        discount_paise, freight_paise, freight_rate_bps,
        raw_total_paise, taxable_paise, gst_paise, round_off_paise, grand_total_paise,
        created_at, updated_at
    FROM invoices
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchase invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts a new header.
    ///
    /// ## Errors
    /// `UniqueViolation` on `invoice_number` when the vendor already has an
    /// invoice with that number.
    pub async fn insert_header<'e, E>(&self, executor: E, record: &InvoiceRecord) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %record.id, number = %record.invoice_number, "Inserting invoice header");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, vendor_id, invoice_date,
                discount_paise, freight_paise, freight_rate_bps,
                raw_total_paise, taxable_paise, gst_paise, round_off_paise, grand_total_paise,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                ?13, ?14
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.invoice_number)
        .bind(&record.vendor_id)
        .bind(record.invoice_date)
        .bind(record.discount_paise)
        .bind(record.freight_paise)
        .bind(record.freight_rate_bps)
        .bind(record.raw_total_paise)
        .bind(record.taxable_paise)
        .bind(record.gst_paise)
        .bind(record.round_off_paise)
        .bind(record.grand_total_paise)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Overwrites an existing header. `created_at` is left alone.
    ///
    /// ## Errors
    /// `NotFound` when no invoice has `record.id`.
    pub async fn update_header<'e, E>(&self, executor: E, record: &InvoiceRecord) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %record.id, number = %record.invoice_number, "Updating invoice header");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                invoice_number = ?2,
                vendor_id = ?3,
                invoice_date = ?4,
                discount_paise = ?5,
                freight_paise = ?6,
                freight_rate_bps = ?7,
                raw_total_paise = ?8,
                taxable_paise = ?9,
                gst_paise = ?10,
                round_off_paise = ?11,
                grand_total_paise = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&record.id)
        .bind(&record.invoice_number)
        .bind(&record.vendor_id)
        .bind(record.invoice_date)
        .bind(record.discount_paise)
        .bind(record.freight_paise)
        .bind(record.freight_rate_bps)
        .bind(record.raw_total_paise)
        .bind(record.taxable_paise)
        .bind(record.gst_paise)
        .bind(record.round_off_paise)
        .bind(record.grand_total_paise)
        .bind(record.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", &record.id));
        }

        Ok(())
    }

    /// Reads a header.
    pub async fn get_header<'e, E>(&self, executor: E, id: &str) -> DbResult<Option<InvoiceRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, InvoiceRecord>(&format!("{SELECT_HEADER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Flattened item rows of an invoice, in line then size order.
    pub async fn item_rows<'e, E>(&self, executor: E, invoice_id: &str) -> DbResult<Vec<InvoiceItemRecord>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, InvoiceItemRecord>(
            r#"
            SELECT
                id, invoice_id, vendor_id, order_number, design_no, product_group_id,
                color_id, size_id, quantity, cost_paise, mrp_paise, mrp_markup_bps,
                gst_logic, hsn_code, description, photos, created_at
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY order_number, rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Deletes the invoice's rows and writes one row per size of `items`.
    ///
    /// Runs several statements, so it needs a connection (normally the
    /// save transaction) rather than a one-shot executor.
    pub async fn replace_items(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
        vendor_id: &str,
        items: &[InvoiceLineItem],
    ) -> DbResult<usize> {
        let removed = sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(invoice_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        let now = Utc::now();
        let mut written = 0;

        for item in items {
            let photos = encode_photos(&item.photos)?;
            let color_id = vastra_core::normalize_color_id(item.color_id.clone());

            for size in &item.sizes {
                sqlx::query(
                    r#"
                    INSERT INTO invoice_items (
                        id, invoice_id, vendor_id, order_number, design_no, product_group_id,
                        color_id, size_id, quantity, cost_paise, mrp_paise, mrp_markup_bps,
                        gst_logic, hsn_code, description, photos, created_at
                    ) VALUES (
                        ?1, ?2, ?3, ?4, ?5, ?6,
                        ?7, ?8, ?9, ?10, ?11, ?12,
                        ?13, ?14, ?15, ?16, ?17
                    )
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(invoice_id)
                .bind(vendor_id)
                .bind(item.order_number)
                .bind(item.design_no.trim())
                .bind(&item.product_group_id)
                .bind(&color_id)
                .bind(&size.size_id)
                .bind(size.quantity)
                .bind(item.cost_per_item.paise())
                .bind(item.mrp.paise())
                .bind(i64::from(item.mrp_markup_bps))
                .bind(item.gst_logic)
                .bind(&item.hsn_code)
                .bind(&item.description)
                .bind(&photos)
                .bind(now)
                .execute(&mut *conn)
                .await?;

                written += 1;
            }
        }

        debug!(invoice_id = %invoice_id, removed, written, "Replaced invoice items");
        Ok(written)
    }

    /// Loads a header and its regrouped line items.
    pub async fn get(&self, id: &str) -> DbResult<Option<StoredInvoice>> {
        let Some(record) = self.get_header(&self.pool, id).await? else {
            return Ok(None);
        };
        let rows = self.item_rows(&self.pool, id).await?;

        Ok(Some(StoredInvoice {
            record,
            items: group_items(rows)?,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded_db;

    fn record(id: &str, number: &str) -> InvoiceRecord {
        let now = Utc::now();
        InvoiceRecord {
            id: id.to_string(),
            invoice_number: number.to_string(),
            vendor_id: "vendor-1".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            discount_paise: 0,
            freight_paise: 0,
            freight_rate_bps: 500,
            raw_total_paise: 0,
            taxable_paise: 0,
            gst_paise: 0,
            round_off_paise: 0,
            grand_total_paise: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(order: i64, color: Option<&str>, sizes: &[(&str, i64)]) -> InvoiceLineItem {
        InvoiceLineItem {
            order_number: order,
            design_no: "D-101".to_string(),
            product_group_id: "grp-kurta".to_string(),
            color_id: color.map(str::to_string),
            sizes: sizes
                .iter()
                .map(|(s, q)| SizeQuantity { size_id: s.to_string(), quantity: *q })
                .collect(),
            cost_per_item: Money::from_rupees(450),
            mrp_markup_bps: 12_000,
            mrp: Money::from_rupees(999),
            gst_logic: GstLogic::Flat5,
            hsn_code: Some("6211".to_string()),
            description: Some("Cotton kurta".to_string()),
            photos: vec!["a.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_items_round_trip_through_rows() {
        let db = seeded_db().await;
        let repo = db.invoices();
        repo.insert_header(db.pool(), &record("inv-1", "A-1")).await.unwrap();

        let items = vec![
            line(1, Some("red"), &[("M", 3), ("L", 2)]),
            line(2, Some(""), &[("M", 1)]),
        ];
        let mut conn = db.pool().acquire().await.unwrap();
        let written = repo.replace_items(&mut conn, "inv-1", "vendor-1", &items).await.unwrap();
        drop(conn);
        assert_eq!(written, 3);

        let stored = repo.get("inv-1").await.unwrap().unwrap();
        assert_eq!(stored.record.invoice_number, "A-1");
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.items[0].sizes.len(), 2);
        assert_eq!(stored.items[0].sizes[1].size_id, "L");
        assert_eq!(stored.items[1].color_id, None);
        assert_eq!(stored.items[0].photos, vec!["a.jpg".to_string()]);
        assert_eq!(stored.items[0].gst_logic, GstLogic::Flat5);
    }

    #[tokio::test]
    async fn test_replace_drops_previous_rows() {
        let db = seeded_db().await;
        let repo = db.invoices();
        repo.insert_header(db.pool(), &record("inv-1", "A-1")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        repo.replace_items(&mut conn, "inv-1", "vendor-1", &[line(1, None, &[("M", 5)])])
            .await
            .unwrap();
        repo.replace_items(&mut conn, "inv-1", "vendor-1", &[line(1, None, &[("L", 2)])])
            .await
            .unwrap();

        let rows = repo.item_rows(&mut *conn, "inv-1").await.unwrap();
        drop(conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].size_id, "L");
        assert_eq!(rows[0].sku_key(), SkuKey::new("D-101", "grp-kurta", None, "L", "vendor-1"));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_per_vendor() {
        let db = seeded_db().await;
        let repo = db.invoices();
        repo.insert_header(db.pool(), &record("inv-1", "A-1")).await.unwrap();

        let err = repo.insert_header(db.pool(), &record("inv-2", "A-1")).await.unwrap_err();
        assert!(err.is_unique_on("invoice_number"));
    }

    #[tokio::test]
    async fn test_update_missing_header() {
        let db = seeded_db().await;
        let err = db
            .invoices()
            .update_header(db.pool(), &record("nope", "A-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.invoices().get("nope").await.unwrap().is_none());
    }
}
