//! # Invoice Service
//!
//! Saves purchase invoices and turns them into stock.
//!
//! ## Save Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(invoice)                                                          │
//! │    │                                                                    │
//! │    ├── validate_invoice, calculate_invoice_totals   (no I/O)           │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐  │
//! │  │ 1. insert / update header        ← takes the write lock first    │  │
//! │  │ 2. read previous item rows       → old quantity state            │  │
//! │  │ 3. new quantity state from the submitted items                   │  │
//! │  │ 4. active batch per changed key                                  │  │
//! │  │ 5. reconcile(old, new, active)   → BatchMutation list            │  │
//! │  │ 6. Adjust → conditional update (version must match)              │  │
//! │  │    Create → next alias, compose barcode, insert batch            │  │
//! │  │ 7. replace item rows                                             │  │
//! │  COMMIT ─────────────────────────────────────────────────────────────┘  │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  audit_log (best effort)                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error inside the transaction drops it, which rolls back every write
//! including drawn aliases. Concurrent saves queue on SQLite's write lock
//! (busy timeout), so each one reads the batch versions the previous one
//! committed.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vastra_core::barcode::{BarcodeEncoder, SkuAttributes, VendorLabel};
use vastra_core::reconcile::{compute_deltas, fold_quantities, quantity_state, reconcile, BatchMutation};
use vastra_core::tax::{calculate_invoice_totals, InvoiceTotals};
use vastra_core::validation::validate_invoice;
use vastra_core::{
    Batch, BatchStatus, InvoiceLineItem, PurchaseInvoice, SkuKey, ValidationError, Vendor,
    BARCODE_ALIAS_SEQUENCE,
};
use vastra_db::{Database, DbError, InvoiceRecord, StoredInvoice};

use crate::error::{InvoiceError, InvoiceResult};

/// Outcome of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SavedInvoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub totals: InvoiceTotals,
    /// Batches minted for keys that had no active batch.
    pub created: Vec<Batch>,
    /// Existing batches after their delta was applied.
    pub adjusted: Vec<Batch>,
}

/// Invoice save and load.
#[derive(Debug, Clone)]
pub struct InvoiceService {
    db: Database,
    encoder: BarcodeEncoder,
}

impl InvoiceService {
    /// Creates a service over `db` using `encoder` for new batches.
    pub fn new(db: Database, encoder: BarcodeEncoder) -> Self {
        InvoiceService { db, encoder }
    }

    /// Validates an invoice and computes its totals without saving.
    pub fn preview(&self, invoice: &PurchaseInvoice) -> InvoiceResult<InvoiceTotals> {
        validate_invoice(invoice)?;
        Ok(calculate_invoice_totals(&invoice.items, &invoice.adjustments)?)
    }

    /// Saves a new invoice (`id == None`) or replaces an existing one.
    ///
    /// ## Errors
    /// - `Validation` for bad input, a duplicate invoice number, or an
    ///   unknown master reference
    /// - `Conflict` when a reduction has no active batch or a batch moved
    /// - `Persistence` for storage failures, including editing an invoice
    ///   that doesn't exist
    pub async fn save(&self, invoice: PurchaseInvoice) -> InvoiceResult<SavedInvoice> {
        let totals = self.preview(&invoice)?;

        let is_edit = invoice.id.is_some();
        let invoice_id = invoice
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = header_record(&invoice_id, &invoice, &totals);

        debug!(
            invoice_id = %invoice_id,
            number = %invoice.invoice_number,
            is_edit,
            "Saving purchase invoice"
        );

        let invoices = self.db.invoices();
        let batches = self.db.batches();

        let mut tx = self.db.begin().await?;

        // Header first: the write lock is held before anything is read.
        let header_written = if is_edit {
            invoices.update_header(&mut *tx, &record).await
        } else {
            invoices.insert_header(&mut *tx, &record).await
        };
        header_written.map_err(|e| header_error(e, &invoice.invoice_number))?;

        let old_rows = if is_edit {
            invoices.item_rows(&mut *tx, &invoice_id).await?
        } else {
            Vec::new()
        };
        let old = fold_quantities(old_rows.iter().map(|row| (row.sku_key(), row.quantity)));
        let new = quantity_state(&invoice.vendor_id, &invoice.items);

        let mut active = HashMap::new();
        for delta in compute_deltas(&old, &new) {
            if let Some(batch) = batches.active_for_key(&mut *tx, &delta.sku_key).await? {
                active.insert(delta.sku_key, batch);
            }
        }

        let mutations = reconcile(&old, &new, &active)?;
        let lines = lines_by_key(&invoice);

        let vendor = self.lookup_vendor(&mut tx, &invoice.vendor_id).await?;
        let mut created = Vec::new();
        let mut adjusted = Vec::new();

        for mutation in mutations {
            match mutation {
                BatchMutation::Adjust {
                    batch_id,
                    expected_version,
                    delta,
                    ..
                } => {
                    let batch = batches
                        .apply_delta(&mut *tx, &batch_id, expected_version, delta)
                        .await?;
                    adjusted.push(batch);
                }
                BatchMutation::Create { sku_key, quantity } => {
                    let line = lines.get(&sku_key).copied().ok_or_else(|| {
                        InvoiceError::Persistence(DbError::Internal(format!(
                            "no line item for new batch {}",
                            sku_key
                        )))
                    })?;
                    let batch = self
                        .mint_batch(&mut tx, &invoice_id, sku_key, quantity, line, &vendor)
                        .await?;
                    batches.insert(&mut *tx, &batch).await?;
                    created.push(batch);
                }
            }
        }

        invoices
            .replace_items(&mut tx, &invoice_id, &invoice.vendor_id, &invoice.items)
            .await?;

        tx.commit().await?;

        info!(
            invoice_id = %invoice_id,
            number = %invoice.invoice_number,
            created = created.len(),
            adjusted = adjusted.len(),
            grand_total = %totals.grand_total,
            "Purchase invoice saved"
        );

        let saved = SavedInvoice {
            invoice_id,
            invoice_number: invoice.invoice_number,
            totals,
            created,
            adjusted,
        };
        self.record_audit(&saved, is_edit).await;

        Ok(saved)
    }

    /// Loads an invoice header and its line items.
    pub async fn load(&self, invoice_id: &str) -> InvoiceResult<Option<StoredInvoice>> {
        Ok(self.db.invoices().get(invoice_id).await?)
    }

    // =========================================================================
    // Batch Minting
    // =========================================================================

    async fn lookup_vendor(&self, conn: &mut SqliteConnection, vendor_id: &str) -> InvoiceResult<Vendor> {
        self.db
            .masters()
            .vendor(&mut *conn, vendor_id)
            .await?
            .ok_or_else(|| unknown_reference("vendor_id", vendor_id))
    }

    /// Builds a new active batch for `sku_key`, drawing its alias from the
    /// durable sequence on `conn`.
    async fn mint_batch(
        &self,
        conn: &mut SqliteConnection,
        invoice_id: &str,
        sku_key: SkuKey,
        quantity: i64,
        line: &InvoiceLineItem,
        vendor: &Vendor,
    ) -> InvoiceResult<Batch> {
        let masters = self.db.masters();

        let group = masters
            .product_group(&mut *conn, &sku_key.product_group_id)
            .await?
            .ok_or_else(|| unknown_reference("product_group_id", &sku_key.product_group_id))?;

        let color_code = match &sku_key.color_id {
            Some(color_id) => Some(
                masters
                    .color(&mut *conn, color_id)
                    .await?
                    .ok_or_else(|| unknown_reference("color_id", color_id))?
                    .color_code,
            ),
            None => None,
        };

        let alias_number = self
            .db
            .sequences()
            .next_value(&mut *conn, BARCODE_ALIAS_SEQUENCE)
            .await?;

        let minted = self.encoder.compose(
            alias_number,
            &SkuAttributes {
                design_no: sku_key.design_no.clone(),
                group_code: Some(group.group_code),
                color_code,
            },
            &VendorLabel {
                vendor_code: Some(vendor.vendor_code.clone()),
                name: vendor.name.clone(),
            },
            line.cost_per_item,
        )?;

        debug!(sku = %sku_key, alias = %minted.alias, quantity, "Minting batch");

        let now = Utc::now();
        Ok(Batch {
            id: Uuid::new_v4().to_string(),
            sku_key,
            status: BatchStatus::Active,
            total_quantity: quantity,
            available_quantity: quantity,
            cost_actual: line.cost_per_item,
            mrp: line.mrp,
            mrp_markup_bps: line.mrp_markup_bps,
            gst_logic: line.gst_logic,
            hsn_code: line.hsn_code.clone().or(group.hsn_code),
            barcode_alias: minted.alias,
            barcode_structured: minted.structured,
            floor: group.floor_id,
            photos: line.photos.clone(),
            description: line.description.clone(),
            source_invoice_id: invoice_id.to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn record_audit(&self, saved: &SavedInvoice, is_edit: bool) {
        let action = if is_edit { "updated" } else { "created" };
        let payload = json!({
            "invoice_number": saved.invoice_number,
            "grand_total_paise": saved.totals.grand_total.paise(),
            "batches_created": saved.created.iter().map(|b| &b.barcode_alias).collect::<Vec<_>>(),
            "batches_adjusted": saved.adjusted.iter().map(|b| &b.id).collect::<Vec<_>>(),
        });

        if let Err(e) = self
            .db
            .audit_log()
            .record("INVOICE", &saved.invoice_id, action, &payload)
            .await
        {
            warn!(invoice_id = %saved.invoice_id, error = %e, "Failed to write audit entry");
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn header_record(invoice_id: &str, invoice: &PurchaseInvoice, totals: &InvoiceTotals) -> InvoiceRecord {
    let now = Utc::now();
    InvoiceRecord {
        id: invoice_id.to_string(),
        invoice_number: invoice.invoice_number.trim().to_string(),
        vendor_id: invoice.vendor_id.clone(),
        invoice_date: invoice.invoice_date,
        discount_paise: totals.discount.paise(),
        freight_paise: totals.freight.paise(),
        freight_rate_bps: i64::from(totals.freight_rate.bps()),
        raw_total_paise: totals.raw_items_total.paise(),
        taxable_paise: totals.taxable_total.paise(),
        gst_paise: totals.total_gst.paise(),
        round_off_paise: totals.round_off.paise(),
        grand_total_paise: totals.grand_total.paise(),
        created_at: now,
        updated_at: now,
    }
}

/// The line item each submitted SKU key came from.
fn lines_by_key(invoice: &PurchaseInvoice) -> HashMap<SkuKey, &InvoiceLineItem> {
    invoice
        .items
        .iter()
        .flat_map(|item| {
            item.sku_quantities(&invoice.vendor_id)
                .map(move |(key, _)| (key, item))
        })
        .collect()
}

fn header_error(err: DbError, invoice_number: &str) -> InvoiceError {
    if err.is_unique_on("invoice_number") {
        InvoiceError::Validation(ValidationError::Duplicate {
            field: "invoice_number".to_string(),
            value: invoice_number.trim().to_string(),
        })
    } else {
        err.into()
    }
}

fn unknown_reference(field: &str, id: &str) -> InvoiceError {
    InvoiceError::Validation(ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("unknown id '{}'", id),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
