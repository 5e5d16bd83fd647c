//! # vastra-engine: Invoice Save Orchestration
//!
//! Turns purchase invoices into stock: validation, tax, reconciliation and
//! batch minting inside one database transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller (back-office UI, seed binary)                                  │
//! │       │  PurchaseInvoice                                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  vastra-engine (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   EngineConfig ──► Database + BarcodeEncoder                    │   │
//! │  │                                                                 │   │
//! │  │   InvoiceService::save ──► SavedInvoice { totals, batches }     │   │
//! │  │   Catalog::register_design                                      │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                       │
//! │                 ▼                              ▼                       │
//! │  ┌──────────────────────────┐    ┌──────────────────────────┐          │
//! │  │       vastra-core        │    │        vastra-db         │          │
//! │  │ reconcile, tax, barcode  │    │ batches, invoices, seqs  │          │
//! │  └──────────────────────────┘    └──────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vastra_engine::{EngineConfig, InvoiceService};
//! use vastra_db::Database;
//!
//! let config = EngineConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//! let service = InvoiceService::new(db, config.encoder());
//!
//! let saved = service.save(invoice).await?;
//! println!("grand total {}", saved.totals.grand_total);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod invoice;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use error::{ConfigError, ConfigResult, InvoiceError, InvoiceResult};
pub use invoice::{InvoiceService, SavedInvoice};

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by engine tests.

    use chrono::NaiveDate;
    use vastra_core::{
        Color, GstLogic, InvoiceAdjustments, InvoiceLineItem, Money, ProductGroup,
        PurchaseInvoice, Size, SizeQuantity, Vendor,
    };
    use vastra_db::{Database, DbConfig};

    /// One group (KUR), colors red/blue, sizes M/L, and two vendors. The
    /// second vendor's name carries the cipher marker.
    pub async fn seed_masters(db: &Database) {
        let masters = db.masters();

        masters
            .insert_product_group(&ProductGroup {
                id: "grp-kurta".to_string(),
                name: "Kurta".to_string(),
                group_code: "KUR".to_string(),
                hsn_code: Some("6211".to_string()),
                floor_id: Some("F1".to_string()),
            })
            .await
            .unwrap();
        for (id, code) in [("red", "RED"), ("blue", "BLU")] {
            masters
                .insert_color(&Color {
                    id: id.to_string(),
                    name: id.to_string(),
                    color_code: code.to_string(),
                })
                .await
                .unwrap();
        }
        for size in ["M", "L"] {
            masters
                .insert_size(&Size {
                    id: size.to_string(),
                    size_code: size.to_string(),
                })
                .await
                .unwrap();
        }
        for (id, name, code) in [
            ("vendor-1", "Sharma Textiles", "SHR"),
            ("vendor-2", "Cipher Fabrics", "CPF"),
        ] {
            masters
                .insert_vendor(&Vendor {
                    id: id.to_string(),
                    name: name.to_string(),
                    vendor_code: code.to_string(),
                })
                .await
                .unwrap();
        }
    }

    /// Fresh in-memory database with master data.
    pub async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_masters(&db).await;
        db
    }

    /// Design D-101 kurta at ₹450 cost, ₹999 MRP.
    pub fn line(order: i64, color: Option<&str>, sizes: &[(&str, i64)]) -> InvoiceLineItem {
        InvoiceLineItem {
            order_number: order,
            design_no: "D-101".to_string(),
            product_group_id: "grp-kurta".to_string(),
            color_id: color.map(str::to_string),
            sizes: sizes
                .iter()
                .map(|(size, qty)| SizeQuantity {
                    size_id: size.to_string(),
                    quantity: *qty,
                })
                .collect(),
            cost_per_item: Money::from_rupees(450),
            mrp_markup_bps: 12_000,
            mrp: Money::from_rupees(999),
            gst_logic: GstLogic::Auto5_18,
            hsn_code: None,
            description: Some("Cotton kurta".to_string()),
            photos: vec![],
        }
    }

    pub fn invoice(number: &str, vendor_id: &str, items: Vec<InvoiceLineItem>) -> PurchaseInvoice {
        PurchaseInvoice {
            id: None,
            invoice_number: number.to_string(),
            vendor_id: vendor_id.to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            items,
            adjustments: InvoiceAdjustments::default(),
        }
    }
}
