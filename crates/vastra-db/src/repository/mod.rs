//! # Repository Module
//!
//! Database repository implementations for Vastra.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Kinds of Methods                                 │
//! │                                                                         │
//! │  Pool methods           db.batches().get_by_alias("00001234")          │
//! │  └── standalone reads and admin writes, use the repository's pool      │
//! │                                                                         │
//! │  Executor methods       db.batches().apply_delta(&mut *tx, ...)        │
//! │  └── take any `Executor<Database = Sqlite>` so the invoice save can    │
//! │      run them on its own transaction                                   │
//! │                                                                         │
//! │  InvoiceService::save                                                  │
//! │       │  BEGIN                                                          │
//! │       ├── invoices().insert_header(&mut *tx, ..)                        │
//! │       ├── batches().active_for_key(&mut *tx, ..)                        │
//! │       ├── sequences().next_value(&mut *tx, ..)                          │
//! │       ├── batches().insert / apply_delta(&mut *tx, ..)                  │
//! │       ├── invoices().replace_items(&mut tx, ..)                         │
//! │       │  COMMIT                                                         │
//! │       └── audit_log().record(..)   (pool, after commit)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BatchRepository`](batch::BatchRepository) - Batch store with CAS updates
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice headers and item rows
//! - [`SequenceRepository`](sequence::SequenceRepository) - Durable counters
//! - [`MasterDataRepository`](master::MasterDataRepository) - Groups, colors, sizes, vendors, designs
//! - [`AuditLogRepository`](audit::AuditLogRepository) - Best-effort audit trail

pub mod audit;
pub mod batch;
pub mod invoice;
pub mod master;
pub mod sequence;

/// Decodes a JSON string-list column.
pub(crate) fn decode_photos(raw: &str) -> crate::error::DbResult<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| crate::error::DbError::corrupt("photos", e))
}

/// Encodes a string list for a JSON text column.
pub(crate) fn encode_photos(photos: &[String]) -> crate::error::DbResult<String> {
    serde_json::to_string(photos).map_err(|e| crate::error::DbError::Internal(e.to_string()))
}

/// Narrows a stored basis-point value.
pub(crate) fn decode_bps(column: &str, raw: i64) -> crate::error::DbResult<u32> {
    u32::try_from(raw).map_err(|e| crate::error::DbError::corrupt(column, e))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for repository tests.

    use vastra_core::{Color, ProductGroup, Size, Vendor};

    use crate::pool::{Database, DbConfig};

    /// Fresh in-memory database with one group, two colors, two sizes and
    /// two vendors.
    pub async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
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

        db
    }
}
