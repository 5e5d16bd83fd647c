//! # Design Catalog
//!
//! Registration of vendor design numbers.

use tracing::info;

use vastra_core::validation::validate_required;
use vastra_core::MAX_DESIGN_NO_LEN;
use vastra_db::Database;

use crate::error::InvoiceResult;

/// Design registration.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    /// Registers `design_no` for a vendor and returns the registration id.
    ///
    /// ## Errors
    /// `Validation(Duplicate)` when the vendor already has this design
    /// number (compared after trimming).
    pub async fn register_design(&self, design_no: &str, vendor_id: &str) -> InvoiceResult<String> {
        validate_required("design_no", design_no, MAX_DESIGN_NO_LEN)?;
        validate_required("vendor_id", vendor_id, 64)?;

        let id = self.db.masters().register_design(design_no, vendor_id).await?;

        info!(design_no = %design_no.trim(), vendor_id = %vendor_id, "Design registered");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvoiceError;
    use crate::test_support::seeded_db;
    use vastra_core::ValidationError;

    #[tokio::test]
    async fn test_register_design_rejects_second_registration() {
        let db = seeded_db().await;
        let catalog = Catalog::new(db);

        catalog.register_design("D-101", "vendor-1").await.unwrap();
        // Same number at another vendor is fine.
        catalog.register_design("D-101", "vendor-2").await.unwrap();

        let err = catalog.register_design(" D-101 ", "vendor-1").await.unwrap_err();
        match err {
            InvoiceError::Validation(ValidationError::Duplicate { field, value }) => {
                assert_eq!(field, "design_no");
                assert_eq!(value, "D-101");
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_design_validates_input() {
        let db = seeded_db().await;
        let catalog = Catalog::new(db);

        let err = catalog.register_design("   ", "vendor-1").await.unwrap_err();
        assert_eq!(err.field(), Some("design_no"));

        let err = catalog.register_design("D-9", "no-such-vendor").await.unwrap_err();
        assert!(matches!(err, InvoiceError::Validation(_)));
    }
}
