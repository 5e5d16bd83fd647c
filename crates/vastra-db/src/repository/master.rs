//! # Master Data Repository
//!
//! Read-only lookups of product groups, colors, sizes and vendors used when
//! minting batches, plus the few inserts needed to seed them and the design
//! registry.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vastra_core::{Color, ProductGroup, Size, Vendor};

/// Repository for master data.
#[derive(Debug, Clone)]
pub struct MasterDataRepository {
    pool: SqlitePool,
}

impl MasterDataRepository {
    /// Creates a new MasterDataRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MasterDataRepository { pool }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Product group by id.
    pub async fn product_group<'e, E>(&self, executor: E, id: &str) -> DbResult<Option<ProductGroup>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let group = sqlx::query_as::<_, ProductGroup>(
            "SELECT id, name, group_code, hsn_code, floor_id FROM product_groups WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(group)
    }

    /// Color by id.
    pub async fn color<'e, E>(&self, executor: E, id: &str) -> DbResult<Option<Color>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let color = sqlx::query_as::<_, Color>(
            "SELECT id, name, color_code FROM colors WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(color)
    }

    /// Size by id.
    pub async fn size<'e, E>(&self, executor: E, id: &str) -> DbResult<Option<Size>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let size = sqlx::query_as::<_, Size>("SELECT id, size_code FROM sizes WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(size)
    }

    /// Vendor by id.
    pub async fn vendor<'e, E>(&self, executor: E, id: &str) -> DbResult<Option<Vendor>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let vendor = sqlx::query_as::<_, Vendor>(
            "SELECT id, name, vendor_code FROM vendors WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(vendor)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Inserts a product group.
    pub async fn insert_product_group(&self, group: &ProductGroup) -> DbResult<()> {
        debug!(id = %group.id, code = %group.group_code, "Inserting product group");

        sqlx::query(
            r#"
            INSERT INTO product_groups (id, name, group_code, hsn_code, floor_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.group_code)
        .bind(&group.hsn_code)
        .bind(&group.floor_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a color.
    pub async fn insert_color(&self, color: &Color) -> DbResult<()> {
        sqlx::query("INSERT INTO colors (id, name, color_code) VALUES (?1, ?2, ?3)")
            .bind(&color.id)
            .bind(&color.name)
            .bind(&color.color_code)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a size.
    pub async fn insert_size(&self, size: &Size) -> DbResult<()> {
        sqlx::query("INSERT INTO sizes (id, size_code) VALUES (?1, ?2)")
            .bind(&size.id)
            .bind(&size.size_code)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a vendor.
    pub async fn insert_vendor(&self, vendor: &Vendor) -> DbResult<()> {
        debug!(id = %vendor.id, code = %vendor.vendor_code, "Inserting vendor");

        sqlx::query("INSERT INTO vendors (id, name, vendor_code) VALUES (?1, ?2, ?3)")
            .bind(&vendor.id)
            .bind(&vendor.name)
            .bind(&vendor.vendor_code)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Design Registry
    // =========================================================================

    /// Registers a design number for a vendor and returns the new row id.
    ///
    /// ## Errors
    /// `UniqueViolation { field: "design_no", .. }` when the pair is already
    /// registered.
    pub async fn register_design(&self, design_no: &str, vendor_id: &str) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let design_no = design_no.trim();

        debug!(design_no = %design_no, vendor_id = %vendor_id, "Registering design");

        let result = sqlx::query(
            "INSERT INTO designs (id, design_no, vendor_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&id)
        .bind(design_no)
        .bind(vendor_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(id),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("design_no", design_no)),
                other => Err(other),
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::repository::test_support::seeded_db;

    #[tokio::test]
    async fn test_lookups() {
        let db = seeded_db().await;
        let masters = db.masters();

        let group = masters.product_group(db.pool(), "grp-kurta").await.unwrap().unwrap();
        assert_eq!(group.group_code, "KUR");
        assert_eq!(group.hsn_code.as_deref(), Some("6211"));

        let vendor = masters.vendor(db.pool(), "vendor-2").await.unwrap().unwrap();
        assert_eq!(vendor.vendor_code, "CPF");

        assert_eq!(masters.color(db.pool(), "blue").await.unwrap().unwrap().color_code, "BLU");
        assert!(masters.size(db.pool(), "XXL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_design_registered_once_per_vendor() {
        let db = seeded_db().await;
        let masters = db.masters();

        masters.register_design("D-101", "vendor-1").await.unwrap();
        // Same design for another vendor is fine
        masters.register_design("D-101", "vendor-2").await.unwrap();

        let err = masters.register_design(" D-101 ", "vendor-1").await.unwrap_err();
        assert!(err.is_unique_on("design_no"));
    }
}
