//! # Seed
//!
//! Loads the engine config, seeds master data and saves a demo invoice.
//!
//! ```text
//! RUST_LOG=debug cargo run -p vastra-engine --bin seed -- [path/to/vastra.toml]
//! ```
//!
//! Safe to run repeatedly: existing master rows are left alone and each run
//! saves a fresh invoice number.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vastra_core::tax::suggest_mrp;
use vastra_core::{
    Color, GstLogic, InvoiceLineItem, Money, ProductGroup, PurchaseInvoice, Size, SizeQuantity,
    Vendor,
};
use vastra_db::{Database, DbError, DbResult};
use vastra_engine::{Catalog, EngineConfig, InvoiceError, InvoiceService};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vastra=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Treats "already exists" as success so reruns don't fail.
fn ignore_existing(result: DbResult<()>, what: &str) -> DbResult<()> {
    match result {
        Err(DbError::UniqueViolation { .. }) => {
            debug!(what, "Already seeded");
            Ok(())
        }
        other => other,
    }
}

async fn seed_masters(db: &Database) -> DbResult<()> {
    let masters = db.masters();

    for (id, name, code, hsn) in [
        ("grp-kurta", "Kurta", "KUR", "6211"),
        ("grp-saree", "Saree", "SAR", "5208"),
    ] {
        let group = ProductGroup {
            id: id.to_string(),
            name: name.to_string(),
            group_code: code.to_string(),
            hsn_code: Some(hsn.to_string()),
            floor_id: Some("GROUND".to_string()),
        };
        ignore_existing(masters.insert_product_group(&group).await, id)?;
    }

    for (id, name, code) in [("red", "Red", "RED"), ("navy", "Navy", "NVY")] {
        let color = Color {
            id: id.to_string(),
            name: name.to_string(),
            color_code: code.to_string(),
        };
        ignore_existing(masters.insert_color(&color).await, id)?;
    }

    for id in ["S", "M", "L", "XL"] {
        let size = Size {
            id: id.to_string(),
            size_code: id.to_string(),
        };
        ignore_existing(masters.insert_size(&size).await, id)?;
    }

    for (id, name, code) in [
        ("vendor-sharma", "Sharma Textiles", "SHR"),
        ("vendor-cipher", "Cipher Handlooms", "CPH"),
    ] {
        let vendor = Vendor {
            id: id.to_string(),
            name: name.to_string(),
            vendor_code: code.to_string(),
        };
        ignore_existing(masters.insert_vendor(&vendor).await, id)?;
    }

    info!("Master data seeded");
    Ok(())
}

fn demo_invoice(config: &EngineConfig) -> PurchaseInvoice {
    let kurta_cost = Money::from_rupees(450);
    let saree_cost = Money::from_rupees_paise(2100, 50);

    PurchaseInvoice {
        id: None,
        invoice_number: format!("DEMO-{}", Utc::now().format("%Y%m%d%H%M%S")),
        vendor_id: "vendor-cipher".to_string(),
        invoice_date: Utc::now().date_naive(),
        items: vec![
            InvoiceLineItem {
                order_number: 1,
                design_no: "K-204".to_string(),
                product_group_id: "grp-kurta".to_string(),
                color_id: Some("red".to_string()),
                sizes: vec![
                    SizeQuantity { size_id: "M".to_string(), quantity: 4 },
                    SizeQuantity { size_id: "L".to_string(), quantity: 3 },
                ],
                cost_per_item: kurta_cost,
                mrp_markup_bps: 12_000,
                mrp: suggest_mrp(kurta_cost, 12_000),
                gst_logic: GstLogic::Auto5_18,
                hsn_code: None,
                description: Some("Printed cotton kurta".to_string()),
                photos: vec![],
            },
            InvoiceLineItem {
                order_number: 2,
                design_no: "S-77".to_string(),
                product_group_id: "grp-saree".to_string(),
                color_id: None,
                sizes: vec![SizeQuantity { size_id: "XL".to_string(), quantity: 2 }],
                cost_per_item: saree_cost,
                mrp_markup_bps: 8_000,
                mrp: suggest_mrp(saree_cost, 8_000),
                gst_logic: GstLogic::Auto5_18,
                hsn_code: None,
                description: Some("Silk blend saree".to_string()),
                photos: vec![],
            },
        ],
        adjustments: vastra_core::InvoiceAdjustments {
            discount: Money::from_rupees(200),
            freight: Money::from_rupees(150),
            ..config.default_adjustments()
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = EngineConfig::load(config_path)?;

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.to_db_config()).await?;
    seed_masters(&db).await?;

    let catalog = Catalog::new(db.clone());
    for design in ["K-204", "S-77"] {
        match catalog.register_design(design, "vendor-cipher").await {
            Ok(_) | Err(InvoiceError::Validation(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let service = InvoiceService::new(db.clone(), config.encoder());
    let saved = service.save(demo_invoice(&config)).await?;

    info!(
        invoice_id = %saved.invoice_id,
        number = %saved.invoice_number,
        taxable = %saved.totals.taxable_total,
        gst = %saved.totals.total_gst,
        round_off = %saved.totals.round_off,
        grand_total = %saved.totals.grand_total,
        "Demo invoice saved"
    );
    for batch in &saved.created {
        info!(
            alias = %batch.barcode_alias,
            barcode = %batch.barcode_structured,
            quantity = batch.total_quantity,
            mrp = %batch.mrp,
            "Batch minted"
        );
    }

    db.close().await;
    Ok(())
}
