//! # Domain Types
//!
//! Core domain types used throughout Vastra.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ PurchaseInvoice  │   │ InvoiceLineItem  │   │      Batch       │    │
//! │  │ ──────────────── │   │ ──────────────── │   │ ──────────────── │    │
//! │  │ invoice_number   │──►│ design_no        │   │ sku_key          │    │
//! │  │ vendor_id        │   │ product_group_id │   │ total_quantity   │    │
//! │  │ adjustments      │   │ color_id?        │   │ available_qty    │    │
//! │  │ items[]          │   │ sizes[]          │   │ barcode_alias    │    │
//! │  └──────────────────┘   └────────┬─────────┘   └────────▲─────────┘    │
//! │                                  │  one SkuKey per size │              │
//! │                                  └──────────────────────┘              │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │     SkuKey       │   │    GstLogic      │   │   FreightRate    │    │
//! │  │ design, group,   │   │ Auto5_18         │   │ Five             │    │
//! │  │ color?, size,    │   │ Flat5            │   │ Eighteen         │    │
//! │  │ vendor           │   └──────────────────┘   └──────────────────┘    │
//! │  └──────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;
use crate::AUTO_GST_MRP_THRESHOLD;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 500 bps = 5% and 1800 bps = 18%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// 5% GST slab.
    pub const GST_5: TaxRate = TaxRate(500);

    /// 18% GST slab.
    pub const GST_18: TaxRate = TaxRate(1800);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// SKU Key
// =============================================================================

/// Composite identity of one stock line.
///
/// ## Canonical Color
/// "No color" is always `None`. Empty or whitespace-only ids coming from a
/// form or a database column are folded into `None` by [`normalize_color_id`]
/// so `Some("")` never reaches a map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkuKey {
    pub design_no: String,
    pub product_group_id: String,
    pub color_id: Option<String>,
    pub size_id: String,
    pub vendor_id: String,
}

impl SkuKey {
    /// Builds a key, normalizing the color and trimming the design number.
    pub fn new(
        design_no: impl AsRef<str>,
        product_group_id: impl Into<String>,
        color_id: Option<String>,
        size_id: impl Into<String>,
        vendor_id: impl Into<String>,
    ) -> Self {
        SkuKey {
            design_no: design_no.as_ref().trim().to_string(),
            product_group_id: product_group_id.into(),
            color_id: normalize_color_id(color_id),
            size_id: size_id.into(),
            vendor_id: vendor_id.into(),
        }
    }

    /// Stable single-string form of the key.
    ///
    /// Stored alongside batches so storage can index "one active batch per
    /// key". Every part is written as `<char count>:<text>`, so no content
    /// can imitate a separator. An absent color is `~`, which never starts a
    /// length-prefixed part.
    ///
    /// ```text
    /// D-101 / grp-kurta / red / M / vendor-1
    ///   → 5:D-101|9:grp-kurta|3:red|1:M|8:vendor-1
    /// ```
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        push_part(&mut out, Some(&self.design_no));
        push_part(&mut out, Some(&self.product_group_id));
        push_part(&mut out, self.color_id.as_deref());
        push_part(&mut out, Some(&self.size_id));
        push_part(&mut out, Some(&self.vendor_id));
        out
    }
}

fn push_part(out: &mut String, part: Option<&str>) {
    if !out.is_empty() {
        out.push('|');
    }
    match part {
        Some(text) => {
            out.push_str(&text.chars().count().to_string());
            out.push(':');
            out.push_str(text);
        }
        None => out.push('~'),
    }
}

impl fmt::Display for SkuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.design_no,
            self.product_group_id,
            self.color_id.as_deref().unwrap_or("-"),
            self.size_id,
            self.vendor_id
        )
    }
}

/// Folds blank color ids into the canonical `None`.
pub fn normalize_color_id(color_id: Option<String>) -> Option<String> {
    color_id
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// =============================================================================
// Batch Status
// =============================================================================

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Receives reconciliation deltas; at most one per SKU key.
    #[default]
    Active,
    /// Retired by an external process. Never touched by reconciliation.
    Inactive,
}

// =============================================================================
// GST Logic
// =============================================================================

/// How the GST slab for a line item is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum GstLogic {
    /// 5% below an MRP of ₹2500, 18% at or above it.
    #[default]
    #[serde(rename = "AUTO_5_18")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AUTO_5_18"))]
    Auto5_18,
    /// 5% regardless of MRP.
    #[serde(rename = "FLAT_5")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "FLAT_5"))]
    Flat5,
}

impl GstLogic {
    /// Returns the slab rate for an item sold at `mrp`.
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::money::Money;
    /// use vastra_core::types::{GstLogic, TaxRate};
    ///
    /// let below = Money::from_rupees_paise(2499, 99);
    /// let at = Money::from_rupees(2500);
    /// assert_eq!(GstLogic::Auto5_18.rate_for(below), TaxRate::GST_5);
    /// assert_eq!(GstLogic::Auto5_18.rate_for(at), TaxRate::GST_18);
    /// assert_eq!(GstLogic::Flat5.rate_for(at), TaxRate::GST_5);
    /// ```
    pub fn rate_for(&self, mrp: Money) -> TaxRate {
        match self {
            GstLogic::Auto5_18 if mrp < AUTO_GST_MRP_THRESHOLD => TaxRate::GST_5,
            GstLogic::Auto5_18 => TaxRate::GST_18,
            GstLogic::Flat5 => TaxRate::GST_5,
        }
    }

    /// Wire name as stored in the database and exchanged with clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            GstLogic::Auto5_18 => "AUTO_5_18",
            GstLogic::Flat5 => "FLAT_5",
        }
    }
}

// =============================================================================
// Freight Rate
// =============================================================================

/// GST slab selected for the invoice-level freight charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FreightRate {
    #[default]
    Five,
    Eighteen,
}

impl FreightRate {
    /// Returns the tax rate for this slab.
    pub const fn rate(&self) -> TaxRate {
        match self {
            FreightRate::Five => TaxRate::GST_5,
            FreightRate::Eighteen => TaxRate::GST_18,
        }
    }

    /// Maps a stored rate back to a slab. Only 5% and 18% are valid.
    pub fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            500 => Some(FreightRate::Five),
            1800 => Some(FreightRate::Eighteen),
            _ => None,
        }
    }
}

impl FromStr for FreightRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('%').to_lowercase().as_str() {
            "5" | "five" => Ok(FreightRate::Five),
            "18" | "eighteen" => Ok(FreightRate::Eighteen),
            other => Err(format!("unknown freight rate: {}", other)),
        }
    }
}

// =============================================================================
// Batch
// =============================================================================

/// The persisted stock unit for one SKU key.
///
/// ## Quantity Invariants
/// - `total_quantity >= 0`, `available_quantity >= 0`
/// - `available_quantity <= total_quantity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub sku_key: SkuKey,
    pub status: BatchStatus,
    pub total_quantity: i64,
    pub available_quantity: i64,
    /// Unit purchase cost.
    pub cost_actual: Money,
    pub mrp: Money,
    /// Markup over cost in basis points.
    pub mrp_markup_bps: u32,
    pub gst_logic: GstLogic,
    pub hsn_code: Option<String>,
    /// Zero-padded sequential alias (scannable).
    pub barcode_alias: String,
    /// `group-design[-color]-vendor-cost-alias`
    pub barcode_structured: String,
    pub floor: Option<String>,
    pub photos: Vec<String>,
    pub description: Option<String>,
    pub source_invoice_id: String,
    /// Bumped on every quantity write; guards conditional updates.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Checks the quantity invariants.
    pub fn quantities_consistent(&self) -> bool {
        self.total_quantity >= 0
            && self.available_quantity >= 0
            && self.available_quantity <= self.total_quantity
    }
}

// =============================================================================
// Invoice Line Item
// =============================================================================

/// Quantity received for one size of a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SizeQuantity {
    pub size_id: String,
    pub quantity: i64,
}

/// One design/color row of a purchase invoice, spread over sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLineItem {
    /// Position of the row on the invoice.
    pub order_number: i64,
    pub design_no: String,
    pub product_group_id: String,
    #[serde(default)]
    pub color_id: Option<String>,
    pub sizes: Vec<SizeQuantity>,
    pub cost_per_item: Money,
    #[serde(default)]
    pub mrp_markup_bps: u32,
    pub mrp: Money,
    #[serde(default)]
    pub gst_logic: GstLogic,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl InvoiceLineItem {
    /// Sum of all size quantities.
    pub fn total_quantity(&self) -> i64 {
        self.sizes.iter().map(|s| s.quantity).sum()
    }

    /// `cost_per_item × total_quantity`, before any invoice discount.
    pub fn raw_total(&self) -> Money {
        self.cost_per_item.multiply_quantity(self.total_quantity())
    }

    /// [`raw_total`](Self::raw_total) with overflow checks.
    pub fn checked_raw_total(&self) -> Option<Money> {
        let quantity = self
            .sizes
            .iter()
            .try_fold(0i64, |acc, s| acc.checked_add(s.quantity))?;
        self.cost_per_item.checked_multiply_quantity(quantity)
    }

    /// GST slab for this line.
    pub fn tax_rate(&self) -> TaxRate {
        self.gst_logic.rate_for(self.mrp)
    }

    /// One `(SkuKey, quantity)` per size row.
    pub fn sku_quantities<'a>(
        &'a self,
        vendor_id: &'a str,
    ) -> impl Iterator<Item = (SkuKey, i64)> + 'a {
        self.sizes.iter().map(move |s| {
            (
                SkuKey::new(
                    &self.design_no,
                    self.product_group_id.clone(),
                    self.color_id.clone(),
                    s.size_id.clone(),
                    vendor_id,
                ),
                s.quantity,
            )
        })
    }
}

// =============================================================================
// Purchase Invoice
// =============================================================================

/// Invoice-level ledger adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceAdjustments {
    /// Flat amount reducing the items' taxable value.
    #[serde(default)]
    pub discount: Money,
    /// Flat amount taxed separately at `freight_rate`.
    #[serde(default)]
    pub freight: Money,
    #[serde(default)]
    pub freight_rate: FreightRate,
}

/// A purchase invoice as submitted for save.
///
/// `id == None` creates a new invoice; `Some(id)` replaces the items of an
/// existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseInvoice {
    #[serde(default)]
    pub id: Option<String>,
    pub invoice_number: String,
    pub vendor_id: String,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    pub items: Vec<InvoiceLineItem>,
    #[serde(default)]
    pub adjustments: InvoiceAdjustments,
}

// =============================================================================
// Master Data
// =============================================================================

/// Product group (e.g. "Kurta", "Saree").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductGroup {
    pub id: String,
    pub name: String,
    pub group_code: String,
    pub hsn_code: Option<String>,
    pub floor_id: Option<String>,
}

/// Color master row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Color {
    pub id: String,
    pub name: String,
    pub color_code: String,
}

/// Size master row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Size {
    pub id: String,
    pub size_code: String,
}

/// Vendor master row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub vendor_code: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
