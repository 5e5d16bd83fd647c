//! # vastra-core: Pure Business Logic for Vastra
//!
//! This crate holds the purchase-side inventory rules of Vastra as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vastra Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 vastra-engine (Application Layer)               │   │
//! │  │    EngineConfig ──► InvoiceService::save ──► audit log         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vastra-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ reconcile │  │    tax    │  │  barcode  │  │ validation│  │   │
//! │  │   │  deltas   │  │ GST slabs │  │  cipher   │  │   rules   │  │   │
//! │  │   │ mutations │  │ round-off │  │ sequence  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   vastra-db (Database Layer)                    │   │
//! │  │         SQLite pool, migrations, batch/invoice repositories     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (SkuKey, Batch, InvoiceLineItem, etc.)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Invoice and field validation
//! - [`reconcile`] - Before/after quantity maps into batch mutations
//! - [`tax`] - GST slabs, discount pro-rating, freight, round-off
//! - [`cipher`] - Reversible cost substitution
//! - [`sequence`] - Alias number source
//! - [`barcode`] - Alias and structured barcode composition
//!
//! ## Example Usage
//!
//! ```rust
//! use vastra_core::money::Money;
//! use vastra_core::types::GstLogic;
//!
//! let mrp = Money::from_rupees(2500);
//! let tax = mrp.calculate_tax(GstLogic::Auto5_18.rate_for(mrp));
//! assert_eq!(tax, Money::from_rupees(450));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod cipher;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod sequence;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// MRP at or above which `AUTO_5_18` items move to the 18% slab.
pub const AUTO_GST_MRP_THRESHOLD: Money = Money::from_rupees(2500);

/// Digits in a barcode alias (`00001234`).
pub const BARCODE_ALIAS_WIDTH: usize = 8;

/// Token printed in place of a missing group or vendor code.
pub const DEFAULT_BARCODE_PLACEHOLDER: &str = "NA";

/// Vendor-name substring that switches on the cost cipher.
pub const DEFAULT_CIPHER_VENDOR_MARKER: &str = "cipher";

/// Name of the durable counter row that issues barcode aliases.
pub const BARCODE_ALIAS_SEQUENCE: &str = "barcode_alias";

/// Maximum length of a design number.
pub const MAX_DESIGN_NO_LEN: usize = 50;

/// Maximum length of a vendor invoice number.
pub const MAX_INVOICE_NUMBER_LEN: usize = 50;

/// Maximum quantity of one size on one line.
///
/// Catches typos like 1000 for 10 before they land in stock.
pub const MAX_SIZE_QUANTITY: i64 = 9_999;

/// Largest single amount (cost, MRP, discount, freight) in paise: ₹1 crore.
pub const MAX_AMOUNT_PAISE: i64 = 1_000_000_000;

/// Largest pre-discount item total of one invoice in paise: ₹100 crore.
///
/// Keeps every total, tax and per-rate sum far inside `i64`.
pub const MAX_INVOICE_TOTAL_PAISE: i64 = 100_000_000_000;
