//! # Validation Module
//!
//! Input validation for purchase invoices.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization                                              │
//! │  └── Types, GST logic names, freight slab                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any stock is touched)                    │
//! │  ├── Required fields, lengths                                          │
//! │  ├── Positive quantities, bounded non-negative money                    │
//! │  └── Duplicate lines / order numbers / sizes in one submission         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (vendor_id, invoice_number)                                │
//! │  ├── UNIQUE (design_no, vendor_id) on design registration              │
//! │  └── One active batch per SKU fingerprint                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are paths into the submission (`items[2].sizes[0].quantity`)
//! so the caller can point at the exact input.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{normalize_color_id, InvoiceLineItem, PurchaseInvoice};
use crate::{
    MAX_AMOUNT_PAISE, MAX_DESIGN_NO_LEN, MAX_INVOICE_NUMBER_LEN, MAX_INVOICE_TOTAL_PAISE,
    MAX_SIZE_QUANTITY,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required text field with a maximum length.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a size quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_SIZE_QUANTITY
///
/// ## Example
/// ```rust
/// use vastra_core::validation::validate_quantity;
///
/// assert!(validate_quantity("quantity", 5).is_ok());
/// assert!(validate_quantity("quantity", 0).is_err());
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_SIZE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_SIZE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in `0..=MAX_AMOUNT_PAISE`. Zero is allowed.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE,
        });
    }

    Ok(())
}

/// Sums `cost × quantity` over all lines, rejecting totals above
/// `MAX_INVOICE_TOTAL_PAISE` (overflow included).
pub fn validate_items_total(items: &[InvoiceLineItem]) -> ValidationResult<Money> {
    let total = items.iter().try_fold(Money::zero(), |acc, item| {
        item.checked_raw_total()
            .filter(|raw| !raw.is_negative())
            .and_then(|raw| acc.checked_add(raw))
    });

    match total {
        Some(total) if total.paise() <= MAX_INVOICE_TOTAL_PAISE => Ok(total),
        _ => Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_INVOICE_TOTAL_PAISE,
        }),
    }
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use vastra_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Line Item Validators
// =============================================================================

/// Validates one line item in isolation.
///
/// `path` prefixes the field names, e.g. `items[3]`.
pub fn validate_line_item(path: &str, item: &InvoiceLineItem) -> ValidationResult<()> {
    validate_required(&format!("{path}.design_no"), &item.design_no, MAX_DESIGN_NO_LEN)?;
    validate_required(&format!("{path}.product_group_id"), &item.product_group_id, 64)?;

    if item.sizes.is_empty() {
        return Err(ValidationError::Required {
            field: format!("{path}.sizes"),
        });
    }

    let mut seen_sizes = HashSet::new();
    for (i, size) in item.sizes.iter().enumerate() {
        let size_path = format!("{path}.sizes[{i}]");
        validate_required(&format!("{size_path}.size_id"), &size.size_id, 64)?;
        validate_quantity(&format!("{size_path}.quantity"), size.quantity)?;

        if !seen_sizes.insert(size.size_id.trim()) {
            return Err(ValidationError::Duplicate {
                field: format!("{size_path}.size_id"),
                value: size.size_id.trim().to_string(),
            });
        }
    }

    validate_amount(&format!("{path}.cost_per_item"), item.cost_per_item)?;
    validate_amount(&format!("{path}.mrp"), item.mrp)?;

    Ok(())
}

// =============================================================================
// Invoice Validator
// =============================================================================

/// Validates a whole purchase invoice before any mutation.
///
/// ## Rules
/// - `id`, when present, is a UUID
/// - invoice number and vendor are required
/// - at least one line item, each valid on its own
/// - no two lines share `(design_no, product_group, color)`
/// - no two lines share an `order_number` (stored rows regroup by it)
/// - amounts are bounded, and so is the items total
///
/// Discount-versus-total limits are checked by the tax calculator, which
/// has the raw total at hand.
pub fn validate_invoice(invoice: &PurchaseInvoice) -> ValidationResult<()> {
    if let Some(id) = &invoice.id {
        validate_uuid(id)?;
    }
    validate_required("invoice_number", &invoice.invoice_number, MAX_INVOICE_NUMBER_LEN)?;
    validate_required("vendor_id", &invoice.vendor_id, 64)?;

    if invoice.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut seen_lines = HashSet::new();
    let mut seen_orders = HashSet::new();
    for (i, item) in invoice.items.iter().enumerate() {
        let path = format!("items[{i}]");
        validate_line_item(&path, item)?;

        if !seen_orders.insert(item.order_number) {
            return Err(ValidationError::Duplicate {
                field: format!("{path}.order_number"),
                value: item.order_number.to_string(),
            });
        }

        let line_key = (
            item.design_no.trim().to_string(),
            item.product_group_id.clone(),
            normalize_color_id(item.color_id.clone()),
        );
        if !seen_lines.insert(line_key) {
            return Err(ValidationError::Duplicate {
                field: format!("{path}.design_no"),
                value: item.design_no.trim().to_string(),
            });
        }
    }

    validate_amount("discount", invoice.adjustments.discount)?;
    validate_amount("freight", invoice.adjustments.freight)?;
    validate_items_total(&invoice.items)?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
