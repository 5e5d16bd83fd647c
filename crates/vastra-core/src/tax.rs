//! # GST Calculator
//!
//! Slab-based GST for purchase invoices.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line raw   = cost_per_item × quantity          (per line)             │
//! │  raw total  = Σ line raw                                               │
//! │  net        = raw total − discount                                     │
//! │                                                                         │
//! │  line taxable = line raw / raw total × net      (discount pro-rated)    │
//! │  line GST     = line taxable × line slab        (5% or 18%)            │
//! │                                                                         │
//! │  freight GST  = freight × freight slab          (NOT pro-rated)        │
//! │                                                                         │
//! │  gross  = net + Σ line GST + freight + freight GST                     │
//! │  grand  = gross rounded to the rupee                                    │
//! │  round-off = grand − gross                      (reported, not hidden) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pro-rating leaves at most a few paise of rounding residue; it is added to
//! the last non-empty line so the line taxables always sum to `net`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{InvoiceAdjustments, InvoiceLineItem, TaxRate};
use crate::validation::validate_items_total;
use crate::MAX_AMOUNT_PAISE;

/// Tax breakdown for one line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTax {
    pub order_number: i64,
    pub raw_total: Money,
    pub taxable: Money,
    pub rate: TaxRate,
    pub gst: Money,
}

/// Taxable value and GST collected at one slab (for the Tally export).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RateSummary {
    pub rate: TaxRate,
    pub taxable: Money,
    pub gst: Money,
}

/// Invoice-level totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub lines: Vec<LineTax>,
    pub raw_items_total: Money,
    pub discount: Money,
    /// `raw_items_total − discount`.
    pub taxable_total: Money,
    pub items_gst: Money,
    pub freight: Money,
    pub freight_rate: TaxRate,
    pub freight_gst: Money,
    /// `items_gst + freight_gst`.
    pub total_gst: Money,
    /// Sum before rounding.
    pub gross_total: Money,
    /// `grand_total − gross_total`.
    pub round_off: Money,
    /// Rounded to the whole rupee.
    pub grand_total: Money,
    pub rate_summary: Vec<RateSummary>,
}

/// Computes line and invoice totals.
///
/// ## Errors
/// - discount negative or larger than the items total
/// - freight negative
///
/// ## Example
/// ```rust
/// use vastra_core::money::Money;
/// use vastra_core::tax::calculate_invoice_totals;
/// use vastra_core::types::{FreightRate, InvoiceAdjustments};
///
/// let adj = InvoiceAdjustments {
///     discount: Money::zero(),
///     freight: Money::from_rupees(50),
///     freight_rate: FreightRate::Five,
/// };
/// let totals = calculate_invoice_totals(&[], &adj).unwrap();
/// assert_eq!(totals.freight_gst, Money::from_paise(250));
/// ```
pub fn calculate_invoice_totals(
    items: &[InvoiceLineItem],
    adjustments: &InvoiceAdjustments,
) -> Result<InvoiceTotals, ValidationError> {
    let raw_items_total = validate_items_total(items)?;
    let discount = adjustments.discount;
    let freight = adjustments.freight;

    if discount.is_negative() || discount > raw_items_total {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: raw_items_total.paise().max(0),
        });
    }
    if freight.is_negative() || freight.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::OutOfRange {
            field: "freight".to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE,
        });
    }

    let taxable_total = raw_items_total - discount;

    let mut lines: Vec<LineTax> = items
        .iter()
        .map(|item| {
            let raw = item.raw_total();
            LineTax {
                order_number: item.order_number,
                raw_total: raw,
                taxable: raw.scale(taxable_total, raw_items_total),
                rate: item.tax_rate(),
                gst: Money::zero(),
            }
        })
        .collect();

    let allocated: Money = lines.iter().map(|l| l.taxable).sum();
    let residual = taxable_total - allocated;
    if !residual.is_zero() {
        if let Some(last) = lines.iter_mut().rev().find(|l| !l.raw_total.is_zero()) {
            last.taxable += residual;
        }
    }

    let mut by_rate: BTreeMap<TaxRate, (Money, Money)> = BTreeMap::new();
    for line in &mut lines {
        line.gst = line.taxable.calculate_tax(line.rate);
        let entry = by_rate.entry(line.rate).or_default();
        entry.0 += line.taxable;
        entry.1 += line.gst;
    }

    let items_gst: Money = lines.iter().map(|l| l.gst).sum();
    let freight_rate = adjustments.freight_rate.rate();
    let freight_gst = freight.calculate_tax(freight_rate);

    let gross_total = taxable_total + items_gst + freight + freight_gst;
    let grand_total = gross_total.round_to_rupee();

    Ok(InvoiceTotals {
        lines,
        raw_items_total,
        discount,
        taxable_total,
        items_gst,
        freight,
        freight_rate,
        freight_gst,
        total_gst: items_gst + freight_gst,
        gross_total,
        round_off: grand_total - gross_total,
        grand_total,
        rate_summary: by_rate
            .into_iter()
            .map(|(rate, (taxable, gst))| RateSummary { rate, taxable, gst })
            .collect(),
    })
}

/// Suggested MRP for a cost and markup (basis points), rounded up to the
/// whole rupee.
pub fn suggest_mrp(cost_per_item: Money, markup_bps: u32) -> Money {
    cost_per_item.apply_markup(markup_bps)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FreightRate, GstLogic, SizeQuantity};

    fn item(order: i64, cost_rupees: i64, qty: i64, mrp: Money, logic: GstLogic) -> InvoiceLineItem {
        InvoiceLineItem {
            order_number: order,
            design_no: format!("D-{}", order),
            product_group_id: "grp".to_string(),
            color_id: None,
            sizes: vec![SizeQuantity { size_id: "M".to_string(), quantity: qty }],
            cost_per_item: Money::from_rupees(cost_rupees),
            mrp_markup_bps: 0,
            mrp,
            gst_logic: logic,
            hsn_code: None,
            description: None,
            photos: vec![],
        }
    }

    #[test]
    fn test_slab_boundary() {
        let below = item(1, 100, 1, Money::from_rupees_paise(2499, 99), GstLogic::Auto5_18);
        let at = item(2, 100, 1, Money::from_rupees(2500), GstLogic::Auto5_18);
        let flat = item(3, 100, 1, Money::from_rupees(9000), GstLogic::Flat5);
        assert_eq!(below.tax_rate(), TaxRate::GST_5);
        assert_eq!(at.tax_rate(), TaxRate::GST_18);
        assert_eq!(flat.tax_rate(), TaxRate::GST_5);
    }

    #[test]
    fn test_discount_and_freight_scenario() {
        // ₹1000 of goods at 18%, ₹100 discount, ₹50 freight at 5%
        let items = vec![item(1, 100, 10, Money::from_rupees(3000), GstLogic::Auto5_18)];
        let adj = InvoiceAdjustments {
            discount: Money::from_rupees(100),
            freight: Money::from_rupees(50),
            freight_rate: FreightRate::Five,
        };

        let totals = calculate_invoice_totals(&items, &adj).unwrap();
        assert_eq!(totals.raw_items_total, Money::from_rupees(1000));
        assert_eq!(totals.taxable_total, Money::from_rupees(900));
        assert_eq!(totals.lines[0].taxable, Money::from_rupees(900));
        assert_eq!(totals.items_gst, Money::from_rupees(162));
        assert_eq!(totals.freight_gst, Money::from_paise(250));
        assert_eq!(totals.total_gst, Money::from_paise(16450));
        assert_eq!(totals.gross_total, Money::from_paise(111450));
        assert_eq!(totals.grand_total, Money::from_rupees(1115));
        assert_eq!(totals.round_off, Money::from_paise(50));
    }

    #[test]
    fn test_discount_is_prorated_per_line_rate() {
        // ₹600 at 5% and ₹400 at 18%, ₹100 discount → ₹540 and ₹360
        let items = vec![
            item(1, 60, 10, Money::from_rupees(999), GstLogic::Auto5_18),
            item(2, 40, 10, Money::from_rupees(2600), GstLogic::Auto5_18),
        ];
        let adj = InvoiceAdjustments {
            discount: Money::from_rupees(100),
            ..Default::default()
        };

        let totals = calculate_invoice_totals(&items, &adj).unwrap();
        assert_eq!(totals.lines[0].taxable, Money::from_rupees(540));
        assert_eq!(totals.lines[1].taxable, Money::from_rupees(360));
        assert_eq!(totals.lines[0].gst, Money::from_rupees(27));
        assert_eq!(totals.lines[1].gst, Money::from_paise(6480));
        assert_eq!(totals.rate_summary.len(), 2);
        assert_eq!(totals.rate_summary[0].rate, TaxRate::GST_5);
        assert_eq!(totals.rate_summary[1].gst, Money::from_paise(6480));
    }

    #[test]
    fn test_residual_paise_land_on_last_line() {
        // ₹3 of goods less ₹1: each line rounds to 67 paise, last gives one back
        let items = vec![
            item(1, 1, 1, Money::from_rupees(10), GstLogic::Flat5),
            item(2, 1, 1, Money::from_rupees(10), GstLogic::Flat5),
            item(3, 1, 1, Money::from_rupees(10), GstLogic::Flat5),
        ];
        let adj = InvoiceAdjustments {
            discount: Money::from_paise(100),
            ..Default::default()
        };

        let totals = calculate_invoice_totals(&items, &adj).unwrap();
        let sum: Money = totals.lines.iter().map(|l| l.taxable).sum();
        assert_eq!(sum, totals.taxable_total);
        assert_eq!(totals.taxable_total, Money::from_paise(200));
        assert_eq!(totals.lines[0].taxable, Money::from_paise(67));
        assert_eq!(totals.lines[2].taxable, Money::from_paise(66));
    }

    #[test]
    fn test_invalid_adjustments() {
        let items = vec![item(1, 100, 1, Money::from_rupees(200), GstLogic::Flat5)];
        let too_much = InvoiceAdjustments {
            discount: Money::from_rupees(101),
            ..Default::default()
        };
        let err = calculate_invoice_totals(&items, &too_much).unwrap_err();
        assert_eq!(err.field(), "discount");

        let negative_freight = InvoiceAdjustments {
            freight: Money::from_rupees(-1),
            ..Default::default()
        };
        let err = calculate_invoice_totals(&items, &negative_freight).unwrap_err();
        assert_eq!(err.field(), "freight");
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_wrapped() {
        let mut huge = item(1, 0, 3, Money::from_rupees(200), GstLogic::Flat5);
        huge.cost_per_item = Money::from_paise(i64::MAX / 2);
        let err = calculate_invoice_totals(&[huge], &InvoiceAdjustments::default()).unwrap_err();
        assert_eq!(err.field(), "items");

        let items = vec![item(1, 100, 1, Money::from_rupees(200), GstLogic::Flat5)];
        let huge_freight = InvoiceAdjustments {
            freight: Money::from_paise(i64::MAX),
            ..Default::default()
        };
        let err = calculate_invoice_totals(&items, &huge_freight).unwrap_err();
        assert_eq!(err.field(), "freight");
    }

    #[test]
    fn test_empty_invoice() {
        let totals = calculate_invoice_totals(&[], &InvoiceAdjustments::default()).unwrap();
        assert!(totals.grand_total.is_zero());
        assert!(totals.round_off.is_zero());
        assert!(totals.lines.is_empty());
    }

    #[test]
    fn test_suggest_mrp() {
        assert_eq!(suggest_mrp(Money::from_rupees(450), 12_000), Money::from_rupees(990));
        assert_eq!(suggest_mrp(Money::from_paise(33_333), 5_000), Money::from_rupees(500));
    }
}
