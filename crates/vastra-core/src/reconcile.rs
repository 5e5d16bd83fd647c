//! # Stock Reconciliation
//!
//! Turns an invoice's previous and submitted line items into the batch
//! mutations that bring stock in line with the new submission.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  persisted items ──► quantity_state ──► old  {A: 5, C: 2}              │
//! │  submitted items ──► quantity_state ──► new  {A: 8, B: 4}              │
//! │                                                                         │
//! │  compute_deltas(old, new)         A: +3   B: +4   C: −2                │
//! │                                                                         │
//! │  reconcile(old, new, active batches)                                   │
//! │    A: batch found      ──► Adjust { +3, expected version }             │
//! │    B: no batch, Δ > 0  ──► Create { quantity: 4 }                      │
//! │    C: no batch, Δ < 0  ──► StockConflict (whole save aborts)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches storage. The caller fetches the active batches,
//! applies the mutations inside one transaction and rolls back on the first
//! failure.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, BatchStatus, InvoiceLineItem, SkuKey};

/// Quantity per SKU key. Ordered so deltas come out in a stable order.
pub type QuantityMap = BTreeMap<SkuKey, i64>;

/// Net change for one SKU key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityDelta {
    pub sku_key: SkuKey,
    pub delta: i64,
}

/// One storage write produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchMutation {
    /// Conditional update of an existing active batch.
    Adjust {
        batch_id: String,
        sku_key: SkuKey,
        /// Version read with the batch; the write fails if it moved.
        expected_version: i64,
        delta: i64,
        /// Clamped totals the write is expected to produce.
        total_quantity: i64,
        available_quantity: i64,
    },
    /// A new batch with `total = available = quantity`.
    Create { sku_key: SkuKey, quantity: i64 },
}

impl BatchMutation {
    /// Key this mutation targets.
    pub fn sku_key(&self) -> &SkuKey {
        match self {
            BatchMutation::Adjust { sku_key, .. } | BatchMutation::Create { sku_key, .. } => {
                sku_key
            }
        }
    }

    /// Signed quantity change.
    pub fn delta(&self) -> i64 {
        match self {
            BatchMutation::Adjust { delta, .. } => *delta,
            BatchMutation::Create { quantity, .. } => *quantity,
        }
    }
}

// =============================================================================
// Quantity State
// =============================================================================

/// Folds `(key, quantity)` pairs into a map, summing repeated keys.
pub fn fold_quantities(pairs: impl IntoIterator<Item = (SkuKey, i64)>) -> QuantityMap {
    let mut map = QuantityMap::new();
    for (key, quantity) in pairs {
        *map.entry(key).or_insert(0) += quantity;
    }
    map
}

/// Per-key quantities for a list of line items from one vendor.
///
/// The same key appearing on several lines sums.
pub fn quantity_state(vendor_id: &str, items: &[InvoiceLineItem]) -> QuantityMap {
    fold_quantities(items.iter().flat_map(|item| item.sku_quantities(vendor_id)))
}

// =============================================================================
// Deltas
// =============================================================================

/// `new[key] − old[key]` over the union of keys, zero deltas dropped.
///
/// ## Example
/// ```rust
/// use vastra_core::reconcile::{compute_deltas, QuantityMap};
/// use vastra_core::types::SkuKey;
///
/// let a = SkuKey::new("D1", "g", None, "M", "v");
/// let old = QuantityMap::from([(a.clone(), 5)]);
/// let new = QuantityMap::from([(a.clone(), 8)]);
///
/// let deltas = compute_deltas(&old, &new);
/// assert_eq!(deltas.len(), 1);
/// assert_eq!(deltas[0].delta, 3);
/// ```
pub fn compute_deltas(old: &QuantityMap, new: &QuantityMap) -> Vec<QuantityDelta> {
    let keys: BTreeSet<&SkuKey> = old.keys().chain(new.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let before = old.get(key).copied().unwrap_or(0);
            let after = new.get(key).copied().unwrap_or(0);
            let delta = after - before;
            (delta != 0).then(|| QuantityDelta {
                sku_key: key.clone(),
                delta,
            })
        })
        .collect()
}

/// Picks the batch to treat as authoritative when a key has several active
/// batches: the most recently created one.
///
/// Inactive batches are never candidates.
pub fn select_authoritative(batches: Vec<Batch>) -> Option<Batch> {
    batches
        .into_iter()
        .filter(|b| b.status == BatchStatus::Active)
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Clamped counters after applying `delta`.
///
/// Both counters floor at zero. `available ≤ total` before implies the same
/// after, since both move by the same amount before clamping.
pub fn clamp_apply(total: i64, available: i64, delta: i64) -> (i64, i64) {
    ((total + delta).max(0), (available + delta).max(0))
}

// =============================================================================
// Reconcile
// =============================================================================

/// Plans the batch mutations turning `old` into `new`.
///
/// `active` holds the current active batch for every key that has one; keys
/// missing from it have no active batch.
///
/// ## Errors
/// [`CoreError::StockConflict`] when a negative delta targets a key with no
/// active batch. No mutations are returned in that case.
pub fn reconcile(
    old: &QuantityMap,
    new: &QuantityMap,
    active: &HashMap<SkuKey, Batch>,
) -> CoreResult<Vec<BatchMutation>> {
    compute_deltas(old, new)
        .into_iter()
        .map(|QuantityDelta { sku_key, delta }| match active.get(&sku_key) {
            Some(batch) => {
                let (total_quantity, available_quantity) =
                    clamp_apply(batch.total_quantity, batch.available_quantity, delta);
                Ok(BatchMutation::Adjust {
                    batch_id: batch.id.clone(),
                    expected_version: batch.version,
                    sku_key,
                    delta,
                    total_quantity,
                    available_quantity,
                })
            }
            None if delta > 0 => Ok(BatchMutation::Create {
                sku_key,
                quantity: delta,
            }),
            None => Err(CoreError::StockConflict {
                sku: sku_key.to_string(),
                delta,
            }),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{GstLogic, SizeQuantity};
    use chrono::{Duration, Utc};

    fn key(design: &str, size: &str) -> SkuKey {
        SkuKey::new(design, "grp", Some("red".to_string()), size, "vendor-1")
    }

    fn batch(id: &str, sku_key: SkuKey, total: i64, available: i64) -> Batch {
        let now = Utc::now();
        Batch {
            id: id.to_string(),
            sku_key,
            status: BatchStatus::Active,
            total_quantity: total,
            available_quantity: available,
            cost_actual: Money::from_rupees(100),
            mrp: Money::from_rupees(250),
            mrp_markup_bps: 15_000,
            gst_logic: GstLogic::Auto5_18,
            hsn_code: None,
            barcode_alias: "00000001".to_string(),
            barcode_structured: "NA-D1-NA-100-00000001".to_string(),
            floor: None,
            photos: vec![],
            description: None,
            source_invoice_id: "inv-0".to_string(),
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(design: &str, color: Option<&str>, sizes: &[(&str, i64)]) -> InvoiceLineItem {
        InvoiceLineItem {
            order_number: 1,
            design_no: design.to_string(),
            product_group_id: "grp".to_string(),
            color_id: color.map(str::to_string),
            sizes: sizes
                .iter()
                .map(|(s, q)| SizeQuantity { size_id: s.to_string(), quantity: *q })
                .collect(),
            cost_per_item: Money::from_rupees(100),
            mrp_markup_bps: 0,
            mrp: Money::from_rupees(250),
            gst_logic: GstLogic::Auto5_18,
            hsn_code: None,
            description: None,
            photos: vec![],
        }
    }

    #[test]
    fn test_quantity_state_sums_repeated_keys() {
        let items = vec![
            line("D1", Some("red"), &[("M", 2), ("L", 1)]),
            line("D1", Some("red"), &[("M", 3)]),
            line("D1", Some(""), &[("M", 4)]),
        ];
        let state = quantity_state("vendor-1", &items);

        assert_eq!(state.len(), 3);
        assert_eq!(state[&key("D1", "M")], 5);
        assert_eq!(state[&key("D1", "L")], 1);
        let no_color = SkuKey::new("D1", "grp", None, "M", "vendor-1");
        assert_eq!(state[&no_color], 4);
    }

    #[test]
    fn test_existing_batch_gets_adjusted() {
        // {A: 5} → {A: 8}: +3 on the existing batch, nothing created
        let a = key("A", "M");
        let old = QuantityMap::from([(a.clone(), 5)]);
        let new = QuantityMap::from([(a.clone(), 8)]);
        let active = HashMap::from([(a.clone(), batch("b-1", a.clone(), 5, 5))]);

        let mutations = reconcile(&old, &new, &active).unwrap();
        assert_eq!(
            mutations,
            vec![BatchMutation::Adjust {
                batch_id: "b-1".to_string(),
                sku_key: a,
                expected_version: 3,
                delta: 3,
                total_quantity: 8,
                available_quantity: 8,
            }]
        );
    }

    #[test]
    fn test_new_key_creates_batch() {
        // {} → {B: 4}
        let b = key("B", "S");
        let new = QuantityMap::from([(b.clone(), 4)]);

        let mutations = reconcile(&QuantityMap::new(), &new, &HashMap::new()).unwrap();
        assert_eq!(mutations, vec![BatchMutation::Create { sku_key: b, quantity: 4 }]);
    }

    #[test]
    fn test_negative_delta_without_batch_is_conflict() {
        let c = key("C", "M");
        let old = QuantityMap::from([(c.clone(), 2)]);
        let other = key("A", "M");
        let new = QuantityMap::from([(other, 1)]);

        let err = reconcile(&old, &new, &HashMap::new()).unwrap_err();
        match err {
            CoreError::StockConflict { sku, delta } => {
                assert_eq!(sku, c.to_string());
                assert_eq!(delta, -2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unchanged_keys_are_skipped() {
        let a = key("A", "M");
        let state = QuantityMap::from([(a.clone(), 5)]);
        let mutations = reconcile(&state, &state.clone(), &HashMap::new()).unwrap();
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_removed_line_drains_batch_without_going_negative() {
        // Batch already partly sold: total 5, available 1; invoice drops all 5
        let a = key("A", "M");
        let old = QuantityMap::from([(a.clone(), 5)]);
        let active = HashMap::from([(a.clone(), batch("b-1", a.clone(), 5, 1))]);

        let mutations = reconcile(&old, &QuantityMap::new(), &active).unwrap();
        match &mutations[0] {
            BatchMutation::Adjust { delta, total_quantity, available_quantity, .. } => {
                assert_eq!(*delta, -5);
                assert_eq!(*total_quantity, 0);
                assert_eq!(*available_quantity, 0);
            }
            other => panic!("unexpected mutation: {other:?}"),
        }
    }

    #[test]
    fn test_clamp_keeps_available_within_total() {
        let cases = [(10, 10, -3), (10, 4, -6), (3, 0, -5), (0, 0, 7), (7, 2, 1)];
        for (total, available, delta) in cases {
            let (t, a) = clamp_apply(total, available, delta);
            assert!(t >= 0 && a >= 0, "negative counters for {:?}", (total, available, delta));
            assert!(a <= t, "available above total for {:?}", (total, available, delta));
        }
    }

    #[test]
    fn test_delta_sum_matches_net_submission() {
        // Repeated edits of one invoice: the summed deltas equal the last state
        let a = key("A", "M");
        let b = key("B", "M");
        let edits = [
            QuantityMap::from([(a.clone(), 5)]),
            QuantityMap::from([(a.clone(), 8), (b.clone(), 2)]),
            QuantityMap::from([(b.clone(), 6)]),
            QuantityMap::from([(a.clone(), 1), (b.clone(), 6)]),
        ];

        let mut applied: HashMap<SkuKey, i64> = HashMap::new();
        let mut previous = QuantityMap::new();
        for state in &edits {
            for d in compute_deltas(&previous, state) {
                *applied.entry(d.sku_key).or_insert(0) += d.delta;
            }
            previous = state.clone();
        }

        assert_eq!(applied[&a], 1);
        assert_eq!(applied[&b], 6);
    }

    #[test]
    fn test_select_authoritative_prefers_latest_active() {
        let a = key("A", "M");
        let mut older = batch("b-old", a.clone(), 1, 1);
        older.created_at = Utc::now() - Duration::days(3);
        let newer = batch("b-new", a.clone(), 2, 2);
        let mut retired = batch("b-retired", a.clone(), 9, 9);
        retired.status = BatchStatus::Inactive;
        retired.created_at = Utc::now() + Duration::days(1);

        let chosen = select_authoritative(vec![older, retired, newer]).unwrap();
        assert_eq!(chosen.id, "b-new");
        assert!(select_authoritative(vec![]).is_none());
    }
}
