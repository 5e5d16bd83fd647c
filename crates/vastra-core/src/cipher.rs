//! # Cost Cipher
//!
//! Reversible substitution that hides the unit cost inside a printed barcode
//! string, so floor staff can read it and customers cannot.
//!
//! ```text
//!   digit:  0 1 2 3 4 5 6 7 8 9 .
//!   code:   D P U R C H A S E M X
//!
//!   "450.50"  ──encode──►  "CHDXHD"  ──decode──►  "450.50"
//! ```
//!
//! Only vendors whose display name contains the configured marker get the
//! ciphered form; everyone else's cost passes through as plain digits.

use crate::error::{CoreError, CoreResult};

/// Plain alphabet, index-aligned with [`CODE`].
const PLAIN: [char; 11] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.'];

/// Substitution alphabet. Every entry is distinct, so the table is a bijection.
const CODE: [char; 11] = ['D', 'P', 'U', 'R', 'C', 'H', 'A', 'S', 'E', 'M', 'X'];

/// Vendor-aware cost cipher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostCipher {
    /// Lowercased marker substring.
    vendor_marker: String,
}

impl CostCipher {
    /// Creates a cipher that activates for vendor names containing `marker`
    /// (case-insensitive). An empty marker never activates.
    pub fn new(vendor_marker: impl AsRef<str>) -> Self {
        CostCipher {
            vendor_marker: vendor_marker.as_ref().trim().to_lowercase(),
        }
    }

    /// Returns true when costs for this vendor are ciphered.
    pub fn applies_to(&self, vendor_name: &str) -> bool {
        !self.vendor_marker.is_empty() && vendor_name.to_lowercase().contains(&self.vendor_marker)
    }

    /// Renders a cost string for the given vendor.
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::cipher::CostCipher;
    ///
    /// let cipher = CostCipher::new("cipher");
    /// assert_eq!(cipher.render("450.50", "Cipher Textiles").unwrap(), "CHDXHD");
    /// assert_eq!(cipher.render("450.50", "Plain Mills").unwrap(), "450.50");
    /// ```
    pub fn render(&self, cost: &str, vendor_name: &str) -> CoreResult<String> {
        if self.applies_to(vendor_name) {
            encode(cost)
        } else {
            Ok(cost.to_string())
        }
    }
}

/// Substitutes every character of a cost string.
pub fn encode(cost: &str) -> CoreResult<String> {
    substitute(cost, &PLAIN, &CODE)
}

/// Exact inverse of [`encode`].
pub fn decode(coded: &str) -> CoreResult<String> {
    substitute(coded, &CODE, &PLAIN)
}

fn substitute(value: &str, from: &[char; 11], to: &[char; 11]) -> CoreResult<String> {
    value
        .chars()
        .map(|c| {
            from.iter()
                .position(|&f| f == c)
                .map(|i| to[i])
                .ok_or_else(|| CoreError::InvalidCostString {
                    value: value.to_string(),
                    found: c,
                })
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
    use std::collections::HashSet;

    #[test]
    fn test_table_is_bijective() {
        let plain: HashSet<_> = PLAIN.iter().collect();
        let code: HashSet<_> = CODE.iter().collect();
        assert_eq!(plain.len(), PLAIN.len());
        assert_eq!(code.len(), CODE.len());
        assert!(plain.is_disjoint(&code));
    }

    #[test]
    fn test_round_trip_over_cost_range() {
        // Every paisa amount up to ₹100 plus a sample of larger ones
        let samples = (0..10_000).chain((10_000..5_000_000).step_by(997));
        for paise in samples {
            let cost = Money::from_paise(paise).to_plain_string();
            let coded = encode(&cost).unwrap();
            assert_eq!(decode(&coded).unwrap(), cost, "round trip failed for {}", cost);
            assert!(coded.chars().all(|c| CODE.contains(&c)));
        }
    }

    #[test]
    fn test_vendor_marker_is_case_insensitive() {
        let cipher = CostCipher::new("Cipher");
        assert!(cipher.applies_to("CIPHER FABRICS"));
        assert!(cipher.applies_to("the cipher house"));
        assert!(!cipher.applies_to("Sharma Textiles"));
    }

    #[test]
    fn test_pass_through_when_marker_absent() {
        let cipher = CostCipher::new("cipher");
        for cost in ["0", "450", "1299.99", "0.05"] {
            assert_eq!(cipher.render(cost, "Sharma Textiles").unwrap(), cost);
        }
    }

    #[test]
    fn test_empty_marker_never_applies() {
        let cipher = CostCipher::new("  ");
        assert!(!cipher.applies_to("anything"));
    }

    #[test]
    fn test_rejects_characters_outside_alphabet() {
        let err = encode("45,0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidCostString { found: ',', .. }));
        assert!(decode("CHZ").is_err());
    }
}
