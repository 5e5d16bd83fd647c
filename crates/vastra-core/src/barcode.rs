//! # Barcode Encoder
//!
//! Composes the two identifiers printed on every garment label.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  alias       = next sequence value, zero-padded to 8 digits             │
//! │                00001234                                                 │
//! │                                                                         │
//! │  structured  = group - design[-color] - vendor - cost - alias           │
//! │                KUR  - D101 - RED      - SHR    - 450  - 00001234        │
//! │                                                                         │
//! │  Missing group/vendor codes become the placeholder token ("NA") so     │
//! │  the string always has the same number of segments.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::cipher::CostCipher;
use crate::error::CoreResult;
use crate::money::Money;
use crate::sequence::{format_alias, AliasSequence};
use crate::{DEFAULT_BARCODE_PLACEHOLDER, DEFAULT_CIPHER_VENDOR_MARKER};

/// SKU attributes resolved from master data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkuAttributes {
    pub design_no: String,
    pub group_code: Option<String>,
    pub color_code: Option<String>,
}

/// Vendor attributes needed on the label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VendorLabel {
    pub vendor_code: Option<String>,
    /// Display name; decides whether the cost is ciphered.
    pub name: String,
}

/// Result of minting a barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedBarcode {
    pub alias: String,
    pub structured: String,
}

/// Builds alias and structured barcode strings.
#[derive(Debug, Clone)]
pub struct BarcodeEncoder {
    cipher: CostCipher,
    placeholder: String,
}

impl Default for BarcodeEncoder {
    fn default() -> Self {
        BarcodeEncoder::new(
            CostCipher::new(DEFAULT_CIPHER_VENDOR_MARKER),
            DEFAULT_BARCODE_PLACEHOLDER,
        )
    }
}

impl BarcodeEncoder {
    /// Creates an encoder with the given cipher and placeholder token.
    pub fn new(cipher: CostCipher, placeholder: impl Into<String>) -> Self {
        BarcodeEncoder {
            cipher,
            placeholder: placeholder.into(),
        }
    }

    /// Draws the next alias from `sequence` and composes both strings.
    ///
    /// The cost is rendered first so a bad cost never consumes an alias.
    pub fn mint(
        &self,
        sequence: &dyn AliasSequence,
        sku: &SkuAttributes,
        vendor: &VendorLabel,
        cost: Money,
    ) -> CoreResult<MintedBarcode> {
        let cost_segment = self.cipher.render(&cost.to_plain_string(), &vendor.name)?;
        let alias = format_alias(sequence.next_alias());
        Ok(self.assemble(sku, vendor, &cost_segment, alias))
    }

    /// Composes both strings for an alias number drawn elsewhere (e.g. the
    /// database sequence inside an invoice transaction).
    pub fn compose(
        &self,
        alias_number: i64,
        sku: &SkuAttributes,
        vendor: &VendorLabel,
        cost: Money,
    ) -> CoreResult<MintedBarcode> {
        let cost_segment = self.cipher.render(&cost.to_plain_string(), &vendor.name)?;
        Ok(self.assemble(sku, vendor, &cost_segment, format_alias(alias_number)))
    }

    fn assemble(
        &self,
        sku: &SkuAttributes,
        vendor: &VendorLabel,
        cost_segment: &str,
        alias: String,
    ) -> MintedBarcode {
        let group = self.code_or_placeholder(sku.group_code.as_deref());
        let vendor_code = self.code_or_placeholder(vendor.vendor_code.as_deref());
        let design = match non_blank(sku.color_code.as_deref()) {
            Some(color) => format!("{}-{}", sku.design_no.trim(), color),
            None => sku.design_no.trim().to_string(),
        };

        let structured = format!(
            "{}-{}-{}-{}-{}",
            group, design, vendor_code, cost_segment, alias
        );
        MintedBarcode { alias, structured }
    }

    fn code_or_placeholder<'a>(&'a self, code: Option<&'a str>) -> &'a str {
        non_blank(code).unwrap_or(&self.placeholder)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher;
    use crate::sequence::AtomicAliasSequence;

    fn sku(color: Option<&str>) -> SkuAttributes {
        SkuAttributes {
            design_no: "D101".to_string(),
            group_code: Some("KUR".to_string()),
            color_code: color.map(str::to_string),
        }
    }

    fn vendor(name: &str) -> VendorLabel {
        VendorLabel {
            vendor_code: Some("SHR".to_string()),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_structured_with_color() {
        let encoder = BarcodeEncoder::default();
        let seq = AtomicAliasSequence::starting_after(1233);
        let minted = encoder
            .mint(&seq, &sku(Some("RED")), &vendor("Sharma Textiles"), Money::from_rupees(450))
            .unwrap();
        assert_eq!(minted.alias, "00001234");
        assert_eq!(minted.structured, "KUR-D101-RED-SHR-450-00001234");
    }

    #[test]
    fn test_structured_without_color() {
        let encoder = BarcodeEncoder::default();
        let minted = encoder
            .compose(7, &sku(None), &vendor("Sharma Textiles"), Money::from_paise(45050))
            .unwrap();
        assert_eq!(minted.structured, "KUR-D101-SHR-450.50-00000007");
    }

    #[test]
    fn test_missing_codes_use_placeholder() {
        let encoder = BarcodeEncoder::default();
        let sku = SkuAttributes {
            design_no: "D9".to_string(),
            group_code: None,
            color_code: Some("  ".to_string()),
        };
        let vendor = VendorLabel {
            vendor_code: Some(String::new()),
            name: "Unknown".to_string(),
        };
        let minted = encoder.compose(1, &sku, &vendor, Money::from_rupees(99)).unwrap();
        assert_eq!(minted.structured, "NA-D9-NA-99-00000001");
    }

    #[test]
    fn test_cost_ciphered_for_marked_vendor() {
        let encoder = BarcodeEncoder::new(CostCipher::new("cipher"), "NA");
        let minted = encoder
            .compose(5, &sku(None), &vendor("Cipher Fabrics"), Money::from_paise(45050))
            .unwrap();
        assert_eq!(minted.structured, "KUR-D101-SHR-CHDXHD-00000005");

        let cost_segment = minted.structured.split('-').nth(3).unwrap();
        assert_eq!(cipher::decode(cost_segment).unwrap(), "450.50");
    }

    #[test]
    fn test_each_mint_gets_a_new_alias() {
        let encoder = BarcodeEncoder::default();
        let seq = AtomicAliasSequence::default();
        let a = encoder.mint(&seq, &sku(None), &vendor("v"), Money::from_rupees(1)).unwrap();
        let b = encoder.mint(&seq, &sku(None), &vendor("v"), Money::from_rupees(1)).unwrap();
        assert_ne!(a.alias, b.alias);
        assert_eq!(b.alias, "00000002");
    }

    #[test]
    fn test_negative_cost_does_not_consume_alias() {
        let encoder = BarcodeEncoder::new(CostCipher::new("cipher"), "NA");
        let seq = AtomicAliasSequence::default();
        let result = encoder.mint(&seq, &sku(None), &vendor("Cipher Co"), Money::from_rupees(-1));
        assert!(result.is_err());
        assert_eq!(seq.last_issued(), 0);
    }
}
