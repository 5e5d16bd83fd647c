//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Invoice: ₹1000.00 of goods, ₹100.00 discount split over 3 lines       │
//! │    float: 299.99999999999994 + 300.00000000000006 + ...  ❌             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    90000 paise split 3 ways = 30000 + 30000 + 30000                     │
//! │    Any leftover paisa is assigned explicitly, never lost               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vastra_core::money::Money;
//!
//! let cost = Money::from_paise(45050);         // ₹450.50
//! let line = cost.multiply_quantity(4);        // ₹1802.00
//! assert_eq!(line.paise(), 180200);
//! assert_eq!(cost.to_plain_string(), "450.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Rounding Helper
// =============================================================================

/// Integer division rounding half away from zero.
///
/// `divisor` must be positive.
pub(crate) fn div_round_half_away(numerator: i128, divisor: i128) -> i128 {
    let half = divisor / 2;
    if numerator >= 0 {
        (numerator + half) / divisor
    } else {
        (numerator - half) / divisor
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: round-off and discounts can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.cost_per_item ──► line raw total ──► pro-rated taxable value │
/// │                │                                        │               │
/// │                │                                        ▼               │
/// │                ▼                                  GST per line          │
/// │        Barcode cost segment                             │               │
/// │        (ciphered for some vendors)                      ▼               │
/// │                                          Grand total + round-off       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(2499, 99).paise(), 249999);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Calculates tax at the given rate, rounded to the paisa.
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::money::Money;
    /// use vastra_core::types::TaxRate;
    ///
    /// let freight = Money::from_rupees(50);
    /// let tax = freight.calculate_tax(TaxRate::from_bps(500));
    /// assert_eq!(tax.paise(), 250); // ₹2.50
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = div_round_half_away(self.0 as i128 * rate.bps() as i128, 10_000);
        Money(tax as i64)
    }

    /// Scales this amount by `numerator / denominator`, rounded to the paisa.
    ///
    /// Used to pro-rate an invoice-level amount over lines. Returns zero when
    /// `denominator` is zero.
    pub fn scale(&self, numerator: Money, denominator: Money) -> Money {
        if denominator.is_zero() {
            return Money::zero();
        }
        let mut num = self.0 as i128 * numerator.0 as i128;
        let mut den = denominator.0 as i128;
        if den < 0 {
            num = -num;
            den = -den;
        }
        Money(div_round_half_away(num, den) as i64)
    }

    /// Adds a markup given in basis points, rounding up to the whole rupee.
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::money::Money;
    ///
    /// // ₹450.00 + 120% markup = ₹990.00
    /// assert_eq!(Money::from_rupees(450).apply_markup(12_000).paise(), 99_000);
    /// // ₹333.33 + 50% = ₹499.995 → ₹500
    /// assert_eq!(Money::from_paise(33_333).apply_markup(5_000).paise(), 50_000);
    /// ```
    pub fn apply_markup(&self, markup_bps: u32) -> Money {
        let raw = self.0 as i128 * (10_000 + markup_bps as i128);
        // paise × 10_000 units; ceil to the next multiple of 100 paise
        let unit = 10_000i128 * 100;
        let rupees = if raw >= 0 {
            (raw + unit - 1) / unit
        } else {
            raw / unit
        };
        Money((rupees * 100) as i64)
    }

    /// Rounds to the nearest whole rupee (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use vastra_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(111450).round_to_rupee().paise(), 111500);
    /// assert_eq!(Money::from_paise(111449).round_to_rupee().paise(), 111400);
    /// ```
    pub fn round_to_rupee(&self) -> Money {
        Money((div_round_half_away(self.0 as i128, 100) * 100) as i64)
    }

    /// Plain decimal rendering used inside barcode strings.
    ///
    /// Whole rupee amounts render without a fraction (`450`), others with
    /// two paise digits (`450.50`). No currency symbol, no grouping.
    pub fn to_plain_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        if self.paise_part() == 0 {
            format!("{}{}", sign, self.rupees().abs())
        } else {
            format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            self.rupees().abs(),
            self.paise_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
