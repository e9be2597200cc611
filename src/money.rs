// 💵 Money - Fixed-point cents
// Prices and line costs are integer cents internally; decimals only at the edges.

use serde::{Serialize, Serializer};
use std::fmt;

/// Largest accepted unit price. Anything above this no longer round-trips
/// exactly through an f64 at cent precision.
pub const MAX_PRICE: f64 = 1e13;

/// Amount of money in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Convert a decimal amount to cents, rounding half up.
    ///
    /// Returns `None` for negative, NaN, infinite or out-of-range amounts.
    pub fn from_decimal(amount: f64) -> Option<Cents> {
        if !amount.is_finite() || amount < 0.0 || amount > MAX_PRICE {
            return None;
        }
        // f64::round rounds half away from zero, which is half up for x >= 0
        Some(Cents((amount * 100.0).round() as i64))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// Decimal value for the JSON/CSV boundary.
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

/// Round to 2 decimals, half up.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Integer division of a non-negative numerator, rounded half up.
///
/// Returns 0 when `denominator` is 0.
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

/// Cents total (possibly wider than i64) as a decimal.
pub fn cents_to_decimal(cents: i128) -> f64 {
    cents as f64 / 100.0
}
