// 📊 Stats - Aggregate statistics over line items
// Same formulas for a submitted batch and for the whole ledger.

use crate::money::{cents_to_decimal, div_round_half_up};
use crate::normalizer::ValidRow;
use serde::{Deserialize, Serialize};

/// Aggregate statistics, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub line_item_count: i64,
    pub total_quantity: i64,
    pub total_cost: f64,
    /// Unweighted mean of unit prices (not weighted by quantity)
    pub avg_unit_price: f64,
    pub avg_line_cost: f64,
}

/// Exact running sums, in cents. Rounding only happens in [`StatsTotals::finish`].
///
/// Sums are i128 so that any number of rows at the price and quantity limits
/// adds up without overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsTotals {
    pub count: i64,
    pub quantity: i128,
    pub price_cents: i128,
    pub cost_cents: i128,
}

impl StatsTotals {
    pub fn add(&mut self, price_cents: i64, quantity: i64) {
        self.count += 1;
        self.quantity += i128::from(quantity);
        self.price_cents += i128::from(price_cents);
        self.cost_cents += i128::from(price_cents) * i128::from(quantity);
    }

    pub fn finish(&self) -> Stats {
        let count = i128::from(self.count);

        Stats {
            line_item_count: self.count,
            total_quantity: i64::try_from(self.quantity).unwrap_or(i64::MAX),
            total_cost: cents_to_decimal(self.cost_cents),
            avg_unit_price: cents_to_decimal(div_round_half_up(self.price_cents, count)),
            avg_line_cost: cents_to_decimal(div_round_half_up(self.cost_cents, count)),
        }
    }
}

/// Stats for a single submitted batch. Pure; nothing is persisted.
pub fn batch_stats(rows: &[ValidRow]) -> Stats {
    rows.iter()
        .fold(StatsTotals::default(), |mut totals, row| {
            totals.add(row.price.as_i64(), row.quantity);
            totals
        })
        .finish()
}
