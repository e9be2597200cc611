// 🌍 Global Stats - Aggregate over everything currently in the ledger
// Computed fresh on every call; nothing is cached between calls.

use crate::stats::{Stats, StatsTotals};
use rusqlite::Connection;

/// Compute stats over all stored items.
///
/// Rows are summed in Rust rather than with SQL `SUM`: SQLite sums in i64 and
/// price * quantity totals at the limits do not fit.
pub fn compute(conn: &Connection) -> rusqlite::Result<Stats> {
    let mut stmt = conn.prepare_cached("SELECT price_cents, quantity FROM items")?;
    let mut rows = stmt.query([])?;

    let mut totals = StatsTotals::default();
    while let Some(row) = rows.next()? {
        totals.add(row.get(0)?, row.get(1)?);
    }

    Ok(totals.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::MAX_PRICE;
    use crate::normalizer::{normalize_batch, LineItem, MAX_QUANTITY};
    use crate::stats::batch_stats;
    use crate::store::Ledger;

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let ledger = Ledger::open_in_memory().unwrap();
        assert_eq!(ledger.global_stats().unwrap(), Stats::default());
    }

    #[test]
    fn test_matches_batch_formulas_for_distinct_identities() {
        let ledger = Ledger::open_in_memory().unwrap();
        let rows = normalize_batch(&[
            LineItem::new("Widget", 10.00, 2),
            LineItem::new("Gadget", 20.00, 1),
            LineItem::new("Sprocket", 0.99, 7),
        ])
        .unwrap();

        ledger.bulk_accumulate(&rows).unwrap();

        assert_eq!(ledger.global_stats().unwrap(), batch_stats(&rows));
    }

    #[test]
    fn test_counts_stored_rows_not_submitted_lines() {
        let ledger = Ledger::open_in_memory().unwrap();
        let rows = normalize_batch(&[
            LineItem::new("Widget", 10.00, 3),
            LineItem::new("widget ", 10.00, 2),
            LineItem::new("Gadget", 20.00, 1),
        ])
        .unwrap();

        ledger.bulk_accumulate(&rows).unwrap();
        let stats = ledger.global_stats().unwrap();

        assert_eq!(stats.line_item_count, 2);
        assert_eq!(stats.total_quantity, 6);
        assert_eq!(stats.total_cost, 70.0);
        assert_eq!(stats.avg_unit_price, 15.0);
        assert_eq!(stats.avg_line_cost, 35.0);
    }

    #[test]
    fn test_totals_at_limits_stay_readable() {
        let ledger = Ledger::open_in_memory().unwrap();
        let rows = normalize_batch(&[
            LineItem::new("Yacht", MAX_PRICE, MAX_QUANTITY),
            LineItem::new("Jet", MAX_PRICE, MAX_QUANTITY),
            LineItem::new("Island", MAX_PRICE, MAX_QUANTITY),
        ])
        .unwrap();

        ledger.bulk_accumulate(&rows).unwrap();
        let stats = ledger.global_stats().unwrap();

        assert_eq!(stats.line_item_count, 3);
        assert_eq!(stats.total_quantity, 3 * MAX_QUANTITY);
        assert_eq!(stats.avg_unit_price, MAX_PRICE);
        assert_eq!(stats, batch_stats(&rows));
    }

    #[test]
    fn test_reflects_merges_and_deletes() {
        let ledger = Ledger::open_in_memory().unwrap();
        let rows = normalize_batch(&[
            LineItem::new("A", 5.00, 3),
            LineItem::new("B", 7.00, 4),
        ])
        .unwrap();
        ledger.bulk_accumulate(&rows).unwrap();

        ledger.update_with_merge(1, &rows[1]).unwrap();
        let stats = ledger.global_stats().unwrap();
        assert_eq!(stats.line_item_count, 1);
        assert_eq!(stats.total_quantity, 8);
        assert_eq!(stats.total_cost, 56.0);

        ledger.delete_one(2).unwrap();
        assert_eq!(ledger.global_stats().unwrap(), Stats::default());
    }
}
