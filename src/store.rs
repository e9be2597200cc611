// 🔀 Merge Store - Persistent item ledger with identity resolution
//
// Identity is (lowercase trimmed name, price), never the id:
// - Bulk inserts accumulate into an existing identity (atomic upsert)
// - Edits that collide with another row's identity merge into that row
//
// Every writer runs inside BEGIN IMMEDIATE, which takes SQLite's write lock up
// front. Two writers can never interleave inside a merge, even from separate
// connections to the same file.

use crate::db::{open_database, setup_database, verify_count, DEFAULT_BUSY_TIMEOUT};
use crate::error::{LedgerError, LedgerResult};
use crate::global_stats;
use crate::money::Cents;
use crate::normalizer::{name_key, FieldError, ValidRow, ValidationError, MAX_QUANTITY};
use crate::stats::Stats;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Rows returned by `list` when no usable limit is given.
pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

// ============================================================================
// STORED ITEM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    /// Assigned by the store; stable for the life of the row
    pub id: i64,

    /// Display name, as first submitted (or last renamed without merge)
    pub name: String,

    pub price: Cents,

    pub quantity: i64,

    /// When this identity was first created
    pub created_at: DateTime<Utc>,
}

const ITEM_COLUMNS: &str = "id, name, price_cents, quantity, created_at";

fn item_from_row(row: &Row) -> rusqlite::Result<StoredItem> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(StoredItem {
        id: row.get(0)?,
        name: row.get(1)?,
        price: Cents(row.get(2)?),
        quantity: row.get(3)?,
        created_at,
    })
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkOutcome {
    /// Rows that created a new identity
    pub created: usize,

    /// Rows folded into an identity that already existed
    pub accumulated: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// The surviving row: the edited row, or the merge target
    pub item: StoredItem,

    /// True when the edit collided with another row and was folded into it
    pub merged: bool,
}

/// Resolve a requested list window: unspecified or out of [1, MAX_LIST_LIMIT] gets the default.
pub fn resolve_list_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => limit,
        _ => DEFAULT_LIST_LIMIT,
    }
}

// ============================================================================
// TRANSACTION BODIES
// ============================================================================

/// Upsert every row, adding to the stored quantity on identity conflict.
///
/// Never reads before writing: the conflict is resolved by SQLite inside the
/// INSERT, so concurrent batches touching the same identity both land. An
/// upsert that would push a quantity past [`MAX_QUANTITY`] returns no row and
/// fails the whole batch.
pub fn accumulate_rows(
    tx: &Transaction,
    rows: &[ValidRow],
    now: DateTime<Utc>,
) -> LedgerResult<BulkOutcome> {
    let created_at = now.to_rfc3339();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO items (name, name_key, price_cents, quantity, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (name_key, price_cents)
         DO UPDATE SET quantity = items.quantity + excluded.quantity
         WHERE items.quantity + excluded.quantity <= ?6
         RETURNING quantity",
    )?;

    let mut outcome = BulkOutcome::default();
    for (index, row) in rows.iter().enumerate() {
        let stored_quantity: Option<i64> = stmt
            .query_row(
                params![
                    row.name,
                    name_key(&row.name),
                    row.price.as_i64(),
                    row.quantity,
                    created_at,
                    MAX_QUANTITY,
                ],
                |r| r.get(0),
            )
            .optional()?;

        let Some(stored_quantity) = stored_quantity else {
            return Err(ValidationError::Item {
                index,
                reason: FieldError::AccumulatedQuantityOutOfRange,
            }
            .into());
        };

        // Stored quantities are >= 1, so an accumulated row always ends up larger
        if stored_quantity == row.quantity {
            outcome.created += 1;
        } else {
            outcome.accumulated += 1;
        }
    }

    Ok(outcome)
}

/// Apply an edit to row `id`, merging into another row if the new identity is taken.
pub fn merge_or_update(tx: &Transaction, id: i64, edit: &ValidRow) -> LedgerResult<UpdateOutcome> {
    // 1) The source row must exist
    let source_exists = tx
        .query_row("SELECT 1 FROM items WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some();
    if !source_exists {
        return Err(LedgerError::NotFound(id));
    }

    // 2-3) Does a different row already hold the new identity?
    let key = name_key(&edit.name);
    let target: Option<(i64, i64)> = tx
        .query_row(
            "SELECT id, quantity FROM items
             WHERE name_key = ?1 AND price_cents = ?2 AND id <> ?3",
            params![key, edit.price.as_i64(), id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match target {
        // 4) Collision: fold into the target, drop the source
        Some((target_id, target_quantity)) => {
            if target_quantity + edit.quantity > MAX_QUANTITY {
                return Err(FieldError::AccumulatedQuantityOutOfRange.into());
            }

            tx.execute(
                "UPDATE items SET quantity = quantity + ?1 WHERE id = ?2",
                params![edit.quantity, target_id],
            )?;
            tx.execute("DELETE FROM items WHERE id = ?1", [id])?;

            let item = fetch_item(tx, target_id)?.ok_or(LedgerError::NotFound(target_id))?;
            Ok(UpdateOutcome { item, merged: true })
        }

        // 5) No collision: rewrite the source in place
        None => {
            tx.execute(
                "UPDATE items
                 SET name = ?1, name_key = ?2, price_cents = ?3, quantity = ?4
                 WHERE id = ?5",
                params![edit.name, key, edit.price.as_i64(), edit.quantity, id],
            )?;

            let item = fetch_item(tx, id)?.ok_or(LedgerError::NotFound(id))?;
            Ok(UpdateOutcome {
                item,
                merged: false,
            })
        }
    }
}

pub fn fetch_item(conn: &Connection, id: i64) -> rusqlite::Result<Option<StoredItem>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
        [id],
        item_from_row,
    )
    .optional()
}

pub fn list_items(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<StoredItem>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY id DESC LIMIT ?1"
    ))?;

    let items = stmt
        .query_map([limit], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

// ============================================================================
// LEDGER HANDLE
// ============================================================================

/// Shared handle to the item ledger.
///
/// Clones share one connection. Separate handles opened on the same file are
/// also safe: writers serialize on SQLite's write lock.
#[derive(Clone)]
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
}

impl Ledger {
    pub fn open(path: &Path) -> LedgerResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> LedgerResult<Self> {
        let conn = open_database(path, busy_timeout)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Ledger {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `op` in a write transaction. Any error drops the transaction, which rolls back.
    fn write<T>(&self, op: impl FnOnce(&Transaction) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Accumulate a validated batch, all or nothing.
    pub fn bulk_accumulate(&self, rows: &[ValidRow]) -> LedgerResult<BulkOutcome> {
        if rows.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let outcome = self.write(|tx| accumulate_rows(tx, rows, Utc::now()))?;
        info!(
            created = outcome.created,
            accumulated = outcome.accumulated,
            "bulk accumulate committed"
        );
        Ok(outcome)
    }

    /// Accumulate a batch and read global stats inside the same transaction.
    ///
    /// The stats describe exactly the state being committed. If they cannot be
    /// computed, the batch is rolled back with them.
    pub fn bulk_accumulate_with_stats(
        &self,
        rows: &[ValidRow],
    ) -> LedgerResult<(BulkOutcome, Stats)> {
        let (outcome, stats) = self.write(|tx| {
            let outcome = if rows.is_empty() {
                BulkOutcome::default()
            } else {
                accumulate_rows(tx, rows, Utc::now())?
            };
            Ok((outcome, global_stats::compute(tx)?))
        })?;

        info!(
            created = outcome.created,
            accumulated = outcome.accumulated,
            total_items = stats.line_item_count,
            "bulk accumulate committed"
        );
        Ok((outcome, stats))
    }

    /// Edit row `id`; merges into an existing row when the new identity is taken.
    pub fn update_with_merge(&self, id: i64, edit: &ValidRow) -> LedgerResult<UpdateOutcome> {
        let outcome = self.write(|tx| merge_or_update(tx, id, edit))?;

        if outcome.merged {
            info!(source = id, target = outcome.item.id, "item merged");
        } else {
            debug!(id, "item updated in place");
        }
        Ok(outcome)
    }

    /// Returns true if a row was removed, false if it was already absent.
    pub fn delete_one(&self, id: i64) -> LedgerResult<bool> {
        let removed =
            self.write(|tx| Ok(tx.execute("DELETE FROM items WHERE id = ?1", [id])? == 1))?;
        debug!(id, removed, "delete one");
        Ok(removed)
    }

    /// Remove every row and restart id allocation. Returns rows removed.
    pub fn clear_all(&self) -> LedgerResult<usize> {
        let removed = self.write(|tx| {
            let removed = tx.execute("DELETE FROM items", [])?;
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'items'", [])?;
            Ok(removed)
        })?;
        info!(removed, "ledger cleared");
        Ok(removed)
    }

    /// Newest ids first.
    pub fn list(&self, limit: Option<i64>) -> LedgerResult<Vec<StoredItem>> {
        let conn = self.lock()?;
        Ok(list_items(&conn, resolve_list_limit(limit))?)
    }

    pub fn get(&self, id: i64) -> LedgerResult<Option<StoredItem>> {
        let conn = self.lock()?;
        Ok(fetch_item(&conn, id)?)
    }

    pub fn count(&self) -> LedgerResult<i64> {
        let conn = self.lock()?;
        Ok(verify_count(&conn)?)
    }

    /// Stats over the whole ledger, computed fresh from the store.
    pub fn global_stats(&self) -> LedgerResult<Stats> {
        let conn = self.lock()?;
        Ok(global_stats::compute(&conn)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
