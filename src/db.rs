use crate::normalizer::MAX_QUANTITY;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's write lock by default.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) a ledger database file and make sure the schema exists.
pub fn open_database(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    // Must be set before anything that writes, so concurrent opens wait instead of failing
    conn.busy_timeout(busy_timeout)?;

    // Enable WAL mode for crash recovery and readers that don't block the writer
    conn.pragma_update(None, "journal_mode", "WAL")?;

    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // ==========================================================================
    // Items Table
    // Identity is (name_key, price_cents), not id. name_key is computed in Rust
    // because SQLite's LOWER() only folds ASCII.
    // ==========================================================================
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
                quantity INTEGER NOT NULL CHECK (quantity BETWEEN 1 AND {MAX_QUANTITY}),
                created_at TEXT NOT NULL,
                UNIQUE (name_key, price_cents)
            )"
        ),
        [],
    )?;

    Ok(())
}

pub fn verify_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
}
