// Item Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod global_stats;
pub mod import;
pub mod money;
pub mod normalizer;
pub mod stats;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{open_database, setup_database, verify_count, DEFAULT_BUSY_TIMEOUT};
pub use error::{LedgerError, LedgerResult};
pub use import::{load_csv, load_csv_from_reader};
pub use money::{round2, Cents, MAX_PRICE};
pub use normalizer::{
    name_key, normalize_batch, normalize_item, FieldError, IdentityKey, LineItem, ValidRow,
    ValidationError, MAX_QUANTITY,
};
pub use stats::{batch_stats, Stats, StatsTotals};
pub use store::{
    resolve_list_limit, BulkOutcome, Ledger, StoredItem, UpdateOutcome, DEFAULT_LIST_LIMIT,
    MAX_LIST_LIMIT,
};
