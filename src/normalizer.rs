// 🧹 Normalizer - Validate and canonicalize submitted line items
// All-or-nothing: one bad row rejects the whole batch.

use crate::money::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// INPUT / OUTPUT ROWS
// ============================================================================

/// Line item as submitted by a client. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        LineItem {
            name: name.into(),
            price,
            quantity,
        }
    }
}

/// Validated line item: trimmed name, price in cents, quantity >= 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRow {
    pub name: String,
    pub price: Cents,
    pub quantity: i64,
}

impl ValidRow {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(&self.name, self.price)
    }
}

/// The true identity of a stored item: (lowercase trimmed name, price).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub name_key: String,
    pub price: Cents,
}

impl IdentityKey {
    pub fn new(name: &str, price: Cents) -> Self {
        IdentityKey {
            name_key: name_key(name),
            price,
        }
    }
}

/// Largest quantity a single row may hold, submitted or accumulated.
/// Keeps every stored quantity and every price * quantity product well inside i64.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Normalized name used for identity comparison.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// ERRORS
// ============================================================================

/// Why a single item failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("item name cannot be empty")]
    EmptyName,

    #[error("price must be valid and >= 0")]
    InvalidPrice,

    #[error("price must not exceed {}", crate::money::MAX_PRICE)]
    PriceOutOfRange,

    #[error("quantity must be >= 1")]
    InvalidQuantity,

    #[error("quantity must not exceed {}", MAX_QUANTITY)]
    QuantityOutOfRange,

    /// Adding to an existing identity would push its quantity past the limit.
    #[error("accumulated quantity would exceed {}", MAX_QUANTITY)]
    AccumulatedQuantityOutOfRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("items cannot be empty")]
    EmptyBatch,

    #[error("item {index}: {reason}")]
    Item { index: usize, reason: FieldError },

    #[error(transparent)]
    Field(#[from] FieldError),
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Validate a single item and convert it to a row.
pub fn normalize_item(item: &LineItem) -> Result<ValidRow, FieldError> {
    let name = item.name.trim();
    if name.is_empty() {
        return Err(FieldError::EmptyName);
    }

    if !item.price.is_finite() || item.price < 0.0 {
        return Err(FieldError::InvalidPrice);
    }
    let price = Cents::from_decimal(item.price).ok_or(FieldError::PriceOutOfRange)?;

    if item.quantity < 1 {
        return Err(FieldError::InvalidQuantity);
    }
    if item.quantity > MAX_QUANTITY {
        return Err(FieldError::QuantityOutOfRange);
    }

    Ok(ValidRow {
        name: name.to_string(),
        price,
        quantity: item.quantity,
    })
}

/// Validate a whole batch. Fails on the first bad item, reporting its index.
pub fn normalize_batch(items: &[LineItem]) -> Result<Vec<ValidRow>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            normalize_item(item).map_err(|reason| ValidationError::Item { index, reason })
        })
        .collect()
}
