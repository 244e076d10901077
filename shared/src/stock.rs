//! Stock projection and ledger arithmetic.
//!
//! The database applies movements with a single relative `UPDATE`; the
//! functions here describe the same arithmetic so that callers and tests can
//! reason about the expected counter without touching storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TransactionType, UnknownVariant};

/// Reorder threshold used when a product does not store its own.
pub const DEFAULT_REORDER_LEVEL: i32 = 10;

/// Upper bound (inclusive) of the "Medium Stock" dashboard bucket.
pub const MEDIUM_STOCK_CEILING: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    InStock,
}

/// Coarser bucketing used by the stock-trend dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockLevel {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low Stock")]
    Low,
    #[serde(rename = "Medium Stock")]
    Medium,
    #[serde(rename = "High Stock")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockHealth {
    Critical,
    Warning,
    Good,
}

/// What to do with an `OUT` movement larger than the quantity on hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverdrawPolicy {
    /// Floor the counter at zero and still record the requested quantity.
    #[default]
    Clamp,
    /// Refuse the movement; nothing is written.
    Reject,
}

/// Classify a quantity against a reorder level.
///
/// `0` is always out of stock, anything below the reorder level is low, and
/// anything at or above it is in stock.
pub fn classify(quantity: i32, reorder_level: i32) -> StockStatus {
    if quantity <= 0 {
        StockStatus::OutOfStock
    } else if quantity < reorder_level {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

pub fn level(quantity: i32, reorder_level: i32) -> StockLevel {
    match classify(quantity, reorder_level) {
        StockStatus::OutOfStock => StockLevel::OutOfStock,
        StockStatus::LowStock => StockLevel::Low,
        StockStatus::InStock if quantity <= MEDIUM_STOCK_CEILING => StockLevel::Medium,
        StockStatus::InStock => StockLevel::High,
    }
}

/// Resolve the reorder level for a product that may not store one.
pub fn effective_reorder_level(stored: Option<i32>, default_level: i32) -> i32 {
    stored.unwrap_or(default_level)
}

/// Counter value after applying one movement.
///
/// Returns `None` when the movement is refused under [`OverdrawPolicy::Reject`].
/// `ADJUSTMENT` rows carry no counter effect.
pub fn apply_movement(
    current: i32,
    kind: TransactionType,
    quantity: i32,
    policy: OverdrawPolicy,
) -> Option<i32> {
    match kind {
        TransactionType::In => Some(current.saturating_add(quantity)),
        TransactionType::Out => match policy {
            OverdrawPolicy::Clamp => Some(current.saturating_sub(quantity).max(0)),
            OverdrawPolicy::Reject if quantity > current => None,
            OverdrawPolicy::Reject => Some(current - quantity),
        },
        TransactionType::Adjustment => Some(current),
    }
}

/// Replay a product's ledger from zero under the clamp policy.
pub fn replay<I>(movements: I) -> i32
where
    I: IntoIterator<Item = (TransactionType, i32)>,
{
    movements.into_iter().fold(0, |current, (kind, quantity)| {
        apply_movement(current, kind, quantity, OverdrawPolicy::Clamp).unwrap_or(current)
    })
}

/// Display code for a product id, e.g. `P007`.
pub fn product_code(id: i32) -> String {
    format!("P{id:03}")
}

/// Display code for a ledger row id, e.g. `T042`.
pub fn transaction_code(id: i32) -> String {
    format!("T{id:03}")
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }

    pub fn health(&self) -> StockHealth {
        match self {
            StockStatus::OutOfStock => StockHealth::Critical,
            StockStatus::LowStock => StockHealth::Warning,
            StockStatus::InStock => StockHealth::Good,
        }
    }
}

impl FromStr for StockStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Out of Stock" => Ok(StockStatus::OutOfStock),
            "Low Stock" => Ok(StockStatus::LowStock),
            "In Stock" => Ok(StockStatus::InStock),
            _ => Err(UnknownVariant {
                kind: "stock status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StockHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockHealth::Critical => "Critical",
            StockHealth::Warning => "Warning",
            StockHealth::Good => "Good",
        }
    }
}

impl FromStr for OverdrawPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clamp" => Ok(OverdrawPolicy::Clamp),
            "reject" => Ok(OverdrawPolicy::Reject),
            _ => Err(UnknownVariant {
                kind: "overdraw policy",
                value: s.to_string(),
            }),
        }
    }
}
