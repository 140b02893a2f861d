//! Catalog item model.
//!
//! # Invariants
//! - `id` and `slug` are globally unique.
//! - `slug` is fixed at creation; updates never touch it.
//! - `price` is non-negative; finiteness is left to callers.
//! - `qty` cannot go below zero.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a catalog item.
pub type ItemId = Uuid;

/// Persisted catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Human-facing unique alias, usable in place of `id` for lookups.
    pub slug: String,
    pub name: String,
    pub description: String,
    /// Thumbnail reference (URL or asset path).
    pub thumbnail: String,
    pub price: f64,
    /// Quantity on hand.
    pub qty: u32,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

/// Input for `ItemRepository::create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub thumbnail: String,
    pub price: f64,
    pub qty: u32,
}

/// Full replacement of an item's mutable fields.
///
/// The slug is not part of the update set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    pub price: f64,
    pub qty: u32,
}

impl From<&Item> for ItemUpdate {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            thumbnail: item.thumbnail.clone(),
            price: item.price,
            qty: item.qty,
        }
    }
}
