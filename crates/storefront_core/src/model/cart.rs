//! Cart model and its eagerly-resolved read shape.
//!
//! # Invariants
//! - A cart's `coupon_id`, when set, references an existing coupon.
//! - Cart lines belong to exactly one cart and are removed with it.
//! - A cart holds at most one line per item; line `qty` is always > 0.

use crate::model::coupon::{Coupon, CouponId};
use crate::model::item::{Item, ItemId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a cart.
pub type CartId = Uuid;

/// Stable identifier for a cart line.
pub type CartItemId = Uuid;

/// Bare cart row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub coupon_id: Option<CouponId>,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

/// Association row linking a cart to an item with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub item_id: ItemId,
    pub qty: u32,
    pub created_at: i64,
}

/// One cart line joined to its item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub cart_item: CartItem,
    pub item: Item,
}

/// Cart with lines and coupon resolved in the same read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDetail {
    #[serde(flatten)]
    pub cart: Cart,
    pub cart_items: Vec<CartLine>,
    pub coupon: Option<Coupon>,
}
