//! Coupon model.
//!
//! # Invariants
//! - `id` and `code` are globally unique.
//! - Unlike item slugs, coupon codes may be changed by an update.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a coupon.
pub type CouponId = Uuid;

/// Persisted coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Human-facing unique alias, usable in place of `id` for lookups.
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount: f64,
    /// Unix epoch milliseconds, assigned by the store.
    pub created_at: i64,
}

/// Input for `CouponRepository::create`; also the full update set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub name: String,
    pub code: String,
    pub description: String,
    pub discount: f64,
}

/// Coupon updates replace every mutable field, including `code`.
pub type CouponUpdate = NewCoupon;

impl From<&Coupon> for NewCoupon {
    fn from(coupon: &Coupon) -> Self {
        Self {
            name: coupon.name.clone(),
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount: coupon.discount,
        }
    }
}
