//! Storefront domain model.
//!
//! # Responsibility
//! - Define the records persisted for items, coupons and carts.
//! - Define the write inputs each repository accepts.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - `created_at` is assigned by the store and never rewritten.

pub mod cart;
pub mod coupon;
pub mod item;
