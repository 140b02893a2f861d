//! Data-access layer for the storefront backend.
//! Items, coupons and carts share one error convention: every operation
//! returns `RepoResult<T>` whose error is `NotFound`, `Conflict` or
//! `ServerError`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{DatabaseLocation, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::cart::{Cart, CartDetail, CartId, CartItem, CartItemId, CartLine};
pub use model::coupon::{Coupon, CouponId, CouponUpdate, NewCoupon};
pub use model::item::{Item, ItemId, ItemUpdate, NewItem};
pub use repo::cart_repo::{CartRepository, SqliteCartRepository};
pub use repo::coupon_repo::{CouponRepository, SqliteCouponRepository};
pub use repo::error::{ErrorBody, ErrorKind, RepoError, RepoResult};
pub use repo::item_repo::{ItemRepository, SqliteItemRepository};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
