//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define one data-access contract per entity (item, coupon, cart).
//! - Isolate SQL details from callers.
//! - Normalize every store failure into `RepoError`.
//!
//! # Invariants
//! - Repositories are stateless apart from the borrowed connection.
//! - Each operation is one statement, or one composed read, against the
//!   store; quantity changes are single atomic `UPDATE` expressions.
//! - Missing rows surface as `ErrorKind::NotFound` on every write path.

pub mod cart_repo;
mod columns;
pub mod coupon_repo;
pub mod error;
pub mod item_repo;
